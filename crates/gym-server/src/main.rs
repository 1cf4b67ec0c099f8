//! gym-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered with
//! `GYM_*` environment variables, opens the SQLite store, and serves the JSON
//! API with a daily reconciliation task running alongside.
//!
//! # First start
//!
//! ```text
//! gym-server bootstrap --name "Owner" --email owner@example.com
//! gym-server serve
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use gym_core::{Gym, clock::SystemClock};
use gym_server::{AppState, ServerConfig, scheduler::Reconciler};
use gym_store_sqlite::SqliteStore;
use tokio::{net::TcpListener, sync::watch};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Gym membership server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
  /// Run one reconciliation sweep, print the report and exit.
  Reconcile,
  /// Create the first super-admin account; the password is read from stdin.
  Bootstrap {
    #[arg(long)]
    name:  String,
    #[arg(long)]
    email: String,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  match cli.command.unwrap_or(Command::Serve) {
    Command::HashPassword => {
      let password = read_password()?;
      let hash = gym_api::credentials::hash_password(&password)
        .context("failed to hash password")?;
      println!("{hash}");
      Ok(())
    }
    Command::Reconcile => {
      let (gym, _) = open(&cli.config).await?;
      let report = gym.run_sweep().await.context("reconciliation failed")?;
      println!("{}", serde_json::to_string_pretty(&report)?);
      Ok(())
    }
    Command::Bootstrap { name, email } => {
      let (gym, _) = open(&cli.config).await?;
      let password = read_password()?;
      let hash = gym_api::credentials::hash_password(&password)
        .context("failed to hash password")?;
      let account = gym
        .bootstrap_super_admin(name, email, hash)
        .await
        .context("failed to create super-admin")?;
      println!("created super-admin {} ({})", account.account_id, account.email);
      Ok(())
    }
    Command::Serve => serve(&cli.config).await,
  }
}

/// Load configuration and open the store.
async fn open(config_path: &Path) -> anyhow::Result<(Arc<Gym<SqliteStore>>, ServerConfig)> {
  let settings = config::Config::builder()
    .add_source(config::File::from(config_path).required(false))
    .add_source(
      config::Environment::with_prefix("GYM")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let gym = Gym::new(
    Arc::new(store),
    Arc::new(SystemClock),
    server_cfg.settings()?,
  );
  Ok((Arc::new(gym), server_cfg))
}

async fn serve(config_path: &Path) -> anyhow::Result<()> {
  let (gym, server_cfg) = open(config_path).await?;
  let reconciler = Reconciler::new(gym.clone(), server_cfg.schedule()?);

  if server_cfg.reconcile.run_on_startup {
    reconciler.sweep_once().await;
  }

  let (shutdown_tx, shutdown_rx) = watch::channel(false);
  let reconcile_task = tokio::spawn(async move { reconciler.run(shutdown_rx).await });

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let state = AppState { gym, config: Arc::new(server_cfg) };
  let app = gym_server::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(async move {
      if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
      }
      tracing::info!("shutting down");
      let _ = shutdown_tx.send(true);
    })
    .await
    .context("server error")?;

  reconcile_task.await.context("reconciliation task panicked")?;
  Ok(())
}

/// Read one line from stdin as the password.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
