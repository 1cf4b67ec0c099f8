//! HTTP server for the gym membership system.
//!
//! Mounts the [`gym_api`] router under `/api` behind Basic authentication,
//! and owns the daily reconciliation task.

pub mod auth;
pub mod error;
pub mod scheduler;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, middleware};
use chrono::{FixedOffset, NaiveTime};
use gym_core::{Gym, Settings, store::GymStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use scheduler::DailySchedule;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `GYM_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "defaults::host")]
  pub host:          String,
  #[serde(default = "defaults::port")]
  pub port:          u16,
  #[serde(default = "defaults::store_path")]
  pub store_path:    PathBuf,
  #[serde(default)]
  pub reconcile:     ReconcileConfig,
  #[serde(default)]
  pub notifications: NotificationsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReconcileConfig {
  /// Local time of the daily sweep, `HH:MM` or `HH:MM:SS`.
  pub run_at:             String,
  /// Offset of the gym's local time from UTC.
  pub utc_offset_minutes: i32,
  /// Sweep once before accepting requests.
  pub run_on_startup:     bool,
  /// Attempts per member write before reporting a conflict.
  pub max_attempts:       u32,
}

impl Default for ReconcileConfig {
  fn default() -> Self {
    Self {
      run_at:             "00:00".to_string(),
      utc_offset_minutes: 0,
      run_on_startup:     true,
      max_attempts:       5,
    }
  }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NotificationsConfig {
  pub page_size: usize,
}

impl Default for NotificationsConfig {
  fn default() -> Self { Self { page_size: 20 } }
}

mod defaults {
  use std::path::PathBuf;

  pub fn host() -> String { "127.0.0.1".to_string() }

  pub fn port() -> u16 { 8080 }

  pub fn store_path() -> PathBuf { PathBuf::from("~/.local/share/gym/gym.db") }
}

impl ServerConfig {
  pub fn utc_offset(&self) -> Result<FixedOffset, Error> {
    FixedOffset::east_opt(self.reconcile.utc_offset_minutes.saturating_mul(60))
      .ok_or_else(|| {
        Error::Config(format!(
          "utc_offset_minutes out of range: {}",
          self.reconcile.utc_offset_minutes
        ))
      })
  }

  /// Service tunables derived from this configuration.
  pub fn settings(&self) -> Result<Settings, Error> {
    if self.notifications.page_size == 0 {
      return Err(Error::Config("notifications.page_size must be positive".into()));
    }
    Ok(Settings {
      utc_offset:   self.utc_offset()?,
      max_attempts: self.reconcile.max_attempts,
      page_size:    self.notifications.page_size,
    })
  }

  pub fn schedule(&self) -> Result<DailySchedule, Error> {
    let raw = self.reconcile.run_at.trim();
    let run_at = NaiveTime::parse_from_str(raw, "%H:%M:%S")
      .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
      .map_err(|_| Error::Config(format!("run_at is not a time of day: {raw:?}")))?;
    Ok(DailySchedule { run_at, offset: self.utc_offset()? })
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through the middleware.
pub struct AppState<S> {
  pub gym:    Arc<Gym<S>>,
  pub config: Arc<ServerConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { gym: Arc::clone(&self.gym), config: Arc::clone(&self.config) }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: GymStore + 'static,
{
  let api = gym_api::api_router(state.gym.clone()).layer(
    middleware::from_fn_with_state(state.clone(), auth::require_actor::<S>),
  );

  Router::new()
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}
