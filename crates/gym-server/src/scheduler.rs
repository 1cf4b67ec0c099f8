//! The daily reconciliation task.
//!
//! The server owns one [`Reconciler`] which sleeps until the configured local
//! time, runs a sweep and goes back to sleep. A `watch` channel carries the
//! shutdown signal; a sweep in progress is finished before the task exits.

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};
use gym_core::{Gym, store::GymStore};
use tokio::sync::watch;

/// "Every day at `run_at`, local time".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
  pub run_at: NaiveTime,
  pub offset: FixedOffset,
}

impl DailySchedule {
  /// The first run strictly after `now`.
  pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
    let shift = Duration::seconds(i64::from(self.offset.local_minus_utc()));
    let local_date = now.with_timezone(&self.offset).date_naive();
    let today = (local_date.and_time(self.run_at) - shift).and_utc();
    if today > now { today } else { today + Duration::days(1) }
  }
}

pub struct Reconciler<S> {
  gym:      Arc<Gym<S>>,
  schedule: DailySchedule,
}

impl<S: GymStore + 'static> Reconciler<S> {
  pub fn new(gym: Arc<Gym<S>>, schedule: DailySchedule) -> Self {
    Self { gym, schedule }
  }

  /// Run one sweep, logging the outcome. Errors never escape.
  pub async fn sweep_once(&self) {
    match self.gym.run_sweep().await {
      Ok(report) if !report.failures.is_empty() => {
        tracing::warn!(failures = report.failures.len(), "reconciliation finished with failures");
      }
      Ok(_) => {}
      Err(e) => tracing::error!(error = %e, "reconciliation sweep failed"),
    }
  }

  /// Loop until `shutdown` flips to `true` or its sender goes away.
  pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
    loop {
      let now = self.gym.now();
      let next = self.schedule.next_run_after(now);
      let wait = (next - now).to_std().unwrap_or_default();
      tracing::debug!(next_run = %next, "reconciliation scheduled");

      tokio::select! {
        changed = shutdown.changed() => {
          if changed.is_err() || *shutdown.borrow() {
            tracing::info!("reconciliation task stopping");
            return;
          }
        }
        _ = tokio::time::sleep(wait) => {
          self.sweep_once().await;
        }
      }
    }
  }
}
