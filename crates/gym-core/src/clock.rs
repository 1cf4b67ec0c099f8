//! Time source injected into services. The lifecycle engine never reads the
//! system clock itself; it is always handed `now`.

use std::sync::RwLock;

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone as _, Utc};

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
  now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
  pub fn new(now: DateTime<Utc>) -> Self { Self { now: RwLock::new(now) } }

  pub fn set(&self, now: DateTime<Utc>) {
    *self.now.write().unwrap_or_else(|e| e.into_inner()) = now;
  }

  pub fn advance(&self, by: Duration) {
    let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
    *guard += by;
  }
}

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.read().unwrap_or_else(|e| e.into_inner())
  }
}

/// The instant of the most recent local midnight at or before `now`, where
/// "local" is the fixed UTC offset the gym operates in.
pub fn local_midnight(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
  let local_date = now.with_timezone(&offset).date_naive();
  offset
    .from_local_datetime(&local_date.and_time(NaiveTime::MIN))
    .single()
    .map(|dt| dt.with_timezone(&Utc))
    .unwrap_or(now)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
  }

  #[test]
  fn midnight_in_utc() {
    let utc = FixedOffset::east_opt(0).unwrap();
    assert_eq!(
      local_midnight(at("2025-02-02T17:45:00Z"), utc),
      at("2025-02-02T00:00:00Z")
    );
  }

  #[test]
  fn midnight_respects_offset() {
    // 01:30 UTC is still the previous evening in UTC-05:00.
    let est = FixedOffset::west_opt(5 * 3600).unwrap();
    assert_eq!(
      local_midnight(at("2025-02-02T01:30:00Z"), est),
      at("2025-02-01T05:00:00Z")
    );
  }

  #[test]
  fn fixed_clock_advances() {
    let clock = FixedClock::new(at("2025-01-01T00:00:00Z"));
    clock.advance(Duration::days(2));
    assert_eq!(clock.now(), at("2025-01-03T00:00:00Z"));
  }
}
