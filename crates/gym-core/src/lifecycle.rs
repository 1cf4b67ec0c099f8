//! The membership lifecycle engine.
//!
//! [`transition`] is a pure function of `(member, event, now)`: it never reads
//! the clock, never touches storage and never fails. It returns the updated
//! member together with the notifications the caller should append.
//!
//! ```text
//! pending ──payment──▶ active ──freeze──▶ frozen ──resume──▶ active
//!                        │                  │
//!                        └──time passes─────┴──▶ expired ──payment──▶ active
//! any non-cancelled ──cancel──▶ cancelled
//! ```

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  member::{Member, MemberStatus, PaymentStatus},
  notification::{NewNotification, NotificationKind},
};

/// How far ahead of `membership_end` the expiring reminder starts.
pub const EXPIRY_WARNING_DAYS: i64 = 3;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

// ─── Events ──────────────────────────────────────────────────────────────────

/// An input to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
  /// A payment covering `period_months` calendar months was taken.
  PaymentReceived { period_months: u32 },
  /// The reconciliation sweep looked at the member.
  TimePassed,
  /// Staff paused an active membership.
  Freeze,
  /// Staff lifted a freeze.
  Resume,
  /// Staff ended the membership for good.
  Cancel,
}

// ─── Outputs ─────────────────────────────────────────────────────────────────

/// How notifications produced by an intent are deduplicated by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dedupe {
  /// Append unconditionally.
  None,
  /// At most one of this kind per member per local calendar day.
  PerMemberPerDay,
}

/// A notification the engine wants appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationIntent {
  pub kind:      NotificationKind,
  pub message:   String,
  pub member_id: Uuid,
  pub dedupe:    Dedupe,
}

impl NotificationIntent {
  pub fn into_new(self, now: DateTime<Utc>) -> NewNotification {
    NewNotification {
      kind:       self.kind,
      message:    self.message,
      member_id:  Some(self.member_id),
      created_by: None,
      created_at: now,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  /// The member record changed and must be persisted.
  Changed,
  /// Nothing to persist (intents may still be present).
  Unchanged,
  /// The event makes no sense for the member's current status.
  NotApplicable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
  pub member:  Member,
  pub intents: Vec<NotificationIntent>,
  pub outcome: Outcome,
}

impl Transition {
  pub fn changed(&self) -> bool { self.outcome == Outcome::Changed }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Apply `event` to `member` as of `now`.
pub fn transition(
  member: &Member,
  event: LifecycleEvent,
  now: DateTime<Utc>,
) -> Transition {
  let mut next = member.clone();
  let mut intents = Vec::new();

  let outcome = match event {
    LifecycleEvent::PaymentReceived { period_months } => {
      receive_payment(&mut next, period_months, now)
    }
    LifecycleEvent::TimePassed => pass_time(&mut next, now, &mut intents),
    LifecycleEvent::Freeze => match next.status {
      MemberStatus::Active => {
        next.status = MemberStatus::Frozen;
        Outcome::Changed
      }
      _ => Outcome::NotApplicable,
    },
    LifecycleEvent::Resume => resume(&mut next, now, &mut intents),
    LifecycleEvent::Cancel => match next.status {
      MemberStatus::Cancelled => Outcome::NotApplicable,
      _ => {
        next.status = MemberStatus::Cancelled;
        Outcome::Changed
      }
    },
  };

  if outcome == Outcome::Changed {
    next.updated_at = now;
  }

  Transition { member: next, intents, outcome }
}

fn receive_payment(m: &mut Member, period_months: u32, now: DateTime<Utc>) -> Outcome {
  if m.status == MemberStatus::Cancelled {
    return Outcome::NotApplicable;
  }

  match m.membership_end {
    // Unused time is preserved: the new period is stacked on the old end.
    Some(end) if end > now => {
      m.membership_end = Some(add_months(end, period_months));
    }
    _ => {
      m.membership_start = Some(now);
      m.membership_end = Some(add_months(now, period_months));
    }
  }
  m.status = MemberStatus::Active;
  m.payment_status = PaymentStatus::Paid;
  Outcome::Changed
}

fn pass_time(
  m: &mut Member,
  now: DateTime<Utc>,
  intents: &mut Vec<NotificationIntent>,
) -> Outcome {
  if !m.status.is_non_terminal() {
    return Outcome::Unchanged;
  }
  let Some(end) = m.membership_end else {
    return Outcome::Unchanged;
  };

  if end < now {
    m.status = MemberStatus::Expired;
    intents.push(expired_intent(m));
    return Outcome::Changed;
  }

  let remaining = end - now;
  if remaining > Duration::zero()
    && remaining <= Duration::days(EXPIRY_WARNING_DAYS)
  {
    let days = days_rounded_up(remaining);
    intents.push(NotificationIntent {
      kind:      NotificationKind::SubscriptionExpiring,
      message:   format!(
        "{}'s subscription expires in {days} day(s)",
        m.profile.full_name()
      ),
      member_id: m.member_id,
      dedupe:    Dedupe::PerMemberPerDay,
    });
  }
  Outcome::Unchanged
}

fn resume(
  m: &mut Member,
  now: DateTime<Utc>,
  intents: &mut Vec<NotificationIntent>,
) -> Outcome {
  if m.status != MemberStatus::Frozen {
    return Outcome::NotApplicable;
  }
  // Same boundary as `pass_time`: a member lapses only once `end < now`.
  match m.membership_end {
    Some(end) if end >= now => {
      m.status = MemberStatus::Active;
      Outcome::Changed
    }
    Some(_) => {
      m.status = MemberStatus::Expired;
      intents.push(expired_intent(m));
      Outcome::Changed
    }
    None => Outcome::NotApplicable,
  }
}

fn expired_intent(m: &Member) -> NotificationIntent {
  NotificationIntent {
    kind:      NotificationKind::SubscriptionExpired,
    message:   format!("{}'s subscription has expired", m.profile.full_name()),
    member_id: m.member_id,
    dedupe:    Dedupe::None,
  }
}

/// Calendar-month addition. A day that does not exist in the target month
/// clamps to that month's last day (Jan 31 + 1 month = Feb 28/29).
pub fn add_months(at: DateTime<Utc>, months: u32) -> DateTime<Utc> {
  at.checked_add_months(Months::new(months))
    .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn days_rounded_up(d: Duration) -> i64 {
  let ms = d.num_milliseconds();
  (ms + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::*;
  use crate::member::{MemberProfile, NewMember};

  fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
  }

  fn pending(created: &str) -> Member {
    NewMember {
      profile:    MemberProfile {
        given_name: "Dana".into(),
        family_name: Some("Reyes".into()),
        ..Default::default()
      },
      created_by: None,
      created_at: at(created),
    }
    .into_member(Uuid::nil())
  }

  fn active_until(end: &str) -> Member {
    let mut m = pending("2024-12-01T00:00:00Z");
    m.status = MemberStatus::Active;
    m.payment_status = PaymentStatus::Paid;
    m.membership_start = Some(at("2024-12-01T00:00:00Z"));
    m.membership_end = Some(at(end));
    m
  }

  fn pay(m: &Member, months: u32, now: &str) -> Transition {
    transition(m, LifecycleEvent::PaymentReceived { period_months: months }, at(now))
  }

  // ── payment_received ──────────────────────────────────────────────────────

  #[test]
  fn first_payment_opens_window_at_now() {
    let t = pay(&pending("2025-01-01T00:00:00Z"), 1, "2025-01-01T00:00:00Z");
    assert!(t.changed());
    assert!(t.intents.is_empty());
    assert_eq!(t.member.status, MemberStatus::Active);
    assert_eq!(t.member.payment_status, PaymentStatus::Paid);
    assert_eq!(t.member.membership_start, Some(at("2025-01-01T00:00:00Z")));
    assert_eq!(t.member.membership_end, Some(at("2025-02-01T00:00:00Z")));
  }

  #[test]
  fn payment_extends_future_end() {
    let t = pay(&active_until("2025-03-01T00:00:00Z"), 2, "2025-01-15T00:00:00Z");
    assert_eq!(t.member.membership_end, Some(at("2025-05-01T00:00:00Z")));
    assert_eq!(t.member.membership_start, Some(at("2024-12-01T00:00:00Z")));
  }

  #[test]
  fn lapsed_member_restarts_from_now() {
    let mut m = active_until("2025-01-10T00:00:00Z");
    m.status = MemberStatus::Expired;
    let t = pay(&m, 1, "2025-03-05T12:00:00Z");
    assert_eq!(t.member.status, MemberStatus::Active);
    assert_eq!(t.member.membership_start, Some(at("2025-03-05T12:00:00Z")));
    assert_eq!(t.member.membership_end, Some(at("2025-04-05T12:00:00Z")));
  }

  #[test]
  fn month_end_clamps_to_last_valid_day() {
    let t = pay(&pending("2025-01-31T00:00:00Z"), 1, "2025-01-31T09:00:00Z");
    assert_eq!(t.member.membership_end, Some(at("2025-02-28T09:00:00Z")));

    let t = pay(&pending("2024-01-31T00:00:00Z"), 1, "2024-01-31T09:00:00Z");
    assert_eq!(t.member.membership_end, Some(at("2024-02-29T09:00:00Z")));
  }

  #[test]
  fn cancelled_member_cannot_pay() {
    let mut m = active_until("2025-03-01T00:00:00Z");
    m.status = MemberStatus::Cancelled;
    let t = pay(&m, 1, "2025-01-15T00:00:00Z");
    assert_eq!(t.outcome, Outcome::NotApplicable);
    assert_eq!(t.member, m);
  }

  // ── time_passed ───────────────────────────────────────────────────────────

  #[test]
  fn expiry_happens_once() {
    let m = active_until("2025-02-01T00:00:00Z");
    let now = at("2025-02-02T00:00:00Z");

    let first = transition(&m, LifecycleEvent::TimePassed, now);
    assert!(first.changed());
    assert_eq!(first.member.status, MemberStatus::Expired);
    assert_eq!(first.intents.len(), 1);
    assert_eq!(first.intents[0].kind, NotificationKind::SubscriptionExpired);

    let second = transition(&first.member, LifecycleEvent::TimePassed, now);
    assert_eq!(second.outcome, Outcome::Unchanged);
    assert!(second.intents.is_empty());
  }

  #[test]
  fn exactly_three_days_out_warns() {
    let m = active_until("2025-02-04T00:00:00Z");
    let t = transition(&m, LifecycleEvent::TimePassed, at("2025-02-01T00:00:00Z"));
    assert_eq!(t.outcome, Outcome::Unchanged);
    assert_eq!(t.intents.len(), 1);
    let intent = &t.intents[0];
    assert_eq!(intent.kind, NotificationKind::SubscriptionExpiring);
    assert_eq!(intent.dedupe, Dedupe::PerMemberPerDay);
    assert_eq!(intent.message, "Dana Reyes's subscription expires in 3 day(s)");
  }

  #[test]
  fn partial_days_round_up() {
    let m = active_until("2025-02-02T06:00:00Z");
    let t = transition(&m, LifecycleEvent::TimePassed, at("2025-02-01T00:00:00Z"));
    assert!(t.intents[0].message.ends_with("in 2 day(s)"));
  }

  #[test]
  fn no_warning_outside_window() {
    let m = active_until("2025-02-04T00:00:01Z");
    let t = transition(&m, LifecycleEvent::TimePassed, at("2025-02-01T00:00:00Z"));
    assert!(t.intents.is_empty());

    let t = transition(&m, LifecycleEvent::TimePassed, at("2025-02-04T00:00:01Z"));
    assert!(t.intents.is_empty());
    assert_eq!(t.outcome, Outcome::Unchanged);
  }

  #[test]
  fn terminal_members_ignore_time() {
    for status in [MemberStatus::Cancelled, MemberStatus::Expired] {
      let mut m = active_until("2025-01-01T00:00:00Z");
      m.status = status;
      let t = transition(&m, LifecycleEvent::TimePassed, at("2025-06-01T00:00:00Z"));
      assert_eq!(t.outcome, Outcome::Unchanged);
      assert!(t.intents.is_empty());
    }
  }

  #[test]
  fn frozen_members_still_expire() {
    let mut m = active_until("2025-01-01T00:00:00Z");
    m.status = MemberStatus::Frozen;
    let t = transition(&m, LifecycleEvent::TimePassed, at("2025-01-02T00:00:00Z"));
    assert_eq!(t.member.status, MemberStatus::Expired);
  }

  // ── administrative events ─────────────────────────────────────────────────

  #[test]
  fn freeze_and_resume() {
    let m = active_until("2025-03-01T00:00:00Z");
    let frozen = transition(&m, LifecycleEvent::Freeze, at("2025-01-10T00:00:00Z"));
    assert_eq!(frozen.member.status, MemberStatus::Frozen);

    let resumed = transition(&frozen.member, LifecycleEvent::Resume, at("2025-01-20T00:00:00Z"));
    assert_eq!(resumed.member.status, MemberStatus::Active);

    let lapsed = transition(&frozen.member, LifecycleEvent::Resume, at("2025-04-01T00:00:00Z"));
    assert_eq!(lapsed.member.status, MemberStatus::Expired);
    assert_eq!(lapsed.intents[0].kind, NotificationKind::SubscriptionExpired);
  }

  #[test]
  fn resume_on_the_last_instant_reactivates() {
    let mut m = active_until("2025-02-01T00:00:00Z");
    m.status = MemberStatus::Frozen;
    let end = at("2025-02-01T00:00:00Z");

    let resumed = transition(&m, LifecycleEvent::Resume, end);
    assert_eq!(resumed.member.status, MemberStatus::Active);
    assert!(resumed.intents.is_empty());
    // The sweep agrees: nothing lapses at `end` itself.
    let swept = transition(&resumed.member, LifecycleEvent::TimePassed, end);
    assert_eq!(swept.member.status, MemberStatus::Active);
  }

  #[test]
  fn inapplicable_admin_events() {
    let p = pending("2025-01-01T00:00:00Z");
    let now = at("2025-01-02T00:00:00Z");
    assert_eq!(transition(&p, LifecycleEvent::Freeze, now).outcome, Outcome::NotApplicable);
    assert_eq!(transition(&p, LifecycleEvent::Resume, now).outcome, Outcome::NotApplicable);

    let cancelled = transition(&p, LifecycleEvent::Cancel, now);
    assert_eq!(cancelled.member.status, MemberStatus::Cancelled);
    assert_eq!(
      transition(&cancelled.member, LifecycleEvent::Cancel, now).outcome,
      Outcome::NotApplicable
    );
  }

  #[test]
  fn scenario_pay_then_lapse() {
    let member = pending("2025-01-01T00:00:00Z");
    let paid = pay(&member, 1, "2025-01-01T00:00:00Z");
    assert_eq!(paid.member.membership_end, Some(at("2025-02-01T00:00:00Z")));

    let swept = transition(&paid.member, LifecycleEvent::TimePassed, at("2025-02-02T00:00:00Z"));
    assert_eq!(swept.member.status, MemberStatus::Expired);
    assert_eq!(swept.intents.len(), 1);
  }

  // ── properties ────────────────────────────────────────────────────────────

  fn any_instant() -> impl Strategy<Value = DateTime<Utc>> {
    // 2000-01-01 .. 2040-01-01
    (946_684_800i64..2_208_988_800i64)
      .prop_map(|secs| DateTime::from_timestamp(secs, 0).unwrap())
  }

  proptest! {
    #[test]
    fn fresh_payment_is_now_plus_months(now in any_instant(), months in 1u32..=36) {
      let mut m = pending("2000-01-01T00:00:00Z");
      m.created_at = now;
      let t = transition(&m, LifecycleEvent::PaymentReceived { period_months: months }, now);
      prop_assert_eq!(t.member.membership_end, Some(add_months(now, months)));
      prop_assert_eq!(t.member.status, MemberStatus::Active);
    }

    #[test]
    fn payment_on_future_end_extends(
      now in any_instant(),
      ahead_days in 1i64..400,
      months in 1u32..=24,
    ) {
      let end = now + Duration::days(ahead_days);
      let mut m = pending("2000-01-01T00:00:00Z");
      m.status = MemberStatus::Active;
      m.membership_start = Some(now);
      m.membership_end = Some(end);
      let t = transition(&m, LifecycleEvent::PaymentReceived { period_months: months }, now);
      prop_assert_eq!(t.member.membership_end, Some(add_months(end, months)));
    }

    #[test]
    fn engine_is_deterministic(now in any_instant(), ahead_hours in -200i64..200) {
      let mut m = pending("2000-01-01T00:00:00Z");
      m.status = MemberStatus::Active;
      m.membership_end = Some(now + Duration::hours(ahead_hours));
      let a = transition(&m, LifecycleEvent::TimePassed, now);
      let b = transition(&m, LifecycleEvent::TimePassed, now);
      prop_assert_eq!(a, b);
    }
  }
}
