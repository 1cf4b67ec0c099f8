//! The reconciliation sweep: advance every live membership to "now".
//!
//! The sweep feeds [`LifecycleEvent::TimePassed`] to each non-terminal
//! member. Expirations are committed together with their notification;
//! expiring reminders go through the ledger's same-day deduplication. A
//! failure on one member is recorded in the report and the sweep moves on.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::Gym;
use crate::{
  Error, Result,
  account::Actor,
  lifecycle::{Dedupe, LifecycleEvent, Outcome, transition},
  member::{Member, MemberStatus},
  rbac::{Action, authorize},
  store::{Commit, GymStore},
};

/// Summary of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
  pub started_at:         Option<DateTime<Utc>>,
  pub examined:           usize,
  pub expired:            usize,
  pub expiring_notices:   usize,
  pub suppressed_notices: usize,
  pub failures:           Vec<SweepFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepFailure {
  pub member_id: Uuid,
  pub error:     String,
}

/// What happened to a single member.
#[derive(Debug, Default)]
struct MemberOutcome {
  expired:    bool,
  notices:    usize,
  suppressed: usize,
}

impl<S: GymStore> Gym<S> {
  /// On-demand sweep requested by staff.
  pub async fn reconcile(&self, actor: &Actor) -> Result<SweepReport> {
    authorize(actor.role, Action::RunReconciliation, None)?;
    tracing::info!(requested_by = %actor.account_id, "manual reconciliation");
    self.run_sweep().await
  }

  /// Run one sweep as the system. Only listing the members can fail the
  /// sweep as a whole.
  pub async fn run_sweep(&self) -> Result<SweepReport> {
    let now = self.clock.now();
    let members = self
      .store
      .list_members(MemberStatus::NON_TERMINAL.to_vec())
      .await
      .map_err(Error::store)?;

    let mut report = SweepReport {
      started_at: Some(now),
      examined: members.len(),
      ..Default::default()
    };

    for member in members {
      let member_id = member.member_id;
      match self.sweep_member(member, now).await {
        Ok(outcome) => {
          report.expired += usize::from(outcome.expired);
          report.expiring_notices += outcome.notices;
          report.suppressed_notices += outcome.suppressed;
        }
        Err(e) => {
          tracing::warn!(%member_id, error = %e, "reconciliation failed for member");
          report.failures.push(SweepFailure { member_id, error: e.to_string() });
        }
      }
    }

    tracing::info!(
      examined = report.examined,
      expired = report.expired,
      expiring_notices = report.expiring_notices,
      suppressed_notices = report.suppressed_notices,
      failures = report.failures.len(),
      "reconciliation sweep finished"
    );
    Ok(report)
  }

  async fn sweep_member(
    &self,
    mut member: Member,
    now: DateTime<Utc>,
  ) -> Result<MemberOutcome> {
    let member_id = member.member_id;
    let mut outcome = MemberOutcome::default();

    for attempt in 1..=self.settings.max_attempts {
      let step = transition(&member, LifecycleEvent::TimePassed, now);
      let (daily, immediate): (Vec<_>, Vec<_>) = step
        .intents
        .into_iter()
        .partition(|intent| intent.dedupe == Dedupe::PerMemberPerDay);

      if step.outcome == Outcome::Changed || !immediate.is_empty() {
        let notifications = immediate
          .into_iter()
          .map(|intent| intent.into_new(now))
          .collect();
        match self
          .store
          .commit_member(step.member, notifications)
          .await
          .map_err(Error::store)?
        {
          Commit::Committed(m) => {
            outcome.expired = m.status == MemberStatus::Expired;
          }
          Commit::Stale => {
            tracing::debug!(%member_id, attempt, "member changed during sweep; re-reading");
            match self.store.get_member(member_id).await.map_err(Error::store)? {
              Some(fresh) => {
                member = fresh;
                continue;
              }
              None => {
                tracing::debug!(%member_id, "member deleted during sweep; skipping");
                return Ok(outcome);
              }
            }
          }
        }
      }

      for intent in daily {
        match self
          .append_notification(intent.into_new(now), Dedupe::PerMemberPerDay)
          .await?
        {
          Some(_) => outcome.notices += 1,
          None => outcome.suppressed += 1,
        }
      }
      return Ok(outcome);
    }

    Err(Error::Conflict { member_id, attempts: self.settings.max_attempts })
  }
}
