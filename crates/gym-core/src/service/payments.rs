//! Payment application: validate, run the engine, persist payment and member
//! together, retrying on version conflicts.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Gym;
use crate::{
  Error, Result,
  account::Actor,
  lifecycle::{LifecycleEvent, Outcome, transition},
  member::Member,
  payment::{NewPayment, Payment, PaymentMethod},
  rbac::{Action, authorize},
  store::{Commit, GymStore, PaymentQuery},
};

/// Longest period a single payment may cover.
pub const MAX_PERIOD_MONTHS: i64 = 120;

/// Size of the "recent transactions" list.
pub const RECENT_PAYMENTS_LIMIT: usize = 100;

/// Raw payment request as received from the outer layer; validated by
/// [`Gym::apply_payment`].
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
  pub member_id:     Uuid,
  pub amount_cents:  i64,
  #[serde(default)]
  pub method:        PaymentMethod,
  pub period_months: i64,
  pub notes:         Option<String>,
}

/// Both entities written by a successful payment.
#[derive(Debug, Clone, Serialize)]
pub struct AppliedPayment {
  pub payment: Payment,
  pub member:  Member,
}

impl<S: GymStore> Gym<S> {
  /// Apply a payment to a member, activating or extending their membership.
  ///
  /// Fails with [`Error::MemberNotFound`], [`Error::InvalidPayment`],
  /// [`Error::Forbidden`], or [`Error::Conflict`] once every attempt lost a
  /// race with another writer. Applying the same request twice records two
  /// payments.
  pub async fn apply_payment(
    &self,
    actor: &Actor,
    req: PaymentRequest,
  ) -> Result<AppliedPayment> {
    authorize(actor.role, Action::RecordPayment, None)?;

    let mut member = self.load_member(req.member_id).await?;
    let period_months = validate(&req)?;

    let max_attempts = self.settings.max_attempts;
    for attempt in 1..=max_attempts {
      let now = self.clock.now();
      let step = transition(
        &member,
        LifecycleEvent::PaymentReceived { period_months },
        now,
      );
      if step.outcome == Outcome::NotApplicable {
        return Err(Error::InvalidPayment(format!(
          "member {} is {}",
          member.member_id, member.status
        )));
      }

      let payment = NewPayment {
        member_id: member.member_id,
        amount_cents: req.amount_cents,
        method: req.method,
        period_months,
        notes: req.notes.clone(),
        paid_at: now,
        recorded_by: Some(actor.account_id),
      };

      match self
        .store
        .commit_payment(step.member, payment)
        .await
        .map_err(Error::store)?
      {
        Commit::Committed((payment, member)) => {
          tracing::info!(
            member_id = %member.member_id,
            payment_id = %payment.payment_id,
            period_months,
            membership_end = ?member.membership_end,
            "payment applied"
          );
          return Ok(AppliedPayment { payment, member });
        }
        Commit::Stale => {
          tracing::debug!(
            member_id = %req.member_id,
            attempt,
            "member changed underneath payment; re-reading"
          );
          member = self.load_member(req.member_id).await?;
        }
      }
    }

    tracing::warn!(member_id = %req.member_id, max_attempts, "payment gave up on conflicts");
    Err(Error::Conflict { member_id: req.member_id, attempts: max_attempts })
  }

  /// Payments for one member, or the most recent payments overall.
  pub async fn list_payments(
    &self,
    actor: &Actor,
    member_id: Option<Uuid>,
  ) -> Result<Vec<Payment>> {
    authorize(actor.role, Action::ViewPayments, None)?;

    let query = match member_id {
      Some(id) => {
        self.load_member(id).await?;
        PaymentQuery { member_id: Some(id), limit: None }
      }
      None => PaymentQuery { member_id: None, limit: Some(RECENT_PAYMENTS_LIMIT) },
    };
    self.store.list_payments(query).await.map_err(Error::store)
  }

  /// Administrative deletion. The member record is left as it is.
  pub async fn delete_payment(&self, actor: &Actor, payment_id: Uuid) -> Result<()> {
    authorize(actor.role, Action::DeletePayment, None)?;

    if !self.store.delete_payment(payment_id).await.map_err(Error::store)? {
      return Err(Error::PaymentNotFound(payment_id));
    }
    tracing::info!(%payment_id, deleted_by = %actor.account_id, "payment deleted");
    Ok(())
  }
}

fn validate(req: &PaymentRequest) -> Result<u32> {
  if req.amount_cents < 0 {
    return Err(Error::InvalidPayment(format!(
      "amount must not be negative (got {})",
      req.amount_cents
    )));
  }
  if !(1..=MAX_PERIOD_MONTHS).contains(&req.period_months) {
    return Err(Error::InvalidPayment(format!(
      "period must be between 1 and {MAX_PERIOD_MONTHS} months (got {})",
      req.period_months
    )));
  }
  u32::try_from(req.period_months)
    .map_err(|_| Error::InvalidPayment("period out of range".into()))
}
