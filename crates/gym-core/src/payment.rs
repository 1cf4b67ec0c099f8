//! Payment records. Payments are immutable once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::member::PaymentStatus;

/// How the money arrived.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentMethod {
  #[default]
  Cash,
  Card,
  Bank,
  Online,
}

/// A persisted payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
  pub payment_id:    Uuid,
  pub member_id:     Uuid,
  /// Amount in minor currency units; never negative.
  pub amount_cents:  i64,
  pub method:        PaymentMethod,
  pub period_months: u32,
  pub status:        PaymentStatus,
  pub notes:         Option<String>,
  pub paid_at:       DateTime<Utc>,
  /// Staff account that took the payment.
  pub recorded_by:   Option<Uuid>,
}

/// A validated payment awaiting persistence together with its member update.
#[derive(Debug, Clone)]
pub struct NewPayment {
  pub member_id:     Uuid,
  pub amount_cents:  i64,
  pub method:        PaymentMethod,
  pub period_months: u32,
  pub notes:         Option<String>,
  pub paid_at:       DateTime<Utc>,
  pub recorded_by:   Option<Uuid>,
}

impl NewPayment {
  pub fn into_payment(self, payment_id: Uuid) -> Payment {
    Payment {
      payment_id,
      member_id: self.member_id,
      amount_cents: self.amount_cents,
      method: self.method,
      period_months: self.period_months,
      status: PaymentStatus::Paid,
      notes: self.notes,
      paid_at: self.paid_at,
      recorded_by: self.recorded_by,
    }
  }
}
