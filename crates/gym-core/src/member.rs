//! Member — a gym customer and the state of their membership window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

// ─── Status ──────────────────────────────────────────────────────────────────

/// Where a member sits in the membership lifecycle.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MemberStatus {
  Pending,
  Active,
  Frozen,
  Expired,
  Cancelled,
}

impl MemberStatus {
  /// Statuses the reconciliation sweep still has to look at.
  pub const NON_TERMINAL: [Self; 3] = [Self::Active, Self::Pending, Self::Frozen];

  pub fn is_non_terminal(self) -> bool { Self::NON_TERMINAL.contains(&self) }
}

/// Whether the member's latest obligation has been paid.
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
pub enum PaymentStatus {
  Paid,
  #[default]
  Unpaid,
}

// ─── Member ──────────────────────────────────────────────────────────────────

/// Contact details and free-text notes; everything about a member that the
/// lifecycle engine never reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberProfile {
  pub given_name:  String,
  pub family_name: Option<String>,
  pub email:       Option<String>,
  pub phone:       Option<String>,
  pub notes:       Option<String>,
}

impl MemberProfile {
  /// Display name used in notification messages.
  pub fn full_name(&self) -> String {
    match &self.family_name {
      Some(family) if !family.is_empty() => {
        format!("{} {}", self.given_name, family)
      }
      _ => self.given_name.clone(),
    }
  }
}

/// A persisted member record.
///
/// Invariant: `membership_end` is `Some` whenever `status` is
/// [`MemberStatus::Active`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
  pub member_id:        Uuid,
  #[serde(flatten)]
  pub profile:          MemberProfile,
  pub status:           MemberStatus,
  pub payment_status:   PaymentStatus,
  pub membership_start: Option<DateTime<Utc>>,
  pub membership_end:   Option<DateTime<Utc>>,
  /// Staff account that registered the member.
  pub created_by:       Option<Uuid>,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
  /// Bumped by the store on every committed write; used for optimistic
  /// concurrency control.
  pub version:          u64,
}

// ─── NewMember ───────────────────────────────────────────────────────────────

/// Input to [`crate::store::GymStore::add_member`]. New members always start
/// `pending` and `unpaid` with no membership window.
#[derive(Debug, Clone)]
pub struct NewMember {
  pub profile:    MemberProfile,
  pub created_by: Option<Uuid>,
  pub created_at: DateTime<Utc>,
}

impl NewMember {
  pub fn into_member(self, member_id: Uuid) -> Member {
    Member {
      member_id,
      profile: self.profile,
      status: MemberStatus::Pending,
      payment_status: PaymentStatus::Unpaid,
      membership_start: None,
      membership_end: None,
      created_by: self.created_by,
      created_at: self.created_at,
      updated_at: self.created_at,
      version: 0,
    }
  }
}

/// Partial profile update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
  pub given_name:  Option<String>,
  pub family_name: Option<String>,
  pub email:       Option<String>,
  pub phone:       Option<String>,
  pub notes:       Option<String>,
}

impl ProfileUpdate {
  pub fn apply_to(self, profile: &mut MemberProfile) {
    if let Some(v) = self.given_name {
      profile.given_name = v;
    }
    if let Some(v) = self.family_name {
      profile.family_name = Some(v);
    }
    if let Some(v) = self.email {
      profile.email = Some(v);
    }
    if let Some(v) = self.phone {
      profile.phone = Some(v);
    }
    if let Some(v) = self.notes {
      profile.notes = Some(v);
    }
  }
}
