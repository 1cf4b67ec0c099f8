//! Notifications shown in the staff notification bell.
//!
//! Notifications are append-only. The only mutation is adding a reader to a
//! notification's acknowledgement set, so read state is tracked per reader.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

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
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
  MemberAdded,
  SubscriptionExpiring,
  SubscriptionExpired,
  Payment,
  System,
}

/// A persisted notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
  pub notification_id: Uuid,
  pub kind:            NotificationKind,
  pub message:         String,
  pub member_id:       Option<Uuid>,
  /// Account whose action produced the notification; `None` for the system.
  pub created_by:      Option<Uuid>,
  pub created_at:      DateTime<Utc>,
  pub read_by:         BTreeSet<Uuid>,
}

impl Notification {
  pub fn is_read_by(&self, reader: Uuid) -> bool { self.read_by.contains(&reader) }
}

/// A notification to append to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
  pub kind:       NotificationKind,
  pub message:    String,
  pub member_id:  Option<Uuid>,
  pub created_by: Option<Uuid>,
  pub created_at: DateTime<Utc>,
}

impl NewNotification {
  pub fn into_notification(self, notification_id: Uuid) -> Notification {
    Notification {
      notification_id,
      kind: self.kind,
      message: self.message,
      member_id: self.member_id,
      created_by: self.created_by,
      created_at: self.created_at,
      read_by: BTreeSet::new(),
    }
  }
}

/// Passed alongside an append: drop the new notification if one of the same
/// kind for the same member was already created at or after `since`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Suppression {
  pub since: DateTime<Utc>,
}
