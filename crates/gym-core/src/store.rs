//! The `GymStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `gym-store-sqlite`).
//! Services in this crate and the HTTP layer depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  account::{Account, NewAccount},
  member::{Member, MemberStatus, NewMember},
  notification::{NewNotification, Notification, Suppression},
  payment::{NewPayment, Payment},
};

// ─── Commit outcome ──────────────────────────────────────────────────────────

/// Result of a versioned member write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit<T> {
  /// The write landed; carries what was persisted.
  Committed(T),
  /// The member's stored version no longer matched the expected one (or the
  /// member vanished). Nothing was written; re-read and try again.
  Stale,
}

/// Result of a write guarded by a uniqueness rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unique<T> {
  Written(T),
  /// Another record already holds the unique key. Nothing was written.
  Duplicate,
}

impl<T> Unique<T> {
  pub fn written(self) -> Option<T> {
    match self {
      Self::Written(value) => Some(value),
      Self::Duplicate => None,
    }
  }
}

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`GymStore::list_payments`].
#[derive(Debug, Clone, Default)]
pub struct PaymentQuery {
  pub member_id: Option<Uuid>,
  pub limit:     Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a gym store backend.
///
/// Member writes are versioned: every mutation names the version it was
/// computed from and is rejected with [`Commit::Stale`] if another writer got
/// there first. Payments and notifications are append-only.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait GymStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Members ───────────────────────────────────────────────────────────

  /// Persist a new member (version 0), unless a member with the same given
  /// name, family name (both ASCII case-insensitive) and phone exists. The
  /// check and the insert are atomic.
  fn add_member(
    &self,
    input: NewMember,
  ) -> impl Future<Output = Result<Unique<Member>, Self::Error>> + Send + '_;

  fn get_member(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Member>, Self::Error>> + Send + '_;

  /// List members, restricted to `statuses` when it is non-empty.
  fn list_members(
    &self,
    statuses: Vec<MemberStatus>,
  ) -> impl Future<Output = Result<Vec<Member>, Self::Error>> + Send + '_;

  /// Write `member` if the stored version still equals `member.version`,
  /// appending `notifications` in the same transaction. The committed
  /// member carries the bumped version.
  fn commit_member(
    &self,
    member: Member,
    notifications: Vec<NewNotification>,
  ) -> impl Future<Output = Result<Commit<Member>, Self::Error>> + Send + '_;

  /// Returns `false` if the member did not exist.
  fn delete_member(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Payments ──────────────────────────────────────────────────────────

  /// Write `member` (version-checked as in [`GymStore::commit_member`]) and
  /// insert `payment` as one unit: either both land or neither does.
  fn commit_payment(
    &self,
    member: Member,
    payment: NewPayment,
  ) -> impl Future<Output = Result<Commit<(Payment, Member)>, Self::Error>>
  + Send
  + '_;

  /// Newest first.
  fn list_payments(
    &self,
    query: PaymentQuery,
  ) -> impl Future<Output = Result<Vec<Payment>, Self::Error>> + Send + '_;

  fn delete_payment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Notifications ─────────────────────────────────────────────────────

  /// Append a notification. With `suppress` set, the append is skipped (and
  /// `None` returned) when a notification of the same kind for the same
  /// member already exists at or after `suppress.since`; the check and the
  /// insert happen atomically.
  fn append_notification(
    &self,
    input: NewNotification,
    suppress: Option<Suppression>,
  ) -> impl Future<Output = Result<Option<Notification>, Self::Error>> + Send + '_;

  /// Notifications `reader` has not acknowledged, newest first.
  fn list_unread(
    &self,
    reader: Uuid,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + '_;

  /// Add `reader` to the acknowledgement set. Returns `false` if the
  /// notification does not exist; acknowledging twice is a no-op.
  fn mark_read(
    &self,
    id: Uuid,
    reader: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Acknowledge everything for `reader`; returns how many were newly read.
  fn mark_all_read(
    &self,
    reader: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Accounts ──────────────────────────────────────────────────────────

  /// Emails are unique, case-insensitively.
  fn add_account(
    &self,
    input: NewAccount,
  ) -> impl Future<Output = Result<Unique<Account>, Self::Error>> + Send + '_;

  fn get_account(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  /// Case-insensitive lookup.
  fn find_account_by_email(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  fn list_accounts(
    &self,
  ) -> impl Future<Output = Result<Vec<Account>, Self::Error>> + Send + '_;

  /// Overwrite every mutable field. Carries `false` if the account is gone;
  /// [`Unique::Duplicate`] if the new email belongs to another account.
  fn update_account(
    &self,
    account: Account,
  ) -> impl Future<Output = Result<Unique<bool>, Self::Error>> + Send + '_;

  fn delete_account(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
