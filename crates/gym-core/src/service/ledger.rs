//! The notification ledger: append-only entries with per-reader read state.

use uuid::Uuid;

use super::Gym;
use crate::{
  Error, Result,
  account::Actor,
  clock::local_midnight,
  lifecycle::Dedupe,
  notification::{NewNotification, Notification, Suppression},
  store::GymStore,
};

impl<S: GymStore> Gym<S> {
  /// Append a notification. With [`Dedupe::PerMemberPerDay`] the append is
  /// skipped, returning `None`, when the same member already has one of the
  /// same kind since local midnight.
  pub async fn append_notification(
    &self,
    input: NewNotification,
    dedupe: Dedupe,
  ) -> Result<Option<Notification>> {
    let suppress = match dedupe {
      Dedupe::None => None,
      Dedupe::PerMemberPerDay => Some(Suppression {
        since: local_midnight(input.created_at, self.settings.utc_offset),
      }),
    };
    let kind = input.kind;
    let appended = self
      .store
      .append_notification(input, suppress)
      .await
      .map_err(Error::store)?;
    if appended.is_none() {
      tracing::debug!(%kind, "notification suppressed; already sent today");
    }
    Ok(appended)
  }

  /// Up to one page of notifications the actor has not read, newest first.
  pub async fn list_unread_for(&self, actor: &Actor) -> Result<Vec<Notification>> {
    self
      .store
      .list_unread(actor.account_id, self.settings.page_size)
      .await
      .map_err(Error::store)
  }

  /// Acknowledge one notification. Acknowledging twice is harmless.
  pub async fn mark_read(&self, actor: &Actor, notification_id: Uuid) -> Result<()> {
    let found = self
      .store
      .mark_read(notification_id, actor.account_id, self.clock.now())
      .await
      .map_err(Error::store)?;
    if !found {
      return Err(Error::NotificationNotFound(notification_id));
    }
    Ok(())
  }

  /// Acknowledge everything; returns how many were newly marked.
  pub async fn mark_all_read(&self, actor: &Actor) -> Result<usize> {
    let marked = self
      .store
      .mark_all_read(actor.account_id, self.clock.now())
      .await
      .map_err(Error::store)?;
    tracing::debug!(reader = %actor.account_id, marked, "notifications marked read");
    Ok(marked)
  }
}
