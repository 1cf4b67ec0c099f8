//! Application services: the orchestration around the pure lifecycle engine
//! and RBAC policy.
//!
//! Every operation lives on [`Gym`], split across submodules by concern.
//! Operations that act on behalf of a person take an
//! [`Actor`](crate::account::Actor) and consult
//! [`crate::rbac`] before touching the store.

mod accounts;
mod ledger;
mod members;
mod payments;
mod reconcile;

pub use accounts::CreateAccount;
pub use members::StatusChange;
pub use payments::{AppliedPayment, MAX_PERIOD_MONTHS, PaymentRequest, RECENT_PAYMENTS_LIMIT};
pub use reconcile::{SweepFailure, SweepReport};

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Offset as _, Utc};
use uuid::Uuid;

use crate::{
  Error, Result,
  clock::Clock,
  member::Member,
  store::GymStore,
};

// ─── Settings ────────────────────────────────────────────────────────────────

/// Tunables shared by the services.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
  /// Offset used to find "local midnight" for same-day deduplication.
  pub utc_offset:   FixedOffset,
  /// Attempts at a versioned member write before giving up with
  /// [`Error::Conflict`].
  pub max_attempts: u32,
  /// Page size for [`Gym::list_unread_for`].
  pub page_size:    usize,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      utc_offset:   Utc.fix(),
      max_attempts: 5,
      page_size:    20,
    }
  }
}

// ─── Gym ─────────────────────────────────────────────────────────────────────

/// Entry point for every core operation, generic over the store backend.
///
/// Cloning is cheap — the store and clock are reference-counted.
pub struct Gym<S> {
  store:    Arc<S>,
  clock:    Arc<dyn Clock>,
  settings: Settings,
}

impl<S> Clone for Gym<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      clock:    Arc::clone(&self.clock),
      settings: self.settings,
    }
  }
}

impl<S: GymStore> Gym<S> {
  pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, settings: Settings) -> Self {
    let settings = Settings {
      max_attempts: settings.max_attempts.max(1),
      ..settings
    };
    Self { store, clock, settings }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn settings(&self) -> &Settings { &self.settings }

  pub fn now(&self) -> DateTime<Utc> { self.clock.now() }

  /// Fetch a member or fail with [`Error::MemberNotFound`].
  async fn load_member(&self, id: Uuid) -> Result<Member> {
    self
      .store
      .get_member(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::MemberNotFound(id))
  }
}
