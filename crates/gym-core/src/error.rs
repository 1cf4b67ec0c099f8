//! Error types for `gym-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::rbac::{Action, Role};

#[derive(Debug, Error)]
pub enum Error {
  #[error("member not found: {0}")]
  MemberNotFound(Uuid),

  #[error("account not found: {0}")]
  AccountNotFound(Uuid),

  #[error("payment not found: {0}")]
  PaymentNotFound(Uuid),

  #[error("notification not found: {0}")]
  NotificationNotFound(Uuid),

  #[error("invalid payment: {0}")]
  InvalidPayment(String),

  #[error("invalid input: {0}")]
  InvalidInput(String),

  /// The RBAC policy denied the request. This is an expected outcome that
  /// callers translate into a user-facing response.
  #[error("{actor} may not {action}{}", .target.map(|t| format!(" on {t}")).unwrap_or_default())]
  Forbidden {
    actor:  Role,
    action: Action,
    target: Option<Role>,
  },

  /// Optimistic version checks kept failing for this member.
  #[error("member {member_id} was modified concurrently; gave up after {attempts} attempts")]
  Conflict { member_id: Uuid, attempts: u32 },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error into [`Error::Store`].
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }

  /// `true` for outcomes the caller caused (bad ids, bad input, denial).
  /// These are never retried.
  pub fn is_terminal(&self) -> bool {
    !matches!(self, Self::Conflict { .. } | Self::Store(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
