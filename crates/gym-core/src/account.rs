//! Staff accounts and the authenticated actor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rbac::Role;

/// A persisted staff account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
  pub account_id:      Uuid,
  pub name:            String,
  /// Unique, compared case-insensitively.
  pub email:           String,
  /// PHC string produced by the credential hasher; never serialised.
  #[serde(skip_serializing, default)]
  pub credential_hash: String,
  pub role:            Role,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

impl Account {
  pub fn actor(&self) -> Actor {
    Actor { account_id: self.account_id, role: self.role }
  }
}

/// Input to [`crate::store::GymStore::add_account`].
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub name:            String,
  pub email:           String,
  pub credential_hash: String,
  pub role:            Role,
  pub created_at:      DateTime<Utc>,
}

impl NewAccount {
  pub fn into_account(self, account_id: Uuid) -> Account {
    Account {
      account_id,
      name: self.name,
      email: normalize_email(&self.email),
      credential_hash: self.credential_hash,
      role: self.role,
      created_at: self.created_at,
      updated_at: self.created_at,
    }
  }
}

/// Partial account update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
  pub name:            Option<String>,
  pub email:           Option<String>,
  pub role:            Option<Role>,
  pub credential_hash: Option<String>,
}

impl AccountUpdate {
  /// Only the credential changes.
  pub fn is_credential_only(&self) -> bool {
    self.name.is_none() && self.email.is_none() && self.role.is_none()
  }
}

/// The identity the authentication layer hands to the core: who is asking,
/// and with what role. Readers of the notification ledger are actors too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub account_id: Uuid,
  pub role:       Role,
}

pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }
