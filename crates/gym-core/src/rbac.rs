//! Role-based access control for staff accounts and gym resources.
//!
//! The whole policy is one pure lookup, [`can_perform`], over a closed set of
//! roles and actions. Rules are evaluated in order and the first match wins:
//!
//! 1. `super-admin` may do anything except delete its own account.
//! 2. Every staff role may run day-to-day front-desk work (view, register and
//!    edit members, record and view payments) and change its own credential.
//! 3. `admin` may create, view, update and delete `employee` accounts, list
//!    accounts, view its own record, and run member/payment administration.
//! 4. `employee` may view its own record.
//! 5. Everything else is denied.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{Error, Result};

// ─── Role ────────────────────────────────────────────────────────────────────

/// A staff role. Variants are declared in ascending privilege order, so the
/// derived `Ord` is the privilege order.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Role {
  Employee,
  Admin,
  SuperAdmin,
}

impl Role {
  /// Parse a role name, reporting unknown names as [`Error::InvalidInput`].
  pub fn parse(s: &str) -> Result<Self> {
    s.parse()
      .map_err(|_| Error::InvalidInput(format!("unknown role: {s:?}")))
  }
}

// ─── Action ──────────────────────────────────────────────────────────────────

/// Everything an actor can ask to do. Account actions distinguish the
/// actor's own record (`*-self`) from somebody else's (`*-other`).
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
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Action {
  // ── Accounts ──────────────────────────────────────────────────────────
  Create,
  List,
  ViewSelf,
  #[strum(to_string = "view-other", serialize = "view")]
  ViewOther,
  /// Change the actor's own credential and nothing else.
  UpdateCredential,
  /// Change the actor's own name, email or role.
  UpdateSelf,
  #[strum(to_string = "update-other", serialize = "update")]
  UpdateOther,
  DeleteSelf,
  #[strum(to_string = "delete-other", serialize = "delete")]
  DeleteOther,

  // ── Members and payments ──────────────────────────────────────────────
  ViewMembers,
  RegisterMember,
  UpdateMember,
  RecordPayment,
  ViewPayments,
  ChangeMemberStatus,
  DeleteMember,
  DeletePayment,
  RunReconciliation,
}

impl Action {
  /// Parse an action name, reporting unknown names as
  /// [`Error::InvalidInput`].
  pub fn parse(s: &str) -> Result<Self> {
    s.parse()
      .map_err(|_| Error::InvalidInput(format!("unknown action: {s:?}")))
  }
}

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Decide whether `actor` may perform `action` on an account holding
/// `target` (if the action concerns an account).
pub fn can_perform(actor: Role, action: Action, target: Option<Role>) -> bool {
  use Action::*;
  use Role::*;

  match (actor, action, target) {
    (SuperAdmin, DeleteSelf, _) => false,
    (SuperAdmin, _, _) => true,

    (
      _,
      ViewMembers | RegisterMember | UpdateMember | RecordPayment
      | ViewPayments | UpdateCredential,
      _,
    ) => true,

    (Admin, Create | ViewOther | UpdateOther | DeleteOther, Some(Employee)) => {
      true
    }
    (Admin, List | ViewSelf, _) => true,
    (
      Admin,
      ChangeMemberStatus | DeleteMember | DeletePayment | RunReconciliation,
      _,
    ) => true,

    (Employee, ViewSelf, _) => true,

    _ => false,
  }
}

/// String form of [`can_perform`] for callers holding raw names.
pub fn can_perform_named(
  actor: &str,
  action: &str,
  target: Option<&str>,
) -> Result<bool> {
  let actor = Role::parse(actor)?;
  let action = Action::parse(action)?;
  let target = target.map(Role::parse).transpose()?;
  Ok(can_perform(actor, action, target))
}

/// [`can_perform`], turning a denial into [`Error::Forbidden`].
pub fn authorize(actor: Role, action: Action, target: Option<Role>) -> Result<()> {
  if can_perform(actor, action, target) {
    Ok(())
  } else {
    tracing::debug!(%actor, %action, ?target, "rbac denied");
    Err(Error::Forbidden { actor, action, target })
  }
}
