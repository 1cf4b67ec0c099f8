//! Staff account administration.
//!
//! Credentials arrive already hashed; hashing and verification belong to the
//! outer layer.

use serde::Deserialize;
use uuid::Uuid;

use super::Gym;
use crate::{
  Error, Result,
  account::{Account, AccountUpdate, Actor, NewAccount, normalize_email},
  rbac::{Action, Role, authorize, can_perform},
  store::{GymStore, Unique},
};

/// Input for [`Gym::create_account`].
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccount {
  pub name:            String,
  pub email:           String,
  pub credential_hash: String,
  pub role:            Role,
}

impl<S: GymStore> Gym<S> {
  pub async fn create_account(
    &self,
    actor: &Actor,
    input: CreateAccount,
  ) -> Result<Account> {
    authorize(actor.role, Action::Create, Some(input.role))?;
    let account = self.insert_account(input).await?;
    tracing::info!(
      account_id = %account.account_id,
      role = %account.role,
      created_by = %actor.account_id,
      "account created"
    );
    Ok(account)
  }

  /// Create the first super-admin. Refused once any super-admin exists.
  pub async fn bootstrap_super_admin(
    &self,
    name: String,
    email: String,
    credential_hash: String,
  ) -> Result<Account> {
    let accounts = self.store.list_accounts().await.map_err(Error::store)?;
    if accounts.iter().any(|a| a.role == Role::SuperAdmin) {
      return Err(Error::InvalidInput("a super-admin already exists".into()));
    }
    let account = self
      .insert_account(CreateAccount {
        name,
        email,
        credential_hash,
        role: Role::SuperAdmin,
      })
      .await?;
    tracing::info!(account_id = %account.account_id, "bootstrapped super-admin");
    Ok(account)
  }

  /// Look an account up for sign-in. No authorization: the caller is not
  /// known yet.
  pub async fn account_for_login(&self, email: &str) -> Result<Option<Account>> {
    self
      .store
      .find_account_by_email(normalize_email(email))
      .await
      .map_err(Error::store)
  }

  pub async fn get_account(&self, actor: &Actor, account_id: Uuid) -> Result<Account> {
    let account = self.load_account(account_id).await?;
    if account_id == actor.account_id {
      authorize(actor.role, Action::ViewSelf, Some(account.role))?;
    } else {
      authorize(actor.role, Action::ViewOther, Some(account.role))?;
    }
    Ok(account)
  }

  /// Accounts visible to the actor: everything for a super-admin, otherwise
  /// the accounts the actor may view individually.
  pub async fn list_accounts(&self, actor: &Actor) -> Result<Vec<Account>> {
    authorize(actor.role, Action::List, None)?;
    let accounts = self.store.list_accounts().await.map_err(Error::store)?;
    Ok(
      accounts
        .into_iter()
        .filter(|a| {
          a.account_id == actor.account_id
            || can_perform(actor.role, Action::ViewOther, Some(a.role))
        })
        .collect(),
    )
  }

  /// Load the account `update` would change and check the actor may make
  /// that change. Lets callers refuse early, before doing costly work such
  /// as hashing a new credential.
  pub async fn check_account_update(
    &self,
    actor: &Actor,
    account_id: Uuid,
    update: &AccountUpdate,
  ) -> Result<Account> {
    let account = self.load_account(account_id).await?;

    if account_id == actor.account_id {
      let action = if update.is_credential_only() {
        Action::UpdateCredential
      } else {
        Action::UpdateSelf
      };
      authorize(actor.role, action, Some(account.role))?;
    } else {
      authorize(actor.role, Action::UpdateOther, Some(account.role))?;
    }
    // Promotion is checked against the new role too.
    if let Some(role) = update.role.filter(|r| *r != account.role) {
      authorize(actor.role, Action::UpdateOther, Some(role))?;
    }
    Ok(account)
  }

  pub async fn update_account(
    &self,
    actor: &Actor,
    account_id: Uuid,
    update: AccountUpdate,
  ) -> Result<Account> {
    let mut account = self.check_account_update(actor, account_id, &update).await?;

    if let Some(name) = update.name {
      account.name = required("name", &name)?;
    }
    if let Some(email) = update.email {
      account.email = valid_email(&email)?;
    }
    if let Some(role) = update.role {
      account.role = role;
    }
    if let Some(hash) = update.credential_hash {
      account.credential_hash = required("credential", &hash)?;
    }
    account.updated_at = self.clock.now();

    match self
      .store
      .update_account(account.clone())
      .await
      .map_err(Error::store)?
    {
      Unique::Written(true) => {}
      Unique::Written(false) => return Err(Error::AccountNotFound(account_id)),
      Unique::Duplicate => return Err(email_taken(&account.email)),
    }
    tracing::info!(%account_id, updated_by = %actor.account_id, "account updated");
    Ok(account)
  }

  pub async fn delete_account(&self, actor: &Actor, account_id: Uuid) -> Result<()> {
    let account = self.load_account(account_id).await?;
    if account_id == actor.account_id {
      authorize(actor.role, Action::DeleteSelf, Some(account.role))?;
    } else {
      authorize(actor.role, Action::DeleteOther, Some(account.role))?;
    }
    if !self.store.delete_account(account_id).await.map_err(Error::store)? {
      return Err(Error::AccountNotFound(account_id));
    }
    tracing::info!(%account_id, deleted_by = %actor.account_id, "account deleted");
    Ok(())
  }

  async fn load_account(&self, id: Uuid) -> Result<Account> {
    self
      .store
      .get_account(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::AccountNotFound(id))
  }

  async fn insert_account(&self, input: CreateAccount) -> Result<Account> {
    let name = required("name", &input.name)?;
    let email = valid_email(&input.email)?;
    let credential_hash = required("credential", &input.credential_hash)?;

    self
      .store
      .add_account(NewAccount {
        name,
        email: email.clone(),
        credential_hash,
        role: input.role,
        created_at: self.clock.now(),
      })
      .await
      .map_err(Error::store)?
      .written()
      .ok_or_else(|| email_taken(&email))
  }
}

fn email_taken(email: &str) -> Error {
  Error::InvalidInput(format!("email {email} is already in use"))
}

fn required(field: &str, value: &str) -> Result<String> {
  let value = value.trim();
  if value.is_empty() {
    return Err(Error::InvalidInput(format!("{field} must not be empty")));
  }
  Ok(value.to_owned())
}

fn valid_email(email: &str) -> Result<String> {
  let email = normalize_email(email);
  match email.split_once('@') {
    Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
    _ => Err(Error::InvalidInput(format!("not an email address: {email:?}"))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn emails_are_normalized_and_checked() {
    assert_eq!(valid_email(" Front@Gym.Example ").unwrap(), "front@gym.example");
    for bad in ["", "desk", "@gym.example", "desk@"] {
      assert!(matches!(valid_email(bad), Err(Error::InvalidInput(_))), "{bad}");
    }
  }

  #[test]
  fn required_trims() {
    assert_eq!(required("name", "  Sam ").unwrap(), "Sam");
    assert!(required("name", "   ").is_err());
  }
}
