//! Member administration: registration, profile edits, status changes.

use serde::Deserialize;
use strum::{Display, EnumString};
use uuid::Uuid;

use super::Gym;
use crate::{
  Error, Result,
  account::Actor,
  lifecycle::{LifecycleEvent, Outcome, transition},
  member::{Member, MemberProfile, MemberStatus, NewMember, ProfileUpdate},
  notification::{NewNotification, NotificationKind},
  rbac::{Action, authorize},
  store::{Commit, GymStore},
};

/// Administrative status change requested by staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StatusChange {
  Freeze,
  Resume,
  Cancel,
}

impl From<StatusChange> for LifecycleEvent {
  fn from(change: StatusChange) -> Self {
    match change {
      StatusChange::Freeze => Self::Freeze,
      StatusChange::Resume => Self::Resume,
      StatusChange::Cancel => Self::Cancel,
    }
  }
}

impl<S: GymStore> Gym<S> {
  /// Register a new member in `pending` status and announce it on the
  /// ledger.
  ///
  /// A member with the same given name, family name and phone number is
  /// rejected as a duplicate.
  pub async fn register_member(
    &self,
    actor: &Actor,
    profile: MemberProfile,
  ) -> Result<Member> {
    authorize(actor.role, Action::RegisterMember, None)?;
    let profile = clean_profile(profile)?;

    let full_name = profile.full_name();
    let now = self.clock.now();
    let member = self
      .store
      .add_member(NewMember {
        profile,
        created_by: Some(actor.account_id),
        created_at: now,
      })
      .await
      .map_err(Error::store)?
      .written()
      .ok_or_else(|| {
        Error::InvalidInput(format!(
          "a member named {full_name:?} with this phone number already exists"
        ))
      })?;
    tracing::info!(member_id = %member.member_id, created_by = %actor.account_id, "member registered");

    let announcement = NewNotification {
      kind:       NotificationKind::MemberAdded,
      message:    format!("New member added: {}", member.profile.full_name()),
      member_id:  Some(member.member_id),
      created_by: Some(actor.account_id),
      created_at: now,
    };
    if let Err(e) = self.store.append_notification(announcement, None).await {
      tracing::warn!(member_id = %member.member_id, error = %e, "could not announce new member");
    }

    Ok(member)
  }

  pub async fn get_member(&self, actor: &Actor, member_id: Uuid) -> Result<Member> {
    authorize(actor.role, Action::ViewMembers, None)?;
    self.load_member(member_id).await
  }

  /// All members, or only those in `statuses` when it is non-empty.
  pub async fn list_members(
    &self,
    actor: &Actor,
    statuses: Vec<MemberStatus>,
  ) -> Result<Vec<Member>> {
    authorize(actor.role, Action::ViewMembers, None)?;
    self.store.list_members(statuses).await.map_err(Error::store)
  }

  /// Edit contact details. Status and dates are only ever changed by the
  /// lifecycle engine.
  pub async fn update_profile(
    &self,
    actor: &Actor,
    member_id: Uuid,
    update: ProfileUpdate,
  ) -> Result<Member> {
    authorize(actor.role, Action::UpdateMember, None)?;

    for _ in 0..self.settings.max_attempts {
      let mut member = self.load_member(member_id).await?;
      update.clone().apply_to(&mut member.profile);
      member.profile = clean_profile(member.profile)?;
      member.updated_at = self.clock.now();

      match self
        .store
        .commit_member(member, Vec::new())
        .await
        .map_err(Error::store)?
      {
        Commit::Committed(member) => return Ok(member),
        Commit::Stale => {
          tracing::debug!(%member_id, "member changed during profile update; retrying");
        }
      }
    }
    Err(Error::Conflict { member_id, attempts: self.settings.max_attempts })
  }

  /// Freeze, resume or cancel a membership.
  pub async fn change_status(
    &self,
    actor: &Actor,
    member_id: Uuid,
    change: StatusChange,
  ) -> Result<Member> {
    authorize(actor.role, Action::ChangeMemberStatus, None)?;

    for _ in 0..self.settings.max_attempts {
      let member = self.load_member(member_id).await?;
      let now = self.clock.now();
      let step = transition(&member, change.into(), now);
      if step.outcome == Outcome::NotApplicable {
        return Err(Error::InvalidInput(format!(
          "cannot {change} a member who is {}",
          member.status
        )));
      }

      let notifications = step
        .intents
        .into_iter()
        .map(|intent| NewNotification {
          created_by: Some(actor.account_id),
          ..intent.into_new(now)
        })
        .collect();

      match self
        .store
        .commit_member(step.member, notifications)
        .await
        .map_err(Error::store)?
      {
        Commit::Committed(member) => {
          tracing::info!(%member_id, %change, status = %member.status, "member status changed");
          return Ok(member);
        }
        Commit::Stale => {
          tracing::debug!(%member_id, "member changed during status change; retrying");
        }
      }
    }
    Err(Error::Conflict { member_id, attempts: self.settings.max_attempts })
  }

  /// Remove a member together with their payments.
  pub async fn delete_member(&self, actor: &Actor, member_id: Uuid) -> Result<()> {
    authorize(actor.role, Action::DeleteMember, None)?;
    if !self.store.delete_member(member_id).await.map_err(Error::store)? {
      return Err(Error::MemberNotFound(member_id));
    }
    tracing::info!(%member_id, deleted_by = %actor.account_id, "member deleted");
    Ok(())
  }
}

fn clean_profile(mut profile: MemberProfile) -> Result<MemberProfile> {
  profile.given_name = profile.given_name.trim().to_owned();
  if profile.given_name.is_empty() {
    return Err(Error::InvalidInput("given name must not be empty".into()));
  }
  for field in [
    &mut profile.family_name,
    &mut profile.email,
    &mut profile.phone,
    &mut profile.notes,
  ] {
    *field = field
      .take()
      .map(|v| v.trim().to_owned())
      .filter(|v| !v.is_empty());
  }
  Ok(profile)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn profile(given: &str, family: Option<&str>, phone: Option<&str>) -> MemberProfile {
    MemberProfile {
      given_name: given.into(),
      family_name: family.map(Into::into),
      phone: phone.map(Into::into),
      ..Default::default()
    }
  }

  #[test]
  fn blank_fields_are_dropped() {
    let p = clean_profile(MemberProfile {
      given_name: "  Ana ".into(),
      family_name: Some("   ".into()),
      email: Some(" ana@example.com".into()),
      ..Default::default()
    })
    .unwrap();
    assert_eq!(p.given_name, "Ana");
    assert_eq!(p.family_name, None);
    assert_eq!(p.email.as_deref(), Some("ana@example.com"));
  }

  #[test]
  fn empty_given_name_rejected() {
    assert!(matches!(
      clean_profile(profile(" ", Some("Lee"), None)),
      Err(Error::InvalidInput(_))
    ));
  }

  #[test]
  fn status_change_names() {
    assert_eq!("freeze".parse::<StatusChange>().unwrap(), StatusChange::Freeze);
    assert_eq!(LifecycleEvent::from(StatusChange::Cancel), LifecycleEvent::Cancel);
  }
}
