//! Handlers for `/accounts` endpoints.
//!
//! Passwords are accepted in request bodies and hashed here, after the
//! actor's permission has been checked; stored hashes never leave the server.

use std::sync::Arc;

use axum::{
  Extension, Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use gym_core::{
  Gym,
  account::{Account, AccountUpdate, Actor},
  rbac::{Action, Role, authorize},
  service::CreateAccount,
  store::GymStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{credentials::hash_password, error::ApiError};

/// `GET /accounts`
pub async fn list<S: GymStore + 'static>(
  State(gym): State<Arc<Gym<S>>>,
  Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<Account>>, ApiError> {
  Ok(Json(gym.list_accounts(&actor).await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name:     String,
  pub email:    String,
  pub password: String,
  pub role:     Role,
}

/// `POST /accounts`
pub async fn create<S: GymStore + 'static>(
  State(gym): State<Arc<Gym<S>>>,
  Extension(actor): Extension<Actor>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  authorize(actor.role, Action::Create, Some(body.role))?;
  let credential_hash = hash_password(&body.password)?;
  let account = gym
    .create_account(&actor, CreateAccount {
      name: body.name,
      email: body.email,
      credential_hash,
      role: body.role,
    })
    .await?;
  Ok((StatusCode::CREATED, Json(account)))
}

/// `GET /accounts/{id}`
pub async fn get_one<S: GymStore + 'static>(
  State(gym): State<Arc<Gym<S>>>,
  Extension(actor): Extension<Actor>,
  Path(id): Path<Uuid>,
) -> Result<Json<Account>, ApiError> {
  Ok(Json(gym.get_account(&actor, id).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBody {
  pub name:     Option<String>,
  pub email:    Option<String>,
  pub role:     Option<Role>,
  pub password: Option<String>,
}

/// `PATCH /accounts/{id}`
pub async fn update<S: GymStore + 'static>(
  State(gym): State<Arc<Gym<S>>>,
  Extension(actor): Extension<Actor>,
  Path(id): Path<Uuid>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<Account>, ApiError> {
  let mut update = AccountUpdate {
    name: body.name,
    email: body.email,
    role: body.role,
    credential_hash: None,
  };
  gym.check_account_update(&actor, id, &update).await?;
  update.credential_hash = body.password.as_deref().map(hash_password).transpose()?;
  Ok(Json(gym.update_account(&actor, id, update).await?))
}

/// `DELETE /accounts/{id}`
pub async fn delete_one<S: GymStore + 'static>(
  State(gym): State<Arc<Gym<S>>>,
  Extension(actor): Extension<Actor>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  gym.delete_account(&actor, id).await?;
  Ok(StatusCode::NO_CONTENT)
}
