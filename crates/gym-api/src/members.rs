//! Handlers for `/members` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/members` | Optional `?status=active,frozen` |
//! | `POST`   | `/members` | Body: member profile; starts `pending` |
//! | `GET`    | `/members/{id}` | 404 if not found |
//! | `PATCH`  | `/members/{id}` | Body: any subset of profile fields |
//! | `DELETE` | `/members/{id}` | admin and above |
//! | `POST`   | `/members/{id}/status` | Body: `{"change":"freeze"}` |

use std::sync::Arc;

use axum::{
  Extension, Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use gym_core::{
  Gym,
  account::Actor,
  member::{Member, MemberProfile, MemberStatus, ProfileUpdate},
  service::StatusChange,
  store::GymStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// Comma-separated statuses.
  pub status: Option<String>,
}

fn parse_statuses(raw: Option<&str>) -> Result<Vec<MemberStatus>, ApiError> {
  raw
    .unwrap_or_default()
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| {
      s.parse()
        .map_err(|_| ApiError::BadRequest(format!("unknown status: {s:?}")))
    })
    .collect()
}

/// `GET /members[?status=<status>,...]`
pub async fn list<S: GymStore + 'static>(
  State(gym): State<Arc<Gym<S>>>,
  Extension(actor): Extension<Actor>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Member>>, ApiError> {
  let statuses = parse_statuses(params.status.as_deref())?;
  Ok(Json(gym.list_members(&actor, statuses).await?))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /members`
pub async fn create<S: GymStore + 'static>(
  State(gym): State<Arc<Gym<S>>>,
  Extension(actor): Extension<Actor>,
  Json(profile): Json<MemberProfile>,
) -> Result<impl IntoResponse, ApiError> {
  let member = gym.register_member(&actor, profile).await?;
  Ok((StatusCode::CREATED, Json(member)))
}

// ─── Single member ────────────────────────────────────────────────────────────

/// `GET /members/{id}`
pub async fn get_one<S: GymStore + 'static>(
  State(gym): State<Arc<Gym<S>>>,
  Extension(actor): Extension<Actor>,
  Path(id): Path<Uuid>,
) -> Result<Json<Member>, ApiError> {
  Ok(Json(gym.get_member(&actor, id).await?))
}

/// `PATCH /members/{id}`
pub async fn update<S: GymStore + 'static>(
  State(gym): State<Arc<Gym<S>>>,
  Extension(actor): Extension<Actor>,
  Path(id): Path<Uuid>,
  Json(body): Json<ProfileUpdate>,
) -> Result<Json<Member>, ApiError> {
  Ok(Json(gym.update_profile(&actor, id, body).await?))
}

/// `DELETE /members/{id}`
pub async fn delete_one<S: GymStore + 'static>(
  State(gym): State<Arc<Gym<S>>>,
  Extension(actor): Extension<Actor>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  gym.delete_member(&actor, id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Status ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub change: StatusChange,
}

/// `POST /members/{id}/status` — body: `{"change":"freeze|resume|cancel"}`
pub async fn change_status<S: GymStore + 'static>(
  State(gym): State<Arc<Gym<S>>>,
  Extension(actor): Extension<Actor>,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<Json<Member>, ApiError> {
  Ok(Json(gym.change_status(&actor, id, body.change).await?))
}
