//! Handlers for `/notifications` and `/reconcile`.
//!
//! Read state is per reader: the authenticated account is the reader.

use std::sync::Arc;

use axum::{
  Extension, Json,
  extract::{Path, State},
  http::StatusCode,
};
use gym_core::{
  Gym, account::Actor, notification::Notification, service::SweepReport,
  store::GymStore,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /notifications`
pub async fn unread<S: GymStore + 'static>(
  State(gym): State<Arc<Gym<S>>>,
  Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<Notification>>, ApiError> {
  Ok(Json(gym.list_unread_for(&actor).await?))
}

/// `POST /notifications/{id}/read`
pub async fn mark_read<S: GymStore + 'static>(
  State(gym): State<Arc<Gym<S>>>,
  Extension(actor): Extension<Actor>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  gym.mark_read(&actor, id).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct MarkedAll {
  pub marked: usize,
}

/// `POST /notifications/read-all`
pub async fn mark_all_read<S: GymStore + 'static>(
  State(gym): State<Arc<Gym<S>>>,
  Extension(actor): Extension<Actor>,
) -> Result<Json<MarkedAll>, ApiError> {
  let marked = gym.mark_all_read(&actor).await?;
  Ok(Json(MarkedAll { marked }))
}

/// `POST /reconcile`
pub async fn reconcile<S: GymStore + 'static>(
  State(gym): State<Arc<Gym<S>>>,
  Extension(actor): Extension<Actor>,
) -> Result<Json<SweepReport>, ApiError> {
  Ok(Json(gym.reconcile(&actor).await?))
}
