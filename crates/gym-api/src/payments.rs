//! Handlers for payment endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/members/{id}/payments` | Member history, newest first |
//! | `POST`   | `/members/{id}/payments` | Body: `{"amount_cents":3000,"period_months":1}` |
//! | `GET`    | `/payments` | The most recent payments overall |
//! | `DELETE` | `/payments/{id}` | admin and above |

use std::sync::Arc;

use axum::{
  Extension, Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use gym_core::{
  Gym,
  account::Actor,
  payment::{Payment, PaymentMethod},
  service::PaymentRequest,
  store::GymStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct PaymentBody {
  pub amount_cents:  i64,
  #[serde(default)]
  pub method:        PaymentMethod,
  pub period_months: i64,
  pub notes:         Option<String>,
}

/// `POST /members/{id}/payments`
pub async fn apply<S: GymStore + 'static>(
  State(gym): State<Arc<Gym<S>>>,
  Extension(actor): Extension<Actor>,
  Path(member_id): Path<Uuid>,
  Json(body): Json<PaymentBody>,
) -> Result<impl IntoResponse, ApiError> {
  let applied = gym
    .apply_payment(&actor, PaymentRequest {
      member_id,
      amount_cents: body.amount_cents,
      method: body.method,
      period_months: body.period_months,
      notes: body.notes,
    })
    .await?;
  Ok((StatusCode::CREATED, Json(applied)))
}

/// `GET /members/{id}/payments`
pub async fn for_member<S: GymStore + 'static>(
  State(gym): State<Arc<Gym<S>>>,
  Extension(actor): Extension<Actor>,
  Path(member_id): Path<Uuid>,
) -> Result<Json<Vec<Payment>>, ApiError> {
  Ok(Json(gym.list_payments(&actor, Some(member_id)).await?))
}

/// `GET /payments`
pub async fn recent<S: GymStore + 'static>(
  State(gym): State<Arc<Gym<S>>>,
  Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<Payment>>, ApiError> {
  Ok(Json(gym.list_payments(&actor, None).await?))
}

/// `DELETE /payments/{id}`
pub async fn delete_one<S: GymStore + 'static>(
  State(gym): State<Arc<Gym<S>>>,
  Extension(actor): Extension<Actor>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  gym.delete_payment(&actor, id).await?;
  Ok(StatusCode::NO_CONTENT)
}
