//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] gym_core::Error),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("credential hashing failed: {0}")]
  Hashing(String),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    use gym_core::Error as E;
    match self {
      ApiError::Core(e) => match e {
        E::MemberNotFound(_)
        | E::AccountNotFound(_)
        | E::PaymentNotFound(_)
        | E::NotificationNotFound(_) => StatusCode::NOT_FOUND,
        E::InvalidPayment(_) | E::InvalidInput(_) => StatusCode::BAD_REQUEST,
        E::Forbidden { .. } => StatusCode::FORBIDDEN,
        E::Conflict { .. } => StatusCode::CONFLICT,
        E::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
      },
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Hashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use gym_core::rbac::{Action, Role};
  use uuid::Uuid;

  use super::*;

  #[test]
  fn core_errors_map_to_statuses() {
    let cases = [
      (gym_core::Error::MemberNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
      (gym_core::Error::InvalidPayment("x".into()), StatusCode::BAD_REQUEST),
      (
        gym_core::Error::Forbidden {
          actor:  Role::Employee,
          action: Action::DeleteMember,
          target: None,
        },
        StatusCode::FORBIDDEN,
      ),
      (
        gym_core::Error::Conflict { member_id: Uuid::nil(), attempts: 5 },
        StatusCode::CONFLICT,
      ),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).status(), status);
    }
  }
}
