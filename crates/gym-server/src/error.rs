//! Error types and axum `IntoResponse` implementation.

use axum::{
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use gym_api::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,
  #[error("invalid configuration: {0}")]
  Config(String),
  #[error(transparent)]
  Core(#[from] gym_core::Error),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized => {
        let mut res =
          (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"gym\""),
        );
        res
      }
      Error::Config(msg) => {
        (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response()
      }
      Error::Core(e) => ApiError::from(e).into_response(),
    }
  }
}
