//! HTTP Basic authentication against staff accounts.
//!
//! The user name is the account email. A successful check inserts the
//! account's [`Actor`] as a request extension for the API handlers.

use axum::{
  extract::{Request, State},
  http::{HeaderMap, header},
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use gym_api::credentials::verify_password;
use gym_core::{Gym, account::Actor, store::GymStore};

use crate::{AppState, error::Error};

/// Pull `(user, password)` out of an `Authorization: Basic …` header.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), Error> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded.trim()).map_err(|_| Error::Unauthorized)?;
  let creds   = String::from_utf8(decoded).map_err(|_| Error::Unauthorized)?;

  let (user, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;
  Ok((user.to_owned(), password.to_owned()))
}

/// Resolve the request's credentials to an [`Actor`].
pub async fn authenticate<S: GymStore>(
  gym: &Gym<S>,
  headers: &HeaderMap,
) -> Result<Actor, Error> {
  let (email, password) = basic_credentials(headers)?;

  let account = gym
    .account_for_login(&email)
    .await?
    .ok_or(Error::Unauthorized)?;

  if !verify_password(&password, &account.credential_hash) {
    tracing::debug!(%email, "rejected credentials");
    return Err(Error::Unauthorized);
  }
  Ok(account.actor())
}

/// Middleware: authenticate or answer 401.
pub async fn require_actor<S: GymStore + 'static>(
  State(state): State<AppState<S>>,
  mut req: Request,
  next: Next,
) -> Result<Response, Error> {
  let actor = authenticate(&state.gym, req.headers()).await?;
  tracing::debug!(account_id = %actor.account_id, role = %actor.role, "authenticated");
  req.extensions_mut().insert(actor);
  Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn headers(value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    h
  }

  fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  #[test]
  fn parses_user_and_password() {
    let (user, pass) = basic_credentials(&headers(&basic("desk@gym.example", "a:b"))).unwrap();
    assert_eq!(user, "desk@gym.example");
    assert_eq!(pass, "a:b");
  }

  #[test]
  fn missing_header() {
    assert!(matches!(basic_credentials(&HeaderMap::new()), Err(Error::Unauthorized)));
  }

  #[test]
  fn wrong_scheme() {
    assert!(matches!(
      basic_credentials(&headers("Bearer abc")),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn invalid_base64() {
    assert!(matches!(
      basic_credentials(&headers("Basic !!!not-base64!!!")),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn no_colon() {
    let value = format!("Basic {}", B64.encode("justauser"));
    assert!(matches!(basic_credentials(&headers(&value)), Err(Error::Unauthorized)));
  }
}
