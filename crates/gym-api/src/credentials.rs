//! Argon2 password hashing for staff credentials.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use rand_core::OsRng;

use crate::ApiError;

/// Hash `password` into a PHC string (`$argon2id$v=19$…`).
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  if password.is_empty() {
    return Err(ApiError::BadRequest("password must not be empty".into()));
  }
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| ApiError::Hashing(e.to_string()))
}

/// `true` if `password` matches the stored PHC string. A malformed hash
/// never matches.
pub fn verify_password(password: &str, phc: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(phc) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}
