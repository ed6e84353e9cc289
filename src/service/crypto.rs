use log::{error, warn};
use tokio::task;
use uuid::Uuid;

use crate::errors::AppError;

/// Argon2 encoded hash; salt and cost parameters are kept inside the string.
pub fn hash_encoded(password: &str) -> Result<String, argon2::Error> {
   let salt = Uuid::new_v4();
   argon2::hash_encoded(password.as_bytes(), salt.as_bytes(), &argon2::Config::default())
}

/// An unreadable stored hash never verifies.
pub fn verify_encoded(password: &str, encoded: &str) -> bool {
   argon2::verify_encoded(encoded, password.as_bytes()).unwrap_or_else(|e| {
      warn!("stored password hash is unreadable: {e}");
      false
   })
}

pub async fn hash_password(password: &str) -> Result<String, AppError> {
   let password = password.to_string();
   task::spawn_blocking(move || hash_encoded(&password))
      .await
      .map_err(|e| {
         error!("password hashing task failed: {e}");
         AppError::InternalError
      })?
      .map_err(|e| {
         error!("password hashing failed: {e}");
         AppError::InternalError
      })
}

pub async fn verify_password(password: &str, encoded: &str) -> Result<bool, AppError> {
   let (password, encoded) = (password.to_string(), encoded.to_string());
   task::spawn_blocking(move || verify_encoded(&password, &encoded))
      .await
      .map_err(|e| {
         error!("password check task failed: {e}");
         AppError::InternalError
      })
}
