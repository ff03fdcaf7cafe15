use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordVerifier};

use crate::errors::{Error, Result};

pub async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(rand::thread_rng());
        let hash = PasswordHash::generate(Argon2::default(), password, salt.as_salt())
            .map_err(|e| Error::Password(e.to_string()))?;
        Ok(hash.to_string())
    })
    .await
    .map_err(|e| Error::Password(e.to_string()))?
}

/// Returns `false` for a wrong password and for a hash that does not parse.
pub async fn verify_password(password: String, hash: &str) -> Result<bool> {
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || {
        let Ok(hash) = PasswordHash::new(hash.as_str()) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok()
    })
    .await
    .map_err(|e| Error::Password(e.to_string()))
}
