use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::error::AccountError;

pub fn hash_password(plain: &str) -> Result<String, AccountError> {
    hash_password_with(&Argon2::default(), plain)
}

/// Hash with explicit parameters where the default cost is not wanted.
pub fn hash_password_with(argon2: &Argon2<'_>, plain: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            AccountError::CryptoUnavailable(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Returns false for a wrong password and for a malformed stored digest.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}
