use crate::model::user::PasswordHash;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Password hashing failed: {0}")]
pub struct PasswordError(#[from] bcrypt::BcryptError);

pub fn hash_password(password: &str) -> Result<PasswordHash, PasswordError> {
    let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
    Ok(PasswordHash::new(hash))
}

/// Checks `password` against a stored hash. The comparison inside bcrypt
/// is constant-time over the hash output.
pub fn verify_password(password: &str, hash: &PasswordHash) -> Result<bool, PasswordError> {
    Ok(bcrypt::verify(password, hash.get())?)
}
