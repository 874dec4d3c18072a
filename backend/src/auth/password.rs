use rand::Rng;

#[cfg(not(test))]
const HASH_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const HASH_COST: u32 = 4;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hash(bcrypt::BcryptError),
    #[error("Malformed password hash: {0}")]
    Malformed(bcrypt::BcryptError),
}

/// Hashes a password with bcrypt and a fresh salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    bcrypt::hash(password, HASH_COST).map_err(PasswordError::Hash)
}

/// Checks a password against a stored bcrypt hash.
///
/// A stored value that is not a bcrypt hash is an error, never a match.
pub fn verify_password(password: &str, encoded: &str) -> Result<bool, PasswordError> {
    bcrypt::verify(password, encoded).map_err(PasswordError::Malformed)
}

/// Random alphanumeric password for a freshly seeded admin account.
pub fn generate_password(len: usize) -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
