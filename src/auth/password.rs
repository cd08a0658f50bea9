/// Password Hashing and Verification
///
/// Salted bcrypt hashes with a tunable cost. Inputs longer than bcrypt's
/// 72-byte limit are rejected rather than truncated, so two passwords that
/// share a 72-byte prefix never collapse onto the same hash.

use crate::error::AuthError;

/// bcrypt reads at most this many bytes of input
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Work factor bounds accepted by bcrypt
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// `cost` is the bcrypt work factor (4..=31); 12 takes a few hundred ms.
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a plaintext password
    ///
    /// # Errors
    /// `HashFailure` if the input exceeds 72 bytes or bcrypt rejects it
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Err(AuthError::HashFailure(format!(
                "password exceeds {} bytes",
                MAX_PASSWORD_BYTES
            )));
        }

        bcrypt::hash(plaintext, self.cost).map_err(|e| AuthError::HashFailure(e.to_string()))
    }

    /// Compare a plaintext password with a stored hash
    ///
    /// A mismatch is `Ok(false)`. Over-long input can never match a hash this
    /// type produced and is also `Ok(false)`.
    ///
    /// # Errors
    /// `HashFailure` only if `hash` is not a well-formed bcrypt hash
    pub fn verify(&self, hash: &str, plaintext: &str) -> Result<bool, AuthError> {
        let matched =
            bcrypt::verify(plaintext, hash).map_err(|e| AuthError::HashFailure(e.to_string()))?;

        Ok(matched && plaintext.len() <= MAX_PASSWORD_BYTES)
    }
}
