/// Password Hashing and Verification
///
/// Opaque one-way hash + compare with bcrypt. Strength rules live in
/// `validators`, since they differ between sign-up and account updates.

use bcrypt::{hash, verify};

use crate::error::AppError;

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// # Errors
    /// Returns error if bcrypt hashing fails (e.g. cost out of range)
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        Ok(hash(password, self.cost)?)
    }

    /// # Errors
    /// Returns error if the stored hash is malformed
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        Ok(verify(password, hash)?)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}
