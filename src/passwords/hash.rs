use std::fmt::Debug;

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use password_hash::SaltString;
use rand_core::OsRng;

use super::Password;

/// An Argon2 hash of a user's password in PHC string format.
#[derive(Clone, PartialEq)]
pub struct Hash(String);

impl Hash {
    /// Hash a password with a freshly generated salt.
    pub fn new(password: &Password) -> Result<Self> {
        let salt = SaltString::generate(&mut OsRng);

        let phc = Argon2::default()
            .hash_password(password.as_bytes(), salt.as_ref())?
            .to_string();

        Ok(Self(phc))
    }

    /// Load a hash that was previously persisted.
    ///
    /// # Returns
    ///
    /// An [`Err`] if the stored value is not a valid PHC string.
    pub fn from_hash_str(hash: &str) -> Result<Self> {
        Ok(Self(PasswordHash::new(hash)?.to_string()))
    }

    /// Determine if a raw password produces this hash.
    pub fn matches_raw_password(&self, raw_password: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(&self.0)?;

        match Argon2::default().verify_password(raw_password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(other) => Err(other.into()),
        }
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl Debug for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Hash").field(&"<redacted>").finish()
    }
}
