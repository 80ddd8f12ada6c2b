//! Password Hasher
//! Mission: Salted one-way hashing with bcrypt

use bcrypt::{hash, verify, BcryptError, DEFAULT_COST};
use std::sync::OnceLock;
use tracing::warn;

/// bcrypt wrapper with a configurable work factor.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
    dummy_hash: OnceLock<String>,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self {
            cost,
            dummy_hash: OnceLock::new(),
        }
    }

    /// Hash with a fresh random salt; two calls never produce the same output.
    pub fn hash(&self, plaintext: &str) -> Result<String, BcryptError> {
        hash(plaintext, self.cost)
    }

    /// Check `plaintext` against a stored hash. Malformed hashes never verify.
    pub fn verify(&self, plaintext: &str, password_hash: &str) -> bool {
        match verify(plaintext, password_hash) {
            Ok(valid) => valid,
            Err(e) => {
                warn!(error = %e, "Stored password hash could not be parsed");
                false
            }
        }
    }

    /// Compute the dummy hash ahead of the first unknown-email login.
    /// Blocking; run it on the blocking pool.
    pub fn warm_up(&self) {
        self.dummy_hash();
    }

    /// Spend the same work as a real verification, then fail.
    ///
    /// Used when no account matches so both login failure paths cost the same.
    pub fn verify_dummy(&self, plaintext: &str) -> bool {
        let dummy = self.dummy_hash();
        if !dummy.is_empty() {
            let _ = verify(plaintext, dummy);
        }
        false
    }

    fn dummy_hash(&self) -> &str {
        self.dummy_hash.get_or_init(|| {
            hash("dummy-password-for-timing", self.cost).unwrap_or_default()
        })
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}
