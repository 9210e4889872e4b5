//! Password hashing (bcrypt).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// bcrypt hasher with a fixed work factor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn hash(&self, plain: &str) -> Result<String, PasswordError> {
        bcrypt::hash(plain, self.cost).map_err(|e| PasswordError::Hash(e.to_string()))
    }

    /// Check `plain` against a stored hash.
    ///
    /// A stored value that is not a bcrypt hash never matches.
    pub fn verify(&self, plain: &str, hash: &str) -> bool {
        match bcrypt::verify(plain, hash) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(error = %e, "stored password hash is unreadable");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_only_for_the_original_password() {
        let hasher = PasswordHasher::new(4);
        let hash = hasher.hash("Secret#123").unwrap();

        assert_ne!(hash, "Secret#123");
        assert!(hasher.verify("Secret#123", &hash));
        assert!(!hasher.verify("secret#123", &hash));
    }

    #[test]
    fn malformed_stored_hash_never_matches() {
        assert!(!PasswordHasher::new(4).verify("anything", "plain-text"));
    }
}
