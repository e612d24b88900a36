//! Salted password hashing
//!
//! Hashes are hex(sha256(salt || password)) with a random 16-byte salt
//! per user.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Generate a fresh random salt, hex-encoded.
pub fn generate_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn verify_password(salt: &str, password: &str, stored_hash: &str) -> bool {
    hash_password(salt, password) == stored_hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_round_trip() {
        let salt = generate_salt();
        let hash = hash_password(&salt, "hunter2");
        assert!(verify_password(&salt, "hunter2", &hash));
        assert!(!verify_password(&salt, "hunter3", &hash));
    }

    #[test]
    fn salt_changes_the_hash() {
        let a = hash_password(&generate_salt(), "same");
        let b = hash_password(&generate_salt(), "same");
        assert_ne!(a, b);
    }

    #[test]
    fn salts_are_unique() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
