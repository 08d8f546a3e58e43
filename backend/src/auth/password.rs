use crate::error::StorageError;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

/// Argon2id password hashing with configurable cost.
///
/// Production uses memory = 19456 KiB, iterations = 2. Tests pass the minimum
/// cost so that bulk uploads of many rows stay fast.
#[derive(Clone, Debug)]
pub struct Hasher {
    params: Params,
}

impl Hasher {
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self, StorageError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| StorageError::Hash(e.to_string()))?;
        Ok(Hasher { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, password: &str) -> Result<String, StorageError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| StorageError::Hash(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// A malformed stored hash never verifies.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}
