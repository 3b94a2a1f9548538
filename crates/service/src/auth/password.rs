use argon2::{
    password_hash::{PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, PasswordHash, Version,
};
use rand::rngs::OsRng;
use tracing::error;

use super::errors::AuthError;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Salted Argon2id hashing with a precomputed decoy hash, so that checking a
/// password for an account that does not exist costs the same as checking a
/// wrong one.
#[derive(Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
    decoy_hash: String,
}

impl Argon2Hasher {
    pub fn new(cost: HashCost) -> Result<Self, AuthError> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| AuthError::Hash(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let decoy_hash = hash_with(&argon2, "decoy-password-for-missing-accounts")?;
        Ok(Self { argon2, decoy_hash })
    }

    /// PHC-formatted hash with a fresh random salt.
    pub fn hash(&self, raw: &str) -> Result<String, AuthError> {
        hash_with(&self.argon2, raw)
    }

    /// Verifies `raw` against a stored PHC hash. The stored hash carries its
    /// own parameters, so cost changes never invalidate old accounts.
    pub fn verify(&self, raw: &str, stored: &str) -> bool {
        let parsed = match PasswordHash::new(stored) {
            Ok(p) => p,
            Err(e) => {
                error!(error = %e, "stored password hash is not a valid PHC string");
                return false;
            }
        };
        self.argon2.verify_password(raw.as_bytes(), &parsed).is_ok()
    }

    /// Spend one verification on the decoy hash. Always false.
    pub fn verify_decoy(&self, raw: &str) -> bool {
        let _ = self.verify(raw, &self.decoy_hash);
        false
    }
}

fn hash_with(argon2: &Argon2<'static>, raw: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    argon2
        .hash_password(raw.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> Argon2Hasher {
        Argon2Hasher::new(HashCost { memory_kib: 1024, iterations: 1, parallelism: 1 }).unwrap()
    }

    #[test]
    fn hash_round_trip() {
        let hasher = cheap();
        let hash = hasher.hash("Secret123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("Secret123"));
        assert!(hasher.verify("Secret123", &hash));
        assert!(!hasher.verify("secret123", &hash));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let hasher = cheap();
        assert_ne!(hasher.hash("Secret123").unwrap(), hasher.hash("Secret123").unwrap());
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!cheap().verify("Secret123", "not-a-phc-string"));
    }

    #[test]
    fn decoy_never_verifies() {
        let hasher = cheap();
        assert!(!hasher.verify_decoy("decoy-password-for-missing-accounts"));
    }

    #[test]
    fn rejects_impossible_cost() {
        let err = Argon2Hasher::new(HashCost { memory_kib: 1, iterations: 1, parallelism: 1 }).err();
        assert!(matches!(err, Some(AuthError::Hash(_))));
    }

    #[test]
    fn verifies_hashes_made_with_other_costs() {
        let stored = cheap().hash("Secret123").unwrap();
        let stronger = Argon2Hasher::new(HashCost { memory_kib: 2048, iterations: 2, parallelism: 1 }).unwrap();
        assert!(stronger.verify("Secret123", &stored));
    }
}
