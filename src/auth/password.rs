use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// One-way password digests. Plaintext never leaves this seam.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plain: &str) -> anyhow::Result<String>;
    /// `Ok(false)` on mismatch; `Err` only when the stored digest is unreadable.
    fn verify(&self, plain: &str, digest: &str) -> anyhow::Result<bool>;
}

/// Argon2id with the crate defaults and a fresh random salt per digest.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

fn argon2_failure(context: &'static str, e: password_hash::Error) -> anyhow::Error {
    error!(error = %e, "{context}");
    anyhow::anyhow!("{context}: {e}")
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map(|digest| digest.to_string())
            .map_err(|e| argon2_failure("argon2 hash failed", e))
    }

    fn verify(&self, plain: &str, digest: &str) -> anyhow::Result<bool> {
        let parsed =
            PasswordHash::new(digest).map_err(|e| argon2_failure("stored digest unreadable", e))?;
        Ok(Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_verifies_and_hides_plaintext() {
        let digest = Argon2Hasher.hash("Secur3P@ssw0rd!").expect("hash");
        assert!(digest.starts_with("$argon2"));
        assert!(!digest.contains("Secur3P@ssw0rd!"));
        assert!(Argon2Hasher.verify("Secur3P@ssw0rd!", &digest).expect("verify"));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = Argon2Hasher.hash("pw").unwrap();
        let b = Argon2Hasher.hash("pw").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_password_is_false_not_error() {
        let digest = Argon2Hasher.hash("correct-horse").unwrap();
        assert!(!Argon2Hasher.verify("wrong", &digest).unwrap());
    }

    #[test]
    fn unreadable_digest_is_an_error() {
        assert!(Argon2Hasher.verify("anything", "not-a-valid-hash").is_err());
    }
}
