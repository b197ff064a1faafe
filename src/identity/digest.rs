//! One-way password digests.

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};
use sha2::{Digest, Sha256};

use crate::config::DigestScheme;
use crate::error::{AppError, AppResult};

pub trait PasswordDigest: Send + Sync {
    fn digest(&self, password: &str) -> AppResult<String>;
    /// True when `password` produces (or verifies against) `stored`.
    fn verify(&self, stored: &str, password: &str) -> bool;
}

/// Lowercase hex SHA-256 of the UTF-8 password bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Digest;

impl Sha256Digest {
    pub fn hex(password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl PasswordDigest for Sha256Digest {
    fn digest(&self, password: &str) -> AppResult<String> { Ok(Self::hex(password)) }

    fn verify(&self, stored: &str, password: &str) -> bool {
        Self::hex(password).as_bytes() == stored.as_bytes()
    }
}

/// Salted Argon2 (PHC string format).
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Digest;

impl PasswordDigest for Argon2Digest {
    fn digest(&self, password: &str) -> AppResult<String> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes).map_err(|e| AppError::internal("salt".to_string(), e.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AppError::internal("salt".to_string(), e.to_string()))?;
        let argon2 = Argon2::default();
        let phc = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::internal("argon2".to_string(), e.to_string()))?
            .to_string();
        Ok(phc)
    }

    fn verify(&self, stored: &str, password: &str) -> bool {
        if let Ok(parsed) = PasswordHash::new(stored) {
            Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
        } else { false }
    }
}

pub fn for_scheme(scheme: DigestScheme) -> Box<dyn PasswordDigest> {
    match scheme {
        DigestScheme::Sha256 => Box::new(Sha256Digest),
        DigestScheme::Argon2 => Box::new(Argon2Digest),
    }
}
