//! Credential hashing.
//!
//! The login call never carries the plaintext secret.  Instead the secret is
//! run through a salted one-way function and the resulting opaque token is
//! sent.  The application layer only depends on the [`CredentialHasher`]
//! trait.
//!
//! | Hasher            | Token format          | Use                                   |
//! |-------------------|-----------------------|---------------------------------------|
//! | [`BcryptHasher`]  | `$2b$08$<salt><hash>` | Default; what the public service checks |
//! | [`Argon2Hasher`]  | `$argon2id$v=19$..`   | Self-hosted services verifying Argon2 |

use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use portal_core::Secret;
use rand_core::OsRng;
use thiserror::Error;

/// Errors raised while hashing a secret.
#[derive(Debug, Error)]
pub enum HashError {
    /// The cost parameters were rejected.
    #[error("invalid hash parameters: {0}")]
    Params(String),

    /// Hashing itself failed.
    #[error("failed to hash secret: {0}")]
    Hash(String),
}

/// Turns a plaintext secret into an opaque login token.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialHasher: Send + Sync {
    /// Hashes `secret`.  Implementations are expected to salt the input, so
    /// two calls with the same secret need not return the same token.
    fn hash(&self, secret: &Secret) -> Result<String, HashError>;
}

/// bcrypt hasher producing modular-crypt strings (`$2b$08$..`).
///
/// A fresh random salt is generated for every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    /// Work factor the coordination service expects.
    pub const COST: u32 = 8;

    /// Creates a hasher with [`COST`](Self::COST).
    pub fn new() -> Self {
        Self { cost: Self::COST }
    }

    /// Creates a hasher with a custom work factor.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Params`] unless `4 <= cost <= 31`.
    pub fn with_cost(cost: u32) -> Result<Self, HashError> {
        if !(4..=31).contains(&cost) {
            return Err(HashError::Params(format!("bcrypt cost {cost} outside 4..=31")));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialHasher for BcryptHasher {
    fn hash(&self, secret: &Secret) -> Result<String, HashError> {
        bcrypt::hash(secret.expose(), self.cost).map_err(|e| HashError::Hash(e.to_string()))
    }
}

/// Argon2id hasher producing PHC strings (`$argon2id$v=19$m=..`).
///
/// A fresh random salt is generated for every call.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Memory cost in KiB.  Login tokens are short-lived, so the cost is kept
    /// low enough for interactive use on small devices.
    pub const MEMORY_KIB: u32 = 8 * 1024;
    /// Number of passes.
    pub const ITERATIONS: u32 = 2;
    /// Degree of parallelism.
    pub const PARALLELISM: u32 = 1;

    /// Creates a hasher with the default cost parameters.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Params`] if the parameters are rejected.
    pub fn new() -> Result<Self, HashError> {
        let params = Params::new(Self::MEMORY_KIB, Self::ITERATIONS, Self::PARALLELISM, None)
            .map_err(|e| HashError::Params(e.to_string()))?;
        Ok(Self { params })
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, secret: &Secret) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        argon
            .hash_password(secret.expose().as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| HashError::Hash(e.to_string()))
    }
}
