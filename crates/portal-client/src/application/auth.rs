//! Registration and login.
//!
//! `register` creates a new portal identity on the service and hands back the
//! opaque bundle it returns.  `login` proves ownership of an existing
//! identity: the secret is hashed locally and only the resulting token is
//! sent.
//!
//! Login is the only operation besides the event dispatcher that writes to
//! the session:
//!
//! | Acknowledgment | Session after settle                                 |
//! |----------------|------------------------------------------------------|
//! | success        | identity + secret committed, authenticated           |
//! | error          | identity + secret cleared, not authenticated         |
//!
//! A secret that cannot be hashed counts as a failed login.
//!
//! Logging in again is allowed; a success overwrites the previous identity.

use std::sync::Arc;

use portal_core::{CallRequest, PortalId, RegistrationData, Secret};
use tracing::{debug, warn};

use crate::application::correlation::Connection;
use crate::application::error::PortalError;
use crate::infrastructure::channel::TransportChannel;
use crate::infrastructure::hasher::{CredentialHasher, HashError};

/// Registers a new portal and returns the service's registration bundle.
pub(crate) async fn register<C: TransportChannel>(
    connection: &Connection<C>,
    platform: &str,
    name: &str,
) -> Result<RegistrationData, PortalError> {
    let value = connection
        .invoke_for_value(CallRequest::register(platform, name))
        .await?;
    Ok(RegistrationData(value))
}

/// Logs in as `identity` using `secret`.
pub(crate) async fn login<C: TransportChannel>(
    connection: &Connection<C>,
    hasher: Arc<dyn CredentialHasher>,
    identity: PortalId,
    secret: Secret,
) -> Result<(), PortalError> {
    // Fail fast before spending time on the hash.
    if !connection.session().is_connected() {
        return Err(PortalError::NotConnected);
    }

    let token = match hash_off_runtime(hasher, secret.clone()).await {
        Ok(token) => token,
        Err(e) => {
            warn!("could not hash secret for {identity}: {e}");
            connection.session().clear_credentials();
            return Err(e.into());
        }
    };
    let outcome = connection.invoke(CallRequest::login(&identity, &token)).await;

    let mut session = connection.session();
    match outcome {
        Ok(_) => {
            debug!("login accepted for {identity}");
            session
                .commit_login(identity, secret)
                .map_err(|_| PortalError::NotConnected)
        }
        Err(e) => {
            session.clear_credentials();
            Err(e)
        }
    }
}

/// Hashes on the blocking pool; bcrypt and Argon2 take milliseconds of CPU.
async fn hash_off_runtime(
    hasher: Arc<dyn CredentialHasher>,
    secret: Secret,
) -> Result<String, HashError> {
    tokio::task::spawn_blocking(move || hasher.hash(&secret))
        .await
        .map_err(|e| HashError::Hash(e.to_string()))?
}

// ── Tests ─────────────────────────────────────────────────────────────────────
