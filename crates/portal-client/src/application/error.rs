//! Error type returned by every [`PortalClient`](super::PortalClient) operation.

use portal_core::Operation;
use thiserror::Error;

use crate::infrastructure::channel::TransportError;
use crate::infrastructure::hasher::HashError;

/// Why a portal operation was rejected.
#[derive(Debug, Error)]
pub enum PortalError {
    /// The channel is not open; the call was not sent.
    #[error("Not connected")]
    NotConnected,

    /// The service acknowledged the call with an error descriptor.
    ///
    /// Displays as the service's message verbatim.
    #[error("{message}")]
    Remote { operation: Operation, message: String },

    /// The channel reported an error before it ever opened.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// `connect` was already called on this client.
    #[error("connect() may only be called once per client")]
    AlreadyStarted,

    /// The transport refused the call or the open request.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The secret could not be hashed.
    #[error(transparent)]
    Hash(#[from] HashError),
}

impl PortalError {
    /// The service's message, if this is a remote rejection.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            PortalError::Remote { message, .. } => Some(message),
            _ => None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
