//! Session state for a single portal connection.
//!
//! # What is a session? (for beginners)
//!
//! Every connector instance talks to the coordination service over exactly one
//! channel.  The *session* records what the connector currently knows about
//! that channel and about the portal it is logged in as:
//!
//! ```text
//! identity      – the portal id used in the last successful login
//! credential    – the plaintext secret that login was performed with
//! connected     – the channel is currently open
//! authenticated – the last login succeeded and no disconnect happened since
//! ```
//!
//! # State machine
//!
//! ```text
//!                 open                 login ok
//! Disconnected ─────────► Connected ─────────────► Authenticated
//!      ▲                   │   ▲                         │
//!      │    disconnect     │   │      login failure      │
//!      └───────────────────┴───┴─────────────────────────┘
//!                              (disconnect from any state)
//! ```
//!
//! The invariant `authenticated ⇒ connected ∧ identity present` holds after
//! every transition.  Fields are private so the transition methods below are
//! the only way to change them.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Identifier assigned to a portal by the coordination service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortalId(String);

impl PortalId {
    /// Wraps a service-assigned identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PortalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PortalId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PortalId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A plaintext portal secret.
///
/// The secret is only ever sent to the service after hashing.  `Debug`
/// output is redacted so secrets cannot leak into logs by accident.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wraps a plaintext secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns the plaintext.  Call sites should be limited to hashing.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl From<&str> for Secret {
    fn from(secret: &str) -> Self {
        Self::new(secret)
    }
}

impl From<String> for Secret {
    fn from(secret: String) -> Self {
        Self(secret)
    }
}

/// Coarse session phase derived from the connected/authenticated flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No open channel.
    Disconnected,
    /// Channel open, not logged in.
    Connected,
    /// Channel open and the last login succeeded.
    Authenticated,
}

/// Errors raised by session transitions that would break the invariant.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// A login result arrived while the channel was not open.
    #[error("cannot commit login while disconnected")]
    NotConnected,
}

/// The owned state of one portal session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionState {
    identity: Option<PortalId>,
    credential: Option<Secret>,
    connected: bool,
    authenticated: bool,
}

impl SessionState {
    /// Creates a fresh, disconnected session with no credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while the channel is open.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Returns `true` if the last login succeeded and no disconnect happened since.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// The portal id committed by the last successful login.
    pub fn identity(&self) -> Option<&PortalId> {
        self.identity.as_ref()
    }

    /// The secret committed by the last successful login.
    pub fn credential(&self) -> Option<&Secret> {
        self.credential.as_ref()
    }

    /// Returns the current [`SessionPhase`].
    pub fn phase(&self) -> SessionPhase {
        match (self.connected, self.authenticated) {
            (true, true) => SessionPhase::Authenticated,
            (true, false) => SessionPhase::Connected,
            _ => SessionPhase::Disconnected,
        }
    }

    /// Transition on a successful channel open.
    pub fn mark_connected(&mut self) {
        debug!("session: {:?} -> Connected", self.phase());
        self.connected = true;
    }

    /// Transition on any disconnect signal, from any phase.
    ///
    /// Clears the connection flag together with every credential field.
    pub fn mark_disconnected(&mut self) {
        debug!("session: {:?} -> Disconnected", self.phase());
        self.connected = false;
        self.authenticated = false;
        self.identity = None;
        self.credential = None;
    }

    /// Transition on a successful login acknowledgment.
    ///
    /// Overwrites any previously committed identity.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotConnected`] (and leaves the credential
    /// fields cleared) if the channel closed before the acknowledgment was
    /// processed.
    pub fn commit_login(&mut self, identity: PortalId, credential: Secret) -> Result<(), SessionError> {
        if !self.connected {
            self.clear_credentials();
            return Err(SessionError::NotConnected);
        }
        debug!("session: {:?} -> Authenticated as {identity}", self.phase());
        self.identity = Some(identity);
        self.credential = Some(credential);
        self.authenticated = true;
        Ok(())
    }

    /// Transition on a rejected login.
    ///
    /// Identity and credential are never left partially set.
    pub fn clear_credentials(&mut self) {
        self.identity = None;
        self.credential = None;
        self.authenticated = false;
    }

    /// Checks `authenticated ⇒ connected ∧ identity present`.
    pub fn invariant_holds(&self) -> bool {
        !self.authenticated || (self.connected && self.identity.is_some())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
