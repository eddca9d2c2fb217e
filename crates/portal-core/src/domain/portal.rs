//! Opaque values issued by the coordination service, and URL envelopes.
//!
//! The connector deliberately does not interpret the shape of anything the
//! service hands out: pairing codes are treated as uninterpreted tokens, and
//! registration bundles and paired-portal records are kept as raw JSON.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::session::PortalId;

/// A short-lived pairing code minted by the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairingCode(String);

impl PairingCode {
    /// Wraps a code typed in by the user or received from the service.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Builds a code from an acknowledgment value.
    ///
    /// Strings are taken as-is; any other JSON value (the service is free to
    /// mint numeric codes) is kept in its compact JSON text form.  An absent
    /// value yields an empty code.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(code) => Self(code),
            Value::Null => Self(String::new()),
            other => Self(other.to_string()),
        }
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PairingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PairingCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// The identity/credential bundle returned by `register`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationData(pub Value);

impl RegistrationData {
    /// Looks up a top-level string field such as `"id"` without enforcing a schema.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }
}

/// The set of paired peers returned by `getPairedPortalsData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairedPortals(pub Value);

impl PairedPortals {
    /// Returns the records if the service answered with a JSON array.
    pub fn records(&self) -> &[Value] {
        self.0.as_array().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A URL addressed to one paired peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundUrl {
    pub target: PortalId,
    pub url: String,
}

/// A URL pushed to this portal by a peer.
///
/// The service sends the URL as the first push argument.  Some deployments
/// append the sender's portal id as a second argument; it is kept when
/// present and otherwise left empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundUrl {
    pub url: String,
    pub source: Option<PortalId>,
}

impl InboundUrl {
    /// Extracts the envelope from `receiveUrl` push arguments.
    ///
    /// Returns `None` if the first argument is missing or not a string.
    pub fn from_args(args: &[Value]) -> Option<Self> {
        let url = args.first()?.as_str()?.to_string();
        let source = args.get(1).and_then(Value::as_str).map(PortalId::from);
        Some(Self { url, source })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
