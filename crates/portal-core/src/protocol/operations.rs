//! Remote operation names, call payloads, and acknowledgment decoding.
//!
//! # Wire contract
//!
//! Every call is a Socket.IO event whose first element is the operation name
//! and whose remaining elements are positional arguments:
//!
//! ```text
//! register              {platform, name}
//! login                 {id, token}
//! getPairingCode        –
//! resetPairingCode      –
//! removePairingCode     –
//! getPairedPortalsData  –
//! rename                name
//! pair                  code
//! sendUrl               id, url
//! ```
//!
//! The service answers each call with exactly one acknowledgment whose
//! arguments are `(error, result)`.  A non-null `error` is a descriptor of the
//! form `{"error": "<message>"}`.
//!
//! The only inbound push consumed by the connector is `receiveUrl(url)`.

use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::domain::portal::PairingCode;
use crate::domain::session::PortalId;

/// Every remote call the connector can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Register,
    Login,
    GetPairingCode,
    ResetPairingCode,
    RemovePairingCode,
    GetPairedPortalsData,
    Rename,
    Pair,
    SendUrl,
}

impl Operation {
    /// All operations, in wire-contract order.
    pub const ALL: [Operation; 9] = [
        Operation::Register,
        Operation::Login,
        Operation::GetPairingCode,
        Operation::ResetPairingCode,
        Operation::RemovePairingCode,
        Operation::GetPairedPortalsData,
        Operation::Rename,
        Operation::Pair,
        Operation::SendUrl,
    ];

    /// The event name used on the wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            Operation::Register => "register",
            Operation::Login => "login",
            Operation::GetPairingCode => "getPairingCode",
            Operation::ResetPairingCode => "resetPairingCode",
            Operation::RemovePairingCode => "removePairingCode",
            Operation::GetPairedPortalsData => "getPairedPortalsData",
            Operation::Rename => "rename",
            Operation::Pair => "pair",
            Operation::SendUrl => "sendUrl",
        }
    }

    /// Reverse lookup of [`Operation::wire_name`].
    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.wire_name() == name)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Unsolicited events pushed by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushEvent {
    /// A peer relayed a URL to this portal.
    ReceiveUrl,
}

impl PushEvent {
    /// The event name used on the wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            PushEvent::ReceiveUrl => "receiveUrl",
        }
    }

    /// Reverse lookup of [`PushEvent::wire_name`].
    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "receiveUrl" => Some(PushEvent::ReceiveUrl),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct RegisterPayload<'a> {
    platform: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct LoginPayload<'a> {
    id: &'a str,
    token: &'a str,
}

/// One outbound call: the operation plus its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest {
    pub operation: Operation,
    pub args: Vec<Value>,
}

impl CallRequest {
    /// A call with no payload.
    pub fn bare(operation: Operation) -> Self {
        Self {
            operation,
            args: Vec::new(),
        }
    }

    /// `register{platform, name}`
    pub fn register(platform: &str, name: &str) -> Self {
        Self {
            operation: Operation::Register,
            args: vec![json!(RegisterPayload { platform, name })],
        }
    }

    /// `login{id, token}` where `token` is already hashed.
    pub fn login(id: &PortalId, token: &str) -> Self {
        Self {
            operation: Operation::Login,
            args: vec![json!(LoginPayload {
                id: id.as_str(),
                token,
            })],
        }
    }

    /// `rename(name)`
    pub fn rename(name: &str) -> Self {
        Self {
            operation: Operation::Rename,
            args: vec![Value::String(name.to_string())],
        }
    }

    /// `pair(code)`
    pub fn pair(code: &PairingCode) -> Self {
        Self {
            operation: Operation::Pair,
            args: vec![Value::String(code.as_str().to_string())],
        }
    }

    /// `sendUrl(id, url)`
    pub fn send_url(target: &PortalId, url: &str) -> Self {
        Self {
            operation: Operation::SendUrl,
            args: vec![
                Value::String(target.as_str().to_string()),
                Value::String(url.to_string()),
            ],
        }
    }
}

/// The error descriptor carried by a rejected acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub message: String,
}

impl RemoteError {
    /// Extracts the message from a descriptor.
    ///
    /// `{"error": "msg"}` yields `msg`; a bare string is used as-is; anything
    /// else is rendered as compact JSON so no information is lost.
    pub fn from_descriptor(descriptor: &Value) -> Self {
        let message = match descriptor {
            Value::String(s) => s.clone(),
            other => match other.get("error") {
                Some(Value::String(s)) => s.clone(),
                _ => other.to_string(),
            },
        };
        Self { message }
    }
}

/// A decoded `(error, result)` acknowledgment.
#[derive(Debug, Clone, PartialEq)]
pub struct Acknowledgement {
    pub error: Option<Value>,
    pub result: Option<Value>,
}

impl Acknowledgement {
    /// Splits raw acknowledgment arguments.  JSON `null` counts as absent.
    pub fn from_args(args: Vec<Value>) -> Self {
        let mut iter = args.into_iter().map(|v| if v.is_null() { None } else { Some(v) });
        let error = iter.next().flatten();
        let result = iter.next().flatten();
        Self { error, result }
    }

    /// A successful acknowledgment carrying `result`.
    pub fn success(result: Option<Value>) -> Self {
        Self { error: None, result }
    }

    /// A rejected acknowledgment with a `{"error": message}` descriptor.
    pub fn failure(message: &str) -> Self {
        Self {
            error: Some(json!({ "error": message })),
            result: None,
        }
    }

    /// Re-encodes the acknowledgment as positional wire arguments.
    pub fn into_args(self) -> Vec<Value> {
        vec![
            self.error.unwrap_or(Value::Null),
            self.result.unwrap_or(Value::Null),
        ]
    }

    /// Settles the acknowledgment: the error descriptor wins over any result.
    pub fn into_result(self) -> Result<Option<Value>, RemoteError> {
        match self.error {
            Some(descriptor) => Err(RemoteError::from_descriptor(&descriptor)),
            None => Ok(self.result),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_match_contract() {
        let names: Vec<&str> = Operation::ALL.iter().map(|op| op.wire_name()).collect();
        assert_eq!(
            names,
            [
                "register",
                "login",
                "getPairingCode",
                "resetPairingCode",
                "removePairingCode",
                "getPairedPortalsData",
                "rename",
                "pair",
                "sendUrl",
            ]
        );
    }

    #[test]
    fn test_from_wire_name_inverts_wire_name() {
        for op in Operation::ALL {
            assert_eq!(Operation::from_wire_name(op.wire_name()), Some(op));
        }
        assert_eq!(Operation::from_wire_name("unknown"), None);
    }

    #[test]
    fn test_register_payload_shape() {
        // Arrange / Act
        let call = CallRequest::register("linux", "desk");

        // Assert
        assert_eq!(call.args, vec![json!({"platform": "linux", "name": "desk"})]);
    }

    #[test]
    fn test_login_payload_carries_id_and_token_only() {
        let call = CallRequest::login(&PortalId::from("p1"), "$2b$08$hash");

        assert_eq!(call.operation, Operation::Login);
        assert_eq!(call.args, vec![json!({"id": "p1", "token": "$2b$08$hash"})]);
    }

    #[test]
    fn test_send_url_uses_two_positional_args() {
        let call = CallRequest::send_url(&PortalId::from("p2"), "http://example.com");

        assert_eq!(call.args, vec![json!("p2"), json!("http://example.com")]);
    }

    #[test]
    fn test_pair_and_rename_send_single_string() {
        assert_eq!(CallRequest::pair(&PairingCode::from("abc")).args, vec![json!("abc")]);
        assert_eq!(CallRequest::rename("kitchen").args, vec![json!("kitchen")]);
    }

    #[test]
    fn test_bare_calls_have_no_args() {
        assert!(CallRequest::bare(Operation::GetPairingCode).args.is_empty());
    }

    #[test]
    fn test_ack_with_error_descriptor_rejects_with_message() {
        // Arrange
        let ack = Acknowledgement::from_args(vec![json!({"error": "not paired"})]);

        // Act
        let result = ack.into_result();

        // Assert
        assert_eq!(result.unwrap_err().to_string(), "not paired");
    }

    #[test]
    fn test_ack_with_null_error_resolves_with_value() {
        let ack = Acknowledgement::from_args(vec![Value::Null, json!("code-1")]);

        assert_eq!(ack.into_result().unwrap(), Some(json!("code-1")));
    }

    #[test]
    fn test_empty_ack_resolves_with_nothing() {
        let ack = Acknowledgement::from_args(Vec::new());

        assert_eq!(ack.into_result().unwrap(), None);
    }

    #[test]
    fn test_descriptor_without_error_field_is_rendered_as_json() {
        let err = RemoteError::from_descriptor(&json!({"code": 7}));
        assert_eq!(err.message, r#"{"code":7}"#);
    }

    #[test]
    fn test_failure_helper_builds_standard_descriptor() {
        let args = Acknowledgement::failure("expired").into_args();
        assert_eq!(args, vec![json!({"error": "expired"}), Value::Null]);
    }
}
