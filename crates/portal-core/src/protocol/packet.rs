//! Text codec for Engine.IO v4 packets carrying Socket.IO v5 packets.
//!
//! # Two layers of framing (for beginners)
//!
//! Socket.IO runs on top of Engine.IO.  Each WebSocket text frame holds one
//! *Engine.IO packet*: a single type digit followed by an optional payload.
//!
//! ```text
//! 0{"sid":"..","pingInterval":25000,"pingTimeout":20000}   open (handshake)
//! 1                                                        close
//! 2                                                        ping (server → client)
//! 3                                                        pong (client → server)
//! 4<socket.io packet>                                      message
//! ```
//!
//! A *Socket.IO packet* sits inside an Engine.IO message and has its own type
//! digit, an optional namespace, an optional acknowledgment id, and a JSON
//! payload:
//!
//! ```text
//! 40                              connect to the default namespace "/"
//! 40{"sid":"abc"}                 server confirms the connection
//! 41                              disconnect
//! 42["receiveUrl","http://x"]     event without acknowledgment
//! 4212["login",{"id":"p1",..}]    event that expects acknowledgment #12
//! 4312[null]                      acknowledgment #12
//! 44{"message":"Not authorized"}  connect error
//! ```
//!
//! Binary attachments (types 5 and 6) are not used by the portal service and
//! are rejected with [`ProtocolError::UnsupportedPacketType`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The only namespace the connector uses.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Errors that can occur while encoding or decoding a packet.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The frame contained no characters at all.
    #[error("empty packet")]
    Empty,

    /// The type character is not a known Engine.IO or Socket.IO packet type.
    #[error("unknown packet type: {0:?}")]
    UnknownPacketType(char),

    /// The packet type is valid but not supported by this connector.
    #[error("unsupported packet type: {0:?}")]
    UnsupportedPacketType(char),

    /// The payload could not be parsed (bad JSON, wrong shape, missing id).
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// The Engine.IO open-packet payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

/// One Engine.IO packet (one WebSocket text frame).
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

/// The body of a Socket.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacketKind {
    /// Connection request (client) or confirmation (server).
    Connect(Option<Value>),
    Disconnect,
    /// A named event; `id` is present when the sender wants an acknowledgment.
    Event {
        id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    /// The acknowledgment for event `id`.
    Ack { id: u64, args: Vec<Value> },
    /// The server refused the namespace connection.
    ConnectError(Value),
}

/// One Socket.IO packet addressed to a namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketPacket {
    pub namespace: String,
    pub kind: SocketPacketKind,
}

impl SocketPacket {
    /// Wraps `kind` for the default namespace.
    pub fn new(kind: SocketPacketKind) -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            kind,
        }
    }

    /// `true` if the packet targets the default namespace.
    pub fn is_default_namespace(&self) -> bool {
        self.namespace == DEFAULT_NAMESPACE
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes an [`EnginePacket`] into the text of one WebSocket frame.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedPayload`] if a JSON payload cannot be
/// serialized.
///
/// # Examples
///
/// ```rust
/// use portal_core::protocol::packet::{encode_engine_packet, EnginePacket, SocketPacket, SocketPacketKind};
///
/// let packet = EnginePacket::Message(SocketPacket::new(SocketPacketKind::Connect(None)));
/// assert_eq!(encode_engine_packet(&packet).unwrap(), "40");
/// ```
pub fn encode_engine_packet(packet: &EnginePacket) -> Result<String, ProtocolError> {
    let text = match packet {
        EnginePacket::Open(handshake) => format!("0{}", to_json(handshake)?),
        EnginePacket::Close => "1".to_string(),
        EnginePacket::Ping(data) => format!("2{data}"),
        EnginePacket::Pong(data) => format!("3{data}"),
        EnginePacket::Message(socket) => format!("4{}", encode_socket_packet(socket)?),
        EnginePacket::Upgrade => "5".to_string(),
        EnginePacket::Noop => "6".to_string(),
    };
    Ok(text)
}

/// Decodes the text of one WebSocket frame into an [`EnginePacket`].
///
/// # Errors
///
/// Returns [`ProtocolError`] if the frame is empty, uses an unknown type, or
/// carries a malformed payload.
///
/// # Examples
///
/// ```rust
/// use portal_core::protocol::packet::{decode_engine_packet, EnginePacket};
///
/// assert_eq!(decode_engine_packet("2").unwrap(), EnginePacket::Ping(String::new()));
/// ```
pub fn decode_engine_packet(text: &str) -> Result<EnginePacket, ProtocolError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(ProtocolError::Empty)?;
    let rest = chars.as_str();

    match kind {
        '0' => {
            let handshake: Handshake = serde_json::from_str(rest)
                .map_err(|e| ProtocolError::MalformedPayload(format!("handshake: {e}")))?;
            Ok(EnginePacket::Open(handshake))
        }
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping(rest.to_string())),
        '3' => Ok(EnginePacket::Pong(rest.to_string())),
        '4' => Ok(EnginePacket::Message(decode_socket_packet(rest)?)),
        '5' => Ok(EnginePacket::Upgrade),
        '6' => Ok(EnginePacket::Noop),
        other => Err(ProtocolError::UnknownPacketType(other)),
    }
}

/// Encodes a [`SocketPacket`] without the leading Engine.IO `4`.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedPayload`] if the payload cannot be serialized.
pub fn encode_socket_packet(packet: &SocketPacket) -> Result<String, ProtocolError> {
    let (kind, id, payload) = match &packet.kind {
        SocketPacketKind::Connect(data) => ('0', None, data.as_ref().map(to_json).transpose()?),
        SocketPacketKind::Disconnect => ('1', None, None),
        SocketPacketKind::Event { id, name, args } => {
            let mut items = Vec::with_capacity(args.len() + 1);
            items.push(Value::String(name.clone()));
            items.extend(args.iter().cloned());
            ('2', *id, Some(to_json(&items)?))
        }
        SocketPacketKind::Ack { id, args } => ('3', Some(*id), Some(to_json(args)?)),
        SocketPacketKind::ConnectError(data) => ('4', None, Some(to_json(data)?)),
    };

    let mut out = String::new();
    out.push(kind);
    if !packet.is_default_namespace() {
        out.push_str(&packet.namespace);
        out.push(',');
    }
    if let Some(id) = id {
        out.push_str(&id.to_string());
    }
    if let Some(payload) = payload {
        out.push_str(&payload);
    }
    Ok(out)
}

/// Decodes a [`SocketPacket`] (the text after the Engine.IO `4`).
///
/// # Errors
///
/// Returns [`ProtocolError`] for unknown or binary packet types and for
/// payloads of the wrong shape.
pub fn decode_socket_packet(text: &str) -> Result<SocketPacket, ProtocolError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(ProtocolError::Empty)?;
    let mut rest = chars.as_str();

    match kind {
        '0'..='4' => {}
        '5' | '6' => return Err(ProtocolError::UnsupportedPacketType(kind)),
        other => return Err(ProtocolError::UnknownPacketType(other)),
    }

    // Optional namespace: "/chat,..." – absent means the default namespace.
    let namespace = if rest.starts_with('/') {
        match rest.find(',') {
            Some(idx) => {
                let ns = &rest[..idx];
                rest = &rest[idx + 1..];
                ns.to_string()
            }
            None => {
                let ns = rest;
                rest = "";
                ns.to_string()
            }
        }
    } else {
        DEFAULT_NAMESPACE.to_string()
    };

    // Optional acknowledgment id: a run of ASCII digits before the payload.
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    let id = if digits > 0 {
        let parsed = rest[..digits]
            .parse::<u64>()
            .map_err(|e| ProtocolError::MalformedPayload(format!("ack id: {e}")))?;
        rest = &rest[digits..];
        Some(parsed)
    } else {
        None
    };

    let payload = if rest.is_empty() {
        None
    } else {
        Some(
            serde_json::from_str::<Value>(rest)
                .map_err(|e| ProtocolError::MalformedPayload(e.to_string()))?,
        )
    };

    let kind = match kind {
        '0' => SocketPacketKind::Connect(payload),
        '1' => SocketPacketKind::Disconnect,
        '2' => {
            let mut items = expect_array(payload, "event")?.into_iter();
            let name = match items.next() {
                Some(Value::String(name)) => name,
                _ => {
                    return Err(ProtocolError::MalformedPayload(
                        "event payload must start with a string name".to_string(),
                    ))
                }
            };
            SocketPacketKind::Event {
                id,
                name,
                args: items.collect(),
            }
        }
        '3' => {
            let id = id.ok_or_else(|| {
                ProtocolError::MalformedPayload("acknowledgment without id".to_string())
            })?;
            let args = match payload {
                None => Vec::new(),
                some => expect_array(some, "acknowledgment")?,
            };
            SocketPacketKind::Ack { id, args }
        }
        '4' => SocketPacketKind::ConnectError(payload.unwrap_or(Value::Null)),
        other => return Err(ProtocolError::UnknownPacketType(other)),
    };

    Ok(SocketPacket { namespace, kind })
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ProtocolError> {
    serde_json::to_string(value).map_err(|e| ProtocolError::MalformedPayload(e.to_string()))
}

fn expect_array(payload: Option<Value>, context: &str) -> Result<Vec<Value>, ProtocolError> {
    match payload {
        Some(Value::Array(items)) => Ok(items),
        _ => Err(ProtocolError::MalformedPayload(format!(
            "{context} payload must be a JSON array"
        ))),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_open_handshake() {
        // Arrange – a real server handshake frame
        let frame = r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;

        // Act
        let packet = decode_engine_packet(frame).unwrap();

        // Assert
        match packet {
            EnginePacket::Open(h) => {
                assert_eq!(h.sid, "lv_VI97HAXpY6yYWAAAC");
                assert_eq!(h.ping_interval, 25000);
                assert_eq!(h.ping_timeout, 20000);
                assert_eq!(h.max_payload, Some(1_000_000));
            }
            other => panic!("unexpected packet {other:?}"),
        }
    }

    #[test]
    fn test_decode_ping_and_probe() {
        assert_eq!(decode_engine_packet("2").unwrap(), EnginePacket::Ping(String::new()));
        assert_eq!(
            decode_engine_packet("2probe").unwrap(),
            EnginePacket::Ping("probe".to_string())
        );
    }

    #[test]
    fn test_encode_pong_echoes_data() {
        let text = encode_engine_packet(&EnginePacket::Pong("probe".to_string())).unwrap();
        assert_eq!(text, "3probe");
    }

    #[test]
    fn test_encode_connect_request_is_40() {
        let packet = EnginePacket::Message(SocketPacket::new(SocketPacketKind::Connect(None)));
        assert_eq!(encode_engine_packet(&packet).unwrap(), "40");
    }

    #[test]
    fn test_encode_event_with_ack_id() {
        // Arrange
        let packet = SocketPacket::new(SocketPacketKind::Event {
            id: Some(12),
            name: "login".to_string(),
            args: vec![json!({"id": "p1", "token": "t"})],
        });

        // Act
        let text = encode_socket_packet(&packet).unwrap();

        // Assert
        assert_eq!(text, r#"212["login",{"id":"p1","token":"t"}]"#);
    }

    #[test]
    fn test_encode_event_without_args() {
        let packet = SocketPacket::new(SocketPacketKind::Event {
            id: Some(0),
            name: "getPairingCode".to_string(),
            args: Vec::new(),
        });

        assert_eq!(encode_socket_packet(&packet).unwrap(), r#"20["getPairingCode"]"#);
    }

    #[test]
    fn test_decode_push_event() {
        // Act
        let packet = decode_engine_packet(r#"42["receiveUrl","http://x"]"#).unwrap();

        // Assert
        assert_eq!(
            packet,
            EnginePacket::Message(SocketPacket::new(SocketPacketKind::Event {
                id: None,
                name: "receiveUrl".to_string(),
                args: vec![json!("http://x")],
            }))
        );
    }

    #[test]
    fn test_decode_ack_with_error_descriptor() {
        let packet = decode_socket_packet(r#"37[{"error":"not paired"}]"#).unwrap();

        assert_eq!(
            packet.kind,
            SocketPacketKind::Ack {
                id: 7,
                args: vec![json!({"error": "not paired"})],
            }
        );
    }

    #[test]
    fn test_decode_ack_without_id_is_malformed() {
        let result = decode_socket_packet(r#"3[null]"#);
        assert!(matches!(result, Err(ProtocolError::MalformedPayload(_))));
    }

    #[test]
    fn test_decode_server_connect_confirmation() {
        let packet = decode_socket_packet(r#"0{"sid":"abc"}"#).unwrap();
        assert_eq!(packet.kind, SocketPacketKind::Connect(Some(json!({"sid": "abc"}))));
        assert!(packet.is_default_namespace());
    }

    #[test]
    fn test_decode_connect_error() {
        let packet = decode_socket_packet(r#"4{"message":"Not authorized"}"#).unwrap();
        assert_eq!(
            packet.kind,
            SocketPacketKind::ConnectError(json!({"message": "Not authorized"}))
        );
    }

    #[test]
    fn test_decode_custom_namespace() {
        // Arrange
        let text = r#"2/admin,["receiveUrl","http://x"]"#;

        // Act
        let packet = decode_socket_packet(text).unwrap();

        // Assert
        assert_eq!(packet.namespace, "/admin");
        assert!(!packet.is_default_namespace());
    }

    #[test]
    fn test_encode_custom_namespace_round_trip() {
        let packet = SocketPacket {
            namespace: "/admin".to_string(),
            kind: SocketPacketKind::Disconnect,
        };

        let text = encode_socket_packet(&packet).unwrap();

        assert_eq!(text, "1/admin,");
        assert_eq!(decode_socket_packet(&text).unwrap(), packet);
    }

    #[test]
    fn test_decode_binary_event_is_unsupported() {
        let result = decode_socket_packet(r#"51-["file",{"_placeholder":true,"num":0}]"#);
        assert_eq!(result, Err(ProtocolError::UnsupportedPacketType('5')));
    }

    #[test]
    fn test_decode_event_with_non_string_name_is_malformed() {
        let result = decode_socket_packet("2[42]");
        assert!(matches!(result, Err(ProtocolError::MalformedPayload(_))));
    }

    #[test]
    fn test_decode_empty_frame_is_error() {
        assert_eq!(decode_engine_packet(""), Err(ProtocolError::Empty));
    }

    #[test]
    fn test_decode_unknown_engine_type() {
        assert_eq!(decode_engine_packet("9"), Err(ProtocolError::UnknownPacketType('9')));
    }

    #[test]
    fn test_decode_bad_json_is_malformed() {
        let result = decode_engine_packet(r#"42["receiveUrl","#);
        assert!(matches!(result, Err(ProtocolError::MalformedPayload(_))));
    }
}
