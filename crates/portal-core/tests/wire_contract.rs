//! Integration tests for the portal-core wire contract.
//!
//! These tests drive complete frames through the public API the way the
//! transport does: a [`CallRequest`] is framed as a Socket.IO event with an
//! acknowledgment id, and server frames are decoded back into
//! acknowledgments and push events.

use portal_core::{
    protocol::{
        decode_engine_packet, encode_engine_packet,
        packet::{SocketPacket, SocketPacketKind},
        SequenceCounter,
    },
    Acknowledgement, CallRequest, EnginePacket, InboundUrl, Operation, PairingCode, PortalId,
    PushEvent,
};
use serde_json::json;

/// Frames a call the same way the Socket.IO transport does.
fn frame_call(call: &CallRequest, counter: &SequenceCounter) -> String {
    let packet = EnginePacket::Message(SocketPacket::new(SocketPacketKind::Event {
        id: Some(counter.next()),
        name: call.operation.wire_name().to_string(),
        args: call.args.clone(),
    }));
    encode_engine_packet(&packet).expect("encode must succeed")
}

#[test]
fn test_login_frame_matches_wire_contract() {
    // Arrange
    let counter = SequenceCounter::new();
    let call = CallRequest::login(&PortalId::from("p1"), "hashed");

    // Act
    let frame = frame_call(&call, &counter);

    // Assert
    assert_eq!(frame, r#"420["login",{"id":"p1","token":"hashed"}]"#);
}

#[test]
fn test_consecutive_calls_get_distinct_ack_ids() {
    let counter = SequenceCounter::new();

    let first = frame_call(&CallRequest::bare(Operation::GetPairingCode), &counter);
    let second = frame_call(&CallRequest::bare(Operation::ResetPairingCode), &counter);

    assert_eq!(first, r#"420["getPairingCode"]"#);
    assert_eq!(second, r#"421["resetPairingCode"]"#);
}

#[test]
fn test_send_url_frame_has_positional_args() {
    let counter = SequenceCounter::new();
    let call = CallRequest::send_url(&PortalId::from("p2"), "http://example.com");

    let frame = frame_call(&call, &counter);

    assert_eq!(frame, r#"420["sendUrl","p2","http://example.com"]"#);
}

#[test]
fn test_pair_frame_carries_code() {
    let counter = SequenceCounter::new();

    let frame = frame_call(&CallRequest::pair(&PairingCode::from("x7k2")), &counter);

    assert_eq!(frame, r#"420["pair","x7k2"]"#);
}

#[test]
fn test_server_ack_decodes_into_rejection() {
    // Arrange – server rejects call #3
    let frame = r#"433[{"error":"not paired"}]"#;

    // Act
    let packet = decode_engine_packet(frame).expect("decode must succeed");
    let EnginePacket::Message(SocketPacket {
        kind: SocketPacketKind::Ack { id, args },
        ..
    }) = packet
    else {
        panic!("expected an acknowledgment, got {packet:?}");
    };
    let result = Acknowledgement::from_args(args).into_result();

    // Assert
    assert_eq!(id, 3);
    assert_eq!(result.unwrap_err().message, "not paired");
}

#[test]
fn test_server_ack_decodes_into_pairing_code() {
    let packet = decode_engine_packet(r#"431[null,"k3j9"]"#).unwrap();
    let EnginePacket::Message(SocketPacket {
        kind: SocketPacketKind::Ack { args, .. },
        ..
    }) = packet
    else {
        panic!("expected an acknowledgment");
    };

    let value = Acknowledgement::from_args(args).into_result().unwrap().unwrap();

    assert_eq!(PairingCode::from_value(value), PairingCode::from("k3j9"));
}

#[test]
fn test_receive_url_push_decodes_into_inbound_url() {
    // Arrange
    let frame = r#"42["receiveUrl","http://a"]"#;

    // Act
    let packet = decode_engine_packet(frame).unwrap();
    let EnginePacket::Message(SocketPacket {
        kind: SocketPacketKind::Event { id, name, args },
        ..
    }) = packet
    else {
        panic!("expected an event");
    };

    // Assert
    assert_eq!(id, None);
    assert_eq!(PushEvent::from_wire_name(&name), Some(PushEvent::ReceiveUrl));
    assert_eq!(
        InboundUrl::from_args(&args),
        Some(InboundUrl {
            url: "http://a".to_string(),
            source: None,
        })
    );
}

#[test]
fn test_register_success_bundle_is_kept_opaque() {
    let ack = Acknowledgement::from_args(vec![
        serde_json::Value::Null,
        json!({"id": "p9", "token": "tok", "extra": [1, 2]}),
    ]);

    let value = ack.into_result().unwrap().unwrap();

    assert_eq!(value["extra"], json!([1, 2]));
}
