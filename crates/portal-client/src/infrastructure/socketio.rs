//! Socket.IO v5 transport over an Engine.IO v4 WebSocket.
//!
//! # Lifecycle of one channel
//!
//! ```text
//! open()  ──► spawn run_channel task ──► connect_async(wss://host/socket.io/?EIO=4&transport=websocket)
//!                                         │
//!             server: 0{"sid":..,"pingInterval":..,"pingTimeout":..}
//!             client: 40
//!             server: 40{"sid":..}                  → ChannelEvent::Connected
//!                                         │
//!             server: 2      client: 3              (heartbeat)
//!             client: 42<id>["op",..]                (TransportChannel::call)
//!             server: 43<id>[err, result]           → ack slot <id>
//!             server: 42["receiveUrl","http://x"]   → ChannelEvent::Push
//!                                         │
//!             socket closed / 41 / silence          → ChannelEvent::Disconnected
//! ```
//!
//! # Acknowledgment routing
//!
//! Every call draws a fresh id from a [`SequenceCounter`] and parks a
//! `oneshot::Sender` under that id.  When `43<id>` arrives the sender is
//! removed and fired, so acknowledgments may arrive in any order.  Slots of
//! calls that are never acknowledged stay parked for the lifetime of the
//! channel; their receivers simply never complete.
//!
//! # Reconnection
//!
//! When [`OpenOptions::reconnection`] is `true` the task waits
//! `reconnect_delay` after a loss and dials again, emitting a fresh
//! `Connected` on success.  The connector itself always opens with
//! reconnection disabled.

use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use portal_core::protocol::packet::{
    decode_engine_packet, encode_engine_packet, EnginePacket, Handshake, SocketPacket,
    SocketPacketKind,
};
use portal_core::protocol::SequenceCounter;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::{
    connect_async,
    tungstenite::Message as WsMessage,
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

use crate::infrastructure::channel::{
    AckSlot, ChannelEvent, OpenOptions, OpenedChannel, Transport, TransportChannel,
    TransportError,
};

/// How long to wait for the Engine.IO open packet after the WebSocket upgrade.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(20);

/// Capacity of the outbound frame queue between callers and the I/O task.
const OUTBOUND_QUEUE: usize = 128;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens Socket.IO channels over WebSocket.
#[derive(Debug, Default, Clone)]
pub struct SocketIoTransport;

impl SocketIoTransport {
    pub fn new() -> Self {
        Self
    }
}

/// State shared between a [`SocketIoChannel`] handle and its I/O task.
#[derive(Default)]
struct ChannelShared {
    open: AtomicBool,
    ack_ids: SequenceCounter,
    pending: Mutex<HashMap<u64, oneshot::Sender<Vec<Value>>>>,
}

impl ChannelShared {
    fn park(&self, id: u64, slot: oneshot::Sender<Vec<Value>>) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, slot);
    }

    fn unpark(&self, id: u64) -> Option<oneshot::Sender<Vec<Value>>> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }
}

/// Handle to one Socket.IO channel.  Dropping it shuts the I/O task down.
pub struct SocketIoChannel {
    shared: Arc<ChannelShared>,
    outbound: mpsc::Sender<String>,
}

impl Transport for SocketIoTransport {
    type Channel = SocketIoChannel;

    fn open(
        &self,
        address: &str,
        options: OpenOptions,
    ) -> Result<OpenedChannel<SocketIoChannel>, TransportError> {
        let url = endpoint_url(address)?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
        let shared = Arc::new(ChannelShared::default());

        info!("opening Socket.IO channel to {url}");
        tokio::spawn(run_channel(
            url,
            options,
            Arc::clone(&shared),
            outbound_rx,
            events_tx,
        ));

        Ok(OpenedChannel {
            channel: SocketIoChannel {
                shared,
                outbound: outbound_tx,
            },
            events: events_rx,
        })
    }
}

#[async_trait]
impl TransportChannel for SocketIoChannel {
    fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }

    async fn call(&self, operation: &str, args: Vec<Value>) -> Result<AckSlot, TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }

        let id = self.shared.ack_ids.next();
        let frame = encode_engine_packet(&EnginePacket::Message(SocketPacket::new(
            SocketPacketKind::Event {
                id: Some(id),
                name: operation.to_string(),
                args,
            },
        )))?;

        let (tx, slot) = oneshot::channel();
        self.shared.park(id, tx);
        debug!("call #{id} {operation}");

        if self.outbound.send(frame).await.is_err() {
            self.shared.unpark(id);
            return Err(TransportError::Closed);
        }
        Ok(slot)
    }
}

// ── Address handling ──────────────────────────────────────────────────────────

/// Turns a service address into the Engine.IO WebSocket endpoint.
///
/// `http://` and `https://` are rewritten to `ws://` and `wss://`; the
/// Socket.IO path and query are appended.
///
/// # Errors
///
/// Returns [`TransportError::InvalidAddress`] for unsupported schemes, a
/// missing host, or an address that already carries a query string.
pub fn endpoint_url(address: &str) -> Result<String, TransportError> {
    let invalid = |reason: &str| TransportError::InvalidAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    let (scheme, rest) = address
        .split_once("://")
        .ok_or_else(|| invalid("missing scheme"))?;
    let ws_scheme = match scheme.to_ascii_lowercase().as_str() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(invalid("scheme must be http, https, ws or wss")),
    };
    if rest.contains('?') {
        return Err(invalid("query strings are not supported"));
    }
    let rest = rest.trim_end_matches('/');
    if rest.is_empty() {
        return Err(invalid("missing host"));
    }

    let path = if rest.ends_with("/socket.io") { "/" } else { "/socket.io/" };
    Ok(format!("{ws_scheme}://{rest}{path}?EIO=4&transport=websocket"))
}

// ── I/O task ──────────────────────────────────────────────────────────────────

/// Why one WebSocket session ended.
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    /// The connection was lost or refused; the string is a human-readable reason.
    Lost(String),
    /// Every channel handle was dropped; stop for good.
    HandleDropped,
}

/// What the session loop should do after handling one inbound packet.
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Continue,
    Reply(String),
    End(String),
}

async fn run_channel(
    url: String,
    options: OpenOptions,
    shared: Arc<ChannelShared>,
    mut outbound: mpsc::Receiver<String>,
    events: mpsc::UnboundedSender<ChannelEvent>,
) {
    loop {
        let end = match connect_async(url.as_str()).await {
            Ok((ws, _response)) => {
                debug!("WebSocket upgrade to {url} complete");
                drive_session(ws, &shared, &mut outbound, &events).await
            }
            Err(e) => SessionEnd::Lost(format!("websocket error: {e}")),
        };

        let was_open = shared.open.swap(false, Ordering::SeqCst);
        match &end {
            SessionEnd::Lost(reason) if was_open => {
                info!("channel to {url} lost: {reason}");
                let _ = events.send(ChannelEvent::Disconnected {
                    reason: reason.clone(),
                });
            }
            SessionEnd::Lost(reason) => {
                warn!("could not open channel to {url}: {reason}");
                let _ = events.send(ChannelEvent::ConnectError {
                    message: reason.clone(),
                });
            }
            SessionEnd::HandleDropped => {
                debug!("channel handle dropped; closing {url}");
                if was_open {
                    let _ = events.send(ChannelEvent::Disconnected {
                        reason: "io client disconnect".to_string(),
                    });
                }
                return;
            }
        }

        if !options.reconnection || events.is_closed() {
            return;
        }
        info!("reconnecting to {url} in {:?}", options.reconnect_delay);
        sleep(options.reconnect_delay).await;
    }
}

async fn drive_session(
    ws: WsStream,
    shared: &ChannelShared,
    outbound: &mut mpsc::Receiver<String>,
    events: &mpsc::UnboundedSender<ChannelEvent>,
) -> SessionEnd {
    let (mut sink, mut stream) = ws.split();

    // ── Step 1: Engine.IO handshake ───────────────────────────────────────────
    let handshake = match timeout(HANDSHAKE_TIMEOUT, next_text(&mut stream)).await {
        Err(_) => return SessionEnd::Lost("handshake timeout".to_string()),
        Ok(Err(reason)) => return SessionEnd::Lost(reason),
        Ok(Ok(text)) => match decode_engine_packet(&text) {
            Ok(EnginePacket::Open(handshake)) => handshake,
            Ok(other) => {
                return SessionEnd::Lost(format!("expected open packet, got {other:?}"))
            }
            Err(e) => return SessionEnd::Lost(format!("bad open packet: {e}")),
        },
    };
    debug!("engine.io session {} established", handshake.sid);

    // ── Step 2: join the default namespace ────────────────────────────────────
    let connect = EnginePacket::Message(SocketPacket::new(SocketPacketKind::Connect(None)));
    let frame = match encode_engine_packet(&connect) {
        Ok(frame) => frame,
        Err(e) => return SessionEnd::Lost(e.to_string()),
    };
    if let Err(e) = sink.send(WsMessage::Text(frame)).await {
        return SessionEnd::Lost(format!("transport error: {e}"));
    }

    // ── Step 3: pump frames both ways ─────────────────────────────────────────
    let liveness = liveness_window(&handshake);
    pump_frames(&mut sink, &mut stream, liveness, shared, outbound, events).await
}

/// Relays frames until the session ends.
///
/// The liveness deadline only moves when the server sends something;
/// outbound traffic says nothing about whether the server is still there.
async fn pump_frames<Si, St>(
    sink: &mut Si,
    stream: &mut St,
    liveness: Duration,
    shared: &ChannelShared,
    outbound: &mut mpsc::Receiver<String>,
    events: &mpsc::UnboundedSender<ChannelEvent>,
) -> SessionEnd
where
    Si: Sink<WsMessage> + Unpin,
    Si::Error: std::fmt::Display,
    St: Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let deadline = sleep(liveness);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            () = &mut deadline => return SessionEnd::Lost("ping timeout".to_string()),
            inbound = next_text(stream) => {
                let text = match inbound {
                    Err(reason) => return SessionEnd::Lost(reason),
                    Ok(text) => text,
                };
                deadline.as_mut().reset(Instant::now() + liveness);
                let packet = match decode_engine_packet(&text) {
                    Ok(packet) => packet,
                    Err(e) => {
                        warn!("dropping undecodable frame: {e}");
                        continue;
                    }
                };
                match handle_packet(packet, shared, events) {
                    Step::Continue => {}
                    Step::Reply(frame) => {
                        if let Err(e) = sink.send(WsMessage::Text(frame)).await {
                            return SessionEnd::Lost(format!("transport error: {e}"));
                        }
                    }
                    Step::End(reason) => return SessionEnd::Lost(reason),
                }
            }
            queued = outbound.recv() => match queued {
                Some(frame) => {
                    if let Err(e) = sink.send(WsMessage::Text(frame)).await {
                        return SessionEnd::Lost(format!("transport error: {e}"));
                    }
                }
                None => {
                    let _ = sink.send(WsMessage::Text("41".to_string())).await;
                    let _ = sink.close().await;
                    return SessionEnd::HandleDropped;
                }
            }
        }
    }
}

/// Reads frames until a text frame arrives.  Control frames are answered by
/// tungstenite itself.
async fn next_text<S>(stream: &mut S) -> Result<String, String>
where
    S: Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        match stream.next().await {
            None => return Err("transport close".to_string()),
            Some(Err(e)) => return Err(format!("transport error: {e}")),
            Some(Ok(WsMessage::Text(text))) => return Ok(text),
            Some(Ok(WsMessage::Close(_))) => return Err("transport close".to_string()),
            Some(Ok(_)) => continue,
        }
    }
}

/// The server pings every `pingInterval` and gives up after `pingTimeout`
/// more; silence for longer than both means the connection is gone.
fn liveness_window(handshake: &Handshake) -> Duration {
    Duration::from_millis(handshake.ping_interval.saturating_add(handshake.ping_timeout))
}

fn handle_packet(
    packet: EnginePacket,
    shared: &ChannelShared,
    events: &mpsc::UnboundedSender<ChannelEvent>,
) -> Step {
    match packet {
        EnginePacket::Ping(data) => match encode_engine_packet(&EnginePacket::Pong(data)) {
            Ok(frame) => Step::Reply(frame),
            Err(e) => Step::End(e.to_string()),
        },
        EnginePacket::Close => Step::End("transport close".to_string()),
        EnginePacket::Message(socket) if !socket.is_default_namespace() => {
            debug!("ignoring packet for namespace {}", socket.namespace);
            Step::Continue
        }
        EnginePacket::Message(socket) => match socket.kind {
            SocketPacketKind::Connect(_) => {
                shared.open.store(true, Ordering::SeqCst);
                info!("Socket.IO namespace connected");
                let _ = events.send(ChannelEvent::Connected);
                Step::Continue
            }
            SocketPacketKind::ConnectError(data) => {
                let message = data
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| data.to_string());
                Step::End(message)
            }
            SocketPacketKind::Disconnect => Step::End("io server disconnect".to_string()),
            SocketPacketKind::Event { id, name, args } => {
                if let Some(id) = id {
                    debug!("server event {name} asked for ack #{id}; server acks are not sent");
                }
                let _ = events.send(ChannelEvent::Push { event: name, args });
                Step::Continue
            }
            SocketPacketKind::Ack { id, args } => {
                match shared.unpark(id) {
                    Some(slot) => {
                        if slot.send(args).is_err() {
                            debug!("ack #{id} arrived after its caller went away");
                        }
                    }
                    None => warn!("ack #{id} does not match any pending call"),
                }
                Step::Continue
            }
        },
        EnginePacket::Open(_) | EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {
            Step::Continue
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
