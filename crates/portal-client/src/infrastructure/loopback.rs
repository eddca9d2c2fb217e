//! In-memory transport with a scripted remote end.
//!
//! [`LoopbackTransport::new`] returns the transport together with a
//! [`RemoteEnd`].  The transport side is handed to a `PortalClient`; the remote
//! end plays the coordination service:
//!
//! ```text
//! PortalClient ── call ──► LoopbackChannel ──► RemoteEnd::next_call()
//!              ◄── ack ───────────────────────  RemoteCall::succeed()/fail()
//!              ◄── events ────────────────────  RemoteEnd::signal_*()/push_url()
//! ```
//!
//! Events signalled before the client opens the channel are buffered, so a
//! test can queue `signal_connected()` and then `await` `connect()` without
//! racing the dispatcher.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};

use async_trait::async_trait;
use portal_core::{Acknowledgement, PushEvent};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::infrastructure::channel::{
    AckSlot, ChannelEvent, OpenOptions, OpenedChannel, Transport, TransportChannel,
    TransportError,
};

struct Shared {
    events_tx: mpsc::UnboundedSender<ChannelEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<ChannelEvent>>>,
    calls_tx: mpsc::UnboundedSender<RemoteCall>,
    open: AtomicBool,
    severed: AtomicBool,
    opened_with: Mutex<Option<(String, OpenOptions)>>,
}

/// The client-facing half of the loopback pair.
pub struct LoopbackTransport {
    shared: Arc<Shared>,
}

/// The scripted service-facing half of the loopback pair.
pub struct RemoteEnd {
    shared: Arc<Shared>,
    calls_rx: mpsc::UnboundedReceiver<RemoteCall>,
}

/// One call as seen by the remote end.  Dropping it without answering leaves
/// the caller's acknowledgment slot unanswered.
#[derive(Debug)]
pub struct RemoteCall {
    pub operation: String,
    pub args: Vec<Value>,
    ack: oneshot::Sender<Vec<Value>>,
}

impl RemoteCall {
    /// Answers the call with `ack`.
    pub fn acknowledge(self, ack: Acknowledgement) {
        if self.ack.send(ack.into_args()).is_err() {
            debug!("loopback: caller dropped the slot for {}", self.operation);
        }
    }

    /// Answers with a success value.
    pub fn succeed(self, result: Option<Value>) {
        self.acknowledge(Acknowledgement::success(result));
    }

    /// Answers with a `{"error": message}` descriptor.
    pub fn fail(self, message: &str) {
        self.acknowledge(Acknowledgement::failure(message));
    }
}

/// The channel handed to the client by [`LoopbackTransport::open`].
pub struct LoopbackChannel {
    shared: Arc<Shared>,
}

impl LoopbackTransport {
    /// Creates a connected transport/remote pair.
    pub fn new() -> (Self, RemoteEnd) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (calls_tx, calls_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            calls_tx,
            open: AtomicBool::new(false),
            severed: AtomicBool::new(false),
            opened_with: Mutex::new(None),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            RemoteEnd { shared, calls_rx },
        )
    }
}

impl Transport for LoopbackTransport {
    type Channel = LoopbackChannel;

    fn open(
        &self,
        address: &str,
        options: OpenOptions,
    ) -> Result<OpenedChannel<LoopbackChannel>, TransportError> {
        let events = self
            .shared
            .events_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(TransportError::AlreadyOpen)?;
        *self
            .shared
            .opened_with
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some((address.to_string(), options));
        Ok(OpenedChannel {
            channel: LoopbackChannel {
                shared: Arc::clone(&self.shared),
            },
            events,
        })
    }
}

#[async_trait]
impl TransportChannel for LoopbackChannel {
    fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }

    async fn call(&self, operation: &str, args: Vec<Value>) -> Result<AckSlot, TransportError> {
        if self.shared.severed.load(Ordering::SeqCst) {
            return Err(TransportError::NotOpen);
        }
        let (ack, slot) = oneshot::channel();
        self.shared
            .calls_tx
            .send(RemoteCall {
                operation: operation.to_string(),
                args,
                ack,
            })
            .map_err(|_| TransportError::Closed)?;
        Ok(slot)
    }
}

impl RemoteEnd {
    /// Reports a successful open.
    pub fn signal_connected(&self) {
        self.shared.open.store(true, Ordering::SeqCst);
        self.emit(ChannelEvent::Connected);
    }

    /// Reports loss of the channel.
    pub fn signal_disconnected(&self, reason: &str) {
        self.shared.open.store(false, Ordering::SeqCst);
        self.emit(ChannelEvent::Disconnected {
            reason: reason.to_string(),
        });
    }

    /// Closes the channel without emitting `Disconnected` yet, so calls are
    /// refused while the session still reads as connected.
    pub fn sever(&self) {
        self.shared.open.store(false, Ordering::SeqCst);
        self.shared.severed.store(true, Ordering::SeqCst);
    }

    /// Reports a failed open attempt.
    pub fn signal_connect_error(&self, message: &str) {
        self.emit(ChannelEvent::ConnectError {
            message: message.to_string(),
        });
    }

    /// Pushes a `receiveUrl` event.
    pub fn push_url(&self, url: &str) {
        self.push(
            PushEvent::ReceiveUrl.wire_name(),
            vec![Value::String(url.to_string())],
        );
    }

    /// Pushes an arbitrary named event.
    pub fn push(&self, event: &str, args: Vec<Value>) {
        self.emit(ChannelEvent::Push {
            event: event.to_string(),
            args,
        });
    }

    /// Waits for the next call sent by the client.
    pub async fn next_call(&mut self) -> Option<RemoteCall> {
        self.calls_rx.recv().await
    }

    /// Returns a call if one is already queued.
    pub fn try_next_call(&mut self) -> Option<RemoteCall> {
        self.calls_rx.try_recv().ok()
    }

    /// The address and options the client opened the channel with, if it has.
    pub fn opened_with(&self) -> Option<(String, OpenOptions)> {
        self.shared
            .opened_with
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn emit(&self, event: ChannelEvent) {
        if self.shared.events_tx.send(event).is_err() {
            debug!("loopback: client dropped the event receiver");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_open_twice_is_rejected() {
        // Arrange
        let (transport, _remote) = LoopbackTransport::new();
        transport.open("loopback", OpenOptions::default()).unwrap();

        // Act
        let second = transport.open("loopback", OpenOptions::default());

        // Assert
        assert!(matches!(second, Err(TransportError::AlreadyOpen)));
    }

    #[test]
    fn test_events_signalled_before_open_are_buffered() {
        let (transport, remote) = LoopbackTransport::new();
        remote.signal_connected();

        let mut opened = transport.open("loopback", OpenOptions::default()).unwrap();

        assert_eq!(opened.events.try_recv().unwrap(), ChannelEvent::Connected);
        assert!(opened.channel.is_open());
    }

    #[tokio::test]
    async fn test_call_reaches_remote_and_ack_returns() {
        // Arrange
        let (transport, mut remote) = LoopbackTransport::new();
        let opened = transport.open("loopback", OpenOptions::default()).unwrap();

        // Act
        let slot = opened.channel.call("getPairingCode", Vec::new()).await.unwrap();
        let call = remote.next_call().await.unwrap();
        assert_eq!(call.operation, "getPairingCode");
        call.succeed(Some(json!("abc")));

        // Assert
        assert_eq!(slot.await.unwrap(), vec![Value::Null, json!("abc")]);
    }

    #[test]
    fn test_opened_with_records_address_and_options() {
        let (transport, remote) = LoopbackTransport::new();
        assert!(remote.opened_with().is_none());

        transport.open("https://svc", OpenOptions::default()).unwrap();

        assert_eq!(
            remote.opened_with(),
            Some(("https://svc".to_string(), OpenOptions::default()))
        );
    }
}
