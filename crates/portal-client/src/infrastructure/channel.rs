//! Transport abstraction consumed by the application layer.
//!
//! A transport opens a *channel*: an event-addressable duplex pipe to the
//! coordination service.  The application layer never sees sockets; it only
//! sees two capabilities:
//!
//! - **Calls** – [`TransportChannel::call`] sends a named call and hands back
//!   an [`AckSlot`] that receives the single acknowledgment for that call.
//! - **Events** – everything unsolicited (open, open failure, loss, and push
//!   events such as `receiveUrl`) arrives in order on the
//!   [`ChannelEvent`] receiver returned by [`Transport::open`].
//!
//! # Acknowledgment slots
//!
//! An [`AckSlot`] is a `tokio::sync::oneshot` receiver, so it can be settled at
//! most once.  The channel is responsible for routing each acknowledgment to
//! the right slot regardless of the order acknowledgments arrive in.

use std::time::Duration;

use async_trait::async_trait;
use portal_core::ProtocolError;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Receives the raw `(error, result)` acknowledgment arguments of one call.
pub type AckSlot = oneshot::Receiver<Vec<Value>>;

/// Options passed to [`Transport::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    /// Whether the transport may reopen the channel on its own after a loss.
    ///
    /// The connector always opens with `false` so a disconnect is permanent
    /// and observable; retry policy belongs to whoever owns the connector.
    pub reconnection: bool,
    /// Delay between reconnect attempts when `reconnection` is `true`.
    pub reconnect_delay: Duration,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            reconnection: false,
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

/// Everything a channel reports that is not an acknowledgment.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// The channel opened successfully.
    Connected,
    /// The channel was lost or closed.
    Disconnected { reason: String },
    /// An attempt to open the channel failed.
    ConnectError { message: String },
    /// The service pushed a named event.
    Push { event: String, args: Vec<Value> },
}

/// Errors raised by a transport or channel.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The service address could not be turned into a channel URL.
    #[error("invalid service address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The transport only supports one open channel.
    #[error("channel already opened")]
    AlreadyOpen,

    /// The channel is not currently open.
    #[error("channel is not open")]
    NotOpen,

    /// The channel's I/O task has shut down.
    #[error("channel closed")]
    Closed,

    /// A frame could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// A freshly opened channel and the stream of its events.
pub struct OpenedChannel<C> {
    pub channel: C,
    pub events: mpsc::UnboundedReceiver<ChannelEvent>,
}

/// Opens channels to a service address.
pub trait Transport: Send + Sync {
    type Channel: TransportChannel + 'static;

    /// Starts opening a channel and returns immediately.
    ///
    /// The outcome of the open attempt is reported later as
    /// [`ChannelEvent::Connected`] or [`ChannelEvent::ConnectError`].
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] only for failures detected before any I/O,
    /// such as a malformed address.
    fn open(
        &self,
        address: &str,
        options: OpenOptions,
    ) -> Result<OpenedChannel<Self::Channel>, TransportError>;
}

/// An open (or opening) duplex channel.
#[async_trait]
pub trait TransportChannel: Send + Sync {
    /// `true` while the channel is open.
    fn is_open(&self) -> bool;

    /// Sends one call and returns the slot its acknowledgment will arrive in.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the call could not be handed to the
    /// channel at all.  Once `Ok` is returned, the call has been queued.
    async fn call(&self, operation: &str, args: Vec<Value>) -> Result<AckSlot, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_options_default_disables_reconnection() {
        let options = OpenOptions::default();

        assert!(!options.reconnection);
        assert_eq!(options.reconnect_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_transport_error_from_protocol_error() {
        let err: TransportError = ProtocolError::Empty.into();
        assert_eq!(err.to_string(), "protocol error: empty packet");
    }
}
