//! Connection lifecycle: opening the channel once and dispatching its events.
//!
//! # Event flow
//!
//! ```text
//! Transport::open ──► OpenedChannel { channel, events }
//!                         │              │
//!                         │              └──► dispatch_events task (one per client)
//!                         ▼                      Connected     → session.mark_connected()
//!                 Connection::install_channel                  → resolve connect()
//!                                                ConnectError  → reject connect() if not yet open
//!                                                Disconnected  → session.mark_disconnected()
//!                                                              → on_disconnected()
//!                                                Push receiveUrl → UrlListeners::deliver
//! ```
//!
//! Events are handled strictly in arrival order by a single task, so a
//! disconnect is always applied before any later push.  The channel is
//! opened with reconnection disabled: after a disconnect the client stays
//! disconnected and every call fails fast with "Not connected".

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use portal_core::{InboundUrl, PushEvent};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::application::correlation::Connection;
use crate::application::error::PortalError;
use crate::application::url_relay::UrlListeners;
use crate::infrastructure::channel::{ChannelEvent, OpenOptions, Transport, TransportChannel};

/// Callback invoked with no arguments whenever the channel is lost.
pub type DisconnectHandler = Box<dyn Fn() + Send + Sync>;

/// Opens the channel and waits until it reports open or fails.
///
/// # Errors
///
/// - [`PortalError::AlreadyStarted`] on a second call for the same client.
/// - [`PortalError::Transport`] if the transport rejects the address.
/// - [`PortalError::ConnectionFailed`] if the channel reports an error (or
///   closes) before it opens.
pub(crate) async fn connect<T: Transport>(
    transport: &T,
    address: &str,
    connection: &Arc<Connection<T::Channel>>,
    listeners: &Arc<UrlListeners>,
    on_disconnected: Option<DisconnectHandler>,
) -> Result<(), PortalError> {
    connection.claim_start()?;

    let options = OpenOptions {
        reconnection: false,
        ..OpenOptions::default()
    };
    let opened = transport.open(address, options)?;
    connection.install_channel(opened.channel)?;

    let (opened_tx, opened_rx) = oneshot::channel();
    tokio::spawn(dispatch_events(
        opened.events,
        Arc::clone(connection),
        Arc::clone(listeners),
        on_disconnected,
        opened_tx,
    ));

    match opened_rx.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(message)) => Err(PortalError::ConnectionFailed(message)),
        Err(_) => Err(PortalError::ConnectionFailed(
            "event dispatcher stopped before the channel opened".to_string(),
        )),
    }
}

async fn dispatch_events<C: TransportChannel>(
    mut events: mpsc::UnboundedReceiver<ChannelEvent>,
    connection: Arc<Connection<C>>,
    listeners: Arc<UrlListeners>,
    on_disconnected: Option<DisconnectHandler>,
    opened: oneshot::Sender<Result<(), String>>,
) {
    let mut opened = Some(opened);

    while let Some(event) = events.recv().await {
        match event {
            ChannelEvent::Connected => {
                connection.session().mark_connected();
                info!("connected to portal service");
                if let Some(tx) = opened.take() {
                    let _ = tx.send(Ok(()));
                }
            }
            ChannelEvent::ConnectError { message } => {
                warn!("connection error: {message}");
                if let Some(tx) = opened.take() {
                    let _ = tx.send(Err(message));
                }
            }
            ChannelEvent::Disconnected { reason } => {
                connection.session().mark_disconnected();
                info!("disconnected from portal service: {reason}");
                if let Some(handler) = &on_disconnected {
                    if panic::catch_unwind(AssertUnwindSafe(|| handler())).is_err() {
                        warn!("disconnect handler panicked");
                    }
                }
            }
            ChannelEvent::Push { event, args } => match PushEvent::from_wire_name(&event) {
                Some(PushEvent::ReceiveUrl) => match InboundUrl::from_args(&args) {
                    Some(inbound) => {
                        listeners.deliver(&inbound);
                    }
                    None => warn!("ignoring receiveUrl push without a URL: {args:?}"),
                },
                None => debug!("ignoring unknown push event {event}"),
            },
        }
    }

    if let Some(tx) = opened.take() {
        let _ = tx.send(Err("channel closed before opening".to_string()));
    }
    debug!("event stream ended");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
