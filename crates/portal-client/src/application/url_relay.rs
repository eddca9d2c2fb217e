//! URL relay: outbound `sendUrl` and fan-out of inbound `receiveUrl` pushes.
//!
//! Listeners are kept in an append-only list and invoked in registration
//! order for every inbound URL.  The list is snapshotted before delivery, so
//! a listener registered from inside another listener only sees later URLs.
//!
//! A listener that panics is caught and logged; the remaining listeners still
//! receive the URL and the event dispatcher keeps running.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use portal_core::{CallRequest, InboundUrl, OutboundUrl, PortalId};
use tracing::{debug, warn};

use crate::application::correlation::Connection;
use crate::application::error::PortalError;
use crate::infrastructure::channel::TransportChannel;

/// A callback invoked with every inbound URL.
pub type UrlListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Ordered registry of URL listeners.
#[derive(Default)]
pub struct UrlListeners {
    listeners: Mutex<Vec<UrlListener>>,
}

impl UrlListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a listener.
    pub fn add(&self, listener: UrlListener) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invokes every listener once with `inbound.url`, in registration order.
    ///
    /// Returns how many listeners ran to completion.
    pub fn deliver(&self, inbound: &InboundUrl) -> usize {
        let snapshot: Vec<UrlListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match &inbound.source {
            Some(source) => debug!("delivering URL from {source} to {} listener(s)", snapshot.len()),
            None => debug!("delivering URL to {} listener(s)", snapshot.len()),
        }

        let mut completed = 0;
        for (index, listener) in snapshot.iter().enumerate() {
            let url = inbound.url.as_str();
            match panic::catch_unwind(AssertUnwindSafe(|| listener(url))) {
                Ok(()) => completed += 1,
                Err(_) => warn!("URL listener #{index} panicked; continuing with the rest"),
            }
        }
        completed
    }
}

/// Asks the service to push `url` to the paired portal `target`.
pub(crate) async fn send_url<C: TransportChannel>(
    connection: &Connection<C>,
    outbound: OutboundUrl,
) -> Result<(), PortalError> {
    connection
        .invoke_unit(CallRequest::send_url(&outbound.target, &outbound.url))
        .await
}

/// Builds the outbound envelope from the caller's arguments.
pub(crate) fn outbound(target: PortalId, url: &str) -> OutboundUrl {
    OutboundUrl {
        target,
        url: url.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
