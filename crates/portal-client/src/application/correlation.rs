//! Call correlation shared by every remote operation.
//!
//! # One call, one acknowledgment, one settlement (for beginners)
//!
//! Every operation on the client follows the same four steps:
//!
//! ```text
//! 1. precondition   session.connected?  ── no ──► Err(NotConnected), nothing sent
//! 2. send           channel.call(op, args)       → AckSlot (a oneshot receiver)
//! 3. await          slot.await                   → raw (error, result) args
//! 4. settle         error descriptor?     ── yes ─► Err(Remote { message })
//!                                         ── no ──► Ok(result)
//! ```
//!
//! Each call owns its own `oneshot` slot, so any number of calls can be in
//! flight at once and their acknowledgments may arrive in any order.
//!
//! There is no timeout or retry at this layer: a call the service never
//! acknowledges stays pending until the caller drops the future.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard, OnceLock, PoisonError,
};

use portal_core::{Acknowledgement, CallRequest, SessionState};
use serde_json::Value;

use crate::application::error::PortalError;
use crate::infrastructure::channel::{TransportChannel, TransportError};

/// State shared by the client facade, the event dispatcher, and in-flight calls.
pub(crate) struct Connection<C> {
    session: Mutex<SessionState>,
    channel: OnceLock<C>,
    started: AtomicBool,
}

impl<C: TransportChannel> Connection<C> {
    pub(crate) fn new() -> Self {
        Self {
            session: Mutex::new(SessionState::new()),
            channel: OnceLock::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Locks the session.  Callers must not hold the guard across an `.await`.
    pub(crate) fn session(&self) -> MutexGuard<'_, SessionState> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims the one-time right to open the channel.
    pub(crate) fn claim_start(&self) -> Result<(), PortalError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(PortalError::AlreadyStarted);
        }
        Ok(())
    }

    pub(crate) fn install_channel(&self, channel: C) -> Result<(), PortalError> {
        self.channel
            .set(channel)
            .map_err(|_| PortalError::AlreadyStarted)
    }

    /// Sends `request` and waits for its acknowledgment.
    ///
    /// Resolves with the acknowledgment's result value, which may be absent.
    ///
    /// # Errors
    ///
    /// - [`PortalError::NotConnected`] if the channel is not open, including
    ///   when it closed before the session noticed.  The call is not sent.
    /// - [`PortalError::Remote`] if the service acknowledged with an error
    ///   descriptor.
    /// - [`PortalError::Transport`] if the channel refused the call.
    pub(crate) async fn invoke(&self, request: CallRequest) -> Result<Option<Value>, PortalError> {
        let operation = request.operation;

        // The guard is dropped at the end of this statement, before any await.
        let connected = self.session().is_connected();
        if !connected {
            return Err(PortalError::NotConnected);
        }
        let channel = self.channel.get().ok_or(PortalError::NotConnected)?;

        // The channel may close before its `Disconnected` event is applied.
        let slot = match channel.call(operation.wire_name(), request.args).await {
            Ok(slot) => slot,
            Err(TransportError::NotOpen) => return Err(PortalError::NotConnected),
            Err(e) => return Err(e.into()),
        };
        let args = match slot.await {
            Ok(args) => args,
            // The channel dropped the slot without answering; nothing will
            // ever settle this call.
            Err(_) => std::future::pending().await,
        };

        Acknowledgement::from_args(args)
            .into_result()
            .map_err(|e| PortalError::Remote {
                operation,
                message: e.message,
            })
    }

    /// Like [`invoke`](Self::invoke), for operations that resolve with a
    /// value.  A success acknowledgment without one resolves with `Null`.
    pub(crate) async fn invoke_for_value(&self, request: CallRequest) -> Result<Value, PortalError> {
        Ok(self.invoke(request).await?.unwrap_or(Value::Null))
    }

    /// Like [`invoke`](Self::invoke), discarding any result value.
    pub(crate) async fn invoke_unit(&self, request: CallRequest) -> Result<(), PortalError> {
        self.invoke(request).await.map(|_| ())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
