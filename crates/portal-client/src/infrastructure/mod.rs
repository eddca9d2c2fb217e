//! Infrastructure layer for the client.
//!
//! Contains the adapters the application layer is written against:
//!
//! - **`channel`** – The [`Transport`](channel::Transport) and
//!   [`TransportChannel`](channel::TransportChannel) traits, the event type a
//!   channel reports through, and transport errors.
//!
//! - **`socketio`** – The production transport: Socket.IO v5 over an
//!   Engine.IO v4 WebSocket, driven by one Tokio task per channel.
//!
//! - **`loopback`** – An in-memory transport whose remote end is scripted by
//!   the caller.  Used by the unit and integration tests.
//!
//! - **`hasher`** – Turns a plaintext secret into the opaque login token.
//!
//! **Dependency rule**: this layer may depend on `portal_core`, but MUST NOT
//! be imported by `portal_core`.

pub mod channel;
pub mod hasher;
pub mod loopback;
pub mod socketio;
