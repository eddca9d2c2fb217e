//! portal-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does portal-client do? (for beginners)
//!
//! A *portal* is a device that can hand URLs to other devices.  The client:
//!
//! 1. Opens one Socket.IO channel to the coordination service.
//! 2. Registers a new portal identity, or logs in with an existing one.  The
//!    secret is hashed locally so the plaintext never leaves the machine.
//! 3. Mints pairing codes for peers to consume, or consumes a peer's code.
//! 4. Sends URLs to paired peers and delivers URLs pushed by peers to every
//!    registered listener.
//!
//! Every remote operation follows the same shape: check that the channel is
//! connected, send exactly one call, await exactly one acknowledgment, and
//! settle the returned future once.
//!
//! # Layers
//!
//! ```text
//! application/     PortalClient facade + lifecycle, auth, pairing, url relay
//! domain/          ClientConfig (TOML + defaults)
//! infrastructure/  Transport traits, Socket.IO transport, loopback transport,
//!                  credential hasher
//! ```

/// Domain layer: configuration types.
pub mod domain;

/// Application layer: session-enforcing operations.
pub mod application;

/// Infrastructure layer: transports and the credential hasher.
pub mod infrastructure;

pub use application::{PortalClient, PortalError};
