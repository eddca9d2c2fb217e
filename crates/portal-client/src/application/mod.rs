//! Application layer for the client.
//!
//! # What lives here? (for beginners)
//!
//! The application layer turns transport capabilities into the operations a
//! portal needs.  It depends only on the `Transport` / `TransportChannel` and
//! `CredentialHasher` traits, so every use case runs against the in-memory
//! loopback transport in tests.
//!
//! # Sub-modules
//!
//! - **`correlation`** – The shared call path: not-connected check, one call,
//!   one acknowledgment, one settlement.
//! - **`lifecycle`** – Opens the channel once and dispatches channel events in
//!   order (open, open failure, disconnect, pushes).
//! - **`auth`** – `register` and `login`; the only operations that touch the
//!   session's credential fields.
//! - **`pairing`** – Pairing codes, paired-portal data, rename and pair.
//! - **`url_relay`** – `sendUrl` and the ordered listener registry for inbound
//!   URLs.
//! - **`portal_client`** – The public facade tying the above together.
//! - **`error`** – [`PortalError`].

mod auth;
mod correlation;
pub mod error;
pub mod lifecycle;
mod pairing;
pub mod portal_client;
pub mod url_relay;

pub use error::PortalError;
pub use lifecycle::DisconnectHandler;
pub use portal_client::PortalClient;
pub use url_relay::{UrlListener, UrlListeners};
