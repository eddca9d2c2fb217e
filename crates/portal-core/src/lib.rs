//! # portal-core
//!
//! Shared library for the Website Portal connector containing the session
//! model, the remote operation vocabulary, and the Socket.IO packet codec.
//!
//! It has zero dependencies on sockets, async runtimes, or UI frameworks.
//!
//! # Architecture overview (for beginners)
//!
//! A *portal* is a device registered with the remote coordination service.
//! Portals pair with each other using short-lived pairing codes and then
//! relay URLs to one another over a persistent Socket.IO channel.
//!
//! This crate (`portal-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – The session state machine (`Disconnected → Connected →
//!   Authenticated`) and the opaque values the service hands out (pairing
//!   codes, registration bundles, paired-portal records).
//!
//! - **`protocol`** – How calls look on the wire.  `operations` names every
//!   remote call and builds its positional arguments; `packet` encodes and
//!   decodes the Engine.IO / Socket.IO text frames that carry them.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `portal_core::SessionState` instead of `portal_core::domain::session::SessionState`.
pub use domain::portal::{InboundUrl, OutboundUrl, PairedPortals, PairingCode, RegistrationData};
pub use domain::session::{PortalId, Secret, SessionPhase, SessionState};
pub use protocol::operations::{Acknowledgement, CallRequest, Operation, PushEvent, RemoteError};
pub use protocol::packet::{EnginePacket, ProtocolError, SocketPacket};
