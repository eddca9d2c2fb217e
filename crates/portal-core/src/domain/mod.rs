//! Domain layer: pure session and portal types with no I/O.
//!
//! - **`session`** – [`SessionState`](session::SessionState), the single
//!   owned record of who this portal is logged in as and whether the channel
//!   is open.  Its transition methods are the only way to change it.
//! - **`portal`** – Opaque values issued by the coordination service and the
//!   URL envelopes relayed between portals.

pub mod portal;
pub mod session;
