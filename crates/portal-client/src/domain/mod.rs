//! Domain layer for the client: configuration.
//!
//! The session model and the remote operation vocabulary live in
//! `portal_core`; this layer only adds what is specific to running the
//! connector as a program.

pub mod config;

pub use config::{ClientConfig, ConfigError, TokenHash, DEFAULT_SERVER_URL};
