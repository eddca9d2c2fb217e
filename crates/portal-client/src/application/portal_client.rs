//! The `PortalClient` facade.
//!
//! One `PortalClient` owns one channel for its whole life.  The typical use:
//!
//! ```no_run
//! # async fn demo() -> Result<(), portal_client::PortalError> {
//! use portal_client::{domain::ClientConfig, PortalClient};
//!
//! let client = PortalClient::socketio(ClientConfig::default())?;
//! client.on_url(|url| println!("received {url}"));
//! client.connect(None).await?;
//! client.login("portal-id", "portal-secret").await?;
//! let code = client.get_pairing_code().await?;
//! println!("pair with code {code}");
//! # Ok(())
//! # }
//! ```
//!
//! Every method takes `&self`, so the client can be shared behind an `Arc`
//! and many calls may be in flight at once.

use std::sync::Arc;

use portal_core::{PairedPortals, PairingCode, PortalId, RegistrationData, Secret, SessionPhase};

use crate::application::correlation::Connection;
use crate::application::error::PortalError;
use crate::application::lifecycle::{self, DisconnectHandler};
use crate::application::url_relay::{self, UrlListeners};
use crate::application::{auth, pairing};
use crate::domain::{ClientConfig, TokenHash};
use crate::infrastructure::channel::Transport;
use crate::infrastructure::hasher::{Argon2Hasher, BcryptHasher, CredentialHasher};
use crate::infrastructure::socketio::SocketIoTransport;

/// Connector to the portal coordination service.
pub struct PortalClient<T: Transport> {
    transport: T,
    hasher: Arc<dyn CredentialHasher>,
    config: ClientConfig,
    connection: Arc<Connection<T::Channel>>,
    listeners: Arc<UrlListeners>,
}

impl PortalClient<SocketIoTransport> {
    /// Creates a client using the Socket.IO transport and the hasher named by
    /// `[portal] token_hash` (bcrypt unless configured otherwise).
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Hash`] if the hasher cannot be constructed.
    pub fn socketio(config: ClientConfig) -> Result<Self, PortalError> {
        let hasher: Arc<dyn CredentialHasher> = match config.portal.token_hash {
            TokenHash::Bcrypt => Arc::new(BcryptHasher::new()),
            TokenHash::Argon2 => Arc::new(Argon2Hasher::new()?),
        };
        Ok(Self::new(SocketIoTransport::new(), hasher, config))
    }
}

impl<T: Transport> PortalClient<T> {
    /// Creates a disconnected client.  Nothing is sent until [`connect`](Self::connect).
    pub fn new(transport: T, hasher: Arc<dyn CredentialHasher>, config: ClientConfig) -> Self {
        Self {
            transport,
            hasher,
            config,
            connection: Arc::new(Connection::new()),
            listeners: Arc::new(UrlListeners::new()),
        }
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ── Connection lifecycle ──────────────────────────────────────────────────

    /// Opens the channel to `config.server.url` and waits until it is open.
    ///
    /// `on_disconnected` runs once for every loss of the channel.  The
    /// channel is never reopened; create a new client to connect again.
    ///
    /// # Errors
    ///
    /// [`PortalError::AlreadyStarted`] if called twice, and
    /// [`PortalError::ConnectionFailed`] if the channel fails before opening.
    pub async fn connect(&self, on_disconnected: Option<DisconnectHandler>) -> Result<(), PortalError> {
        lifecycle::connect(
            &self.transport,
            &self.config.server.url,
            &self.connection,
            &self.listeners,
            on_disconnected,
        )
        .await
    }

    /// `true` while the channel is open.
    pub fn connected(&self) -> bool {
        self.connection.session().is_connected()
    }

    /// `true` after a successful login, until the next failed login or disconnect.
    pub fn authenticated(&self) -> bool {
        self.connection.session().is_authenticated()
    }

    /// Where the session currently is in `Disconnected → Connected → Authenticated`.
    pub fn phase(&self) -> SessionPhase {
        self.connection.session().phase()
    }

    /// The portal id of the current login, if any.
    pub fn identity(&self) -> Option<PortalId> {
        self.connection.session().identity().cloned()
    }

    // ── Authentication ────────────────────────────────────────────────────────

    /// Registers a new portal and returns the service's registration bundle.
    pub async fn register(&self, platform: &str, name: &str) -> Result<RegistrationData, PortalError> {
        auth::register(&self.connection, platform, name).await
    }

    /// Logs in.  The secret is hashed before it leaves the process.
    pub async fn login(
        &self,
        identity: impl Into<PortalId>,
        secret: impl Into<Secret>,
    ) -> Result<(), PortalError> {
        auth::login(
            &self.connection,
            Arc::clone(&self.hasher),
            identity.into(),
            secret.into(),
        )
        .await
    }

    // ── Pairing ───────────────────────────────────────────────────────────────

    pub async fn get_pairing_code(&self) -> Result<PairingCode, PortalError> {
        pairing::get_pairing_code(&self.connection).await
    }

    pub async fn reset_pairing_code(&self) -> Result<PairingCode, PortalError> {
        pairing::reset_pairing_code(&self.connection).await
    }

    pub async fn remove_pairing_code(&self) -> Result<(), PortalError> {
        pairing::remove_pairing_code(&self.connection).await
    }

    pub async fn get_paired_portals_data(&self) -> Result<PairedPortals, PortalError> {
        pairing::get_paired_portals_data(&self.connection).await
    }

    pub async fn rename(&self, new_name: &str) -> Result<(), PortalError> {
        pairing::rename(&self.connection, new_name).await
    }

    pub async fn pair(&self, code: &PairingCode) -> Result<(), PortalError> {
        pairing::pair(&self.connection, code).await
    }

    // ── URL relay ─────────────────────────────────────────────────────────────

    /// Sends `url` to the paired portal `target`.
    pub async fn send_url(&self, target: &PortalId, url: &str) -> Result<(), PortalError> {
        url_relay::send_url(&self.connection, url_relay::outbound(target.clone(), url)).await
    }

    /// Registers a listener for URLs pushed by peers.
    ///
    /// Listeners run in registration order on the event dispatcher task and
    /// should return quickly.
    pub fn on_url<F>(&self, listener: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.listeners.add(Arc::new(listener));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::hasher::MockCredentialHasher;
    use crate::infrastructure::loopback::LoopbackTransport;

    #[test]
    fn test_new_client_is_disconnected() {
        // Arrange
        let (transport, _remote) = LoopbackTransport::new();

        // Act
        let client = PortalClient::new(
            transport,
            Arc::new(MockCredentialHasher::new()),
            ClientConfig::default(),
        );

        // Assert
        assert!(!client.connected());
        assert!(!client.authenticated());
        assert_eq!(client.phase(), SessionPhase::Disconnected);
        assert!(client.identity().is_none());
    }

    #[tokio::test]
    async fn test_connect_uses_configured_server_url() {
        let (transport, remote) = LoopbackTransport::new();
        let mut config = ClientConfig::default();
        config.server.url = "http://localhost:3000".to_string();
        let client = PortalClient::new(transport, Arc::new(MockCredentialHasher::new()), config);
        remote.signal_connected();

        client.connect(None).await.unwrap();

        let (address, _) = remote.opened_with().unwrap();
        assert_eq!(address, "http://localhost:3000");
        assert_eq!(client.phase(), SessionPhase::Connected);
    }

    #[test]
    fn test_socketio_constructor_builds_client() {
        let client = PortalClient::socketio(ClientConfig::default()).unwrap();
        assert_eq!(client.config().server.url, "https://website-portal.herokuapp.com");
    }

    #[test]
    fn test_socketio_constructor_accepts_argon2_token_hash() {
        let mut config = ClientConfig::default();
        config.portal.token_hash = TokenHash::Argon2;

        let client = PortalClient::socketio(config).unwrap();

        assert_eq!(client.config().portal.token_hash, TokenHash::Argon2);
    }
}
