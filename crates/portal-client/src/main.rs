//! Website Portal connector: command-line entry point.
//!
//! Each invocation opens one channel to the coordination service, performs a
//! single command, and exits.  `listen` is the exception: it stays connected
//! and prints every URL a paired portal sends until Ctrl+C or disconnect.
//!
//! # Usage
//!
//! ```text
//! portal-client [OPTIONS] <COMMAND>
//!
//! Commands:
//!   register  Register a new portal and print its credentials
//!   code      Show, reset (--reset) or remove (--remove) the pairing code
//!   pair      Pair with the portal that issued <CODE>
//!   peers     Print the paired portals
//!   rename    Change this portal's display name
//!   send      Send <URL> to the paired portal <TARGET>
//!   listen    Print URLs pushed by paired portals
//!
//! Options:
//!   --config <PATH>    TOML configuration file
//!   --server <URL>     Coordination service address
//!   --id <ID>          Portal id used to log in
//!   --secret <SECRET>  Portal secret used to log in
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable        | Flag        |
//! |-----------------|-------------|
//! | `PORTAL_CONFIG` | `--config`  |
//! | `PORTAL_SERVER` | `--server`  |
//! | `PORTAL_ID`     | `--id`      |
//! | `PORTAL_SECRET` | `--secret`  |
//!
//! Flags take precedence over the configuration file.  Every command except
//! `register` logs in first.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::Notify;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use portal_client::domain::ClientConfig;
use portal_client::PortalClient;
use portal_core::{PairingCode, PortalId, Secret};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Website Portal connector.
#[derive(Debug, Parser)]
#[command(
    name = "portal-client",
    about = "Register, pair and relay URLs between Website Portal devices",
    version
)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, env = "PORTAL_CONFIG")]
    config: Option<PathBuf>,

    /// Coordination service address; overrides `[server] url`.
    #[arg(long, env = "PORTAL_SERVER")]
    server: Option<String>,

    /// Portal id used to log in.
    #[arg(long, env = "PORTAL_ID", global = true)]
    id: Option<String>,

    /// Portal secret used to log in.
    #[arg(long, env = "PORTAL_SECRET", global = true, hide_env_values = true)]
    secret: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
enum Command {
    /// Register a new portal and print the credentials the service issues.
    Register {
        /// Platform tag; defaults to `[portal] platform`.
        #[arg(long)]
        platform: Option<String>,
        /// Display name; defaults to `[portal] name`.
        #[arg(long)]
        name: Option<String>,
    },
    /// Show the current pairing code.
    Code {
        /// Replace the code with a fresh one.
        #[arg(long, conflicts_with = "remove")]
        reset: bool,
        /// Invalidate the code.
        #[arg(long)]
        remove: bool,
    },
    /// Pair with the portal that issued CODE.
    Pair { code: String },
    /// Print the paired portals.
    Peers,
    /// Change this portal's display name.
    Rename { name: String },
    /// Send URL to the paired portal TARGET.
    Send { target: String, url: String },
    /// Print URLs pushed by paired portals until Ctrl+C.
    Listen,
}

impl Cli {
    /// Loads the configuration file (if any) and applies flag overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if `--config` names a file that cannot be read or parsed.
    fn into_config(&self) -> anyhow::Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => ClientConfig::default(),
        };
        if let Some(server) = &self.server {
            config.server.url = server.clone();
        }
        Ok(config)
    }

    /// The login credentials, required by every command except `register`.
    fn credentials(&self) -> anyhow::Result<(PortalId, Secret)> {
        let id = self
            .id
            .clone()
            .context("--id (or PORTAL_ID) is required for this command")?;
        let secret = self
            .secret
            .clone()
            .context("--secret (or PORTAL_SECRET) is required for this command")?;
        Ok((PortalId::new(id), Secret::new(secret)))
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.into_config()?;

    // `RUST_LOG` wins; otherwise use the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    #[cfg(feature = "tls")]
    {
        // Another component may already have installed a provider.
        let _ = rustls::crypto::ring::default_provider().install_default();
    }

    info!("connecting to {}", config.server.url);
    let client = PortalClient::socketio(config).context("failed to create portal client")?;

    let lost = Arc::new(Notify::new());
    let lost_signal = Arc::clone(&lost);
    client
        .connect(Some(Box::new(move || {
            warn!("connection to portal service lost");
            lost_signal.notify_one();
        })))
        .await
        .context("failed to connect to portal service")?;

    run(&cli, &client, &lost).await
}

async fn run<T>(cli: &Cli, client: &PortalClient<T>, lost: &Notify) -> anyhow::Result<()>
where
    T: portal_client::infrastructure::channel::Transport,
{
    if let Command::Register { platform, name } = &cli.command {
        let portal = &client.config().portal;
        let platform = platform.as_deref().unwrap_or(&portal.platform);
        let name = name.as_deref().unwrap_or(&portal.name);
        let data = client
            .register(platform, name)
            .await
            .context("registration failed")?;
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    let (id, secret) = cli.credentials()?;
    client
        .login(id.clone(), secret)
        .await
        .with_context(|| format!("login as {id} failed"))?;
    info!("logged in as {id}");

    match &cli.command {
        Command::Register { .. } => {}
        Command::Code { reset, remove } => {
            if *remove {
                client.remove_pairing_code().await?;
                println!("pairing code removed");
            } else if *reset {
                println!("{}", client.reset_pairing_code().await?);
            } else {
                println!("{}", client.get_pairing_code().await?);
            }
        }
        Command::Pair { code } => {
            client.pair(&PairingCode::new(code.as_str())).await?;
            println!("paired");
        }
        Command::Peers => {
            let peers = client.get_paired_portals_data().await?;
            println!("{}", serde_json::to_string_pretty(&peers)?);
        }
        Command::Rename { name } => {
            client.rename(name).await?;
            println!("renamed to {name}");
        }
        Command::Send { target, url } => {
            client.send_url(&PortalId::new(target.as_str()), url).await?;
            println!("sent");
        }
        Command::Listen => {
            client.on_url(|url| println!("{url}"));
            info!("listening for URLs; press Ctrl+C to stop");
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result.context("failed to listen for Ctrl+C")?;
                    info!("received Ctrl+C, exiting");
                }
                _ = lost.notified() => {
                    anyhow::bail!("disconnected from portal service");
                }
            }
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_when_no_file_given() {
        // Arrange
        let cli = Cli::parse_from(["portal-client", "peers"]);

        // Act
        let config = cli.into_config().unwrap();

        // Assert
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_server_flag_overrides_config() {
        let cli = Cli::parse_from(["portal-client", "--server", "http://localhost:3000", "peers"]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.server.url, "http://localhost:3000");
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let cli = Cli::parse_from([
            "portal-client",
            "--config",
            "/nonexistent/portal.toml",
            "peers",
        ]);
        assert!(cli.into_config().is_err());
    }

    #[test]
    fn test_credentials_are_required_for_login_commands() {
        let cli = Cli::parse_from(["portal-client", "--id", "p1", "peers"]);
        let err = cli.credentials().unwrap_err();
        assert!(err.to_string().contains("--secret"));
    }

    #[test]
    fn test_credentials_accepted_after_subcommand() {
        let cli = Cli::parse_from(["portal-client", "send", "p2", "http://x", "--id", "p1", "--secret", "s"]);
        let (id, secret) = cli.credentials().unwrap();
        assert_eq!(id.as_str(), "p1");
        assert_eq!(secret.expose(), "s");
        assert_eq!(
            cli.command,
            Command::Send {
                target: "p2".to_string(),
                url: "http://x".to_string()
            }
        );
    }

    #[test]
    fn test_code_reset_and_remove_conflict() {
        let result = Cli::try_parse_from(["portal-client", "code", "--reset", "--remove"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_register_flags_are_optional() {
        let cli = Cli::parse_from(["portal-client", "register", "--name", "den"]);
        assert_eq!(
            cli.command,
            Command::Register {
                platform: None,
                name: Some("den".to_string())
            }
        );
    }
}
