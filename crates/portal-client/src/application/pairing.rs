//! Pairing codes, paired-portal data and renaming.
//!
//! A pairing code is minted by one portal and consumed by another through
//! `pair`.  Codes are opaque: the client never validates or parses them.
//! None of these operations touch local state; the service is the only
//! record of pairings and portal names.

use portal_core::{CallRequest, Operation, PairedPortals, PairingCode};

use crate::application::correlation::Connection;
use crate::application::error::PortalError;
use crate::infrastructure::channel::TransportChannel;

/// Returns the current pairing code, minting one if none exists.
pub(crate) async fn get_pairing_code<C: TransportChannel>(
    connection: &Connection<C>,
) -> Result<PairingCode, PortalError> {
    let value = connection
        .invoke_for_value(CallRequest::bare(Operation::GetPairingCode))
        .await?;
    Ok(PairingCode::from_value(value))
}

/// Replaces the current pairing code with a fresh one.
pub(crate) async fn reset_pairing_code<C: TransportChannel>(
    connection: &Connection<C>,
) -> Result<PairingCode, PortalError> {
    let value = connection
        .invoke_for_value(CallRequest::bare(Operation::ResetPairingCode))
        .await?;
    Ok(PairingCode::from_value(value))
}

/// Invalidates the current pairing code.
pub(crate) async fn remove_pairing_code<C: TransportChannel>(
    connection: &Connection<C>,
) -> Result<(), PortalError> {
    connection
        .invoke_unit(CallRequest::bare(Operation::RemovePairingCode))
        .await
}

/// Fetches the records of every portal paired with this one.
pub(crate) async fn get_paired_portals_data<C: TransportChannel>(
    connection: &Connection<C>,
) -> Result<PairedPortals, PortalError> {
    let value = connection
        .invoke_for_value(CallRequest::bare(Operation::GetPairedPortalsData))
        .await?;
    Ok(PairedPortals(value))
}

/// Changes this portal's display name on the service.
pub(crate) async fn rename<C: TransportChannel>(
    connection: &Connection<C>,
    new_name: &str,
) -> Result<(), PortalError> {
    connection.invoke_unit(CallRequest::rename(new_name)).await
}

/// Pairs with the portal that minted `code`.
pub(crate) async fn pair<C: TransportChannel>(
    connection: &Connection<C>,
    code: &PairingCode,
) -> Result<(), PortalError> {
    connection.invoke_unit(CallRequest::pair(code)).await
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::channel::{OpenOptions, Transport};
    use crate::infrastructure::loopback::{LoopbackChannel, LoopbackTransport, RemoteEnd};
    use serde_json::json;

    fn connected_pair() -> (Connection<LoopbackChannel>, RemoteEnd) {
        let (transport, remote) = LoopbackTransport::new();
        let opened = transport.open("loopback", OpenOptions::default()).unwrap();
        let connection = Connection::new();
        connection.install_channel(opened.channel).unwrap();
        connection.session().mark_connected();
        (connection, remote)
    }

    #[tokio::test]
    async fn test_reset_yields_new_code_each_time() {
        // Arrange
        let (connection, mut remote) = connected_pair();

        // Act
        let (first, ()) = tokio::join!(reset_pairing_code(&connection), async {
            remote.next_call().await.unwrap().succeed(Some(json!("AAA111")));
        });
        let (second, ()) = tokio::join!(reset_pairing_code(&connection), async {
            remote.next_call().await.unwrap().succeed(Some(json!("BBB222")));
        });

        // Assert
        assert_ne!(first.unwrap(), second.unwrap());
    }

    #[tokio::test]
    async fn test_numeric_code_is_kept_as_text() {
        let (connection, mut remote) = connected_pair();

        let (code, ()) = tokio::join!(get_pairing_code(&connection), async {
            remote.next_call().await.unwrap().succeed(Some(json!(482913)));
        });

        assert_eq!(code.unwrap().as_str(), "482913");
    }

    #[tokio::test]
    async fn test_pair_sends_code_positionally_and_failure_has_no_side_effect() {
        // Arrange
        let (connection, mut remote) = connected_pair();
        let before = connection.session().clone();

        // Act
        let code = PairingCode::from("zzz");
        let (result, args) = tokio::join!(pair(&connection, &code), async {
            let call = remote.next_call().await.unwrap();
            let args = call.args.clone();
            call.fail("unknown code");
            args
        });

        // Assert
        assert_eq!(args, vec![json!("zzz")]);
        assert_eq!(result.unwrap_err().to_string(), "unknown code");
        assert_eq!(*connection.session(), before);
    }

    #[tokio::test]
    async fn test_paired_portals_are_opaque_records() {
        let (connection, mut remote) = connected_pair();

        let (data, ()) = tokio::join!(get_paired_portals_data(&connection), async {
            remote
                .next_call()
                .await
                .unwrap()
                .succeed(Some(json!([{"id": "a"}, {"id": "b", "name": "tv"}])));
        });

        assert_eq!(data.unwrap().records().len(), 2);
    }

    #[tokio::test]
    async fn test_paired_portals_without_value_resolve_empty() {
        let (connection, mut remote) = connected_pair();

        let (data, ()) = tokio::join!(get_paired_portals_data(&connection), async {
            remote.next_call().await.unwrap().succeed(None);
        });

        let data = data.unwrap();
        assert_eq!(data.0, serde_json::Value::Null);
        assert!(data.records().is_empty());
    }

    #[tokio::test]
    async fn test_remove_and_rename_resolve_without_value() {
        let (connection, mut remote) = connected_pair();

        let (removed, ()) = tokio::join!(remove_pairing_code(&connection), async {
            remote.next_call().await.unwrap().succeed(None);
        });
        let (renamed, name) = tokio::join!(rename(&connection, "den"), async {
            let call = remote.next_call().await.unwrap();
            let args = call.args.clone();
            call.succeed(None);
            args
        });

        assert!(removed.is_ok());
        assert!(renamed.is_ok());
        assert_eq!(name, vec![json!("den")]);
    }
}
