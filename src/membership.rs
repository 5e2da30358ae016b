//! Join and exit, kept eventual and outside the Lamport order: register
//! with the Registry, confirm the registration once listening, notify
//! the existing peers, and exit by notifying both on the way out.

use std::time::Duration;

use log::warn;

use crate::error::WireError;
use crate::peer::PeersCatalog;
use crate::wire::{self, RegisterConfirmBody, RegisterResponse};

/// Step 1: ask the Registry for an id and the current peer set.
pub fn join(registry_addr: &str, timeout: Duration) -> Result<RegisterResponse, WireError> {
    wire::get_json(registry_addr, "/register", timeout)
}

/// Step 2: tell the Registry our own reachable address.
pub fn confirm_registration(
    registry_addr: &str,
    client_id: u32,
    client_addr: &str,
    timeout: Duration,
) -> Result<(), WireError> {
    let body = RegisterConfirmBody {
        client_id,
        client_addr: client_addr.to_string(),
    };
    let _: wire::ResultResponse = wire::post_json(registry_addr, "/register-confirm", &body, timeout)?;
    Ok(())
}

/// Step 3: announce ourselves to every peer we were told about. Peers
/// that don't answer are logged (MembershipStale) and skipped — a peer
/// that misses this notification simply won't see us until it learns of
/// us some other way, an accepted eventual-membership limitation.
pub fn notify_peers_of_join(peers: &PeersCatalog, client_id: u32, client_addr: &str, timeout: Duration) {
    let body = RegisterConfirmBody {
        client_id,
        client_addr: client_addr.to_string(),
    };
    for peer in peers.iter() {
        let result: Result<wire::ResultResponse, WireError> =
            wire::post_json(peer.addr(), "/register", &body, timeout);
        if result.is_err() {
            warn!("peer {} unreachable while notifying join (MembershipStale)", peer.id());
        }
    }
}

/// Exit sequence: best-effort, non-blocking notification to every peer
/// and the Registry. Failures are logged only.
pub fn notify_exit(peers: &PeersCatalog, registry_addr: &str, client_id: u32, timeout: Duration) {
    for peer in peers.iter() {
        let path = format!("/exit/{client_id}");
        let result: Result<wire::ResultResponse, WireError> = wire::get_json(peer.addr(), &path, timeout);
        if result.is_err() {
            warn!("peer {} unreachable while notifying exit (MembershipStale)", peer.id());
        }
    }

    let path = format!("/exit/{client_id}");
    let result: Result<wire::ResultResponse, WireError> = wire::get_json(registry_addr, &path, timeout);
    if result.is_err() {
        warn!("registry unreachable while notifying exit (MembershipStale)");
    }
}
