//! The Registry process: the single authoritative balance holder and
//! peer-address directory. Its HTTP surface is the only concurrent
//! activity it runs.

use std::sync::Arc;

use lamport_ledger::error::EngineError;
use lamport_ledger::registry::Registry;
use lamport_ledger::wire::{self, BalanceResponse, RegisterConfirmBody, RegisterResponse};
use lamport_ledger::{config, transaction::Transaction};
use tiny_http::Method;

fn main() {
    config::init_registry_logger();

    let addr = config::server_addr();
    let registry = Arc::new(Registry::new(addr.clone()));

    log::info!("registry listening on {addr}");

    let server = tiny_http::Server::http(&addr).unwrap_or_else(|e| panic!("binding {addr}: {e}"));
    for mut request in server.incoming_requests() {
        let registry = registry.clone();
        let method = request.method().clone();
        let url = request.url().to_string();

        match (method, url.as_str()) {
            (Method::Get, "/register") => {
                let registration = registry.register();
                wire::respond_json(
                    request,
                    200,
                    &RegisterResponse {
                        client_id: registration.client_id,
                        other_clients: registration.other_clients,
                        server_addr: registration.server_addr,
                    },
                );
            }
            (Method::Post, "/register-confirm") => {
                match wire::read_json_body::<RegisterConfirmBody>(&mut request) {
                    Ok(body) => match registry.register_confirm(body.client_id, body.client_addr) {
                        Ok(()) => wire::respond_success(request),
                        Err(err) => wire::respond_not_found(request, err.to_string()),
                    },
                    Err(err) => wire::respond_json(request, 400, &wire::ErrorResponse { error: err.to_string() }),
                }
            }
            (Method::Get, url) if url.starts_with("/balance/") => match wire::path_tail_as_u32(url) {
                Some(client_id) => match registry.balance(client_id) {
                    Ok(balance) => wire::respond_json(request, 200, &BalanceResponse { balance }),
                    Err(err) => wire::respond_not_found(request, err.to_string()),
                },
                None => wire::respond_not_found(request, "invalid client id"),
            },
            (Method::Post, "/transfer") => match wire::read_json_body::<Transaction>(&mut request) {
                Ok(tx) => match registry.transfer(&tx) {
                    Ok(()) => wire::respond_success(request),
                    Err(err @ EngineError::UnknownAccount(_)) => wire::respond_not_found(request, err.to_string()),
                    Err(err) => wire::respond_failure(request, err.to_string()),
                },
                Err(err) => wire::respond_json(request, 400, &wire::ErrorResponse { error: err.to_string() }),
            },
            (Method::Get, url) if url.starts_with("/exit/") => match wire::path_tail_as_u32(url) {
                Some(client_id) => {
                    registry.exit(client_id);
                    wire::respond_success(request);
                }
                None => wire::respond_not_found(request, "invalid client id"),
            },
            (Method::Get, "/") => {
                wire::respond_json(
                    request,
                    200,
                    &wire::StatusResponse {
                        ok: true,
                        addr: addr.clone(),
                        peer_count: registry.peer_count(),
                    },
                );
            }
            _ => wire::respond_not_found(request, "no such route"),
        }
    }
}
