//! A peer daemon: runs the ordering engine's HTTP listener, its periodic
//! commit ticker, and a local control-channel listener for the CLI.

use std::env;
use std::io::Write as _;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use lamport_ledger::cli::{Command, Response};
use lamport_ledger::engine::{Engine, HttpTransport};
use lamport_ledger::peer::PeersCatalog;
use lamport_ledger::transaction::Transaction;
use lamport_ledger::{config, history, membership, wire};
use tiny_http::Method;

const CONTROL_PORT_ENV: &str = "LEDGER_DAEMON_PORT";
const DEFAULT_CONTROL_PORT: u16 = 27737;

fn main() {
    config::init_peer_logger();

    let registry_addr = config::server_addr();
    let bind_host = config::client_bind_host();
    let public_ip = config::client_public_ipv4();
    let base_port = config::client_base_port();
    let rpc_timeout = config::rpc_timeout();
    let shutdown_timeout = config::shutdown_timeout();
    let transfer_delay = config::transfer_delay();
    let tick_interval = config::tick_interval();
    let control_port = control_port();

    log::debug!("registry address: {registry_addr}");

    // join sequence: register, confirm, notify peers.
    let registration = membership::join(&registry_addr, rpc_timeout).expect("joining the registry");
    let id = registration.client_id;
    let self_port = base_port + id as u16;
    let self_addr = format!("{public_ip}:{self_port}");

    membership::confirm_registration(&registry_addr, id, &self_addr, rpc_timeout)
        .expect("confirming registration with the registry");

    let peers = PeersCatalog::from_addrs(registration.other_clients);
    membership::notify_peers_of_join(&peers, id, &self_addr, rpc_timeout);

    log::info!("peer {id} listening on {self_addr} (registry at {registry_addr})");

    let engine = Arc::new(Engine::new(
        id,
        registry_addr.clone(),
        peers,
        rpc_timeout,
        transfer_delay,
        HttpTransport,
    ));

    let network_listener_addr = format!("{bind_host}:{self_port}");
    spawn_network_listener(network_listener_addr, engine.clone());
    spawn_ticker(engine.clone(), tick_interval);

    run_control_channel(engine, registry_addr, control_port, shutdown_timeout);
}

fn control_port() -> u16 {
    env::var(CONTROL_PORT_ENV).map_or(DEFAULT_CONTROL_PORT, |port| {
        port.parse()
            .unwrap_or_else(|_| panic!("Environment variable `{CONTROL_PORT_ENV}` could not be parsed as a port"))
    })
}

/// The HTTP surface a peer exposes to other peers.
fn spawn_network_listener(addr: String, engine: Arc<Engine<HttpTransport>>) {
    thread::spawn(move || {
        let server = tiny_http::Server::http(&addr).unwrap_or_else(|e| panic!("binding {addr}: {e}"));
        for mut request in server.incoming_requests() {
            let engine = engine.clone();
            let method = request.method().clone();
            let url = request.url().to_string();

            match (method, url.as_str()) {
                (Method::Post, "/transfer-request") => {
                    match wire::read_json_body::<Transaction>(&mut request) {
                        Ok(tx) => {
                            engine.on_request(tx);
                            wire::respond_success(request);
                        }
                        Err(err) => wire::respond_json(request, 400, &wire::ErrorResponse { error: err.to_string() }),
                    }
                }
                (Method::Post, "/transfer-finish") => {
                    match wire::read_json_body::<Transaction>(&mut request) {
                        Ok(tx) => {
                            engine.on_release(tx);
                            wire::respond_success(request);
                        }
                        Err(err) => wire::respond_json(request, 400, &wire::ErrorResponse { error: err.to_string() }),
                    }
                }
                (Method::Post, "/register") => {
                    match wire::read_json_body::<wire::RegisterConfirmBody>(&mut request) {
                        Ok(body) => {
                            engine.insert_peer(body.client_id, body.client_addr);
                            history::log_peer_joined(body.client_id);
                            wire::respond_success(request);
                        }
                        Err(err) => wire::respond_json(request, 400, &wire::ErrorResponse { error: err.to_string() }),
                    }
                }
                (Method::Get, url) if url.starts_with("/exit/") => match wire::path_tail_as_u32(url) {
                    Some(peer_id) => {
                        engine.remove_peer(peer_id);
                        history::log_peer_exited(peer_id);
                        wire::respond_success(request);
                    }
                    None => wire::respond_not_found(request, "invalid peer id"),
                },
                (Method::Get, "/") => {
                    wire::respond_json(
                        request,
                        200,
                        &wire::StatusResponse {
                            ok: true,
                            addr: addr.clone(),
                            peer_count: engine.peer_count(),
                        },
                    );
                }
                _ => wire::respond_not_found(request, "no such route"),
            }
        }
    });
}

fn spawn_ticker(engine: Arc<Engine<HttpTransport>>, interval: Duration) {
    thread::spawn(move || loop {
        thread::sleep(interval);
        if let Err(err) = engine.tick() {
            log::warn!("tick failed: {err}");
        }
    });
}

/// The local CLI <-> daemon wire format: one JSON `Command` per
/// connection, one JSON `Response` back — a separate, much simpler
/// surface than the peer-to-peer HTTP API.
fn run_control_channel(
    engine: Arc<Engine<HttpTransport>>,
    registry_addr: String,
    control_port: u16,
    shutdown_timeout: Duration,
) {
    let listener = TcpListener::bind(("127.0.0.1", control_port))
        .unwrap_or_else(|e| panic!("binding control channel on port {control_port}: {e}"));

    for stream in listener.incoming() {
        let Ok(stream) = stream else { continue };
        let engine = engine.clone();
        let registry_addr = registry_addr.clone();

        let should_exit = handle_control_connection(stream, &engine, &registry_addr, shutdown_timeout);
        if should_exit {
            break;
        }
    }
}

fn handle_control_connection(
    mut stream: TcpStream,
    engine: &Arc<Engine<HttpTransport>>,
    registry_addr: &str,
    shutdown_timeout: Duration,
) -> bool {
    let command: Command = match serde_json::from_reader(&stream) {
        Ok(command) => command,
        Err(err) => {
            let _ = write_response(&mut stream, &Response::Error(err.to_string()));
            return false;
        }
    };

    let (response, exit) = dispatch(&command, engine, registry_addr, shutdown_timeout);
    let _ = write_response(&mut stream, &response);
    exit
}

fn dispatch(
    command: &Command,
    engine: &Arc<Engine<HttpTransport>>,
    registry_addr: &str,
    shutdown_timeout: Duration,
) -> (Response, bool) {
    match command {
        Command::Transfer { rcp_id, amt } => match engine.initiate_transfer(*rcp_id, *amt) {
            Ok(()) => (Response::Text(format!("transfer to {rcp_id} of {amt} queued")), false),
            Err(err) => (Response::Error(err.to_string()), false),
        },
        Command::Balance => match engine.balance_query() {
            Ok(balance) => (Response::Text(format!("{balance}")), false),
            Err(err) => (Response::Error(err.to_string()), false),
        },
        Command::View => {
            let text = engine.with_ledger(|ledger| match ledger.tail() {
                Some(block) => serde_json::to_string_pretty(block).unwrap_or_default(),
                None => "ledger is empty".to_string(),
            });
            (Response::Text(text), false)
        }
        Command::Queues => {
            let sending = engine.sending_queue_snapshot();
            let message = engine.message_queue_snapshot();
            let text = format!(
                "sending_queue: {}\nmessage_queue: {}",
                serde_json::to_string(&sending).unwrap_or_default(),
                serde_json::to_string(&message).unwrap_or_default()
            );
            (Response::Text(text), false)
        }
        Command::History => {
            let events: Vec<String> = history::snapshot().iter().map(ToString::to_string).collect();
            (Response::Text(events.join("\n")), false)
        }
        Command::Id => (Response::Text(format!("{}", engine.id())), false),
        Command::Exit => {
            engine.shutdown(registry_addr, shutdown_timeout);
            (Response::Text("goodbye".to_string()), true)
        }
    }
}

fn write_response(stream: &mut TcpStream, response: &Response) -> std::io::Result<()> {
    serde_json::to_writer(&mut *stream, response)?;
    stream.flush()
}
