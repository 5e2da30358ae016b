//! Environment-variable configuration: named constants for each
//! variable, a parse-or-panic-with-a-named-message helper per value, and
//! sensible defaults where one makes sense.

use std::env;
use std::net::UdpSocket;
use std::time::Duration;

const SERVER_IPV4_ENV: &str = "SERVER_IPv4";
const SERVER_PORT_ENV: &str = "SERVER_PORT";
const DEFAULT_SERVER_PORT: u16 = 8000;

const CLIENT_BIND_HOST_ENV: &str = "CLIENT_BIND_HOST";
const DEFAULT_CLIENT_BIND_HOST: &str = "0.0.0.0";

const CLIENT_PUBLIC_IPV4_ENV: &str = "CLIENT_PUBLIC_IPv4";
const CLIENT_BASE_PORT_ENV: &str = "CLIENT_BASE_PORT";
const DEFAULT_CLIENT_BASE_PORT: u16 = 9000;

const TRANSFER_DELAY_SECONDS_ENV: &str = "TRANSFER_DELAY_SECONDS";
const DEFAULT_TRANSFER_DELAY_SECONDS: u64 = 3;

const LEDGER_RPC_TIMEOUT_SECONDS_ENV: &str = "LEDGER_RPC_TIMEOUT_SECONDS";
const DEFAULT_RPC_TIMEOUT_SECONDS: u64 = 5;

const LEDGER_SHUTDOWN_TIMEOUT_SECONDS_ENV: &str = "LEDGER_SHUTDOWN_TIMEOUT_SECONDS";
const DEFAULT_SHUTDOWN_TIMEOUT_SECONDS: u64 = 2;

const LEDGER_TICK_HZ_ENV: &str = "LEDGER_TICK_HZ";
const DEFAULT_TICK_HZ: u64 = 10;

const LEDGER_REGISTRY_LOG_ENV: &str = "LEDGER_REGISTRY_LOG";
const LEDGER_PEER_LOG_ENV: &str = "LEDGER_PEER_LOG";
const DEFAULT_LOG_LEVEL: &str = "warn";

pub fn init_logger(env_var: &str) {
    let env = env_logger::Env::new().filter_or(env_var, DEFAULT_LOG_LEVEL);
    env_logger::init_from_env(env);
}

pub fn init_registry_logger() {
    init_logger(LEDGER_REGISTRY_LOG_ENV);
}

pub fn init_peer_logger() {
    init_logger(LEDGER_PEER_LOG_ENV);
}

pub fn server_ipv4() -> String {
    env::var(SERVER_IPV4_ENV).unwrap_or_else(|_| {
        panic!("Environment variable `{SERVER_IPV4_ENV}` must be set to the Registry's host")
    })
}

pub fn server_port() -> u16 {
    env::var(SERVER_PORT_ENV).map_or(DEFAULT_SERVER_PORT, |port| {
        port.parse()
            .unwrap_or_else(|_| panic!("Environment variable `{SERVER_PORT_ENV}` could not be parsed as a port"))
    })
}

pub fn server_addr() -> String {
    format!("{}:{}", server_ipv4(), server_port())
}

pub fn client_bind_host() -> String {
    env::var(CLIENT_BIND_HOST_ENV).unwrap_or_else(|_| DEFAULT_CLIENT_BIND_HOST.to_string())
}

/// Resolves `CLIENT_PUBLIC_IPv4`, treating the literal value `"auto"` as
/// a request to detect an outbound-reachable address the way
/// `original_source/src/utils.py::get_host_ip` does: open a UDP socket
/// "connected" to a well-known external address and read back the local
/// address the kernel picked, without sending any packet.
pub fn client_public_ipv4() -> String {
    match env::var(CLIENT_PUBLIC_IPV4_ENV) {
        Ok(value) if value == "auto" => detect_outbound_ip(),
        Ok(value) => value,
        Err(_) => detect_outbound_ip(),
    }
}

fn detect_outbound_ip() -> String {
    let socket = UdpSocket::bind("0.0.0.0:0").expect("binding an ephemeral UDP socket");
    socket
        .connect("8.8.8.8:80")
        .expect("connecting a UDP socket never sends a packet");
    socket
        .local_addr()
        .expect("a connected socket has a local address")
        .ip()
        .to_string()
}

pub fn client_base_port() -> u16 {
    env::var(CLIENT_BASE_PORT_ENV).map_or(DEFAULT_CLIENT_BASE_PORT, |port| {
        port.parse()
            .unwrap_or_else(|_| panic!("Environment variable `{CLIENT_BASE_PORT_ENV}` could not be parsed as a port"))
    })
}

pub fn transfer_delay() -> Duration {
    env::var(TRANSFER_DELAY_SECONDS_ENV).map_or(Duration::from_secs(DEFAULT_TRANSFER_DELAY_SECONDS), |secs| {
        Duration::from_secs(secs.parse().unwrap_or_else(|_| {
            panic!("Environment variable `{TRANSFER_DELAY_SECONDS_ENV}` could not be parsed as seconds")
        }))
    })
}

pub fn rpc_timeout() -> Duration {
    env::var(LEDGER_RPC_TIMEOUT_SECONDS_ENV).map_or(Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECONDS), |secs| {
        Duration::from_secs(secs.parse().unwrap_or_else(|_| {
            panic!("Environment variable `{LEDGER_RPC_TIMEOUT_SECONDS_ENV}` could not be parsed as seconds")
        }))
    })
}

pub fn shutdown_timeout() -> Duration {
    env::var(LEDGER_SHUTDOWN_TIMEOUT_SECONDS_ENV).map_or(Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECONDS), |secs| {
        Duration::from_secs(secs.parse().unwrap_or_else(|_| {
            panic!("Environment variable `{LEDGER_SHUTDOWN_TIMEOUT_SECONDS_ENV}` could not be parsed as seconds")
        }))
    })
}

pub fn tick_interval() -> Duration {
    let hz = env::var(LEDGER_TICK_HZ_ENV).map_or(DEFAULT_TICK_HZ, |hz| {
        hz.parse()
            .unwrap_or_else(|_| panic!("Environment variable `{LEDGER_TICK_HZ_ENV}` could not be parsed as a rate"))
    });
    Duration::from_millis(1000 / hz.max(1))
}
