//! The interactive companion to a running peer daemon. Talks to the
//! daemon over a local, one-shot-per-command TCP connection.

use clap::Parser as _;
use lamport_ledger::cli::{Args, Command, Response};
use std::env;
use std::io::{self, Read as _, Write as _};
use std::iter;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpStream, ToSocketAddrs as _};

const LOGGING_LEVEL_ENV: &str = "LEDGER_CLIENT_LOG";
const DEFAULT_LOGGING_LEVEL: &str = "warn";

const DAEMON_SOCKET_ENV: &str = "LEDGER_DAEMON_SOCKET";
const DAEMON_PORT_ENV: &str = "LEDGER_DAEMON_PORT";
const DEFAULT_DAEMON_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));
const DEFAULT_DAEMON_PORT: u16 = 27737;

fn main() -> io::Result<()> {
    init_logger();
    let daemon_addr = init_daemon_addr();
    log::debug!("daemon address: {daemon_addr}");

    let command = Args::parse().cmd;

    match command {
        None => interactive_mode(daemon_addr),
        Some(command) => {
            let response = send_command(&command, daemon_addr)?;
            println!("{response}");
        }
    }

    Ok(())
}

fn init_logger() {
    let env = env_logger::Env::new().filter_or(LOGGING_LEVEL_ENV, DEFAULT_LOGGING_LEVEL);
    env_logger::init_from_env(env);
}

fn init_daemon_addr() -> SocketAddr {
    if let Ok(addr) = env::var(DAEMON_SOCKET_ENV) {
        return addr
            .to_socket_addrs()
            .unwrap_or_else(|_| {
                panic!("Environment variable `{DAEMON_SOCKET_ENV}` could not be parsed as a valid socket address")
            })
            .next()
            .unwrap();
    }

    if let Ok(port) = env::var(DAEMON_PORT_ENV) {
        let port: u16 = port
            .parse()
            .unwrap_or_else(|_| panic!("Environment variable `{DAEMON_PORT_ENV}` could not be parsed as a port"));
        return SocketAddr::new(DEFAULT_DAEMON_IP, port);
    }

    SocketAddr::new(DEFAULT_DAEMON_IP, DEFAULT_DAEMON_PORT)
}

fn interactive_mode(daemon_addr: SocketAddr) {
    loop {
        print!("> ");
        io::stdout().flush().unwrap();

        let mut line = String::new();
        if io::stdin().read_line(&mut line).unwrap() == 0 {
            println!();
            break;
        }

        if line.trim() == "exit" {
            let _ = send_command(&Command::Exit, daemon_addr);
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let args = iter::once("ledger-client").chain(line.split_whitespace());
        let command = match Args::try_parse_from(args) {
            Ok(args) => match args.cmd {
                Some(command) => command,
                None => continue,
            },
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };

        match send_command(&command, daemon_addr) {
            Ok(response) => println!("{response}"),
            Err(err) => eprintln!("failed to reach daemon: {err}"),
        }
    }
}

fn send_command(command: &Command, addr: SocketAddr) -> io::Result<Response> {
    let mut stream = TcpStream::connect(addr)?;
    serde_json::to_writer(&mut stream, command)?;
    stream.shutdown(std::net::Shutdown::Write)?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf)?;

    serde_json::from_slice(&buf).map_err(io::Error::from)
}
