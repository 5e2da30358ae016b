//! The peer CLI's command set and its wire representation over the
//! local control channel.

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Deserialize, Parser, Serialize)]
pub struct Args {
    #[command(name = "command", subcommand)]
    pub cmd: Option<Command>,
}

#[derive(Clone, Debug, Deserialize, Serialize, Subcommand)]
pub enum Command {
    /// Transfer coins to another peer
    #[command(arg_required_else_help = true)]
    Transfer {
        /// The peer id of the recipient
        #[arg(name = "RECIPIENT_ID")]
        rcp_id: u32,
        /// The amount to transfer
        #[arg(name = "AMOUNT")]
        amt: f64,
    },

    /// View your current balance
    Balance,

    /// View the last committed block
    View,

    /// View the contents of sending_queue and message_queue
    Queues,

    /// View the event history for this peer
    History,

    // * debug only
    /// View this peer's own id
    #[command(skip = true)]
    Id,

    /// Exit the network
    Exit,
}

/// The daemon's reply to a `Command` sent over the local control
/// channel.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum Response {
    Text(String),
    Error(String),
}

impl Display for Response {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Response::Text(text) => write!(f, "{text}"),
            Response::Error(error) => write!(f, "error: {error}"),
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Command::Transfer { rcp_id, amt } => write!(f, "transfer {rcp_id} {amt}"),
            Command::Balance => write!(f, "balance"),
            Command::View => write!(f, "view"),
            Command::Queues => write!(f, "queues"),
            Command::History => write!(f, "history"),
            Command::Id => write!(f, "id"),
            Command::Exit => write!(f, "exit"),
        }
    }
}
