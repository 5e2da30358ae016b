use thiserror::Error;

/// The error kinds the ordering engine and its callers can produce, one
/// variant per distinct, named outcome.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("peer RPC exceeded its deadline")]
    ProtocolTimeout,

    #[error("registry does not know account {0}")]
    UnknownAccount(u32),

    #[error("account {0} has insufficient balance")]
    InsufficientBalance(u32),

    #[error("invalid transfer: {0}")]
    InvalidTransfer(#[from] crate::transaction::ValidateError),

    #[error("peer {0} is unreachable")]
    MembershipStale(u32),
}

/// Transport-level failures, below the level that has a named kind.
/// Call sites map these into `EngineError` where one is assigned
/// (e.g. a connect failure during initiate_transfer becomes
/// `ProtocolTimeout`) and propagate with `?` otherwise.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("connecting to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("request to {addr} timed out")]
    Timeout { addr: String },

    #[error("{addr} responded with status {status}")]
    Status { addr: String, status: u16 },

    #[error("serializing/deserializing JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("local I/O: {0}")]
    Io(#[from] std::io::Error),
}
