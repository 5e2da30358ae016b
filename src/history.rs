//! A process-local, tagged-event log of protocol activity: requests,
//! remote requests, commits, releases, and membership changes. Used by
//! the CLI's `history` introspection command; a convenience for demos
//! and tests, not part of the protocol itself.

use std::fmt;
use std::sync::{Mutex, OnceLock};

use serde::{Deserialize, Serialize};

use crate::transaction::TransactionStatus;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum EventKind {
    /// This peer broadcast a request for its own transfer.
    Request { sender_id: u32, recipient_id: u32, amount: f64 },
    /// This peer observed a remote request.
    RemoteRequest { sender_id: u32, recipient_id: u32, amount: f64 },
    /// This peer's own transfer committed.
    Commit { recipient_id: u32, amount: f64, status: TransactionStatus },
    /// This peer observed a release for someone else's transfer.
    RemoteRelease { sender_id: u32, recipient_id: u32, status: TransactionStatus },
    /// A peer joined the address book.
    PeerJoined { peer_id: u32 },
    /// A peer left the address book.
    PeerExited { peer_id: u32 },
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Event {
    pub id: u64,
    pub kind: EventKind,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            EventKind::Request { sender_id, recipient_id, amount } => {
                write!(f, "#{} requested transfer {sender_id} -> {recipient_id} ({amount})", self.id)
            }
            EventKind::RemoteRequest { sender_id, recipient_id, amount } => {
                write!(f, "#{} saw request {sender_id} -> {recipient_id} ({amount})", self.id)
            }
            EventKind::Commit { recipient_id, amount, status } => {
                write!(f, "#{} committed transfer to {recipient_id} ({amount}) as {status:?}", self.id)
            }
            EventKind::RemoteRelease { sender_id, recipient_id, status } => {
                write!(f, "#{} saw release {sender_id} -> {recipient_id} as {status:?}", self.id)
            }
            EventKind::PeerJoined { peer_id } => write!(f, "#{} peer {peer_id} joined", self.id),
            EventKind::PeerExited { peer_id } => write!(f, "#{} peer {peer_id} exited", self.id),
        }
    }
}

#[derive(Debug, Default)]
pub struct History {
    events: Vec<Event>,
}

impl History {
    fn push(&mut self, kind: EventKind) {
        let id = self.events.len() as u64;
        self.events.push(Event { id, kind });
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

fn global() -> &'static Mutex<History> {
    static HISTORY: OnceLock<Mutex<History>> = OnceLock::new();
    HISTORY.get_or_init(|| Mutex::new(History::default()))
}

pub fn log_request(sender_id: u32, recipient_id: u32, amount: f64) {
    global().lock().unwrap().push(EventKind::Request { sender_id, recipient_id, amount });
}

pub fn log_remote_request(sender_id: u32, recipient_id: u32, amount: f64) {
    global()
        .lock()
        .unwrap()
        .push(EventKind::RemoteRequest { sender_id, recipient_id, amount });
}

pub fn log_commit(recipient_id: u32, amount: f64, status: TransactionStatus) {
    global().lock().unwrap().push(EventKind::Commit { recipient_id, amount, status });
}

pub fn log_remote_release(sender_id: u32, recipient_id: u32, status: TransactionStatus) {
    global()
        .lock()
        .unwrap()
        .push(EventKind::RemoteRelease { sender_id, recipient_id, status });
}

pub fn log_peer_joined(peer_id: u32) {
    global().lock().unwrap().push(EventKind::PeerJoined { peer_id });
}

pub fn log_peer_exited(peer_id: u32) {
    global().lock().unwrap().push(EventKind::PeerExited { peer_id });
}

pub fn snapshot() -> Vec<Event> {
    global().lock().unwrap().events().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_display_with_an_incrementing_id() {
        let mut history = History::default();
        history.push(EventKind::PeerJoined { peer_id: 2 });
        history.push(EventKind::PeerExited { peer_id: 2 });

        assert_eq!(history.events()[0].id, 0);
        assert_eq!(history.events()[1].id, 1);
        assert_eq!(history.events()[0].to_string(), "#0 peer 2 joined");
    }
}
