pub mod peers_catalog;

pub use peers_catalog::PeersCatalog;

use serde::{Deserialize, Serialize};

/// An entry in a peer's address book: another peer's id and its
/// advertised, reachable address.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Peer {
    id: u32,
    addr: String,
}

impl Peer {
    pub fn new(id: u32, addr: String) -> Self {
        Self { id, addr }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}
