use std::collections::HashMap;

use super::Peer;

/// A peer's address book of every *other* peer it currently believes is
/// reachable. Membership changes are not Lamport-ordered; they are
/// eventual, so this is a plain mutable directory rather than anything
/// append-only.
#[derive(Clone, Debug, Default)]
pub struct PeersCatalog {
    peers: HashMap<u32, Peer>,
}

impl PeersCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_addrs(addrs: HashMap<u32, String>) -> Self {
        let peers = addrs
            .into_iter()
            .map(|(id, addr)| (id, Peer::new(id, addr)))
            .collect();
        Self { peers }
    }

    pub fn insert(&mut self, id: u32, addr: String) {
        self.peers.insert(id, Peer::new(id, addr));
    }

    pub fn remove(&mut self, id: u32) -> Option<Peer> {
        self.peers.remove(&id)
    }

    pub fn get(&self, id: u32) -> Option<&Peer> {
        self.peers.get(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.peers.contains_key(&id)
    }

    /// The count the commit gate predicate compares `num_replies`
    /// against. Callers that need this for an in-flight
    /// transfer must snapshot it at request-broadcast time, not re-read
    /// it live — see `engine`'s handling of late joiners.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }

    pub fn as_addr_map(&self) -> HashMap<u32, String> {
        self.peers
            .iter()
            .map(|(id, peer)| (*id, peer.addr().to_string()))
            .collect()
    }
}
