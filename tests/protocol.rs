//! End-to-end exercises of the ordering engine across several in-process
//! peers sharing one `Registry`, wired together through an in-memory
//! `Transport` instead of real sockets.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lamport_ledger::engine::{Engine, Transport};
use lamport_ledger::error::EngineError;
use lamport_ledger::peer::PeersCatalog;
use lamport_ledger::registry::Registry;
use lamport_ledger::transaction::{Transaction, TransactionStatus};

type Peers = Arc<Mutex<HashMap<u32, Arc<Engine<NetworkTransport>>>>>;

/// Routes peer-to-peer calls straight into another engine's `on_request`/
/// `on_release`, and registry calls into a shared, real `Registry` —
/// everything a real deployment would do over HTTP, minus the sockets.
#[derive(Clone)]
struct NetworkTransport {
    registry: Arc<Registry>,
    peers: Peers,
}

impl Transport for NetworkTransport {
    fn send_request(&self, peer_id: u32, _peer_addr: &str, tx: &Transaction, _timeout: Duration) -> Result<(), EngineError> {
        match self.peers.lock().unwrap().get(&peer_id).cloned() {
            Some(engine) => {
                engine.on_request(tx.clone());
                Ok(())
            }
            None => Err(EngineError::MembershipStale(peer_id)),
        }
    }

    fn send_release(&self, peer_id: u32, _peer_addr: &str, tx: &Transaction, _timeout: Duration) -> Result<(), EngineError> {
        match self.peers.lock().unwrap().get(&peer_id).cloned() {
            Some(engine) => {
                engine.on_release(tx.clone());
                Ok(())
            }
            None => Err(EngineError::MembershipStale(peer_id)),
        }
    }

    fn registry_balance(&self, _registry_addr: &str, client_id: u32, _timeout: Duration) -> Result<f64, EngineError> {
        self.registry.balance(client_id)
    }

    fn registry_transfer(&self, _registry_addr: &str, tx: &Transaction, _timeout: Duration) -> Result<TransactionStatus, EngineError> {
        match self.registry.transfer(tx) {
            Ok(()) => Ok(TransactionStatus::Success),
            Err(_) => Ok(TransactionStatus::Abort),
        }
    }
}

/// Registers `num_peers` accounts against a fresh `Registry` and wires up
/// one fully-connected `Engine` per account.
fn build_network(num_peers: u32) -> (Arc<Registry>, Peers, HashMap<u32, Arc<Engine<NetworkTransport>>>) {
    let registry = Arc::new(Registry::new("registry"));
    let peers: Peers = Arc::new(Mutex::new(HashMap::new()));

    let ids: Vec<u32> = (0..num_peers).map(|_| registry.register().client_id).collect();

    let mut engines = HashMap::new();
    for &id in &ids {
        let mut catalog = PeersCatalog::new();
        for &other in &ids {
            if other != id {
                catalog.insert(other, other.to_string());
            }
        }
        let transport = NetworkTransport {
            registry: registry.clone(),
            peers: peers.clone(),
        };
        let engine = Arc::new(Engine::new(id, "registry", catalog, Duration::from_secs(1), Duration::ZERO, transport));
        engines.insert(id, engine);
    }

    *peers.lock().unwrap() = engines.clone();
    (registry, peers, engines)
}

#[test]
fn a_simple_transfer_commits_on_the_sender_and_arrives_on_every_peer() {
    let (registry, _peers, engines) = build_network(3);

    engines[&1].initiate_transfer(2, 4.0).unwrap();
    engines[&1].tick().unwrap();

    assert_eq!(registry.balance(1).unwrap(), 6.0);
    assert_eq!(registry.balance(2).unwrap(), 14.0);

    for (_, engine) in &engines {
        engine.with_ledger(|ledger| assert_eq!(ledger.length(), 1));
    }
}

#[test]
fn insufficient_balance_aborts_without_moving_funds() {
    let (registry, _peers, engines) = build_network(2);

    engines[&1].initiate_transfer(2, 1_000.0).unwrap();
    engines[&1].tick().unwrap();

    assert_eq!(registry.balance(1).unwrap(), 10.0);
    assert_eq!(registry.balance(2).unwrap(), 10.0);

    engines[&1].with_ledger(|ledger| {
        assert!(matches!(
            ledger.head().unwrap().transaction().status(),
            TransactionStatus::Abort
        ));
    });
}

#[test]
fn self_transfer_is_rejected_before_touching_the_clock_or_queues() {
    let (_registry, _peers, engines) = build_network(2);

    let err = engines[&1].initiate_transfer(1, 1.0).unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransfer(_)));
    assert_eq!(engines[&1].clock_value(), 0);
    assert_eq!(engines[&1].ledger_length(), 0);
}

#[test]
fn a_later_request_waits_behind_an_earlier_one_still_pending_in_the_queue() {
    let (registry, _peers, engines) = build_network(3);
    let peer1 = &engines[&1];

    // A remote, lower-clock request arrives first and is never released —
    // simulating a transfer still in flight elsewhere in the system.
    let early = Transaction::new(99, 1, 1.0, 1);
    peer1.on_request(early.clone());

    // peer1's own request is stamped with a higher clock, since its clock
    // already advanced past 1 when it received `early`.
    peer1.initiate_transfer(2, 5.0).unwrap();

    // the gate predicate cannot hold: the head of peer1's message queue is
    // still `early`, not its own request.
    peer1.tick().unwrap();
    assert_eq!(peer1.ledger_length(), 0);
    assert_eq!(registry.balance(1).unwrap(), 10.0);

    // once the earlier request is released, peer1's own request becomes
    // the queue head and the next tick can commit it. The release itself
    // appends a block too, so the ledger grows by one before the commit
    // and by one more after it.
    peer1.on_release(early);
    assert_eq!(peer1.ledger_length(), 1);

    peer1.tick().unwrap();
    assert_eq!(peer1.ledger_length(), 2);
    assert_eq!(registry.balance(1).unwrap(), 5.0);
}

#[test]
fn a_peer_that_joins_after_a_request_is_broadcast_is_not_counted_in_its_reply_quorum() {
    let (registry, peers, engines) = build_network(2);

    engines[&1].initiate_transfer(2, 4.0).unwrap();

    // a third peer joins mid-flight, after the request went out to peer 2
    // only; it must not retroactively raise the bar for this transfer.
    let late_id = registry.register().client_id;
    let late_transport = NetworkTransport {
        registry: registry.clone(),
        peers: peers.clone(),
    };
    let late_engine = Arc::new(Engine::new(
        late_id,
        "registry",
        PeersCatalog::new(),
        Duration::from_secs(1),
        Duration::ZERO,
        late_transport,
    ));
    peers.lock().unwrap().insert(late_id, late_engine);
    engines[&1].insert_peer(late_id, late_id.to_string());

    engines[&1].tick().unwrap();
    assert_eq!(engines[&1].ledger_length(), 1);
}

#[test]
fn a_departed_peer_is_no_longer_required_to_reply() {
    let (registry, _peers, engines) = build_network(3);

    engines[&1].remove_peer(3);
    engines[&1].initiate_transfer(2, 2.0).unwrap();
    engines[&1].tick().unwrap();

    assert_eq!(engines[&1].ledger_length(), 1);
    assert_eq!(registry.balance(2).unwrap(), 12.0);
}

#[test]
fn independently_built_chains_for_the_same_transfer_hash_identically() {
    let (_registry, _peers, engines) = build_network(2);

    engines[&1].initiate_transfer(2, 3.0).unwrap();
    engines[&1].tick().unwrap();

    let hash_on_sender = engines[&1].with_ledger(|ledger| ledger.head().unwrap().hash());
    let hash_on_recipient = engines[&2].with_ledger(|ledger| ledger.head().unwrap().hash());

    assert_eq!(hash_on_sender, hash_on_recipient);
}

#[test]
fn balance_query_is_a_pure_read_that_still_advances_the_local_clock() {
    let (registry, _peers, engines) = build_network(2);

    let before = engines[&1].clock_value();
    let balance = engines[&1].balance_query().unwrap();

    assert_eq!(balance, registry.balance(1).unwrap());
    assert_eq!(engines[&1].clock_value(), before + 1);
    assert_eq!(engines[&1].ledger_length(), 0);
}

#[test]
fn a_timed_out_peer_leaves_the_transfer_queued_with_no_rollback() {
    let (_registry, peers, engines) = build_network(2);

    // remove peer 2 from the shared network map so peer 1's broadcast to
    // it fails, without telling peer 1 its peer list shrank.
    peers.lock().unwrap().remove(&2);

    let err = engines[&1].initiate_transfer(2, 4.0).unwrap_err();
    assert!(matches!(err, EngineError::ProtocolTimeout));

    assert_eq!(engines[&1].sending_queue_snapshot().len(), 1);
    assert_eq!(engines[&1].message_queue_snapshot().len(), 1);

    engines[&1].tick().unwrap();
    assert_eq!(engines[&1].ledger_length(), 0);
}
