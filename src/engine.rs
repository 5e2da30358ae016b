//! The ordering and mutual-exclusion engine. One peer-wide state struct
//! behind a single mutex, network I/O released outside the lock, and a
//! polling loop (`tick`) that drives commits once a transfer's replies
//! are all in.

use std::collections::HashMap;
use std::time::Duration;

use log::{info, warn};

use crate::clock::LogicalClock;
use crate::error::EngineError;
use crate::history;
use crate::ledger::BlockChain;
use crate::peer::PeersCatalog;
use crate::queue::{MessageQueue, SendingQueue};
use crate::transaction::{Transaction, TransactionStatus, TransactionValidator};
use crate::wire::{self, BalanceResponse, ResultResponse};
use std::sync::Mutex;

/// Everything a remote peer or the Registry can do for us, abstracted so
/// tests can swap a real HTTP transport for an in-process stub. A
/// production binary uses `HttpTransport` exclusively.
pub trait Transport: Send + Sync {
    fn send_request(&self, peer_id: u32, peer_addr: &str, tx: &Transaction, timeout: Duration) -> Result<(), EngineError>;
    fn send_release(&self, peer_id: u32, peer_addr: &str, tx: &Transaction, timeout: Duration) -> Result<(), EngineError>;
    fn registry_balance(&self, registry_addr: &str, client_id: u32, timeout: Duration) -> Result<f64, EngineError>;
    fn registry_transfer(&self, registry_addr: &str, tx: &Transaction, timeout: Duration) -> Result<TransactionStatus, EngineError>;
}

/// The real, blocking HTTP transport.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpTransport;

impl Transport for HttpTransport {
    fn send_request(&self, peer_id: u32, peer_addr: &str, tx: &Transaction, timeout: Duration) -> Result<(), EngineError> {
        wire::post_json::<_, ResultResponse>(peer_addr, "/transfer-request", tx, timeout)
            .map(|_| ())
            .map_err(|_| {
                warn!("peer {peer_id} did not reply to transfer-request in time");
                EngineError::ProtocolTimeout
            })
    }

    fn send_release(&self, peer_id: u32, peer_addr: &str, tx: &Transaction, timeout: Duration) -> Result<(), EngineError> {
        wire::post_json::<_, ResultResponse>(peer_addr, "/transfer-finish", tx, timeout)
            .map(|_| ())
            .map_err(|_| EngineError::MembershipStale(peer_id))
    }

    fn registry_balance(&self, registry_addr: &str, client_id: u32, timeout: Duration) -> Result<f64, EngineError> {
        let path = format!("/balance/{client_id}");
        match wire::get_json::<BalanceResponse>(registry_addr, &path, timeout) {
            Ok(resp) => Ok(resp.balance),
            Err(crate::error::WireError::Status { status: 404, .. }) => Err(EngineError::UnknownAccount(client_id)),
            Err(_) => Err(EngineError::ProtocolTimeout),
        }
    }

    fn registry_transfer(&self, registry_addr: &str, tx: &Transaction, timeout: Duration) -> Result<TransactionStatus, EngineError> {
        match wire::post_json::<_, ResultResponse>(registry_addr, "/transfer", tx, timeout) {
            Ok(resp) if resp.result == "success" => Ok(TransactionStatus::Success),
            Ok(_) => Ok(TransactionStatus::Abort),
            Err(_) => Err(EngineError::ProtocolTimeout),
        }
    }
}

/// The clock, queues, and ledger behind one mutex, plus the address book
/// (membership is eventual and not load-bearing for ordering, but sits
/// behind the same lock for simplicity) and the per-in-flight-transfer
/// required-reply count.
struct EngineState {
    clock: LogicalClock,
    sending_queue: SendingQueue,
    message_queue: MessageQueue,
    ledger: BlockChain,
    peers: PeersCatalog,
    /// Number of other peers this peer had at the moment each of its own
    /// pending transfers was broadcast, keyed by that transfer's
    /// `sender_logic_clock`. The commit gate compares `num_replies`
    /// against this snapshot, not against `peers.len()` read live — a
    /// peer that joins mid-flight must not retroactively raise the bar
    /// for a transfer already in flight.
    required_replies: HashMap<u64, usize>,
}

pub struct Engine<T: Transport = HttpTransport> {
    id: u32,
    registry_addr: String,
    rpc_timeout: Duration,
    transfer_delay: Duration,
    transport: T,
    state: Mutex<EngineState>,
}

impl<T: Transport> Engine<T> {
    pub fn new(
        id: u32,
        registry_addr: impl Into<String>,
        peers: PeersCatalog,
        rpc_timeout: Duration,
        transfer_delay: Duration,
        transport: T,
    ) -> Self {
        Self {
            id,
            registry_addr: registry_addr.into(),
            rpc_timeout,
            transfer_delay,
            transport,
            state: Mutex::new(EngineState {
                clock: LogicalClock::new(),
                sending_queue: SendingQueue::new(),
                message_queue: MessageQueue::new(),
                ledger: BlockChain::new(),
                peers,
                required_replies: HashMap::new(),
            }),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn clock_value(&self) -> u64 {
        self.state.lock().unwrap().clock.value()
    }

    pub fn ledger_length(&self) -> usize {
        self.state.lock().unwrap().ledger.length()
    }

    pub fn with_ledger<R>(&self, f: impl FnOnce(&BlockChain) -> R) -> R {
        f(&self.state.lock().unwrap().ledger)
    }

    pub fn insert_peer(&self, id: u32, addr: String) {
        self.state.lock().unwrap().peers.insert(id, addr);
    }

    pub fn remove_peer(&self, id: u32) {
        self.state.lock().unwrap().peers.remove(id);
    }

    pub fn peer_count(&self) -> usize {
        self.state.lock().unwrap().peers.len()
    }

    pub fn sending_queue_snapshot(&self) -> Vec<Transaction> {
        let state = self.state.lock().unwrap();
        state.sending_queue.iter().cloned().collect()
    }

    pub fn message_queue_snapshot(&self) -> Vec<Transaction> {
        let state = self.state.lock().unwrap();
        state.message_queue.iter().cloned().collect()
    }

    // ---- local operations -----------------------------------------

    /// Step 1 of initiate_transfer: validated before any clock or queue
    /// mutation, so an invalid transfer is rejected without side effects.
    pub fn initiate_transfer(&self, recipient_id: u32, amount: f64) -> Result<(), EngineError> {
        {
            let state = self.state.lock().unwrap();
            if recipient_id != self.id && !state.peers.contains(recipient_id) {
                return Err(EngineError::UnknownAccount(recipient_id));
            }
        }
        TransactionValidator::validate(&Transaction::new(self.id, recipient_id, amount, 0))?;

        let (tx, peer_addrs) = {
            let mut state = self.state.lock().unwrap();
            let clock_value = state.clock.send_event();
            let tx = Transaction::new(self.id, recipient_id, amount, clock_value);

            state.sending_queue.push(tx.clone());
            state.message_queue.insert(tx.clone());

            let required = state.peers.len();
            state.required_replies.insert(clock_value, required);

            let addrs: Vec<(u32, String)> = state
                .peers
                .iter()
                .map(|p| (p.id(), p.addr().to_string()))
                .collect();
            (tx, addrs)
        };

        history::log_request(self.id, recipient_id, amount);

        for (peer_id, addr) in &peer_addrs {
            match self.transport.send_request(*peer_id, addr, &tx, self.rpc_timeout) {
                Ok(()) => {
                    let mut state = self.state.lock().unwrap();
                    if let Some(entry) = state.sending_queue.find_mut(&tx) {
                        entry.increment_num_replies();
                    }
                }
                Err(err) => {
                    // on timeout the transaction stays in both queues
                    // indefinitely; no automatic rollback or retry.
                    warn!("initiate_transfer({}): peer {peer_id} did not reply: {err}", self.id);
                    return Err(EngineError::ProtocolTimeout);
                }
            }
        }

        Ok(())
    }

    /// The commit gate predicate, invoked at a fixed cadence.
    pub fn tick(&self) -> Result<(), EngineError> {
        let ready = {
            let state = self.state.lock().unwrap();
            match (state.sending_queue.head(), state.message_queue.head()) {
                (Some(send_head), Some(msg_head)) if send_head == msg_head => {
                    let required = state
                        .required_replies
                        .get(&send_head.sender_logic_clock())
                        .copied()
                        .unwrap_or(usize::MAX);
                    send_head.num_replies() as usize == required
                }
                _ => false,
            }
        };

        if !ready {
            return Ok(());
        }

        let mut tx = {
            let state = self.state.lock().unwrap();
            state
                .sending_queue
                .head()
                .cloned()
                .expect("gate predicate held but sending_queue was empty")
        };

        // a. commit-time balance read: a pure query, not a recv-style
        // clock event.
        let balance = self.transport.registry_balance(&self.registry_addr, self.id, self.rpc_timeout)?;

        // b.
        if balance < tx.amount() {
            tx.set_status(TransactionStatus::Abort);
        } else {
            let status = self
                .transport
                .registry_transfer(&self.registry_addr, &tx, self.rpc_timeout)
                .unwrap_or(TransactionStatus::Abort);
            tx.set_status(status);
        }

        let peer_addrs = {
            let mut state = self.state.lock().unwrap();

            // c.
            state.ledger.append(tx.clone());

            let popped = state
                .sending_queue
                .pop_head()
                .expect("commit predicate held but sending_queue became empty under lock");
            assert_eq!(
                popped.lamport_key(),
                tx.lamport_key(),
                "sending_queue head changed identity while holding the lock"
            );

            // e.
            state.message_queue.remove(&tx);
            state.required_replies.remove(&tx.sender_logic_clock());

            info!(
                "peer {} committed transfer to {} as {:?}",
                self.id,
                tx.recipient_id(),
                tx.status()
            );
            history::log_commit(tx.recipient_id(), tx.amount(), tx.status().clone());

            state
                .peers
                .iter()
                .map(|p| (p.id(), p.addr().to_string()))
                .collect::<Vec<_>>()
        };

        // d.
        for (peer_id, addr) in peer_addrs {
            if self.transport.send_release(peer_id, &addr, &tx, self.rpc_timeout).is_err() {
                warn!("peer {peer_id} unreachable while broadcasting release (MembershipStale)");
            }
        }

        Ok(())
    }

    pub fn balance_query(&self) -> Result<f64, EngineError> {
        self.state.lock().unwrap().clock.local_event();
        self.transport.registry_balance(&self.registry_addr, self.id, self.rpc_timeout)
    }

    pub fn shutdown(&self, registry_addr: &str, shutdown_timeout: Duration) {
        let peer_addrs: Vec<(u32, String)> = {
            let state = self.state.lock().unwrap();
            state.peers.iter().map(|p| (p.id(), p.addr().to_string())).collect()
        };
        for (peer_id, addr) in peer_addrs {
            let path = format!("/exit/{}", self.id);
            let result: Result<ResultResponse, _> = wire::get_json(&addr, &path, shutdown_timeout);
            if result.is_err() {
                warn!("peer {peer_id} unreachable while notifying exit (MembershipStale)");
            }
        }
        let path = format!("/exit/{}", self.id);
        let result: Result<ResultResponse, _> = wire::get_json(registry_addr, &path, shutdown_timeout);
        if result.is_err() {
            warn!("registry unreachable while notifying exit (MembershipStale)");
        }
    }

    // ---- remote operations ----------------------------------------

    pub fn on_request(&self, tx: Transaction) {
        std::thread::sleep(self.transfer_delay);
        history::log_remote_request(tx.sender_id(), tx.recipient_id(), tx.amount());
        let mut state = self.state.lock().unwrap();
        state.clock.recv_event(tx.sender_logic_clock());
        state.message_queue.insert(tx);
    }

    pub fn on_release(&self, tx: Transaction) {
        std::thread::sleep(self.transfer_delay);
        history::log_remote_release(tx.sender_id(), tx.recipient_id(), tx.status().clone());
        let mut state = self.state.lock().unwrap();
        state.clock.recv_event(tx.sender_logic_clock());
        state.message_queue.remove(&tx);
        state.ledger.append(tx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    #[derive(Default)]
    struct StubTransport {
        reply_ok: StdMutex<bool>,
        registry_balance: StdMutex<f64>,
        transfer_status: StdMutex<Option<TransactionStatus>>,
    }

    impl Transport for StubTransport {
        fn send_request(&self, _peer_id: u32, _peer_addr: &str, _tx: &Transaction, _timeout: Duration) -> Result<(), EngineError> {
            if *self.reply_ok.lock().unwrap() {
                Ok(())
            } else {
                Err(EngineError::ProtocolTimeout)
            }
        }

        fn send_release(&self, _peer_id: u32, _peer_addr: &str, _tx: &Transaction, _timeout: Duration) -> Result<(), EngineError> {
            Ok(())
        }

        fn registry_balance(&self, _registry_addr: &str, _client_id: u32, _timeout: Duration) -> Result<f64, EngineError> {
            Ok(*self.registry_balance.lock().unwrap())
        }

        fn registry_transfer(&self, _registry_addr: &str, _tx: &Transaction, _timeout: Duration) -> Result<TransactionStatus, EngineError> {
            Ok(self
                .transfer_status
                .lock()
                .unwrap()
                .clone()
                .unwrap_or(TransactionStatus::Success))
        }
    }

    fn engine_with_one_peer(transport: StubTransport) -> Engine<StubTransport> {
        let mut peers = PeersCatalog::new();
        peers.insert(2, "peer-2".to_string());
        Engine::new(1, "registry", peers, Duration::from_secs(1), Duration::ZERO, transport)
    }

    #[test]
    fn initiate_transfer_rejects_unknown_recipient() {
        let engine = engine_with_one_peer(StubTransport {
            reply_ok: StdMutex::new(true),
            ..Default::default()
        });

        let err = engine.initiate_transfer(999, 1.0).unwrap_err();
        assert!(matches!(err, EngineError::UnknownAccount(999)));
    }

    #[test]
    fn initiate_transfer_rejects_self_transfer_without_mutating_state() {
        let engine = engine_with_one_peer(StubTransport {
            reply_ok: StdMutex::new(true),
            ..Default::default()
        });

        let err = engine.initiate_transfer(1, 1.0).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransfer(_)));
        assert_eq!(engine.clock_value(), 0);
    }

    #[test]
    fn tick_does_nothing_until_all_peers_have_replied() {
        let engine = engine_with_one_peer(StubTransport {
            reply_ok: StdMutex::new(true),
            registry_balance: StdMutex::new(10.0),
            transfer_status: StdMutex::new(Some(TransactionStatus::Success)),
        });

        engine.initiate_transfer(2, 4.0).unwrap();
        engine.tick().unwrap();

        // one peer replied, so the predicate holds and the ledger should
        // have exactly one committed block.
        assert_eq!(engine.ledger_length(), 1);
    }

    #[test]
    fn tick_commits_as_success_when_balance_covers_amount() {
        let engine = engine_with_one_peer(StubTransport {
            reply_ok: StdMutex::new(true),
            registry_balance: StdMutex::new(10.0),
            transfer_status: StdMutex::new(Some(TransactionStatus::Success)),
        });

        engine.initiate_transfer(2, 4.0).unwrap();
        engine.tick().unwrap();

        engine.with_ledger(|ledger| {
            assert_eq!(ledger.length(), 1);
            assert!(matches!(
                ledger.head().unwrap().transaction().status(),
                TransactionStatus::Success
            ));
        });
    }

    #[test]
    fn tick_aborts_when_balance_is_insufficient() {
        let engine = engine_with_one_peer(StubTransport {
            reply_ok: StdMutex::new(true),
            registry_balance: StdMutex::new(1.0),
            transfer_status: StdMutex::new(Some(TransactionStatus::Success)),
        });

        engine.initiate_transfer(2, 100.0).unwrap();
        engine.tick().unwrap();

        engine.with_ledger(|ledger| {
            assert!(matches!(
                ledger.head().unwrap().transaction().status(),
                TransactionStatus::Abort
            ));
        });
    }

    #[test]
    fn on_request_advances_clock_and_inserts_into_message_queue() {
        let engine = engine_with_one_peer(StubTransport::default());
        let tx = Transaction::new(2, 1, 3.0, 5);

        engine.on_request(tx.clone());

        assert_eq!(engine.clock_value(), 6);
    }

    #[test]
    fn timed_out_reply_leaves_the_transfer_in_queues_rather_than_rolling_back() {
        let engine = engine_with_one_peer(StubTransport {
            reply_ok: StdMutex::new(false),
            ..Default::default()
        });

        let err = engine.initiate_transfer(2, 4.0).unwrap_err();
        assert!(matches!(err, EngineError::ProtocolTimeout));

        // the transaction is still sitting in both queues: no automatic
        // rollback.
        engine.tick().unwrap();
        assert_eq!(engine.ledger_length(), 0);
    }

    #[test]
    fn a_late_joining_peer_is_not_required_to_reply_to_an_in_flight_transfer() {
        let engine = engine_with_one_peer(StubTransport {
            reply_ok: StdMutex::new(true),
            registry_balance: StdMutex::new(10.0),
            transfer_status: StdMutex::new(Some(TransactionStatus::Success)),
        });

        engine.initiate_transfer(2, 4.0).unwrap();
        // peer 3 joins mid-flight, after the request was already broadcast.
        engine.insert_peer(3, "peer-3".to_string());

        // the required-reply count was snapshotted before peer 3 joined,
        // so the single reply from peer 2 is still enough to commit.
        engine.tick().unwrap();
        assert_eq!(engine.ledger_length(), 1);
    }
}
