mod transaction_validator;

pub use transaction_validator::{TransactionValidator, ValidateError};

use chrono::Local;
use serde::{Deserialize, Serialize};

/*
    A Transaction is the unit the whole system orders and commits. It is
    immutable once broadcast except for `status` (set exactly once, by the
    sender, at commit time) and `num_replies` (sender-local bookkeeping,
    never serialized out to other peers as meaningful input).

    Equality is identity equality — (sender_id, recipient_id, amount,
    sender_logic_clock, timestamp) — and deliberately ignores `status` and
    `num_replies`, so that a peer can recognise its own in-flight request
    inside a reply or a release message even after those two fields have
    moved. Lamport ordering is a *separate* relation (`lamport_key`), used
    for sorting queues and the ledger; we don't implement `Ord` on
    `Transaction` itself so the two relations can't be confused for one
    another.
*/

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Success,
    Abort,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Transaction {
    sender_id: u32,
    recipient_id: u32,
    amount: f64,
    sender_logic_clock: u64,
    timestamp: String,
    status: TransactionStatus,
    num_replies: u32,
}

impl Transaction {
    pub fn new(sender_id: u32, recipient_id: u32, amount: f64, sender_logic_clock: u64) -> Self {
        Self {
            sender_id,
            recipient_id,
            amount,
            sender_logic_clock,
            timestamp: Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            status: TransactionStatus::Pending,
            num_replies: 0,
        }
    }

    /// The total order this system agrees on: (sender_logic_clock, sender_id).
    /// Ties on clock resolve by sender id, which is unique per peer, so
    /// the order is strict and total.
    pub fn lamport_key(&self) -> (u64, u32) {
        (self.sender_logic_clock, self.sender_id)
    }

    pub fn increment_num_replies(&mut self) {
        self.num_replies += 1;
    }

    pub fn set_status(&mut self, status: TransactionStatus) {
        self.status = status;
    }

    // getters

    pub fn sender_id(&self) -> u32 {
        self.sender_id
    }

    pub fn recipient_id(&self) -> u32 {
        self.recipient_id
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn sender_logic_clock(&self) -> u64 {
        self.sender_logic_clock
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn status(&self) -> &TransactionStatus {
        &self.status
    }

    pub fn num_replies(&self) -> u32 {
        self.num_replies
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.sender_id == other.sender_id
            && self.recipient_id == other.recipient_id
            && self.amount == other.amount
            && self.sender_logic_clock == other.sender_logic_clock
            && self.timestamp == other.timestamp
    }
}

impl Eq for Transaction {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_status_and_num_replies() {
        let mut a = Transaction::new(1, 2, 4.0, 1);
        let b = a.clone();

        a.set_status(TransactionStatus::Success);
        a.increment_num_replies();

        assert_eq!(a, b);
    }

    #[test]
    fn equality_distinguishes_identity_fields() {
        let a = Transaction::new(1, 2, 4.0, 1);
        let mut b = a.clone();
        b.sender_logic_clock = 2;

        assert_ne!(a, b);
    }

    #[test]
    fn lamport_key_breaks_ties_by_sender_id() {
        let a = Transaction::new(1, 3, 1.0, 5);
        let b = Transaction::new(2, 3, 1.0, 5);

        assert!(a.lamport_key() < b.lamport_key());
    }
}
