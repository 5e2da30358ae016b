use std::collections::VecDeque;

use crate::transaction::Transaction;

/// Transactions this peer originated and has not yet completed. The
/// sender is the only mutator; FIFO by insertion time.
#[derive(Clone, Debug, Default)]
pub struct SendingQueue {
    items: VecDeque<Transaction>,
}

impl SendingQueue {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    pub fn push(&mut self, tx: Transaction) {
        self.items.push_back(tx);
    }

    pub fn head(&self) -> Option<&Transaction> {
        self.items.front()
    }

    pub fn head_mut(&mut self) -> Option<&mut Transaction> {
        self.items.front_mut()
    }

    /// Removes and returns the head, used once a transfer commits.
    pub fn pop_head(&mut self) -> Option<Transaction> {
        self.items.pop_front()
    }

    /// Finds the entry identity-equal to `tx`, e.g. to record an
    /// incoming reply against the right in-flight request.
    pub fn find_mut(&mut self, tx: &Transaction) -> Option<&mut Transaction> {
        self.items.iter_mut().find(|t| *t == tx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Transactions of any origin currently outstanding in the ordering
/// protocol, always kept in Lamport order.
#[derive(Clone, Debug, Default)]
pub struct MessageQueue {
    items: Vec<Transaction>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Inserts `tx` and restores Lamport order. The queue is small enough
    /// in practice that a full re-sort after push is simpler than a
    /// binary-search insertion and costs nothing observable.
    pub fn insert(&mut self, tx: Transaction) {
        self.items.push(tx);
        self.items.sort_by_key(|t| t.lamport_key());
    }

    pub fn head(&self) -> Option<&Transaction> {
        self.items.first()
    }

    /// Removes the entry equal (by `Transaction`'s identity equality) to
    /// `tx`, if present. Returns whether an entry was removed.
    pub fn remove(&mut self, tx: &Transaction) -> bool {
        if let Some(pos) = self.items.iter().position(|t| t == tx) {
            self.items.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, tx: &Transaction) -> bool {
        self.items.iter().any(|t| t == tx)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.items.iter()
    }
}
