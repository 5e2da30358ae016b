pub mod block;

pub use block::Block;
use block::empty_digest;

use crate::transaction::Transaction;

/// A per-peer, append-only, hash-linked record of committed transactions.
/// Not a proof-of-work or proof-of-stake chain — it exists purely to make
/// the locally-agreed Lamport order tamper-evident.
#[derive(Clone, Debug, Default)]
pub struct BlockChain {
    blocks: Vec<Block>,
}

impl BlockChain {
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    pub fn head(&self) -> Option<&Block> {
        self.blocks.first()
    }

    pub fn tail(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn length(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Inserts a block carrying `transaction`, then restores invariants S
    /// (Lamport order) and H1/H2 (hash linkage) by re-sorting the whole
    /// sequence and sweeping front-to-back. Cheap enough for the ledger
    /// sizes this system deals with; callers must not append the same
    /// transaction twice (the ledger itself does not de-duplicate).
    pub fn append(&mut self, transaction: Transaction) {
        self.blocks.push(Block::new(transaction, [0u8; 32]));
        self.resort_and_relink();
    }

    fn resort_and_relink(&mut self) {
        self.blocks
            .sort_by_key(|block| block.transaction().lamport_key());

        let mut previous_hash = empty_digest();
        for block in &mut self.blocks {
            *block = Block::new(block.transaction().clone(), previous_hash);
            previous_hash = block.hash();
        }
    }
}
