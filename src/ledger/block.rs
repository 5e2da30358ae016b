use serde::{Serialize, Serializer};
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::transaction::Transaction;

fn serialize_hash<S: Serializer>(hash: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(hash))
}

/// A single ledger entry: one transaction plus the hash of the entry
/// before it. There is deliberately no forward "next" pointer here — the
/// chain's `Vec` order is the single source of truth, so a block can't be
/// wired into a cycle by construction (see the chain's own doc comment).
#[derive(Clone, Debug, Serialize)]
pub struct Block {
    transaction: Transaction,
    #[serde(serialize_with = "serialize_hash")]
    previous_hash: [u8; 32],
}

impl Block {
    pub(super) fn new(transaction: Transaction, previous_hash: [u8; 32]) -> Self {
        Self {
            transaction,
            previous_hash,
        }
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn previous_hash(&self) -> &[u8; 32] {
        &self.previous_hash
    }

    /// The digest of the canonical encoding of this block's {transaction,
    /// previous_hash} pair. `serde_json`'s default map type is a
    /// `BTreeMap`, so keys come out lexicographically sorted without any
    /// canonicalisation pass of our own — two peers serializing the same
    /// block this way produce byte-identical input to the hash.
    pub fn hash(&self) -> [u8; 32] {
        let canonical = json!({
            "transaction": self.transaction,
            "previous_hash": hex::encode(self.previous_hash),
        });
        let bytes = serde_json::to_vec(&canonical).expect("JSON values always serialize");

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        hasher.finalize().into()
    }
}

/// The digest of the empty string, used as the head block's fixed
/// `previous_hash` sentinel.
pub fn empty_digest() -> [u8; 32] {
    Sha256::new().finalize().into()
}
