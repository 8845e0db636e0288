pub mod chain;
pub mod config;
pub mod constants;
pub mod error;
pub mod mine;
pub mod pow;

use serde::{Deserialize, Serialize};
use std::{
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};

pub use chain::{verify_chain, Ledger};
pub use config::{HashAlgorithm, LedgerConfig};
pub use error::{ChainFault, LedgerError};
pub use pow::{CancelFlag, SearchControl};

pub type Hash = [u8; 32];

/// An opaque transaction descriptor. The ledger never inspects its content.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transaction(String);

impl Transaction {
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self(descriptor.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Transaction {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Transaction {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for Transaction {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Unix seconds at commit time.
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    /// Hex digest of the preceding block, empty for genesis.
    pub prev_hash: String,
    pub proof: u64,
    pub hash: String,
}

impl Block {
    /// Build a block and seal it with its content hash.
    pub fn new(
        index: u64,
        timestamp: u64,
        transactions: Vec<Transaction>,
        prev_hash: String,
        proof: u64,
        algorithm: HashAlgorithm,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp,
            transactions,
            prev_hash,
            proof,
            hash: String::new(),
        };
        block.hash = block.compute_hash(algorithm);
        block
    }

    /// Canonical preimage: `index:timestamp:transactions_json:prev_hash:proof`.
    ///
    /// This layout is part of the chain format. Changing it invalidates every
    /// hash already committed.
    pub fn hash_preimage(&self) -> Vec<u8> {
        let txs =
            serde_json::to_string(&self.transactions).expect("string lists always serialize");
        format!(
            "{}:{}:{}:{}:{}",
            self.index, self.timestamp, txs, self.prev_hash, self.proof
        )
        .into_bytes()
    }

    pub fn compute_hash(&self, algorithm: HashAlgorithm) -> String {
        hex::encode(algorithm.digest(&self.hash_preimage()))
    }

    /// Whether the stored `hash` still matches the block's fields.
    pub fn is_sealed(&self, algorithm: HashAlgorithm) -> bool {
        self.hash == self.compute_hash(algorithm)
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.prev_hash.is_empty()
    }
}

/// Hex content hash of `block`, ignoring whatever is stored in `block.hash`.
pub fn compute_hash(block: &Block, algorithm: HashAlgorithm) -> String {
    block.compute_hash(algorithm)
}

/// The sentinel first block: index 0, no predecessor, seeded proof.
pub fn genesis_block(config: &LedgerConfig, timestamp: u64) -> Block {
    Block::new(
        0,
        timestamp,
        vec![Transaction::new(config.genesis_transaction.clone())],
        String::new(),
        config.genesis_proof,
        config.hash_algorithm,
    )
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
