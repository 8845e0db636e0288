//! Ledger configuration: difficulty, digest algorithm and genesis seed.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512_256};

use crate::{
    constants::{
        DEFAULT_DIFFICULTY, GENESIS_PROOF, GENESIS_TRANSACTION, HASH_SIZE, MAX_DIFFICULTY,
        MIN_DIFFICULTY,
    },
    error::LedgerError,
    Hash,
};

/// 256-bit digest used for both block hashes and proof attempts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[default]
    #[serde(rename = "sha256")]
    Sha256,
    #[serde(rename = "sha512-256")]
    Sha512_256,
}

impl HashAlgorithm {
    pub fn digest(&self, bytes: &[u8]) -> Hash {
        let mut out = [0u8; HASH_SIZE];
        match self {
            HashAlgorithm::Sha256 => out.copy_from_slice(&Sha256::digest(bytes)[..]),
            HashAlgorithm::Sha512_256 => out.copy_from_slice(&Sha512_256::digest(bytes)[..]),
        }
        out
    }

    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512_256 => "sha512-256",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "sha512-256" | "sha512_256" | "sha-512/256" => Ok(HashAlgorithm::Sha512_256),
            _ => Err(LedgerError::UnknownHashAlgorithm(s.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Number of leading `'0'` hex characters a proof digest must carry.
    pub difficulty: u32,
    pub hash_algorithm: HashAlgorithm,
    pub genesis_proof: u64,
    pub genesis_transaction: String,
    /// Fan the proof search out over the rayon pool.
    pub parallel_search: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            hash_algorithm: HashAlgorithm::default(),
            genesis_proof: GENESIS_PROOF,
            genesis_transaction: GENESIS_TRANSACTION.to_string(),
            parallel_search: false,
        }
    }
}

impl LedgerConfig {
    pub fn with_difficulty(difficulty: u32) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&self.difficulty) {
            return Err(LedgerError::InvalidDifficulty {
                got: self.difficulty,
                max: MAX_DIFFICULTY,
            });
        }
        Ok(())
    }
}
