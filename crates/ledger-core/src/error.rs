use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("difficulty must be between 1 and {max}, got {got}")]
    InvalidDifficulty { got: u32, max: u32 },

    #[error("unknown hash algorithm: {0}")]
    UnknownHashAlgorithm(String),

    #[error("proof search cancelled after {attempts} attempts")]
    Cancelled { attempts: u64 },

    #[error("proof search exceeded its deadline after {attempts} attempts")]
    DeadlineExceeded { attempts: u64 },
}

/// Why a chain failed verification. Indices refer to the offending block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainFault {
    #[error("chain is empty")]
    Empty,

    #[error("first block is not a well-formed genesis block")]
    MalformedGenesis,

    #[error("block at position {position} has index {found}")]
    IndexOutOfSequence { position: u64, found: u64 },

    #[error("block {index} hash does not match its contents")]
    HashMismatch { index: u64 },

    #[error("block {index} does not link to its predecessor")]
    BrokenLink { index: u64 },

    #[error("block {index} carries a proof that misses the difficulty target")]
    InvalidProof { index: u64 },
}
