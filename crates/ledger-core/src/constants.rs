pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
/// Bits covered by one hex character of a digest.
pub const BITS_PER_HEX_CHAR: u32 = 4;

pub const DEFAULT_DIFFICULTY: u32 = 4;
pub const MIN_DIFFICULTY: u32 = 1;
pub const MAX_DIFFICULTY: u32 = HASH_HEX_SIZE as u32;

pub const GENESIS_PROOF: u64 = 100;
pub const GENESIS_TRANSACTION: &str = "Genesis Block";

/// How many candidates the sequential search tries between interrupt checks.
pub const CANCEL_CHECK_INTERVAL: u64 = 4096;
/// Candidates scanned per rayon batch in the parallel search.
pub const PARALLEL_BATCH_SIZE: u64 = 1 << 14;
