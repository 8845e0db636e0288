//! Proof-of-work: find a candidate whose digest, taken together with the
//! previous proof, starts with `difficulty` zero hex characters.
//!
//! The search is a pure function of `(previous_proof, difficulty, algorithm)`
//! and always returns the smallest winning candidate. Verifying a proof takes a
//! single digest evaluation (see [`valid_proof`]).

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use crate::{
    config::{HashAlgorithm, LedgerConfig},
    constants::{BITS_PER_HEX_CHAR, CANCEL_CHECK_INTERVAL},
    error::LedgerError,
    Hash,
};

/// Shared flag an operator can set to abort a running search.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Once set the flag stays set.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Stop conditions for an interruptible search.
#[derive(Clone, Debug, Default)]
pub struct SearchControl {
    cancel: CancelFlag,
    deadline: Option<Instant>,
    timeout: Option<Duration>,
}

impl SearchControl {
    pub fn new(cancel: CancelFlag) -> Self {
        Self {
            cancel,
            deadline: None,
            timeout: None,
        }
    }

    /// Absolute cut-off, counted from whenever the caller built it.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Time budget for the search itself. The clock starts when a search
    /// begins, so time spent queued behind another miner is not charged.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Copy with the timeout turned into a deadline from now. The earlier of
    /// that and any explicit deadline wins.
    pub fn started(&self) -> Self {
        let mut control = self.clone();
        if let Some(timeout) = control.timeout.take() {
            let from_now = Instant::now() + timeout;
            control.deadline = Some(control.deadline.map_or(from_now, |d| d.min(from_now)));
        }
        control
    }

    /// Cancellation wins over an expired deadline when both hold.
    pub fn check(&self, attempts: u64) -> Result<(), LedgerError> {
        if self.cancel.is_cancelled() {
            return Err(LedgerError::Cancelled { attempts });
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(LedgerError::DeadlineExceeded { attempts })
            }
            _ => Ok(()),
        }
    }
}

/// Digest of the two-field proof preimage `"{previous_proof}{candidate}"`.
pub fn proof_digest(previous_proof: u64, candidate: u64, algorithm: HashAlgorithm) -> Hash {
    algorithm.digest(format!("{previous_proof}{candidate}").as_bytes())
}

pub fn count_leading_zero_bits(hash: &Hash) -> u32 {
    let mut total = 0u32;
    for b in hash {
        if *b == 0 {
            total += 8;
        } else {
            total += b.leading_zeros();
            break;
        }
    }
    total
}

/// True when the first `difficulty` hex characters of `hash` are all `'0'`.
pub fn meets_difficulty(hash: &Hash, difficulty: u32) -> bool {
    count_leading_zero_bits(hash) >= difficulty.saturating_mul(BITS_PER_HEX_CHAR)
}

pub fn valid_proof(previous_proof: u64, candidate: u64, config: &LedgerConfig) -> bool {
    meets_difficulty(
        &proof_digest(previous_proof, candidate, config.hash_algorithm),
        config.difficulty,
    )
}

/// Unbounded search starting at candidate 0.
pub fn find_proof(previous_proof: u64, config: &LedgerConfig) -> u64 {
    let mut candidate = 0u64;
    while !valid_proof(previous_proof, candidate, config) {
        candidate = candidate.wrapping_add(1);
    }
    candidate
}

/// Same search as [`find_proof`], checking `control` before the first
/// candidate and every [`CANCEL_CHECK_INTERVAL`] candidates after that.
/// A timeout on `control` starts counting here.
pub fn find_proof_until(
    previous_proof: u64,
    config: &LedgerConfig,
    control: &SearchControl,
) -> Result<u64, LedgerError> {
    let control = control.started();
    let mut candidate = 0u64;
    loop {
        if candidate % CANCEL_CHECK_INTERVAL == 0 {
            control.check(candidate)?;
        }
        if valid_proof(previous_proof, candidate, config) {
            return Ok(candidate);
        }
        candidate = candidate.wrapping_add(1);
    }
}
