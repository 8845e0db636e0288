use crate::{
    config::LedgerConfig,
    constants::PARALLEL_BATCH_SIZE,
    error::LedgerError,
    pow::{valid_proof, SearchControl},
};
use rayon::prelude::*;
use tracing::debug;

/// Scan one batch in parallel. `find_first` keeps the lowest winning index,
/// so batching does not change which proof is found.
fn search_batch(previous_proof: u64, start: u64, config: &LedgerConfig) -> Option<u64> {
    let end = start.saturating_add(PARALLEL_BATCH_SIZE);
    (start..end)
        .into_par_iter()
        .find_first(|candidate| valid_proof(previous_proof, *candidate, config))
}

/// Parallel counterpart of [`crate::pow::find_proof`]; returns the same proof.
pub fn find_proof_parallel(previous_proof: u64, config: &LedgerConfig) -> u64 {
    let mut start = 0u64;
    loop {
        if let Some(found) = search_batch(previous_proof, start, config) {
            return found;
        }
        start = start.wrapping_add(PARALLEL_BATCH_SIZE);
    }
}

/// Parallel counterpart of [`crate::pow::find_proof_until`]. `control` is
/// consulted between batches.
pub fn find_proof_parallel_until(
    previous_proof: u64,
    config: &LedgerConfig,
    control: &SearchControl,
) -> Result<u64, LedgerError> {
    let control = control.started();
    let mut start = 0u64;
    loop {
        control.check(start)?;
        if let Some(found) = search_batch(previous_proof, start, config) {
            debug!(previous_proof, found, "parallel proof search finished");
            return Ok(found);
        }
        start = start.wrapping_add(PARALLEL_BATCH_SIZE);
    }
}
