//! The ledger: committed chain plus pending transaction pool.

use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::{
    config::LedgerConfig,
    error::{ChainFault, LedgerError},
    genesis_block, mine,
    pow::{self, SearchControl},
    unix_now, Block, Transaction,
};

#[derive(Debug)]
struct LedgerState {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
}

/// Single-chain ledger shared between concurrent producers and miners.
///
/// Chain and pending pool sit behind one `RwLock`; every read hands back a
/// copy. Miners are serialized by a separate mutex, so the proof search runs
/// without blocking submissions while the tip stays fixed. The pool drain and
/// the block append happen under a single write lock.
#[derive(Debug)]
pub struct Ledger {
    config: LedgerConfig,
    state: RwLock<LedgerState>,
    miner: Mutex<()>,
}

impl Ledger {
    /// Validate `config` and install the genesis block.
    pub fn new(config: LedgerConfig) -> Result<Self, LedgerError> {
        config.validate()?;
        let genesis = genesis_block(&config, unix_now());
        info!(hash = %genesis.hash, difficulty = config.difficulty, "genesis block created");
        Ok(Self {
            config,
            state: RwLock::new(LedgerState {
                chain: vec![genesis],
                pending: Vec::new(),
            }),
            miner: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // Every mutation is a single push or take, so a poisoned lock never
    // guards a half-applied change.
    fn read(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a transaction for the next block. Returns the pool size after the push.
    pub fn add_transaction(&self, tx: impl Into<Transaction>) -> usize {
        let tx = tx.into();
        let mut state = self.write();
        state.pending.push(tx);
        let pending = state.pending.len();
        drop(state);
        debug!(pending, "transaction queued");
        pending
    }

    pub fn last_block(&self) -> Block {
        self.read()
            .chain
            .last()
            .cloned()
            .expect("ledger always holds its genesis block")
    }

    /// Index of the tip.
    pub fn height(&self) -> u64 {
        self.last_block().index
    }

    pub fn chain(&self) -> Vec<Block> {
        self.read().chain.clone()
    }

    pub fn pending(&self) -> Vec<Transaction> {
        self.read().pending.clone()
    }

    /// Mine a block from the whole pending pool. An empty pool still yields a
    /// block.
    pub fn mine(&self) -> Block {
        let _miner = self.miner.lock().unwrap_or_else(PoisonError::into_inner);
        let last = self.last_block();
        let proof = if self.config.parallel_search {
            mine::find_proof_parallel(last.proof, &self.config)
        } else {
            pow::find_proof(last.proof, &self.config)
        };
        self.commit(&last, proof)
    }

    /// Like [`Ledger::mine`], but gives up when `control` is cancelled or its
    /// deadline passes. A timeout on `control` only starts once this call holds
    /// the miner lock. On error neither the chain nor the pending pool changes.
    pub fn mine_until(&self, control: &SearchControl) -> Result<Block, LedgerError> {
        let _miner = self.miner.lock().unwrap_or_else(PoisonError::into_inner);
        let last = self.last_block();
        let found = if self.config.parallel_search {
            mine::find_proof_parallel_until(last.proof, &self.config, control)
        } else {
            pow::find_proof_until(last.proof, &self.config, control)
        };
        match found {
            Ok(proof) => Ok(self.commit(&last, proof)),
            Err(err) => {
                warn!(index = last.index + 1, %err, "proof search interrupted");
                Err(err)
            }
        }
    }

    /// Drain the pool into a new block on top of `last` and append it.
    /// Caller must hold the miner lock.
    fn commit(&self, last: &Block, proof: u64) -> Block {
        let mut state = self.write();
        debug_assert_eq!(state.chain.last().map(|b| &b.hash), Some(&last.hash));
        let transactions = std::mem::take(&mut state.pending);
        let block = Block::new(
            last.index + 1,
            unix_now().max(last.timestamp),
            transactions,
            last.hash.clone(),
            proof,
            self.config.hash_algorithm,
        );
        state.chain.push(block.clone());
        drop(state);
        info!(
            index = block.index,
            proof = block.proof,
            hash = %block.hash,
            txs = block.transactions.len(),
            "mined block"
        );
        block
    }

    /// True iff the chain passes [`verify_chain`].
    pub fn validate(&self) -> bool {
        self.verify().is_ok()
    }

    /// Like [`Ledger::validate`], but names the first offending block.
    /// Works on a snapshot, so writers are not held up by the walk.
    pub fn verify(&self) -> Result<(), ChainFault> {
        let chain = self.chain();
        verify_chain(&chain, &self.config).inspect_err(|fault| {
            warn!(%fault, "chain verification failed");
        })
    }
}

/// Re-validate a chain from scratch, e.g. one received from another party.
///
/// Block 0 must be a self-consistent genesis block. Every later block must
/// sit at its own index, hash to its stored digest, point at its
/// predecessor's digest and carry a proof that meets the difficulty.
pub fn verify_chain(chain: &[Block], config: &LedgerConfig) -> Result<(), ChainFault> {
    let algorithm = config.hash_algorithm;
    let genesis = chain.first().ok_or(ChainFault::Empty)?;
    if !genesis.is_genesis() || !genesis.is_sealed(algorithm) {
        return Err(ChainFault::MalformedGenesis);
    }

    for (position, pair) in (1u64..).zip(chain.windows(2)) {
        let (prev, block) = (&pair[0], &pair[1]);
        if block.index != position {
            return Err(ChainFault::IndexOutOfSequence {
                position,
                found: block.index,
            });
        }
        if !block.is_sealed(algorithm) {
            return Err(ChainFault::HashMismatch { index: block.index });
        }
        if block.prev_hash != prev.hash {
            return Err(ChainFault::BrokenLink { index: block.index });
        }
        if !pow::valid_proof(prev.proof, block.proof, config) {
            return Err(ChainFault::InvalidProof { index: block.index });
        }
    }
    Ok(())
}
