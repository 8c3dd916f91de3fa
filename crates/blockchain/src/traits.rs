use crate::{ChainError, ConsensusEngine};
use alloy_primitives::{B256, U256};
use ember_primitives::{Log, Receipts, SealedBlock, SealedHeader};
use ember_storage::{IndexedTransaction, InsertOutcome, SetHeadOutcome};
use std::sync::Arc;

/// Where a block handed to [`BlockChain::insert_block`] comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOrigin {
    /// Downloaded from a peer during sync.
    Sync,
    /// Sealed by this node.
    Local,
}

impl BlockOrigin {
    /// Label used in logs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Local => "local",
        }
    }
}

/// Canonical header and block lookups.
pub trait HeaderChain {
    /// Gets the canonical header at `number`.
    fn header_by_number(&self, number: u64) -> Result<SealedHeader, ChainError>;

    /// Gets the canonical header with the given hash.
    fn header_by_hash(&self, hash: B256) -> Result<SealedHeader, ChainError>;

    /// Gets the canonical block with the given hash.
    fn block_by_hash(&self, hash: B256) -> Result<SealedBlock, ChainError>;

    /// Gets the canonical block at `number`.
    fn block_by_number(&self, number: u64) -> Result<SealedBlock, ChainError>;
}

/// The chain interface driven by consensus and sync layers.
///
/// Insertion and [`BlockChain::set_head`] are the only calls that move the canonical chain.
/// [`BlockChain::write_receipts`] attaches receipts to a known block without touching it. Both
/// batch and single insertion run the same validation, weighing and fork-choice path.
pub trait BlockChain: HeaderChain {
    /// Gets the canonical head block.
    fn current_block(&self) -> Result<SealedBlock, ChainError>;

    /// Gets the genesis block.
    fn genesis_block(&self) -> Result<SealedBlock, ChainError>;

    /// Inserts a batch of blocks in order.
    ///
    /// # Returns
    /// * `Ok(usize)` with the number of blocks processed, which is the length of the batch.
    /// * `Err(ChainError::BatchAborted)` naming the first block that failed. Blocks before it
    ///   stay inserted.
    fn insert_chain(&self, blocks: Vec<SealedBlock>) -> Result<usize, ChainError>;

    /// Inserts a single block.
    fn insert_block(
        &self,
        block: SealedBlock,
        origin: BlockOrigin,
    ) -> Result<InsertOutcome, ChainError>;

    /// Inserts a block sealed by this node.
    fn sealed_block(&self, block: SealedBlock) -> Result<InsertOutcome, ChainError>;

    /// Replaces the consensus engine used for subsequent insertions.
    fn set_engine(&self, engine: Arc<dyn ConsensusEngine>);

    /// Returns the current consensus engine.
    fn engine(&self) -> Arc<dyn ConsensusEngine>;

    /// Returns the block with `hash` followed by up to `n - 1` of its ancestors, newest first.
    ///
    /// The walk follows parent links through canonical and side blocks and stops early at
    /// genesis. An unknown `hash` yields an empty list.
    fn blocks_from_hash(&self, hash: B256, n: usize) -> Result<Vec<SealedBlock>, ChainError>;

    /// Gets the receipts of a block.
    fn receipts(&self, block_hash: B256) -> Result<Receipts, ChainError>;

    /// Gets the logs of a block, grouped per receipt.
    fn logs(&self, block_hash: B256) -> Result<Vec<Vec<Log>>, ChainError>;

    /// Stores the receipts of a known block.
    fn write_receipts(&self, block_hash: B256, receipts: Receipts) -> Result<(), ChainError>;

    /// Rewinds the canonical head to `number`.
    fn set_head(&self, number: u64) -> Result<SetHeadOutcome, ChainError>;

    /// Gets the header of any known block with the given hash and number.
    fn header(&self, hash: B256, number: u64) -> Result<SealedHeader, ChainError>;

    /// Gets any known block with the given hash, canonical or not.
    fn block(&self, hash: B256) -> Result<SealedBlock, ChainError>;

    /// Gets the cumulative weight of the chain ending in the given block.
    fn total_difficulty(&self, hash: B256) -> Result<U256, ChainError>;

    /// Looks up a canonical transaction by hash.
    fn transaction_by_hash(&self, tx_hash: B256) -> Result<IndexedTransaction, ChainError>;
}
