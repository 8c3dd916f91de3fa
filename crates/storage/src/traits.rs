use crate::{
    StorageError,
    types::{IndexedTransaction, InsertOutcome, SetHeadOutcome},
};
use alloy_eips::eip1898::BlockNumHash;
use alloy_primitives::{B256, U256};
use ember_primitives::{Body, Receipt, Receipts, SealedBlock, SealedHeader};

/// Provides read access to canonical headers.
///
/// Implementations are expected to provide persistent and thread-safe access to block data.
pub trait HeaderReader {
    /// Gets the canonical [`SealedHeader`] at `number`.
    ///
    /// # Returns
    /// * `Ok(SealedHeader)` if a canonical header is stored at that height.
    /// * `Err(StorageError::EntryNotFound)` if there is none.
    fn header(&self, number: u64) -> Result<SealedHeader, StorageError>;

    /// Gets the canonical [`SealedHeader`] with the given hash.
    ///
    /// # Returns
    /// * `Ok(SealedHeader)` if the hash belongs to a canonical block.
    /// * `Err(StorageError::EntryNotFound)` if the hash is not canonical.
    /// * `Err(StorageError::InconsistentIndex)` if the index resolves to a different header.
    fn header_by_hash(&self, hash: B256) -> Result<SealedHeader, StorageError>;

    /// Gets the current canonical head.
    fn latest_block_ref(&self) -> Result<BlockNumHash, StorageError>;
}

/// Provides read access to canonical and side blocks.
pub trait BlockReader: HeaderReader {
    /// Gets the canonical [`Body`] at `number`.
    fn body(&self, number: u64) -> Result<Body, StorageError>;

    /// Gets the canonical [`SealedBlock`] at `number`.
    ///
    /// A header stored without its body is reported as
    /// [`StorageError::InconsistentIndex`].
    fn block(&self, number: u64) -> Result<SealedBlock, StorageError>;

    /// Gets the canonical [`SealedBlock`] with the given hash.
    fn block_by_hash(&self, hash: B256) -> Result<SealedBlock, StorageError>;

    /// Gets the header of any stored block with the given hash, canonical or on a side branch.
    fn known_header(&self, hash: B256) -> Result<SealedHeader, StorageError>;

    /// Gets any stored [`SealedBlock`] with the given hash, canonical or on a side branch.
    fn known_block(&self, hash: B256) -> Result<SealedBlock, StorageError>;

    /// Gets the genesis block.
    fn genesis(&self) -> Result<SealedBlock, StorageError>;

    /// Gets the block the head pointer names.
    ///
    /// The pointer and the block are read from the same snapshot, so a concurrent reorg or
    /// rewind is observed either entirely or not at all.
    ///
    /// # Returns
    /// * `Ok(SealedBlock)` holding the canonical head.
    /// * `Err(StorageError::EntryNotFound)` if no genesis has been stored.
    /// * `Err(StorageError::InconsistentIndex)` if the block at the head height is not the one the
    ///   pointer names.
    fn current_block(&self) -> Result<SealedBlock, StorageError>;
}

/// Provides read access to the derived chain indices.
pub trait ChainIndexReader {
    /// Resolves a canonical block hash to its number.
    fn block_number(&self, hash: B256) -> Result<u64, StorageError>;

    /// Looks up a canonical transaction by hash.
    ///
    /// Transactions that only exist in non-canonical blocks are reported as
    /// [`StorageError::EntryNotFound`].
    fn transaction_by_hash(&self, tx_hash: B256) -> Result<IndexedTransaction, StorageError>;

    /// Gets the receipts stored for a block.
    fn receipts(&self, block_hash: B256) -> Result<Receipts, StorageError>;

    /// Gets the cumulative weight of the chain ending in the given block.
    fn weight(&self, block_hash: B256) -> Result<U256, StorageError>;
}

/// Mutates the stored chain.
///
/// Each call runs in its own write transaction: either all of its changes are persisted or none.
pub trait ChainWriter {
    /// Stores the genesis block and points the head at it.
    ///
    /// Storing the same genesis again is a no-op, a different one is rejected with
    /// [`StorageError::ConflictError`].
    fn initialise(&self, genesis: &SealedBlock) -> Result<(), StorageError>;

    /// Stores a block and applies the fork-choice rule.
    ///
    /// # Arguments
    /// * `block` - The block to store. Its parent must already be stored.
    /// * `block_weight` - The weight of this block alone.
    ///
    /// # Returns
    /// * `Ok(InsertOutcome)` describing how the canonical chain changed.
    /// * `Err(StorageError::ConflictError)` if the parent is unknown or the number does not follow
    ///   it.
    fn insert_block(
        &self,
        block: &SealedBlock,
        block_weight: U256,
    ) -> Result<InsertOutcome, StorageError>;

    /// Rewinds the canonical head to `number`, deleting everything above it.
    fn set_head(&self, number: u64) -> Result<SetHeadOutcome, StorageError>;

    /// Stores the receipts of a known block.
    fn put_receipts(&self, block_hash: B256, receipts: &[Receipt]) -> Result<(), StorageError>;
}
