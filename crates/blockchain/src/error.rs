use alloy_primitives::B256;
use ember_storage::StorageError;
use thiserror::Error;

/// Reasons a block is rejected by a [`ConsensusEngine`](crate::ConsensusEngine).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    /// The block number does not follow the parent's number.
    #[error("block number {number} does not follow parent number {parent_number}")]
    NumberMismatch {
        /// Number of the parent block.
        parent_number: u64,
        /// Number of the block.
        number: u64,
    },

    /// The block's parent hash is not the hash of the given parent.
    #[error("parent hash mismatch: expected {expected}, got {got}")]
    ParentHashMismatch {
        /// Hash of the parent block.
        expected: B256,
        /// Parent hash declared by the block.
        got: B256,
    },

    /// The block timestamp is not after its parent's.
    #[error("timestamp {timestamp} is not after parent timestamp {parent_timestamp}")]
    TimestampNotIncreasing {
        /// Timestamp of the parent block.
        parent_timestamp: u64,
        /// Timestamp of the block.
        timestamp: u64,
    },

    /// The block uses more gas than its limit allows.
    #[error("gas used {gas_used} exceeds gas limit {gas_limit}")]
    GasUsedExceedsGasLimit {
        /// Gas used by the block.
        gas_used: u64,
        /// Gas limit of the block.
        gas_limit: u64,
    },

    /// The header's transactions root does not commit to the body.
    #[error("transactions root mismatch: header has {expected}, body hashes to {got}")]
    TransactionsRootMismatch {
        /// Root declared in the header.
        expected: B256,
        /// Root computed from the body.
        got: B256,
    },
}

/// Errors returned by the chain interface.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The block store failed or reported a miss.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The consensus engine rejected the block.
    #[error("consensus error: {0}")]
    Consensus(#[from] ConsensusError),

    /// The block's parent is not stored, neither canonical nor on a side branch.
    #[error("unknown parent {parent_hash} of block {hash}")]
    UnknownParent {
        /// Hash of the rejected block.
        hash: B256,
        /// Parent hash declared by the block.
        parent_hash: B256,
    },

    /// The store holds no genesis block.
    #[error("genesis block is not stored")]
    MissingGenesis,

    /// A batch insertion stopped at the block at `index`. Blocks before it were inserted.
    #[error("batch aborted at block {index}: {source}")]
    BatchAborted {
        /// Position of the failing block in the batch.
        index: usize,
        /// Why the block was rejected.
        #[source]
        source: Box<ChainError>,
    },
}

impl ChainError {
    /// Returns `true` if the error is a plain storage miss.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Storage(err) if err.is_not_found())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let miss: ChainError = StorageError::EntryNotFound("header 3".to_string()).into();
        assert!(miss.is_not_found());

        let corrupt: ChainError = StorageError::CorruptRecord("header 3".to_string()).into();
        assert!(!corrupt.is_not_found());
        assert!(!ChainError::MissingGenesis.is_not_found());
    }

    #[test]
    fn test_batch_error_reports_index_and_cause() {
        let err = ChainError::BatchAborted {
            index: 4,
            source: Box::new(ChainError::Consensus(ConsensusError::GasUsedExceedsGasLimit {
                gas_used: 2,
                gas_limit: 1,
            })),
        };
        assert_eq!(
            err.to_string(),
            "batch aborted at block 4: consensus error: gas used 2 exceeds gas limit 1"
        );
    }
}
