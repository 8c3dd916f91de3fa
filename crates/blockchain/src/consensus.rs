//! Pluggable block validation and weighing.

use crate::ConsensusError;
use alloy_primitives::U256;
use ember_primitives::{SealedBlock, SealedHeader};
use std::fmt::Debug;

/// Validates blocks and assigns them a fork-choice weight.
///
/// The chain asks the engine to validate every incoming block against its stored parent, then
/// adds the block's weight to the parent's cumulative weight. The heaviest chain is canonical.
pub trait ConsensusEngine: Debug + Send + Sync {
    /// Checks `block` against its `parent`.
    fn validate(&self, block: &SealedBlock, parent: &SealedHeader) -> Result<(), ConsensusError>;

    /// Returns the weight `header` contributes to its chain.
    fn weight(&self, header: &SealedHeader) -> U256;
}

/// Engine that checks block structure and weighs blocks by their difficulty.
///
/// Cumulative weight is then the total difficulty of the chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct DifficultyEngine;

impl ConsensusEngine for DifficultyEngine {
    fn validate(&self, block: &SealedBlock, parent: &SealedHeader) -> Result<(), ConsensusError> {
        validate_header_against_parent(block.sealed_header(), parent)?;
        validate_header_gas(block.sealed_header())?;
        validate_transactions_root(block)
    }

    fn weight(&self, header: &SealedHeader) -> U256 {
        header.difficulty
    }
}

/// Number, parent hash and timestamp must follow the parent.
#[inline]
pub fn validate_header_against_parent(
    header: &SealedHeader,
    parent: &SealedHeader,
) -> Result<(), ConsensusError> {
    if parent.number + 1 != header.number {
        return Err(ConsensusError::NumberMismatch {
            parent_number: parent.number,
            number: header.number,
        });
    }

    if parent.hash() != header.parent_hash {
        return Err(ConsensusError::ParentHashMismatch {
            expected: parent.hash(),
            got: header.parent_hash,
        });
    }

    if header.timestamp <= parent.timestamp {
        return Err(ConsensusError::TimestampNotIncreasing {
            parent_timestamp: parent.timestamp,
            timestamp: header.timestamp,
        });
    }
    Ok(())
}

/// Gas used needs to be less than or equal to the gas limit.
#[inline]
pub fn validate_header_gas(header: &SealedHeader) -> Result<(), ConsensusError> {
    if header.gas_used > header.gas_limit {
        return Err(ConsensusError::GasUsedExceedsGasLimit {
            gas_used: header.gas_used,
            gas_limit: header.gas_limit,
        });
    }
    Ok(())
}

/// The header's transactions root must commit to the body.
pub fn validate_transactions_root(block: &SealedBlock) -> Result<(), ConsensusError> {
    let root = block.body().transactions_root();
    if root != block.transactions_root {
        return Err(ConsensusError::TransactionsRootMismatch {
            expected: block.transactions_root,
            got: root,
        });
    }
    Ok(())
}
