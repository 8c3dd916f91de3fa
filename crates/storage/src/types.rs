//! Result types returned by the chain store.

use alloy_eips::eip1898::BlockNumHash;
use alloy_primitives::B256;
use ember_primitives::Transaction;

/// A canonical transaction together with its location in the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedTransaction {
    /// The transaction.
    pub transaction: Transaction,
    /// Hash of the canonical block containing the transaction.
    pub block_hash: B256,
    /// Number of the canonical block containing the transaction.
    pub block_number: u64,
    /// Position of the transaction in the block body.
    pub index: u64,
}

/// What happened to a block handed to the fork-choice authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The block was stored before, nothing changed.
    AlreadyKnown,
    /// The block extended the canonical head.
    Extended {
        /// The new head.
        head: BlockNumHash,
    },
    /// The block's branch outweighed the canonical chain and replaced it above the common
    /// ancestor.
    Reorged {
        /// The new head.
        head: BlockNumHash,
        /// The last block shared by the old and the new canonical chain.
        common_ancestor: BlockNumHash,
        /// Number of canonical blocks that lost canonical status.
        depth: u64,
    },
    /// The block was stored on a side branch, the head is unchanged.
    SideChain {
        /// The unchanged head.
        head: BlockNumHash,
    },
}

impl InsertOutcome {
    /// Returns `true` if the block became the canonical head.
    pub const fn is_canonical_head(&self) -> bool {
        matches!(self, Self::Extended { .. } | Self::Reorged { .. })
    }

    /// Label used in logs and metrics.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyKnown => "known",
            Self::Extended { .. } => "extended",
            Self::Reorged { .. } => "reorged",
            Self::SideChain { .. } => "side",
        }
    }
}

/// Result of rewinding the canonical head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetHeadOutcome {
    /// The head after the rewind.
    pub head: BlockNumHash,
    /// Number of canonical blocks removed.
    pub removed: u64,
    /// Number of side blocks pruned.
    pub pruned: u64,
}
