//! Fork-choice rule over the stored chain.
//!
//! The canonical chain is the known chain with the greatest cumulative weight. Every block that
//! enters the store is weighed against the current head inside the same read-write transaction,
//! so the compare and the head update cannot interleave with another writer.

use crate::{
    error::StorageError,
    providers::{BlockProvider, HeadRefProvider, IndexProvider},
    types::{InsertOutcome, SetHeadOutcome},
};
use alloy_eips::eip1898::BlockNumHash;
use alloy_primitives::U256;
use ember_primitives::SealedBlock;
use reth_db_api::transaction::{DbTx, DbTxMut};
use tracing::{debug, info, warn};

/// Applies the fork-choice rule and head rewinds within a write transaction.
#[derive(Debug)]
pub(crate) struct ForkChoiceProvider<'tx, TX> {
    tx: &'tx TX,
}

impl<'tx, TX> ForkChoiceProvider<'tx, TX> {
    pub(crate) const fn new(tx: &'tx TX) -> Self {
        Self { tx }
    }
}

impl<TX> ForkChoiceProvider<'_, TX>
where
    TX: DbTxMut + DbTx,
{
    /// Stores `block` and updates the canonical chain if the block's branch is now the heaviest.
    ///
    /// `block_weight` is the weight of this block alone, the cumulative weight is derived from the
    /// parent. On equal cumulative weight the current head is kept.
    pub(crate) fn insert_block(
        &self,
        block: &SealedBlock,
        block_weight: U256,
    ) -> Result<InsertOutcome, StorageError> {
        let blocks = BlockProvider::new(self.tx);
        let index = IndexProvider::new(self.tx);
        let head_ref = HeadRefProvider::new(self.tx);

        let hash = block.hash();
        if index.has_weight(hash)? {
            debug!(target: "chain_storage", number = block.number(), %hash, "Block already known");
            return Ok(InsertOutcome::AlreadyKnown);
        }

        let parent = blocks.known_header(block.parent_hash).map_err(|err| match err {
            StorageError::EntryNotFound(_) => {
                warn!(
                    target: "chain_storage",
                    number = block.number(),
                    %hash,
                    parent_hash = %block.parent_hash,
                    "Parent block is unknown"
                );
                StorageError::ConflictError(format!(
                    "parent {} of block {hash} is unknown",
                    block.parent_hash
                ))
            }
            err => err,
        })?;

        if block.number() != parent.number + 1 {
            warn!(
                target: "chain_storage",
                number = block.number(),
                parent_number = parent.number,
                "Block number does not follow its parent"
            );
            return Err(StorageError::ConflictError(format!(
                "block {hash} has number {}, parent has {}",
                block.number(),
                parent.number
            )));
        }

        let parent_weight = self.known_weight(parent.num_hash())?;
        let weight = parent_weight.saturating_add(block_weight);
        index.write_weight(hash, weight)?;

        let head = head_ref.latest_block_ref()?;
        if block.parent_hash == head.hash {
            blocks.store_block(block)?;
            head_ref.update_latest_block_ref(block.num_hash())?;
            info!(
                target: "chain_storage",
                number = block.number(),
                %hash,
                %weight,
                "Extended canonical chain"
            );
            return Ok(InsertOutcome::Extended { head: block.num_hash() });
        }

        let head_weight = self.known_weight(head)?;
        if weight <= head_weight {
            blocks.put_side_block(block)?;
            debug!(
                target: "chain_storage",
                number = block.number(),
                %hash,
                %weight,
                %head_weight,
                "Stored block on side chain"
            );
            return Ok(InsertOutcome::SideChain { head });
        }

        self.reorg(block, head)
    }

    /// Replaces the canonical chain above the common ancestor of `block` and `old_head` with the
    /// branch ending in `block`.
    fn reorg(
        &self,
        block: &SealedBlock,
        old_head: BlockNumHash,
    ) -> Result<InsertOutcome, StorageError> {
        let blocks = BlockProvider::new(self.tx);

        // new branch, tip first
        let mut branch = vec![block.clone()];
        let mut parent_hash = block.parent_hash;
        let common_ancestor = loop {
            if let Some(number) = blocks.canonical_number(parent_hash)? {
                break BlockNumHash { number, hash: parent_hash };
            }
            let ancestor = blocks.side_block(parent_hash).map_err(|err| match err {
                StorageError::EntryNotFound(_) => StorageError::InconsistentIndex(format!(
                    "ancestor {parent_hash} of block {} is not stored",
                    block.hash()
                )),
                err => err,
            })?;
            parent_hash = ancestor.parent_hash;
            branch.push(ancestor);
        };

        let mut depth = 0;
        for number in (common_ancestor.number + 1..=old_head.number).rev() {
            let displaced = blocks.remove_canonical_block(number)?;
            blocks.put_side_block(&displaced)?;
            depth += 1;
        }

        for promoted in branch.iter().rev() {
            blocks.remove_side_block(promoted.hash())?;
            blocks.store_block(promoted)?;
        }
        HeadRefProvider::new(self.tx).update_latest_block_ref(block.num_hash())?;

        info!(
            target: "chain_storage",
            old_head = %old_head.hash,
            new_head = %block.hash(),
            common_ancestor = common_ancestor.number,
            depth,
            "Reorganised canonical chain"
        );
        Ok(InsertOutcome::Reorged { head: block.num_hash(), common_ancestor, depth })
    }

    /// Rewinds the canonical head to block `number`.
    ///
    /// Canonical blocks above `number` are deleted with their indices, weights and receipts. Side
    /// blocks above `number` are pruned as well.
    pub(crate) fn set_head(&self, number: u64) -> Result<SetHeadOutcome, StorageError> {
        let blocks = BlockProvider::new(self.tx);
        let index = IndexProvider::new(self.tx);
        let head_ref = HeadRefProvider::new(self.tx);

        let head = head_ref.latest_block_ref()?;
        if number > head.number {
            warn!(
                target: "chain_storage",
                number,
                head = head.number,
                "Cannot set head above the current head"
            );
            return Err(StorageError::EntryNotFound(format!(
                "block {number} is above the current head {}",
                head.number
            )));
        }
        if number == head.number {
            return Ok(SetHeadOutcome { head, removed: 0, pruned: 0 });
        }

        let target = blocks.header(number)?;

        let mut removed = 0;
        for canonical in (number + 1..=head.number).rev() {
            let block = blocks.remove_canonical_block(canonical)?;
            index.delete_weight(block.hash())?;
            index.remove_receipts(block.hash())?;
            removed += 1;
        }
        let pruned = blocks.prune_side_blocks_above(number)?;
        head_ref.update_latest_block_ref(target.num_hash())?;

        info!(
            target: "chain_storage",
            old_head = head.number,
            new_head = number,
            removed,
            pruned,
            "Rewound canonical head"
        );
        Ok(SetHeadOutcome { head: target.num_hash(), removed, pruned })
    }

    /// Weight of a block that is known to be stored.
    fn known_weight(&self, block: BlockNumHash) -> Result<U256, StorageError> {
        IndexProvider::new(self.tx).weight(block.hash).map_err(|err| match err {
            StorageError::EntryNotFound(_) => StorageError::InconsistentIndex(format!(
                "stored block {} at {} has no weight",
                block.hash, block.number
            )),
            err => err,
        })
    }
}
