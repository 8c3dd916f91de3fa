//! Provider for the secondary indices: hash to number, transaction to block, receipts and chain
//! weights.

use crate::{
    error::StorageError,
    models::{
        BlockReceipts, ChainWeight, ChainWeights, HeaderNumbers, StoredBlockNumber,
        StoredReceipts, TransactionBlocks,
    },
    providers::BlockProvider,
    types::IndexedTransaction,
};
use alloy_primitives::{B256, U256};
use ember_primitives::{Receipt, Receipts};
use reth_db_api::transaction::{DbTx, DbTxMut};
use tracing::{debug, error, warn};

/// Provides access to the secondary indices within a transaction.
#[derive(Debug)]
pub(crate) struct IndexProvider<'tx, TX> {
    tx: &'tx TX,
}

impl<'tx, TX> IndexProvider<'tx, TX> {
    pub(crate) const fn new(tx: &'tx TX) -> Self {
        Self { tx }
    }
}

impl<TX> IndexProvider<'_, TX>
where
    TX: DbTx,
{
    /// Resolves a canonical block hash to its number.
    pub(crate) fn hash_number(&self, hash: B256) -> Result<u64, StorageError> {
        let number = self.tx.get::<HeaderNumbers>(hash).inspect_err(|err| {
            error!(target: "chain_storage", %hash, ?err, "Failed to read hash number index");
        })?;

        number.map(Into::into).ok_or_else(|| {
            debug!(target: "chain_storage", %hash, "Block hash not indexed");
            StorageError::EntryNotFound(format!("block hash {hash} not indexed"))
        })
    }

    /// Resolves a transaction hash to the number of the canonical block containing it.
    pub(crate) fn transaction_index(&self, tx_hash: B256) -> Result<u64, StorageError> {
        let number = self.tx.get::<TransactionBlocks>(tx_hash).inspect_err(|err| {
            error!(target: "chain_storage", %tx_hash, ?err, "Failed to read transaction index");
        })?;

        number.map(Into::into).ok_or_else(|| {
            debug!(target: "chain_storage", %tx_hash, "Transaction not indexed");
            StorageError::EntryNotFound(format!("transaction {tx_hash} not indexed"))
        })
    }

    /// Looks up a canonical transaction and its position.
    ///
    /// The index only records the owning block, the position is found by scanning the body.
    pub(crate) fn transaction_by_hash(
        &self,
        tx_hash: B256,
    ) -> Result<IndexedTransaction, StorageError> {
        let block_number = self.transaction_index(tx_hash)?;

        let block = BlockProvider::new(self.tx).block(block_number).map_err(|err| match err {
            StorageError::EntryNotFound(_) => {
                warn!(
                    target: "chain_storage",
                    %tx_hash,
                    block_number,
                    "Transaction index points to a missing block"
                );
                StorageError::InconsistentIndex(format!(
                    "transaction {tx_hash} indexed at missing block {block_number}"
                ))
            }
            err => err,
        })?;

        let index = block.body().position(tx_hash).ok_or_else(|| {
            warn!(
                target: "chain_storage",
                %tx_hash,
                block_number,
                "Indexed block does not contain the transaction"
            );
            StorageError::InconsistentIndex(format!(
                "transaction {tx_hash} not in body of block {block_number}"
            ))
        })?;

        Ok(IndexedTransaction {
            transaction: block.transactions()[index].clone(),
            block_hash: block.hash(),
            block_number,
            index: index as u64,
        })
    }

    /// Gets the receipts of a block by its hash.
    pub(crate) fn receipts(&self, block_hash: B256) -> Result<Receipts, StorageError> {
        let receipts = self.tx.get::<BlockReceipts>(block_hash).inspect_err(|err| {
            error!(target: "chain_storage", %block_hash, ?err, "Failed to read receipts");
        })?;

        receipts.map(Into::into).ok_or_else(|| {
            debug!(target: "chain_storage", %block_hash, "Receipts not found");
            StorageError::EntryNotFound(format!("receipts of block {block_hash} not found"))
        })
    }

    /// Gets the cumulative chain weight of a block by its hash.
    pub(crate) fn weight(&self, block_hash: B256) -> Result<U256, StorageError> {
        let weight = self.tx.get::<ChainWeights>(block_hash).inspect_err(|err| {
            error!(target: "chain_storage", %block_hash, ?err, "Failed to read chain weight");
        })?;

        weight.map(Into::into).ok_or_else(|| {
            debug!(target: "chain_storage", %block_hash, "Chain weight not found");
            StorageError::EntryNotFound(format!("weight of block {block_hash} not found"))
        })
    }

    /// Returns `true` if a weight has been recorded for the block, i.e. the block is known.
    pub(crate) fn has_weight(&self, block_hash: B256) -> Result<bool, StorageError> {
        match self.weight(block_hash) {
            Ok(_) => Ok(true),
            Err(StorageError::EntryNotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

impl<TX> IndexProvider<'_, TX>
where
    TX: DbTxMut + DbTx,
{
    /// Stores the hash to number index entry of a canonical block.
    pub(crate) fn store_hash_number(&self, hash: B256, number: u64) -> Result<(), StorageError> {
        self.tx.put::<HeaderNumbers>(hash, StoredBlockNumber(number)).inspect_err(|err| {
            error!(target: "chain_storage", %hash, number, ?err, "Failed to store hash number");
        })?;
        Ok(())
    }

    /// Removes the hash to number index entry of a block.
    pub(crate) fn remove_hash_number(&self, hash: B256) -> Result<(), StorageError> {
        self.tx.delete::<HeaderNumbers>(hash, None).inspect_err(|err| {
            error!(target: "chain_storage", %hash, ?err, "Failed to remove hash number");
        })?;
        Ok(())
    }

    /// Stores the transaction index entry pointing `tx_hash` at block `number`.
    ///
    /// Canonical blocks are only ever stored at the tip, so an existing entry belongs to a lower
    /// canonical block and is kept. The entry always names the earliest canonical occurrence,
    /// which outlives every later one when blocks are removed from the tip down.
    pub(crate) fn store_transaction_index(
        &self,
        number: u64,
        tx_hash: B256,
    ) -> Result<(), StorageError> {
        match self.transaction_index(tx_hash) {
            Ok(existing) => {
                debug!(
                    target: "chain_storage",
                    %tx_hash,
                    number,
                    existing,
                    "Transaction already indexed at an earlier block"
                );
                return Ok(());
            }
            Err(StorageError::EntryNotFound(_)) => {}
            Err(err) => return Err(err),
        }

        self.tx.put::<TransactionBlocks>(tx_hash, StoredBlockNumber(number)).inspect_err(|err| {
            error!(
                target: "chain_storage",
                %tx_hash,
                number,
                ?err,
                "Failed to store transaction index"
            );
        })?;
        Ok(())
    }

    /// Removes the transaction index entry of `tx_hash` if it still points at block `number`.
    ///
    /// An entry owned by another block is left untouched.
    pub(crate) fn remove_transaction_index(
        &self,
        number: u64,
        tx_hash: B256,
    ) -> Result<(), StorageError> {
        match self.transaction_index(tx_hash) {
            Ok(indexed) if indexed == number => {
                self.tx.delete::<TransactionBlocks>(tx_hash, None).inspect_err(|err| {
                    error!(
                        target: "chain_storage",
                        %tx_hash,
                        ?err,
                        "Failed to remove transaction index"
                    );
                })?;
                Ok(())
            }
            Ok(_) | Err(StorageError::EntryNotFound(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Stores the receipts of a block.
    pub(crate) fn put_receipts(
        &self,
        block_hash: B256,
        receipts: &[Receipt],
    ) -> Result<(), StorageError> {
        self.tx.put::<BlockReceipts>(block_hash, StoredReceipts::from(receipts)).inspect_err(
            |err| {
                error!(target: "chain_storage", %block_hash, ?err, "Failed to store receipts");
            },
        )?;
        Ok(())
    }

    /// Removes the receipts of a block.
    pub(crate) fn remove_receipts(&self, block_hash: B256) -> Result<(), StorageError> {
        self.tx.delete::<BlockReceipts>(block_hash, None).inspect_err(|err| {
            error!(target: "chain_storage", %block_hash, ?err, "Failed to remove receipts");
        })?;
        Ok(())
    }

    /// Records the cumulative chain weight of a block.
    pub(crate) fn write_weight(&self, block_hash: B256, weight: U256) -> Result<(), StorageError> {
        self.tx.put::<ChainWeights>(block_hash, ChainWeight(weight)).inspect_err(|err| {
            error!(target: "chain_storage", %block_hash, ?err, "Failed to store chain weight");
        })?;
        Ok(())
    }

    /// Removes the cumulative chain weight of a block.
    pub(crate) fn delete_weight(&self, block_hash: B256) -> Result<(), StorageError> {
        self.tx.delete::<ChainWeights>(block_hash, None).inspect_err(|err| {
            error!(target: "chain_storage", %block_hash, ?err, "Failed to remove chain weight");
        })?;
        Ok(())
    }
}
