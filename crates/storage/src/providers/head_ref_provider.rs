//! Provider for the canonical head pointer.
use crate::{
    StorageError,
    models::{HeadRefKey, HeadRefs},
};
use alloy_eips::eip1898::BlockNumHash;
use reth_db_api::transaction::{DbTx, DbTxMut};
use tracing::{error, warn};

/// A head reference storage that wraps transactional reference.
#[derive(Debug)]
pub(crate) struct HeadRefProvider<'tx, TX> {
    tx: &'tx TX,
}

impl<'tx, TX> HeadRefProvider<'tx, TX> {
    pub(crate) const fn new(tx: &'tx TX) -> Self {
        Self { tx }
    }
}

impl<TX> HeadRefProvider<'_, TX>
where
    TX: DbTx,
{
    /// Gets the current canonical head.
    pub(crate) fn latest_block_ref(&self) -> Result<BlockNumHash, StorageError> {
        let result = self.tx.get::<HeadRefs>(HeadRefKey::Latest).inspect_err(|error| {
            error!(target: "chain_storage", ?error, "Failed to read head reference");
        })?;
        let block_ref = result.ok_or_else(|| {
            warn!(target: "chain_storage", "No head reference found");
            StorageError::EntryNotFound("no head reference found".to_string())
        })?;
        Ok(block_ref.into())
    }
}

impl<TX> HeadRefProvider<'_, TX>
where
    TX: DbTxMut,
{
    /// Points the canonical head at `head`.
    pub(crate) fn update_latest_block_ref(&self, head: BlockNumHash) -> Result<(), StorageError> {
        self.tx.put::<HeadRefs>(HeadRefKey::Latest, head.into()).inspect_err(|error| {
            error!(
                target: "chain_storage",
                number = head.number,
                hash = %head.hash,
                ?error,
                "Failed to store head reference"
            )
        })?;
        Ok(())
    }
}
