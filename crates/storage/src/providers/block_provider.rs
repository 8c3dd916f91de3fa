//! Provider for the primary block data: canonical headers and bodies keyed by number, and known
//! side blocks keyed by hash.

use crate::{
    error::StorageError,
    models::{
        CanonicalBodies, CanonicalHeaders, SideBlocks, StoredBlock, StoredBody, StoredHeader,
    },
    providers::{HeadRefProvider, IndexProvider},
};
use alloy_primitives::B256;
use ember_primitives::{Body, SealedBlock, SealedHeader};
use reth_db_api::{
    cursor::DbCursorRO,
    transaction::{DbTx, DbTxMut},
};
use tracing::{debug, error, info, warn};

/// Provides access to block headers and bodies within a transaction.
#[derive(Debug)]
pub(crate) struct BlockProvider<'tx, TX> {
    tx: &'tx TX,
}

impl<'tx, TX> BlockProvider<'tx, TX> {
    /// Creates a new [`BlockProvider`] instance.
    pub(crate) const fn new(tx: &'tx TX) -> Self {
        Self { tx }
    }
}

impl<TX> BlockProvider<'_, TX>
where
    TX: DbTx,
{
    /// Gets the canonical header at `number`.
    pub(crate) fn header(&self, number: u64) -> Result<SealedHeader, StorageError> {
        let header = self.tx.get::<CanonicalHeaders>(number).inspect_err(|err| {
            error!(target: "chain_storage", number, ?err, "Failed to read header");
        })?;

        let header = header.ok_or_else(|| {
            debug!(target: "chain_storage", number, "Header not found");
            StorageError::EntryNotFound(format!("header {number} not found"))
        })?;
        Ok(header.into())
    }

    /// Gets a canonical header by its hash: hash to number, then the number keyed lookup.
    pub(crate) fn header_by_hash(&self, hash: B256) -> Result<SealedHeader, StorageError> {
        let number = IndexProvider::new(self.tx).hash_number(hash)?;
        let header = self.header(number).map_err(|err| match err {
            StorageError::EntryNotFound(_) => {
                warn!(
                    target: "chain_storage",
                    %hash,
                    number,
                    "Hash index points to a missing header"
                );
                StorageError::InconsistentIndex(format!(
                    "block hash {hash} indexed at missing header {number}"
                ))
            }
            err => err,
        })?;

        if header.hash() != hash {
            warn!(
                target: "chain_storage",
                number,
                expected_hash = %hash,
                actual_hash = %header.hash(),
                "Header hash mismatch"
            );
            return Err(StorageError::InconsistentIndex(format!(
                "block hash {hash} indexed at {number}, which holds {}",
                header.hash()
            )));
        }
        Ok(header)
    }

    /// Returns the number of `hash` if it is the canonical block at that height.
    pub(crate) fn canonical_number(&self, hash: B256) -> Result<Option<u64>, StorageError> {
        match self.header_by_hash(hash) {
            Ok(header) => Ok(Some(header.number)),
            Err(StorageError::EntryNotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Gets the canonical body at `number`.
    pub(crate) fn body(&self, number: u64) -> Result<Body, StorageError> {
        let body = self.tx.get::<CanonicalBodies>(number).inspect_err(|err| {
            error!(target: "chain_storage", number, ?err, "Failed to read body");
        })?;

        body.map(Into::into).ok_or_else(|| {
            debug!(target: "chain_storage", number, "Body not found");
            StorageError::EntryNotFound(format!("body {number} not found"))
        })
    }

    /// Pairs the body at `header.number` with `header`.
    fn with_body(&self, header: SealedHeader) -> Result<SealedBlock, StorageError> {
        let number = header.number;
        let body = self.body(number).map_err(|err| match err {
            StorageError::EntryNotFound(_) => {
                warn!(target: "chain_storage", number, "Canonical header stored without body");
                StorageError::InconsistentIndex(format!("header {number} stored without body"))
            }
            err => err,
        })?;
        Ok(SealedBlock::new(header, body))
    }

    /// Gets the canonical block at `number`.
    pub(crate) fn block(&self, number: u64) -> Result<SealedBlock, StorageError> {
        let header = self.header(number)?;
        self.with_body(header)
    }

    /// Gets a canonical block by hash.
    pub(crate) fn block_by_hash(&self, hash: B256) -> Result<SealedBlock, StorageError> {
        let header = self.header_by_hash(hash)?;
        self.with_body(header)
    }

    /// Gets the genesis block, the canonical block at number `0`.
    pub(crate) fn genesis(&self) -> Result<SealedBlock, StorageError> {
        self.block(0)
    }

    /// Gets a known, non-canonical block by hash.
    pub(crate) fn side_block(&self, hash: B256) -> Result<SealedBlock, StorageError> {
        let block = self.tx.get::<SideBlocks>(hash).inspect_err(|err| {
            error!(target: "chain_storage", %hash, ?err, "Failed to read side block");
        })?;

        block.map(Into::into).ok_or_else(|| {
            debug!(target: "chain_storage", %hash, "Side block not found");
            StorageError::EntryNotFound(format!("side block {hash} not found"))
        })
    }

    /// Gets the header of any known block by hash, canonical or not.
    pub(crate) fn known_header(&self, hash: B256) -> Result<SealedHeader, StorageError> {
        match self.header_by_hash(hash) {
            Err(StorageError::EntryNotFound(_)) => {
                self.side_block(hash).map(|block| block.split().0)
            }
            result => result,
        }
    }

    /// Gets any known block by hash, canonical or not.
    pub(crate) fn known_block(&self, hash: B256) -> Result<SealedBlock, StorageError> {
        match self.block_by_hash(hash) {
            Err(StorageError::EntryNotFound(_)) => self.side_block(hash),
            result => result,
        }
    }

    /// Collects the hashes of side blocks above `number`.
    fn side_blocks_above(&self, number: u64) -> Result<Vec<B256>, StorageError> {
        let mut cursor = self.tx.cursor_read::<SideBlocks>().inspect_err(|err| {
            error!(target: "chain_storage", ?err, "Failed to get cursor for SideBlocks");
        })?;

        let walker = cursor.walk(None).inspect_err(|err| {
            error!(target: "chain_storage", ?err, "Failed to walk side blocks");
        })?;

        let mut hashes = Vec::new();
        for row in walker {
            let (hash, block) = row.inspect_err(|err| {
                error!(target: "chain_storage", ?err, "Failed to read side block entry");
            })?;
            if block.0.header.number > number {
                hashes.push(hash);
            }
        }
        Ok(hashes)
    }
}

impl<TX> BlockProvider<'_, TX>
where
    TX: DbTxMut + DbTx,
{
    /// Stores a canonical header and its hash to number index entry.
    pub(crate) fn put_header(&self, header: &SealedHeader) -> Result<(), StorageError> {
        let stored = StoredHeader::from(header);
        self.tx.put::<CanonicalHeaders>(header.number, stored).inspect_err(|err| {
            error!(
                target: "chain_storage",
                number = header.number,
                hash = %header.hash(),
                ?err,
                "Failed to store header"
            );
        })?;
        IndexProvider::new(self.tx).store_hash_number(header.hash(), header.number)
    }

    /// Stores the canonical body at `number`.
    pub(crate) fn put_body(&self, number: u64, body: &Body) -> Result<(), StorageError> {
        self.tx.put::<CanonicalBodies>(number, StoredBody::from(body)).inspect_err(|err| {
            error!(target: "chain_storage", number, ?err, "Failed to store body");
        })?;
        Ok(())
    }

    /// Stores a block as canonical at its number.
    ///
    /// The body is written first, then the header with its hash index, then one transaction index
    /// entry per transaction.
    pub(crate) fn store_block(&self, block: &SealedBlock) -> Result<(), StorageError> {
        let number = block.number();
        debug!(
            target: "chain_storage",
            number,
            hash = %block.hash(),
            transactions = block.transactions().len(),
            "Storing canonical block"
        );

        self.put_body(number, block.body())?;
        self.put_header(block.sealed_header())?;

        let index = IndexProvider::new(self.tx);
        for tx_hash in block.body().transaction_hashes() {
            index.store_transaction_index(number, tx_hash)?;
        }
        Ok(())
    }

    /// Removes the canonical block at `number` together with its index entries and returns it.
    ///
    /// Index entries are dropped before the primary data.
    pub(crate) fn remove_canonical_block(&self, number: u64) -> Result<SealedBlock, StorageError> {
        let block = self.block(number)?;
        debug!(target: "chain_storage", number, hash = %block.hash(), "Removing canonical block");

        let index = IndexProvider::new(self.tx);
        for tx_hash in block.body().transaction_hashes() {
            index.remove_transaction_index(number, tx_hash)?;
        }
        index.remove_hash_number(block.hash())?;

        self.tx.delete::<CanonicalBodies>(number, None).inspect_err(|err| {
            error!(target: "chain_storage", number, ?err, "Failed to remove body");
        })?;
        self.tx.delete::<CanonicalHeaders>(number, None).inspect_err(|err| {
            error!(target: "chain_storage", number, ?err, "Failed to remove header");
        })?;
        Ok(block)
    }

    /// Stores a known block that is not canonical.
    pub(crate) fn put_side_block(&self, block: &SealedBlock) -> Result<(), StorageError> {
        self.tx.put::<SideBlocks>(block.hash(), StoredBlock::from(block)).inspect_err(|err| {
            error!(
                target: "chain_storage",
                number = block.number(),
                hash = %block.hash(),
                ?err,
                "Failed to store side block"
            );
        })?;
        Ok(())
    }

    /// Removes a side block. Removing an absent block is not an error.
    pub(crate) fn remove_side_block(&self, hash: B256) -> Result<(), StorageError> {
        self.tx.delete::<SideBlocks>(hash, None).inspect_err(|err| {
            error!(target: "chain_storage", %hash, ?err, "Failed to remove side block");
        })?;
        Ok(())
    }

    /// Deletes every side block above `number`, with its weight and receipts.
    ///
    /// Returns the number of pruned blocks.
    pub(crate) fn prune_side_blocks_above(&self, number: u64) -> Result<u64, StorageError> {
        let hashes = self.side_blocks_above(number)?;
        let index = IndexProvider::new(self.tx);
        for hash in &hashes {
            self.remove_side_block(*hash)?;
            index.delete_weight(*hash)?;
            index.remove_receipts(*hash)?;
        }
        Ok(hashes.len() as u64)
    }

    /// Stores the genesis block, its weight and points the head at it.
    ///
    /// The genesis weight is its declared difficulty. Storing the same genesis again is a no-op,
    /// a different genesis is rejected.
    pub(crate) fn store_genesis(&self, genesis: &SealedBlock) -> Result<(), StorageError> {
        if genesis.number() != 0 {
            warn!(
                target: "chain_storage",
                number = genesis.number(),
                "Genesis block must have number 0"
            );
            return Err(StorageError::ConflictError(format!(
                "genesis block has number {}",
                genesis.number()
            )));
        }

        match self.header(0) {
            Ok(stored) if stored.hash() == genesis.hash() => {
                debug!(target: "chain_storage", hash = %genesis.hash(), "Genesis already stored");
                return Ok(());
            }
            Ok(stored) => {
                warn!(
                    target: "chain_storage",
                    stored_hash = %stored.hash(),
                    incoming_hash = %genesis.hash(),
                    "Refusing to overwrite genesis"
                );
                return Err(StorageError::ConflictError(format!(
                    "genesis {} already stored, refusing {}",
                    stored.hash(),
                    genesis.hash()
                )));
            }
            Err(StorageError::EntryNotFound(_)) => {}
            Err(err) => return Err(err),
        }

        self.store_block(genesis)?;
        IndexProvider::new(self.tx).write_weight(genesis.hash(), genesis.difficulty)?;
        HeadRefProvider::new(self.tx).update_latest_block_ref(genesis.num_hash())?;

        info!(target: "chain_storage", hash = %genesis.hash(), "Stored genesis block");
        Ok(())
    }
}
