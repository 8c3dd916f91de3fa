//! Main database access structure and transaction contexts.

use crate::{
    error::StorageError,
    models::Tables,
    providers::{BlockProvider, ForkChoiceProvider, HeadRefProvider, IndexProvider},
    traits::{BlockReader, ChainIndexReader, ChainWriter, HeaderReader},
    types::{IndexedTransaction, InsertOutcome, SetHeadOutcome},
};
use alloy_eips::eip1898::BlockNumHash;
use alloy_primitives::{B256, U256};
use ember_primitives::{Body, Receipt, Receipts, SealedBlock, SealedHeader};
use reth_db::{
    DatabaseEnv,
    mdbx::{DatabaseArguments, init_db_for},
};
use reth_db_api::{database::Database, transaction::DbTx};
use std::path::Path;
use tracing::{debug, error, warn};

/// Manages the database environment of a chain.
/// Provides transactional access to data via providers.
#[derive(Debug)]
pub struct ChainDb {
    env: DatabaseEnv,
}

impl ChainDb {
    /// Creates or opens a database environment at the given path.
    pub fn new(path: &Path) -> Result<Self, StorageError> {
        Self::with_args(path, DatabaseArguments::default())
    }

    /// Creates or opens a database environment at the given path with explicit MDBX arguments.
    pub fn with_args(path: &Path, args: DatabaseArguments) -> Result<Self, StorageError> {
        let env = init_db_for::<_, Tables>(path, args).inspect_err(|err| {
            error!(
                target: "chain_storage",
                path = %path.display(),
                %err,
                "Failed to open database"
            );
        })?;
        Ok(Self { env })
    }

    /// Runs `f` in a read-only transaction.
    fn view<T>(
        &self,
        f: impl FnOnce(&<DatabaseEnv as Database>::TX) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        self.env.view(f)?
    }

    /// Runs `f` in a read-write transaction, committing only if it succeeds.
    fn update<T>(
        &self,
        f: impl FnOnce(&<DatabaseEnv as Database>::TXMut) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let tx = self.env.tx_mut().inspect_err(|err| {
            error!(target: "chain_storage", ?err, "Failed to open write transaction");
        })?;

        match f(&tx) {
            Ok(value) => {
                tx.commit().inspect_err(|err| {
                    error!(target: "chain_storage", ?err, "Failed to commit write transaction");
                })?;
                Ok(value)
            }
            Err(err) => {
                debug!(target: "chain_storage", %err, "Aborting write transaction");
                tx.abort();
                Err(err)
            }
        }
    }
}

impl HeaderReader for ChainDb {
    fn header(&self, number: u64) -> Result<SealedHeader, StorageError> {
        self.view(|tx| BlockProvider::new(tx).header(number))
    }

    fn header_by_hash(&self, hash: B256) -> Result<SealedHeader, StorageError> {
        self.view(|tx| BlockProvider::new(tx).header_by_hash(hash))
    }

    fn latest_block_ref(&self) -> Result<BlockNumHash, StorageError> {
        self.view(|tx| HeadRefProvider::new(tx).latest_block_ref())
    }
}

impl BlockReader for ChainDb {
    fn body(&self, number: u64) -> Result<Body, StorageError> {
        self.view(|tx| BlockProvider::new(tx).body(number))
    }

    fn block(&self, number: u64) -> Result<SealedBlock, StorageError> {
        self.view(|tx| BlockProvider::new(tx).block(number))
    }

    fn block_by_hash(&self, hash: B256) -> Result<SealedBlock, StorageError> {
        self.view(|tx| BlockProvider::new(tx).block_by_hash(hash))
    }

    fn known_header(&self, hash: B256) -> Result<SealedHeader, StorageError> {
        self.view(|tx| BlockProvider::new(tx).known_header(hash))
    }

    fn known_block(&self, hash: B256) -> Result<SealedBlock, StorageError> {
        self.view(|tx| BlockProvider::new(tx).known_block(hash))
    }

    fn genesis(&self) -> Result<SealedBlock, StorageError> {
        self.view(|tx| BlockProvider::new(tx).genesis())
    }

    fn current_block(&self) -> Result<SealedBlock, StorageError> {
        self.view(|tx| {
            let head = HeadRefProvider::new(tx).latest_block_ref()?;
            let block = BlockProvider::new(tx).block(head.number).map_err(|err| match err {
                StorageError::EntryNotFound(_) => StorageError::InconsistentIndex(format!(
                    "head {} has no canonical block at {}",
                    head.hash, head.number
                )),
                err => err,
            })?;

            if block.hash() != head.hash {
                warn!(
                    target: "chain_storage",
                    number = head.number,
                    head = %head.hash,
                    stored = %block.hash(),
                    "Head pointer does not match canonical block"
                );
                return Err(StorageError::InconsistentIndex(format!(
                    "head {} does not match canonical block {} at {}",
                    head.hash,
                    block.hash(),
                    head.number
                )));
            }
            Ok(block)
        })
    }
}

impl ChainIndexReader for ChainDb {
    fn block_number(&self, hash: B256) -> Result<u64, StorageError> {
        self.view(|tx| IndexProvider::new(tx).hash_number(hash))
    }

    fn transaction_by_hash(&self, tx_hash: B256) -> Result<IndexedTransaction, StorageError> {
        self.view(|tx| IndexProvider::new(tx).transaction_by_hash(tx_hash))
    }

    fn receipts(&self, block_hash: B256) -> Result<Receipts, StorageError> {
        self.view(|tx| IndexProvider::new(tx).receipts(block_hash))
    }

    fn weight(&self, block_hash: B256) -> Result<U256, StorageError> {
        self.view(|tx| IndexProvider::new(tx).weight(block_hash))
    }
}

impl ChainWriter for ChainDb {
    fn initialise(&self, genesis: &SealedBlock) -> Result<(), StorageError> {
        self.update(|tx| BlockProvider::new(tx).store_genesis(genesis))
    }

    fn insert_block(
        &self,
        block: &SealedBlock,
        block_weight: U256,
    ) -> Result<InsertOutcome, StorageError> {
        self.update(|tx| ForkChoiceProvider::new(tx).insert_block(block, block_weight))
    }

    fn set_head(&self, number: u64) -> Result<SetHeadOutcome, StorageError> {
        self.update(|tx| ForkChoiceProvider::new(tx).set_head(number))
    }

    fn put_receipts(&self, block_hash: B256, receipts: &[Receipt]) -> Result<(), StorageError> {
        self.update(|tx| {
            let index = IndexProvider::new(tx);
            if !index.has_weight(block_hash)? {
                warn!(target: "chain_storage", %block_hash, "Receipts for unknown block");
                return Err(StorageError::EntryNotFound(format!("block {block_hash} is unknown")));
            }
            index.put_receipts(block_hash, receipts)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes};
    use ember_primitives::{Block, Header, Log, Transaction};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn transfer(nonce: u64) -> Transaction {
        Transaction { nonce, sender: Address::repeat_byte(0x0c), ..Default::default() }
    }

    fn child(parent: &SealedHeader, difficulty: u64, txs: Vec<Transaction>) -> SealedBlock {
        let body = Body::new(txs);
        let header = Header {
            parent_hash: parent.hash(),
            number: parent.number + 1,
            difficulty: U256::from(difficulty),
            transactions_root: body.transactions_root(),
            extra_data: Bytes::copy_from_slice(&difficulty.to_be_bytes()),
            ..Default::default()
        };
        Block::new(header, body).seal_slow()
    }

    fn genesis() -> SealedBlock {
        let header = Header { difficulty: U256::from(1), ..Default::default() };
        Block::new(header, Body::default()).seal_slow()
    }

    fn open() -> (TempDir, ChainDb, SealedBlock) {
        let tmp_dir = TempDir::new().expect("create temp dir");
        let db = ChainDb::new(&tmp_dir.path().join("chaindb")).expect("open database");
        let genesis = genesis();
        db.initialise(&genesis).expect("store genesis");
        (tmp_dir, db, genesis)
    }

    #[test]
    fn test_create_and_open_db() {
        let tmp_dir = TempDir::new().expect("create temp dir");
        let db_path = tmp_dir.path().join("chaindb");
        let db = ChainDb::new(&db_path);
        assert!(db.is_ok(), "Should create or open database");
    }

    #[test]
    fn test_empty_store_has_no_genesis() {
        let tmp_dir = TempDir::new().expect("create temp dir");
        let db = ChainDb::new(tmp_dir.path()).expect("open database");

        assert!(matches!(db.genesis(), Err(StorageError::EntryNotFound(_))));
        assert!(matches!(db.latest_block_ref(), Err(StorageError::EntryNotFound(_))));
    }

    #[test]
    fn test_initialise_is_idempotent() {
        let (_dir, db, genesis) = open();
        db.initialise(&genesis).expect("same genesis again");

        let other = Block::new(
            Header { difficulty: U256::from(2), ..Default::default() },
            Body::default(),
        )
        .seal_slow();
        assert!(matches!(db.initialise(&other), Err(StorageError::ConflictError(_))));
        assert_eq!(db.genesis().unwrap(), genesis);
        assert_eq!(db.latest_block_ref().unwrap(), genesis.num_hash());
    }

    #[test]
    fn test_state_survives_reopen() {
        let tmp_dir = TempDir::new().expect("create temp dir");
        let path = tmp_dir.path().join("chaindb");
        let genesis = genesis();
        let block1 = child(genesis.sealed_header(), 1, vec![transfer(1)]);

        {
            let db = ChainDb::new(&path).expect("open database");
            db.initialise(&genesis).unwrap();
            db.insert_block(&block1, block1.difficulty).unwrap();
        }

        let db = ChainDb::new(&path).expect("reopen database");
        assert_eq!(db.latest_block_ref().unwrap(), block1.num_hash());
        assert_eq!(db.block_by_hash(block1.hash()).unwrap(), block1);
        assert_eq!(db.weight(block1.hash()).unwrap(), U256::from(2));
        assert_eq!(db.transaction_by_hash(transfer(1).hash()).unwrap().block_number, 1);
    }

    #[test]
    fn test_failed_insert_leaves_no_trace() {
        let (_dir, db, genesis) = open();
        let block1 = child(genesis.sealed_header(), 1, vec![]);
        // skips block 1, so the parent is unknown
        let block2 = child(block1.sealed_header(), 1, vec![transfer(5)]);

        assert!(matches!(
            db.insert_block(&block2, U256::from(1)),
            Err(StorageError::ConflictError(_))
        ));
        assert!(matches!(db.weight(block2.hash()), Err(StorageError::EntryNotFound(_))));
        assert!(matches!(db.known_block(block2.hash()), Err(StorageError::EntryNotFound(_))));
        assert_eq!(db.latest_block_ref().unwrap(), genesis.num_hash());
    }

    #[test]
    fn test_receipts_by_hash() {
        let (_dir, db, genesis) = open();
        let block1 = child(genesis.sealed_header(), 1, vec![transfer(1)]);
        let receipts = vec![Receipt {
            success: true,
            cumulative_gas_used: 21_000,
            logs: vec![Log {
                address: Address::repeat_byte(0x0d),
                topics: vec![B256::repeat_byte(0x01)],
                data: Bytes::from_static(b"transfer"),
            }],
        }];

        assert!(matches!(
            db.put_receipts(block1.hash(), &receipts),
            Err(StorageError::EntryNotFound(_))
        ));

        db.insert_block(&block1, U256::from(1)).unwrap();
        db.put_receipts(block1.hash(), &receipts).unwrap();
        assert_eq!(db.receipts(block1.hash()).unwrap(), receipts);
    }

    #[test]
    fn test_current_block_follows_head() {
        let (_dir, db, genesis) = open();
        assert_eq!(db.current_block().unwrap(), genesis);

        let block1 = child(genesis.sealed_header(), 1, vec![transfer(1)]);
        db.insert_block(&block1, U256::from(1)).unwrap();
        assert_eq!(db.current_block().unwrap(), block1);

        db.set_head(0).unwrap();
        assert_eq!(db.current_block().unwrap(), genesis);
    }

    #[test]
    fn test_current_block_during_head_changes() {
        let (_dir, db, genesis) = open();
        let db = Arc::new(db);
        let mut blocks = Vec::new();
        let mut parent = genesis.sealed_header().clone();
        for nonce in 0..5 {
            let block = child(&parent, 1, vec![transfer(nonce)]);
            parent = block.sealed_header().clone();
            blocks.push(block);
        }

        let writer = {
            let db = Arc::clone(&db);
            std::thread::spawn(move || {
                for _ in 0..20 {
                    for block in &blocks {
                        db.insert_block(block, U256::from(1)).unwrap();
                    }
                    db.set_head(0).unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let db = Arc::clone(&db);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let block = db.current_block().expect("head block must always resolve");
                        assert!(block.number() <= 5);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(db.current_block().unwrap(), genesis);
    }

    /// Two siblings of the head race to become canonical from separate threads.
    #[test]
    fn test_racing_siblings_serialise() {
        for (first_weight, second_weight) in [(3u64, 5u64), (5, 3), (4, 4)] {
            let (_dir, db, genesis) = open();
            let db = Arc::new(db);
            let block1 = child(genesis.sealed_header(), 1, vec![transfer(1)]);
            db.insert_block(&block1, U256::from(1)).unwrap();

            let rivals = [
                child(genesis.sealed_header(), first_weight, vec![transfer(100)]),
                child(genesis.sealed_header(), second_weight, vec![transfer(200)]),
            ];
            let barrier = Arc::new(std::sync::Barrier::new(2));
            let handles: Vec<_> = rivals
                .iter()
                .cloned()
                .map(|rival| {
                    let db = Arc::clone(&db);
                    let barrier = Arc::clone(&barrier);
                    std::thread::spawn(move || {
                        barrier.wait();
                        db.insert_block(&rival, rival.difficulty).unwrap()
                    })
                })
                .collect();
            let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

            let head = db.latest_block_ref().unwrap();
            let winner = rivals.iter().position(|rival| rival.hash() == head.hash).unwrap();
            let loser = 1 - winner;
            assert!(rivals[winner].difficulty >= rivals[loser].difficulty);
            assert!(outcomes[winner].is_canonical_head());
            assert!(matches!(
                outcomes[winner],
                InsertOutcome::Reorged { head, .. } if head == rivals[winner].num_hash()
            ));

            match outcomes[loser] {
                InsertOutcome::SideChain { head } => assert_eq!(head, rivals[winner].num_hash()),
                InsertOutcome::Reorged { head, .. } => {
                    // only possible if it won first and was then outweighed
                    assert_eq!(head, rivals[loser].num_hash());
                    assert!(rivals[winner].difficulty > rivals[loser].difficulty);
                }
                ref other => panic!("unexpected outcome {other:?}"),
            }

            assert_eq!(db.current_block().unwrap(), rivals[winner]);
            let loser_tx = rivals[loser].transactions()[0].hash();
            assert!(matches!(
                db.transaction_by_hash(loser_tx),
                Err(StorageError::EntryNotFound(_))
            ));
            assert!(matches!(
                db.transaction_by_hash(transfer(1).hash()),
                Err(StorageError::EntryNotFound(_))
            ));
        }
    }

    #[test]
    fn test_concurrent_readers_see_committed_head() {
        let (_dir, db, genesis) = open();
        let db = Arc::new(db);
        let mut parent = genesis.sealed_header().clone();
        for _ in 0..4 {
            let block = child(&parent, 1, vec![]);
            db.insert_block(&block, U256::from(1)).unwrap();
            parent = block.sealed_header().clone();
        }

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let db = Arc::clone(&db);
                std::thread::spawn(move || {
                    let head = db.latest_block_ref().unwrap();
                    let header = db.header(head.number).unwrap();
                    assert_eq!(header.hash(), head.hash);
                    db.block_number(head.hash).unwrap()
                })
            })
            .collect();

        for reader in readers {
            assert_eq!(reader.join().unwrap(), 4);
        }
    }
}
