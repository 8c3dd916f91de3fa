//! The [`Blockchain`] façade over the block store.

use crate::{
    BlockChain, BlockOrigin, ChainError, Config, ConsensusEngine, HeaderChain, metrics::Metrics,
};
use alloy_primitives::{B256, U256};
use ember_primitives::{Log, Receipts, SealedBlock, SealedHeader};
use ember_storage::{
    BlockReader, ChainDb, ChainIndexReader, ChainWriter, HeaderReader, IndexedTransaction,
    InsertOutcome, SetHeadOutcome, StorageError,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Chain interface over a block store and a consensus engine.
///
/// The store serialises writers, so a `Blockchain` can be shared between an import pipeline and
/// query callers without external locking.
#[derive(Debug)]
pub struct Blockchain<DB = ChainDb> {
    db: DB,
    engine: RwLock<Arc<dyn ConsensusEngine>>,
    config: Config,
}

impl<DB> Blockchain<DB>
where
    DB: BlockReader + ChainIndexReader + ChainWriter,
{
    /// Opens the chain on a store that already holds a genesis block.
    ///
    /// Fails with [`ChainError::MissingGenesis`] on an empty store.
    pub fn new(
        db: DB,
        engine: Arc<dyn ConsensusEngine>,
        config: Config,
    ) -> Result<Self, ChainError> {
        let genesis = db.genesis().map_err(|err| match err {
            StorageError::EntryNotFound(_) => {
                warn!(target: "blockchain", "Block store holds no genesis block");
                ChainError::MissingGenesis
            }
            err => err.into(),
        })?;
        let head = db.latest_block_ref()?;

        Metrics::init();
        Metrics::record_head(head.number);
        info!(
            target: "blockchain",
            genesis = %genesis.hash(),
            head_number = head.number,
            head_hash = %head.hash,
            "Loaded chain"
        );

        Ok(Self { db, engine: RwLock::new(engine), config })
    }

    /// Stores `genesis` if the store is empty, then opens the chain.
    pub fn initialise(
        db: DB,
        genesis: &SealedBlock,
        engine: Arc<dyn ConsensusEngine>,
        config: Config,
    ) -> Result<Self, ChainError> {
        db.initialise(genesis)?;
        Self::new(db, engine, config)
    }

    /// Returns the underlying block store.
    pub const fn db(&self) -> &DB {
        &self.db
    }

    /// Returns the chain configuration.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Validates, weighs and stores one block. Every insertion path ends here.
    fn insert_one(
        &self,
        block: &SealedBlock,
        origin: BlockOrigin,
    ) -> Result<InsertOutcome, ChainError> {
        let result = self.try_insert(block);
        Metrics::record_insert(&result);

        match &result {
            Ok(outcome) => debug!(
                target: "blockchain",
                number = block.number(),
                hash = %block.hash(),
                origin = origin.as_str(),
                outcome = outcome.as_str(),
                "Inserted block"
            ),
            Err(err) => warn!(
                target: "blockchain",
                number = block.number(),
                hash = %block.hash(),
                origin = origin.as_str(),
                %err,
                "Rejected block"
            ),
        }
        result
    }

    fn try_insert(&self, block: &SealedBlock) -> Result<InsertOutcome, ChainError> {
        match self.db.weight(block.hash()) {
            Ok(_) => return Ok(InsertOutcome::AlreadyKnown),
            Err(StorageError::EntryNotFound(_)) => {}
            Err(err) => return Err(err.into()),
        }

        let parent = self.db.known_header(block.parent_hash).map_err(|err| match err {
            StorageError::EntryNotFound(_) => {
                ChainError::UnknownParent { hash: block.hash(), parent_hash: block.parent_hash }
            }
            err => err.into(),
        })?;

        let engine = self.engine();
        engine.validate(block, &parent)?;
        let weight = engine.weight(block.sealed_header());

        let outcome = self.db.insert_block(block, weight)?;
        if let InsertOutcome::Reorged { head, common_ancestor, depth } = outcome {
            info!(
                target: "blockchain",
                head_number = head.number,
                head_hash = %head.hash,
                common_ancestor = common_ancestor.number,
                depth,
                "Chain reorganised"
            );
        }
        Ok(outcome)
    }
}

impl<DB> HeaderChain for Blockchain<DB>
where
    DB: BlockReader + ChainIndexReader + ChainWriter,
{
    fn header_by_number(&self, number: u64) -> Result<SealedHeader, ChainError> {
        Ok(self.db.header(number)?)
    }

    fn header_by_hash(&self, hash: B256) -> Result<SealedHeader, ChainError> {
        Ok(self.db.header_by_hash(hash)?)
    }

    fn block_by_hash(&self, hash: B256) -> Result<SealedBlock, ChainError> {
        Ok(self.db.block_by_hash(hash)?)
    }

    fn block_by_number(&self, number: u64) -> Result<SealedBlock, ChainError> {
        Ok(self.db.block(number)?)
    }
}

impl<DB> BlockChain for Blockchain<DB>
where
    DB: BlockReader + ChainIndexReader + ChainWriter,
{
    fn current_block(&self) -> Result<SealedBlock, ChainError> {
        Ok(self.db.current_block()?)
    }

    fn genesis_block(&self) -> Result<SealedBlock, ChainError> {
        Ok(self.db.genesis()?)
    }

    fn insert_chain(&self, blocks: Vec<SealedBlock>) -> Result<usize, ChainError> {
        let total = blocks.len();
        for (index, block) in blocks.iter().enumerate() {
            self.insert_one(block, BlockOrigin::Sync).map_err(|source| {
                warn!(target: "blockchain", index, total, "Aborting block batch");
                ChainError::BatchAborted { index, source: Box::new(source) }
            })?;
        }
        Ok(total)
    }

    fn insert_block(
        &self,
        block: SealedBlock,
        origin: BlockOrigin,
    ) -> Result<InsertOutcome, ChainError> {
        self.insert_one(&block, origin)
    }

    fn sealed_block(&self, block: SealedBlock) -> Result<InsertOutcome, ChainError> {
        self.insert_one(&block, BlockOrigin::Local)
    }

    fn set_engine(&self, engine: Arc<dyn ConsensusEngine>) {
        info!(target: "blockchain", ?engine, "Replacing consensus engine");
        *self.engine.write() = engine;
    }

    fn engine(&self) -> Arc<dyn ConsensusEngine> {
        Arc::clone(&self.engine.read())
    }

    fn blocks_from_hash(&self, hash: B256, n: usize) -> Result<Vec<SealedBlock>, ChainError> {
        let limit = n.min(self.config.max_blocks_from_hash);
        let mut blocks = Vec::with_capacity(limit);
        let mut next = hash;

        while blocks.len() < limit {
            let block = match self.db.known_block(next) {
                Ok(block) => block,
                Err(StorageError::EntryNotFound(_)) => break,
                Err(err) => return Err(err.into()),
            };
            next = block.parent_hash;
            let is_genesis = block.is_genesis();
            blocks.push(block);
            if is_genesis {
                break;
            }
        }
        Ok(blocks)
    }

    fn receipts(&self, block_hash: B256) -> Result<Receipts, ChainError> {
        Ok(self.db.receipts(block_hash)?)
    }

    fn logs(&self, block_hash: B256) -> Result<Vec<Vec<Log>>, ChainError> {
        let receipts = self.db.receipts(block_hash)?;
        Ok(receipts.into_iter().map(|receipt| receipt.logs).collect())
    }

    fn write_receipts(&self, block_hash: B256, receipts: Receipts) -> Result<(), ChainError> {
        Ok(self.db.put_receipts(block_hash, &receipts)?)
    }

    fn set_head(&self, number: u64) -> Result<SetHeadOutcome, ChainError> {
        let outcome = self.db.set_head(number)?;
        Metrics::record_set_head(&outcome);
        info!(
            target: "blockchain",
            head_number = outcome.head.number,
            removed = outcome.removed,
            pruned = outcome.pruned,
            "Head rewound"
        );
        Ok(outcome)
    }

    fn header(&self, hash: B256, number: u64) -> Result<SealedHeader, ChainError> {
        let header = self.db.known_header(hash)?;
        if header.number != number {
            return Err(StorageError::EntryNotFound(format!(
                "block {hash} has number {}, not {number}",
                header.number
            ))
            .into());
        }
        Ok(header)
    }

    fn block(&self, hash: B256) -> Result<SealedBlock, ChainError> {
        Ok(self.db.known_block(hash)?)
    }

    fn total_difficulty(&self, hash: B256) -> Result<U256, ChainError> {
        Ok(self.db.weight(hash)?)
    }

    fn transaction_by_hash(&self, tx_hash: B256) -> Result<IndexedTransaction, ChainError> {
        Ok(self.db.transaction_by_hash(tx_hash)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConsensusError, DifficultyEngine};
    use alloy_primitives::{Address, Bytes};
    use ember_primitives::{Block, Body, Header, Receipt, Transaction};
    use rstest::rstest;
    use tempfile::TempDir;

    /// Accepts everything and gives every block the same weight.
    #[derive(Debug)]
    struct FlatEngine(u64);

    impl ConsensusEngine for FlatEngine {
        fn validate(&self, _: &SealedBlock, _: &SealedHeader) -> Result<(), ConsensusError> {
            Ok(())
        }

        fn weight(&self, _: &SealedHeader) -> U256 {
            U256::from(self.0)
        }
    }

    fn transfer(nonce: u64) -> Transaction {
        Transaction {
            nonce,
            sender: Address::repeat_byte(0x0e),
            value: U256::from(nonce),
            ..Default::default()
        }
    }

    fn genesis() -> SealedBlock {
        let header = Header {
            difficulty: U256::from(1),
            gas_limit: 30_000_000,
            extra_data: Bytes::from_static(b"genesis"),
            ..Default::default()
        };
        Block::new(header, Body::default()).seal_slow()
    }

    fn child(
        parent: &SealedHeader,
        difficulty: u64,
        tag: &'static str,
        txs: Vec<Transaction>,
    ) -> SealedBlock {
        let body = Body::new(txs);
        let header = Header {
            parent_hash: parent.hash(),
            number: parent.number + 1,
            timestamp: parent.timestamp + 12,
            gas_limit: parent.gas_limit,
            difficulty: U256::from(difficulty),
            transactions_root: body.transactions_root(),
            extra_data: Bytes::from_static(tag.as_bytes()),
            ..Default::default()
        };
        Block::new(header, body).seal_slow()
    }

    fn setup_chain() -> (TempDir, Blockchain, SealedBlock) {
        let tmp_dir = TempDir::new().expect("create temp dir");
        let config = Config { datadir: tmp_dir.path().join("chaindata"), ..Default::default() };
        let db = config.open_db().expect("open database");
        let genesis = genesis();
        let chain = Blockchain::initialise(db, &genesis, Arc::new(DifficultyEngine), config)
            .expect("initialise chain");
        (tmp_dir, chain, genesis)
    }

    #[test]
    fn test_new_requires_genesis() {
        let tmp_dir = TempDir::new().expect("create temp dir");
        let db = ChainDb::new(tmp_dir.path()).expect("open database");

        let result = Blockchain::new(db, Arc::new(DifficultyEngine), Config::default());
        assert!(matches!(result, Err(ChainError::MissingGenesis)));
    }

    #[test]
    fn test_reopen_loads_head() {
        let tmp_dir = TempDir::new().expect("create temp dir");
        let config = Config { datadir: tmp_dir.path().to_path_buf(), ..Default::default() };
        let genesis = genesis();
        let block1 = child(genesis.sealed_header(), 2, "1", vec![]);
        {
            let chain = Blockchain::initialise(
                config.open_db().unwrap(),
                &genesis,
                Arc::new(DifficultyEngine),
                config.clone(),
            )
            .unwrap();
            chain.insert_block(block1.clone(), BlockOrigin::Sync).unwrap();
        }

        let chain =
            Blockchain::new(config.open_db().unwrap(), Arc::new(DifficultyEngine), config).unwrap();
        assert_eq!(chain.current_block().unwrap(), block1);
        assert_eq!(chain.genesis_block().unwrap(), genesis);
    }

    #[test]
    fn test_insert_chain_and_query() {
        let (_dir, chain, genesis) = setup_chain();
        let block1 = child(genesis.sealed_header(), 2, "1", vec![transfer(1), transfer(2)]);
        let block2 = child(block1.sealed_header(), 2, "2", vec![transfer(3)]);

        let inserted = chain.insert_chain(vec![block1.clone(), block2.clone()]).unwrap();
        assert_eq!(inserted, 2);

        assert_eq!(chain.current_block().unwrap(), block2);
        assert_eq!(chain.block_by_number(1).unwrap(), block1);
        assert_eq!(chain.block_by_hash(block2.hash()).unwrap(), block2);
        assert_eq!(chain.header_by_number(2).unwrap(), *block2.sealed_header());
        assert_eq!(chain.header_by_hash(block1.hash()).unwrap(), *block1.sealed_header());
        assert_eq!(chain.total_difficulty(block2.hash()).unwrap(), U256::from(5));

        let found = chain.transaction_by_hash(transfer(2).hash()).unwrap();
        assert_eq!(found.block_hash, block1.hash());
        assert_eq!(found.index, 1);
    }

    #[test]
    fn test_batch_stops_at_first_invalid_block() {
        let (_dir, chain, genesis) = setup_chain();
        let block1 = child(genesis.sealed_header(), 1, "1", vec![]);
        let mut bad = child(block1.sealed_header(), 1, "2", vec![]).split().0.unseal();
        bad.gas_used = bad.gas_limit + 1;
        let bad = Block::new(bad, Body::default()).seal_slow();
        let block3 = child(bad.sealed_header(), 1, "3", vec![]);

        let err = chain.insert_chain(vec![block1.clone(), bad, block3.clone()]).unwrap_err();
        assert!(matches!(
            err,
            ChainError::BatchAborted { index: 1, ref source }
                if matches!(**source, ChainError::Consensus(
                    ConsensusError::GasUsedExceedsGasLimit { .. }
                ))
        ));

        // the prefix stays inserted
        assert_eq!(chain.current_block().unwrap(), block1);
        assert!(chain.block(block3.hash()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_unknown_parent() {
        let (_dir, chain, genesis) = setup_chain();
        let block1 = child(genesis.sealed_header(), 1, "1", vec![]);
        let block2 = child(block1.sealed_header(), 1, "2", vec![]);

        let err = chain.insert_block(block2.clone(), BlockOrigin::Sync).unwrap_err();
        assert!(matches!(
            err,
            ChainError::UnknownParent { hash, parent_hash }
                if hash == block2.hash() && parent_hash == block1.hash()
        ));
    }

    #[test]
    fn test_reinsert_is_already_known() {
        let (_dir, chain, genesis) = setup_chain();
        let block1 = child(genesis.sealed_header(), 1, "1", vec![]);

        chain.sealed_block(block1.clone()).unwrap();
        assert_eq!(
            chain.insert_block(block1, BlockOrigin::Sync).unwrap(),
            InsertOutcome::AlreadyKnown
        );
        let outcome = chain.insert_block(genesis, BlockOrigin::Sync).unwrap();
        assert_eq!(outcome, InsertOutcome::AlreadyKnown);
    }

    /// #1 and #2 canonical, #2' is lighter than #2, #2'' is heavier.
    #[test]
    fn test_sibling_competition() {
        let (_dir, chain, genesis) = setup_chain();
        let block1 = child(genesis.sealed_header(), 10, "1", vec![transfer(1)]);
        let block2 = child(block1.sealed_header(), 10, "2", vec![transfer(2)]);
        let lighter = child(block1.sealed_header(), 5, "2'", vec![transfer(3)]);
        let heavier = child(block1.sealed_header(), 15, "2''", vec![transfer(4)]);

        chain.insert_chain(vec![block1.clone(), block2.clone()]).unwrap();
        assert_eq!(chain.current_block().unwrap(), block2);

        let outcome = chain.insert_block(lighter.clone(), BlockOrigin::Sync).unwrap();
        assert!(matches!(outcome, InsertOutcome::SideChain { .. }));
        assert_eq!(chain.current_block().unwrap(), block2);
        assert_eq!(chain.block(lighter.hash()).unwrap(), lighter);
        assert!(chain.block_by_hash(lighter.hash()).unwrap_err().is_not_found());

        let outcome = chain.insert_block(heavier.clone(), BlockOrigin::Sync).unwrap();
        assert!(matches!(outcome, InsertOutcome::Reorged { depth: 1, .. }));
        assert_eq!(chain.current_block().unwrap(), heavier);
        assert_eq!(chain.block_by_number(2).unwrap(), heavier);
        assert_eq!(chain.header_by_hash(heavier.hash()).unwrap(), *heavier.sealed_header());

        assert!(chain.transaction_by_hash(transfer(2).hash()).unwrap_err().is_not_found());
        assert_eq!(chain.transaction_by_hash(transfer(4).hash()).unwrap().block_number, 2);
        assert_eq!(chain.total_difficulty(heavier.hash()).unwrap(), U256::from(26));
    }

    #[test]
    fn test_set_head_invalidates_transactions() {
        let (_dir, chain, genesis) = setup_chain();
        let block1 = child(genesis.sealed_header(), 1, "1", vec![transfer(1)]);
        let block2 = child(block1.sealed_header(), 1, "2", vec![transfer(2)]);
        let block3 = child(block2.sealed_header(), 1, "3", vec![transfer(3)]);
        chain.insert_chain(vec![block1.clone(), block2.clone(), block3.clone()]).unwrap();

        let outcome = chain.set_head(1).unwrap();
        assert_eq!(outcome.head, block1.num_hash());
        assert_eq!(outcome.removed, 2);
        assert_eq!(chain.current_block().unwrap(), block1);

        for gone in [transfer(2), transfer(3)] {
            assert!(chain.transaction_by_hash(gone.hash()).unwrap_err().is_not_found());
        }
        assert!(chain.block_by_number(2).unwrap_err().is_not_found());
        assert!(chain.set_head(5).unwrap_err().is_not_found());
    }

    #[test]
    fn test_receipts_and_logs() {
        let (_dir, chain, genesis) = setup_chain();
        let block1 = child(genesis.sealed_header(), 1, "1", vec![transfer(1), transfer(2)]);
        chain.insert_block(block1.clone(), BlockOrigin::Sync).unwrap();

        let log = Log {
            address: Address::repeat_byte(0x42),
            topics: vec![B256::repeat_byte(0x01), B256::repeat_byte(0x02)],
            data: Bytes::from_static(b"payload"),
        };
        let receipts = vec![
            Receipt { success: true, cumulative_gas_used: 21_000, logs: vec![log.clone()] },
            Receipt { success: false, cumulative_gas_used: 42_000, logs: vec![] },
        ];
        chain.write_receipts(block1.hash(), receipts.clone()).unwrap();

        assert_eq!(chain.receipts(block1.hash()).unwrap(), receipts);
        assert_eq!(chain.logs(block1.hash()).unwrap(), vec![vec![log], vec![]]);
        assert!(chain.receipts(genesis.hash()).unwrap_err().is_not_found());
    }

    #[rstest]
    #[case(1, 1)]
    #[case(3, 3)]
    #[case(4, 4)]
    #[case(10, 4)]
    fn test_blocks_from_hash_walks_to_genesis(#[case] n: usize, #[case] expected: usize) {
        let (_dir, chain, genesis) = setup_chain();
        let mut parent = genesis.sealed_header().clone();
        let mut blocks = Vec::new();
        for tag in ["1", "2", "3"] {
            let block = child(&parent, 1, tag, vec![]);
            parent = block.sealed_header().clone();
            blocks.push(block);
        }
        chain.insert_chain(blocks.clone()).unwrap();

        let walked = chain.blocks_from_hash(parent.hash(), n).unwrap();
        assert_eq!(walked.len(), expected);
        assert_eq!(walked[0].hash(), parent.hash());
        for pair in walked.windows(2) {
            assert_eq!(pair[0].parent_hash, pair[1].hash());
        }
        if expected == 4 {
            assert_eq!(walked[3], genesis);
        }
    }

    #[test]
    fn test_blocks_from_hash_respects_config_cap() {
        let (_dir, chain, genesis) = setup_chain();
        let chain = Blockchain {
            config: Config { max_blocks_from_hash: 1, ..chain.config.clone() },
            ..chain
        };
        let block1 = child(genesis.sealed_header(), 1, "1", vec![]);
        chain.insert_block(block1.clone(), BlockOrigin::Sync).unwrap();

        assert_eq!(chain.blocks_from_hash(block1.hash(), 10).unwrap(), vec![block1]);
        assert!(chain.blocks_from_hash(B256::repeat_byte(0x99), 10).unwrap().is_empty());
    }

    #[test]
    fn test_header_by_hash_and_number() {
        let (_dir, chain, genesis) = setup_chain();
        let block1 = child(genesis.sealed_header(), 2, "1", vec![]);
        let side1 = child(genesis.sealed_header(), 1, "1'", vec![]);
        chain.insert_chain(vec![block1.clone(), side1.clone()]).unwrap();

        assert_eq!(chain.header(side1.hash(), 1).unwrap(), *side1.sealed_header());
        assert_eq!(chain.header(block1.hash(), 1).unwrap(), *block1.sealed_header());
        assert!(chain.header(block1.hash(), 2).unwrap_err().is_not_found());
    }

    #[test]
    fn test_engine_swap_changes_fork_choice() {
        let (_dir, chain, genesis) = setup_chain();
        let block1 = child(genesis.sealed_header(), 100, "1", vec![]);
        chain.insert_block(block1.clone(), BlockOrigin::Sync).unwrap();

        // under a flat engine the heavy difficulty of block1 no longer matters going forward
        chain.set_engine(Arc::new(FlatEngine(1_000)));
        let rival = child(genesis.sealed_header(), 1, "rival", vec![]);
        let outcome = chain.insert_block(rival.clone(), BlockOrigin::Sync).unwrap();

        assert!(matches!(outcome, InsertOutcome::Reorged { depth: 1, .. }));
        assert_eq!(chain.current_block().unwrap(), rival);
        assert_eq!(chain.engine().weight(rival.sealed_header()), U256::from(1_000));
    }
}
