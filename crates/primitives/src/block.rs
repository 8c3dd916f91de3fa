//! Block and body types.

use crate::{Header, SealedHeader, Transaction};
use alloy_eips::eip1898::BlockNumHash;
use alloy_primitives::{B256, keccak256};
use alloy_rlp::{RlpDecodable, RlpEncodable};
use derive_more::Deref;
use serde::{Deserialize, Serialize};

/// The ordered list of transactions belonging to a header.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize, RlpEncodable, RlpDecodable,
)]
pub struct Body {
    /// Transactions in execution order.
    pub transactions: Vec<Transaction>,
}

impl Body {
    /// Creates a body from a list of transactions.
    pub const fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    /// Returns the hashes of all transactions, in order.
    pub fn transaction_hashes(&self) -> Vec<B256> {
        self.transactions.iter().map(Transaction::hash).collect()
    }

    /// Commitment over the ordered transaction hashes.
    ///
    /// An empty body commits to the hash of the empty RLP list.
    pub fn transactions_root(&self) -> B256 {
        keccak256(alloy_rlp::encode(self.transaction_hashes()))
    }

    /// Returns the position of the transaction with the given hash.
    pub fn position(&self, tx_hash: B256) -> Option<usize> {
        self.transactions.iter().position(|tx| tx.hash() == tx_hash)
    }
}

/// A header paired with its body.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize, RlpEncodable, RlpDecodable,
)]
pub struct Block {
    /// Block header.
    pub header: Header,
    /// Block body.
    pub body: Body,
}

impl Block {
    /// Creates a new block.
    pub const fn new(header: Header, body: Body) -> Self {
        Self { header, body }
    }

    /// Seals the header, computing the block hash.
    pub fn seal_slow(self) -> SealedBlock {
        SealedBlock { header: self.header.seal_slow(), body: self.body }
    }
}

/// A block whose header hash has been computed.
///
/// A block's identity is its header hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deref)]
pub struct SealedBlock {
    #[deref]
    header: SealedHeader,
    body: Body,
}

impl SealedBlock {
    /// Creates a sealed block from a sealed header and a body.
    pub const fn new(header: SealedHeader, body: Body) -> Self {
        Self { header, body }
    }

    /// Returns the block hash.
    pub const fn hash(&self) -> B256 {
        self.header.hash()
    }

    /// Returns the block number.
    pub const fn number(&self) -> u64 {
        self.header.header().number
    }

    /// Returns the number and hash of the block.
    pub const fn num_hash(&self) -> BlockNumHash {
        self.header.num_hash()
    }

    /// Returns the sealed header.
    pub const fn sealed_header(&self) -> &SealedHeader {
        &self.header
    }

    /// Returns the body.
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// Returns the transactions of the block.
    pub fn transactions(&self) -> &[Transaction] {
        &self.body.transactions
    }

    /// Splits the block into its sealed header and body.
    pub fn split(self) -> (SealedHeader, Body) {
        (self.header, self.body)
    }

    /// Drops the cached hash.
    pub fn unseal(self) -> Block {
        Block { header: self.header.unseal(), body: self.body }
    }
}

impl From<Block> for SealedBlock {
    fn from(block: Block) -> Self {
        block.seal_slow()
    }
}
