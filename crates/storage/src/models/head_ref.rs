//! Models for the chain head pointer.

use alloy_eips::eip1898::BlockNumHash;
use alloy_primitives::B256;
use alloy_rlp::{RlpDecodable, RlpEncodable};
use reth_db_api::{
    DatabaseError,
    table::{Decode, Encode, Table},
};
use serde::{Deserialize, Serialize};

/// Key representing a particular head reference type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HeadRefKey {
    /// Head of the canonical chain.
    Latest,
}

impl Encode for HeadRefKey {
    type Encoded = [u8; 1];

    fn encode(self) -> Self::Encoded {
        match self {
            Self::Latest => [0],
        }
    }
}

impl Decode for HeadRefKey {
    fn decode(value: &[u8]) -> Result<Self, DatabaseError> {
        match value {
            [0] => Ok(Self::Latest),
            _ => Err(DatabaseError::Decode),
        }
    }
}

/// Number and hash of the block a head reference points at.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, RlpEncodable, RlpDecodable,
)]
pub struct BlockRef {
    /// Block number.
    pub number: u64,
    /// Block hash.
    pub hash: B256,
}

impl From<BlockNumHash> for BlockRef {
    fn from(id: BlockNumHash) -> Self {
        Self { number: id.number, hash: id.hash }
    }
}

impl From<BlockRef> for BlockNumHash {
    fn from(block_ref: BlockRef) -> Self {
        Self { number: block_ref.number, hash: block_ref.hash }
    }
}

/// A table holding the head references of the chain.
///
/// - **Key**: [`HeadRefKey`]
/// - **Value**: [`BlockRef`]
///
/// There is exactly one [`HeadRefKey::Latest`] row once genesis is stored; it is overwritten on
/// every canonical change and never deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct HeadRefs;

impl Table for HeadRefs {
    const NAME: &'static str = "head_refs";

    const DUPSORT: bool = false;

    type Key = HeadRefKey;

    type Value = BlockRef;
}
