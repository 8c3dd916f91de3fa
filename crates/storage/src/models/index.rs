//! Models for the secondary indices and per-hash chain weights.
//!
//! Both the hash index and the transaction index resolve a hash to the number of the canonical
//! block it belongs to. Chain weights are keyed by hash, not number, because competing blocks may
//! share a height while carrying different cumulative weights.

use alloy_primitives::{B256, U256};
use alloy_rlp::{RlpDecodableWrapper, RlpEncodableWrapper};
use derive_more::{Display, From, Into};
use reth_db_api::table::Table;
use serde::{Deserialize, Serialize};

/// A block number stored as a table value.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Display,
    From,
    Into,
    Serialize,
    Deserialize,
    RlpEncodableWrapper,
    RlpDecodableWrapper,
)]
pub struct StoredBlockNumber(pub u64);

/// Cumulative weight ("total difficulty") of a block: the weight of its parent plus its own.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Default,
    Display,
    From,
    Into,
    Serialize,
    Deserialize,
    RlpEncodableWrapper,
    RlpDecodableWrapper,
)]
pub struct ChainWeight(pub U256);

/// Index from canonical block hash to block number.
///
/// - **Key**: `B256`: block hash
/// - **Value**: [`StoredBlockNumber`]: canonical block number
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct HeaderNumbers;

impl Table for HeaderNumbers {
    const NAME: &'static str = "header_numbers";

    const DUPSORT: bool = false;

    type Key = B256;

    type Value = StoredBlockNumber;
}

/// Index from transaction hash to the number of the canonical block containing it.
///
/// - **Key**: `B256`: transaction hash
/// - **Value**: [`StoredBlockNumber`]: canonical block number
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct TransactionBlocks;

impl Table for TransactionBlocks {
    const NAME: &'static str = "transaction_blocks";

    const DUPSORT: bool = false;

    type Key = B256;

    type Value = StoredBlockNumber;
}

/// Cumulative chain weight of every known block, canonical or not.
///
/// - **Key**: `B256`: block hash
/// - **Value**: [`ChainWeight`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct ChainWeights;

impl Table for ChainWeights {
    const NAME: &'static str = "chain_weights";

    const DUPSORT: bool = false;

    type Key = B256;

    type Value = ChainWeight;
}
