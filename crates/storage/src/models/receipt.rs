//! Models for storing execution receipts.
//!
//! Receipts are keyed by block hash rather than number: they are looked up when verifying a
//! specific block, independently of whether that block is canonical.

use alloy_primitives::B256;
use alloy_rlp::{RlpDecodableWrapper, RlpEncodableWrapper};
use ember_primitives::{Receipt, Receipts};
use reth_db_api::table::Table;
use serde::{Deserialize, Serialize};

/// Receipts of one block, in transaction order.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    RlpEncodableWrapper,
    RlpDecodableWrapper,
)]
pub struct StoredReceipts(pub Vec<Receipt>);

impl From<&[Receipt]> for StoredReceipts {
    fn from(receipts: &[Receipt]) -> Self {
        Self(receipts.to_vec())
    }
}

impl From<StoredReceipts> for Receipts {
    fn from(stored: StoredReceipts) -> Self {
        stored.0
    }
}

/// A table for storing receipts by block hash.
///
/// - **Key**: `B256`: block hash
/// - **Value**: [`StoredReceipts`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct BlockReceipts;

impl Table for BlockReceipts {
    const NAME: &'static str = "block_receipts";

    const DUPSORT: bool = false;

    type Key = B256;

    type Value = StoredReceipts;
}
