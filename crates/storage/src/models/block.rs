//! Models for storing block headers and bodies in the database.
//!
//! Canonical headers and bodies are keyed by block number: for every canonical height there is
//! exactly one header and one body. Blocks that are known but not canonical are kept whole in
//! [`SideBlocks`], keyed by hash, so that a later reorg can promote them.

use alloy_rlp::{RlpDecodableWrapper, RlpEncodableWrapper};
use ember_primitives::{Block, Body, Header, SealedBlock, SealedHeader};
use reth_db_api::table::Table;
use serde::{Deserialize, Serialize};

/// Stored form of a block [`Header`].
///
/// It is stored as the value in the [`CanonicalHeaders`] table. The hash is not stored, it is
/// recomputed from the content when the header is read back.
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
pub struct StoredHeader(pub Header);

impl From<&SealedHeader> for StoredHeader {
    fn from(header: &SealedHeader) -> Self {
        Self(header.header().clone())
    }
}

impl From<StoredHeader> for SealedHeader {
    fn from(stored: StoredHeader) -> Self {
        stored.0.seal_slow()
    }
}

/// Stored form of a block [`Body`], the value of the [`CanonicalBodies`] table.
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
pub struct StoredBody(pub Body);

impl From<&Body> for StoredBody {
    fn from(body: &Body) -> Self {
        Self(body.clone())
    }
}

impl From<StoredBody> for Body {
    fn from(stored: StoredBody) -> Self {
        stored.0
    }
}

/// A complete non-canonical block, the value of the [`SideBlocks`] table.
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
pub struct StoredBlock(pub Block);

impl From<&SealedBlock> for StoredBlock {
    fn from(block: &SealedBlock) -> Self {
        Self(Block::new(block.header().clone(), block.body().clone()))
    }
}

impl From<StoredBlock> for SealedBlock {
    fn from(stored: StoredBlock) -> Self {
        stored.0.seal_slow()
    }
}

/// A table for storing canonical block headers by block number.
///
/// This is a standard table (not dup-sorted) where:
/// - **Key**: `u64`: block number
/// - **Value**: [`StoredHeader`]: header content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CanonicalHeaders;

impl Table for CanonicalHeaders {
    const NAME: &'static str = "canonical_headers";

    const DUPSORT: bool = false;

    type Key = u64;

    type Value = StoredHeader;
}

/// A table for storing canonical block bodies by block number.
///
/// - **Key**: `u64`: block number
/// - **Value**: [`StoredBody`]: ordered transactions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CanonicalBodies;

impl Table for CanonicalBodies {
    const NAME: &'static str = "canonical_bodies";

    const DUPSORT: bool = false;

    type Key = u64;

    type Value = StoredBody;
}

/// A table for storing known blocks that are not part of the canonical chain.
///
/// - **Key**: `B256`: block hash
/// - **Value**: [`StoredBlock`]: header and body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct SideBlocks;

impl Table for SideBlocks {
    const NAME: &'static str = "side_blocks";

    const DUPSORT: bool = false;

    type Key = alloy_primitives::B256;

    type Value = StoredBlock;
}
