//! Block header types.

use alloy_eips::eip1898::BlockNumHash;
use alloy_primitives::{Address, B256, Bytes, U256, keccak256};
use alloy_rlp::{RlpDecodable, RlpEncodable};
use derive_more::Deref;
use serde::{Deserialize, Serialize};

/// A block header.
///
/// The header is immutable once stored. Its hash is the keccak256 digest of its RLP encoding, so
/// two headers with the same content always share the same hash.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize, RlpEncodable, RlpDecodable,
)]
pub struct Header {
    /// Hash of the parent block.
    pub parent_hash: B256,
    /// Address receiving the block reward.
    pub beneficiary: Address,
    /// Commitment to the post-execution state.
    pub state_root: B256,
    /// Commitment to the transactions in the body, see [`Body::transactions_root`].
    ///
    /// [`Body::transactions_root`]: crate::Body::transactions_root
    pub transactions_root: B256,
    /// Commitment to the receipts produced by executing the body.
    pub receipts_root: B256,
    /// Per-block weight declared by the producer. Interpretation is up to the consensus engine.
    pub difficulty: U256,
    /// Height of the block. The genesis block has number `0`.
    pub number: u64,
    /// Gas limit of the block.
    pub gas_limit: u64,
    /// Gas consumed by the transactions in the block.
    pub gas_used: u64,
    /// Block timestamp in seconds since the Unix epoch.
    pub timestamp: u64,
    /// Arbitrary producer data.
    pub extra_data: Bytes,
    /// Consensus specific mix digest.
    pub mix_hash: B256,
    /// Consensus specific nonce.
    pub nonce: u64,
}

impl Header {
    /// Computes the hash of the header.
    ///
    /// This re-encodes the header on every call, prefer [`Header::seal_slow`] when the hash is
    /// needed more than once.
    pub fn hash_slow(&self) -> B256 {
        keccak256(alloy_rlp::encode(self))
    }

    /// Computes the hash once and pairs it with the header.
    pub fn seal_slow(self) -> SealedHeader {
        let hash = self.hash_slow();
        SealedHeader { header: self, hash }
    }

    /// Returns `true` if this header is a genesis header.
    pub const fn is_genesis(&self) -> bool {
        self.number == 0
    }
}

/// A [`Header`] together with its precomputed hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deref)]
pub struct SealedHeader {
    #[deref]
    header: Header,
    hash: B256,
}

impl SealedHeader {
    /// Returns the block hash.
    pub const fn hash(&self) -> B256 {
        self.hash
    }

    /// Returns the inner header.
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Returns the number and hash of the block.
    pub const fn num_hash(&self) -> BlockNumHash {
        BlockNumHash { number: self.header.number, hash: self.hash }
    }

    /// Consumes the sealed header and returns the inner header.
    pub fn unseal(self) -> Header {
        self.header
    }
}

impl From<Header> for SealedHeader {
    fn from(header: Header) -> Self {
        header.seal_slow()
    }
}
