//! Transaction type.

use alloy_primitives::{Address, B256, Bytes, TxKind, U256, keccak256};
use alloy_rlp::{RlpDecodable, RlpEncodable};
use serde::{Deserialize, Serialize};

/// A transaction as carried in a block [`Body`](crate::Body).
///
/// Signature recovery happens before a transaction reaches the chain store, so the sender is
/// carried explicitly. The transaction hash covers every field.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize, RlpEncodable, RlpDecodable,
)]
pub struct Transaction {
    /// Chain the transaction is bound to.
    pub chain_id: u64,
    /// Sender account nonce.
    pub nonce: u64,
    /// Recovered sender.
    pub sender: Address,
    /// Price per unit of gas.
    pub gas_price: u128,
    /// Maximum gas the transaction may consume.
    pub gas_limit: u64,
    /// Recipient, or [`TxKind::Create`] for contract creation.
    pub to: TxKind,
    /// Value transferred.
    pub value: U256,
    /// Call data or init code.
    pub input: Bytes,
}

impl Transaction {
    /// Computes the transaction hash.
    pub fn hash(&self) -> B256 {
        keccak256(alloy_rlp::encode(self))
    }
}
