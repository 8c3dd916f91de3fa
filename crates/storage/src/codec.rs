//! Record codec used for every value persisted by the chain store.
//!
//! Values are stored in their canonical RLP encoding. Decoding is strict: the input must contain
//! exactly one well-formed item, anything else is reported as
//! [`StorageError::CorruptRecord`] instead of panicking.

use crate::StorageError;
use alloy_rlp::{Decodable, Encodable};

/// Encodes a value into its storage representation.
pub fn encode<T: Encodable>(value: &T) -> Vec<u8> {
    alloy_rlp::encode(value)
}

/// Decodes a value from its storage representation.
pub fn decode<T: Decodable>(bytes: &[u8]) -> Result<T, StorageError> {
    decode_exact(bytes).map_err(|err| StorageError::CorruptRecord(err.to_string()))
}

/// Decodes exactly one item, rejecting trailing bytes.
pub(crate) fn decode_exact<T: Decodable>(mut bytes: &[u8]) -> alloy_rlp::Result<T> {
    let value = T::decode(&mut bytes)?;
    if !bytes.is_empty() {
        return Err(alloy_rlp::Error::UnexpectedLength);
    }
    Ok(value)
}
