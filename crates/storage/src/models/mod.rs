//! Database table schemas used by the chain store.
//!
//! This module defines the value types, keys, and table layouts for all data persisted by the
//! chain store. Keys follow a fixed-width layout:
//! - block numbers are encoded as 8 big-endian bytes, so byte order equals numeric order and range
//!   walks visit the chain in height order;
//! - block and transaction hashes are stored as their raw 32 bytes;
//! - head references use a one byte [`HeadRefKey`].
//!
//! Each table lives in its own MDBX sub-database, so equal key bytes in different tables never
//! collide.
//!
//! The tables are registered using [`reth_db_api::table::TableInfo`] and grouped into a
//! [`reth_db_api::TableSet`] for database initialization via Reth's storage-api.

mod block;
pub use block::{
    CanonicalBodies, CanonicalHeaders, SideBlocks, StoredBlock, StoredBody, StoredHeader,
};
mod index;
pub use index::{ChainWeight, ChainWeights, HeaderNumbers, StoredBlockNumber, TransactionBlocks};
mod receipt;
pub use receipt::{BlockReceipts, StoredReceipts};
mod head_ref;
pub use head_ref::{BlockRef, HeadRefKey, HeadRefs};

/// Implements [`reth_db_api::table::Compress`] and [`reth_db_api::table::Decompress`] for types
/// that implement [`alloy_rlp::Encodable`] and [`alloy_rlp::Decodable`].
///
/// Decompression never panics: malformed bytes surface as
/// [`reth_db_api::DatabaseError::Decode`], which the store reports as a corrupt record.
///
/// # Example
/// ```ignore
/// impl_compression_for_rlp!(StoredHeader, StoredBody);
/// ```
macro_rules! impl_compression_for_rlp {
    ($($name:ident),+ $(,)?) => {
        $(
            impl reth_db_api::table::Compress for $name {
                type Compressed = Vec<u8>;

                fn compress_to_buf<B: bytes::BufMut + AsMut<[u8]>>(&self, buf: &mut B) {
                    alloy_rlp::Encodable::encode(self, buf);
                }
            }

            impl reth_db_api::table::Decompress for $name {
                fn decompress(value: &[u8]) -> Result<$name, reth_db_api::DatabaseError> {
                    $crate::codec::decode_exact(value).map_err(|err| {
                        tracing::error!(
                            target: "chain_storage",
                            record = stringify!($name),
                            %err,
                            "Failed to decode stored record"
                        );
                        reth_db_api::DatabaseError::Decode
                    })
                }
            }
        )+
    };
}

/// Implements [`reth_db_api::table::TableInfo`] for one or more table types that implement
/// [`reth_db_api::table::Table`].
///
/// This allows the table to be registered and introspected by the Reth database schema system.
macro_rules! impl_table_info {
    ($($table:ty),+ $(,)?) => {
        $(
            impl reth_db_api::table::TableInfo for $table
            where
                $table: reth_db_api::table::Table,
            {
                fn name(&self) -> &'static str {
                    <$table as reth_db_api::table::Table>::NAME
                }

                fn is_dupsort(&self) -> bool {
                    <$table as reth_db_api::table::Table>::DUPSORT
                }
            }
        )+
    };
}

/// Declares a struct representing a collection of tables and implements [`reth_db_api::TableSet`]
/// for it.
///
/// The resulting struct can be passed to Reth's `init_db_for::<_, YourTableSet>()` to initialize
/// only the specified tables.
macro_rules! impl_table_set {
    (
        $(#[$outer:meta])*
        $set_name:ident, $($table:ty),+ $(,)?
    ) => {
        $(#[$outer])*
        #[derive(Debug)]
        pub(crate) struct $set_name;

        impl reth_db_api::TableSet for $set_name {
            fn tables() -> Box<dyn Iterator<Item = Box<dyn reth_db_api::table::TableInfo>>> {
                Box::new(vec![
                    $(
                        Box::new(<$table>::default()) as Box<dyn reth_db_api::table::TableInfo>
                    ),*
                ].into_iter())
            }
        }
    };
}

// Implement compression logic for all value types stored in tables
impl_compression_for_rlp!(
    StoredHeader,
    StoredBody,
    StoredBlock,
    StoredReceipts,
    StoredBlockNumber,
    ChainWeight,
    BlockRef,
);

// Enable reflection for each table (name + dupsort metadata)
impl_table_info!(
    CanonicalHeaders,
    CanonicalBodies,
    HeaderNumbers,
    TransactionBlocks,
    BlockReceipts,
    HeadRefs,
    ChainWeights,
    SideBlocks,
);

// Define and register the full table set used by the chain store
impl_table_set!(
    /// Every table of the chain store.
    Tables,
    CanonicalHeaders,
    CanonicalBodies,
    HeaderNumbers,
    TransactionBlocks,
    BlockReceipts,
    HeadRefs,
    ChainWeights,
    SideBlocks,
);
