#![doc = include_str!("../README.md")]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod codec;

mod error;
pub use error::StorageError;

pub mod models;

mod providers;

mod chaindb;
pub use chaindb::ChainDb;

mod traits;
pub use traits::{BlockReader, ChainIndexReader, ChainWriter, HeaderReader};

mod types;
pub use types::{IndexedTransaction, InsertOutcome, SetHeadOutcome};

pub use reth_db::mdbx::DatabaseArguments;
