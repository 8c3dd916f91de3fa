#![doc = include_str!("../README.md")]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod header;
pub use header::{Header, SealedHeader};

mod transaction;
pub use transaction::Transaction;

mod block;
pub use block::{Block, Body, SealedBlock};

mod receipt;
pub use receipt::{Log, Receipt, Receipts};

pub use alloy_eips::eip1898::BlockNumHash;
