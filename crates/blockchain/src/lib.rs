#![doc = include_str!("../README.md")]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod chain;
pub use chain::Blockchain;

mod config;
pub use config::{Config, DEFAULT_MAX_BLOCKS_FROM_HASH};

mod consensus;
pub use consensus::{
    ConsensusEngine, DifficultyEngine, validate_header_against_parent, validate_header_gas,
    validate_transactions_root,
};

mod error;
pub use error::{ChainError, ConsensusError};

mod metrics;

mod traits;
pub use traits::{BlockChain, BlockOrigin, HeaderChain};
