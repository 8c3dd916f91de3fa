//! Chain configuration.

use ember_storage::{ChainDb, DatabaseArguments, StorageError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default cap on the number of blocks returned by a single ancestry walk.
pub const DEFAULT_MAX_BLOCKS_FROM_HASH: usize = 1024;

/// Configuration of a [`Blockchain`](crate::Blockchain).
///
/// Missing fields take their default value, so a partial TOML document is accepted:
///
/// ```toml
/// datadir = "/var/lib/ember/chaindata"
/// max_blocks_from_hash = 256
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the MDBX environment.
    pub datadir: PathBuf,
    /// Upper bound on `n` in [`BlockChain::blocks_from_hash`](crate::BlockChain::blocks_from_hash).
    pub max_blocks_from_hash: usize,
    /// Maximum number of concurrent MDBX readers. `None` keeps the MDBX default.
    pub max_readers: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            datadir: PathBuf::from("chaindata"),
            max_blocks_from_hash: DEFAULT_MAX_BLOCKS_FROM_HASH,
            max_readers: None,
        }
    }
}

impl Config {
    /// Parses a configuration from a TOML document.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// MDBX arguments derived from this configuration.
    pub fn database_args(&self) -> DatabaseArguments {
        DatabaseArguments::default().with_max_readers(self.max_readers)
    }

    /// Opens the block store in [`Config::datadir`].
    pub fn open_db(&self) -> Result<ChainDb, StorageError> {
        ChainDb::with_args(&self.datadir, self.database_args())
    }
}
