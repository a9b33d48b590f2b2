use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};

const DEFAULT_CONFIG: &str = include_str!("default.toml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub read: ReadConfig,
}

impl AppConfig {
    pub fn load() -> CommonResult<Self> {
        Figment::from(Toml::string(DEFAULT_CONFIG))
            .admerge(Env::prefixed("TRAWL__").map(|p| p.as_str().replace("__", ".").into()))
            .extract()
            .map_err(|e| CommonError::InvalidArgument(e.to_string()))
    }
}

/// Configuration for partitioned reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadConfig {
    /// The number of partitions each query result is split into.
    pub partition_count: usize,
    /// The number of column-block shards produced per partition.
    /// Zero means "use the partition count".
    pub column_splits: usize,
}
