/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Download defaults
pub const DEFAULT_DATA_URL: &str = "https://cs.nyu.edu/~roweis/data/olivettifaces.mat";
pub const DEFAULT_DOWNLOAD_IF_MISSING: bool = true;

// Cache defaults
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;
pub const MAX_COMPRESSION_LEVEL: u32 = 9;
pub const DATA_HOME_ENV: &str = "OLIVETTI_DATA_HOME";
pub const DEFAULT_DATA_HOME_DIR: &str = "olivetti_data";

// Dataset defaults
pub const DEFAULT_SHUFFLE: bool = false;
pub const DEFAULT_SEED: u64 = 0;

// Config file / environment
pub const DEFAULT_CONFIG_FILE: &str = "olivetti.toml";
pub const ENV_PREFIX: &str = "OLIVETTI_";
