use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub mod defaults;
pub mod duration_serde;

use defaults::*;

use crate::dataset::{DegeneratePolicy, RandomState};
use crate::errors::{FetchError, FetchResult};
use crate::fetch::FetchOptions;

/// Remote archive retrieval settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Locator of the MATLAB archive holding the `faces` matrix
    #[serde(default = "default_data_url")]
    pub url: String,
    /// Connection timeout; the reference behaviour has none
    #[serde(
        default,
        with = "duration_serde::option_duration",
        skip_serializing_if = "Option::is_none"
    )]
    pub connect_timeout: Option<Duration>,
    /// Allow a download when no cached artifact exists
    #[serde(default = "default_download_if_missing")]
    pub download_if_missing: bool,
}

/// Cache artifact settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// gzip level for the cached artifact (0 = none ... 9 = max)
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
}

/// Post-processing applied to the loaded collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub degenerate_policy: DegeneratePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cache root; resolved with [`resolve_data_home`] when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_home: Option<PathBuf>,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
}

fn default_data_url() -> String {
    DEFAULT_DATA_URL.to_string()
}

fn default_download_if_missing() -> bool {
    DEFAULT_DOWNLOAD_IF_MISSING
}

fn default_compression_level() -> u32 {
    DEFAULT_COMPRESSION_LEVEL
}

fn default_shuffle() -> bool {
    DEFAULT_SHUFFLE
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            url: default_data_url(),
            connect_timeout: None,
            download_if_missing: default_download_if_missing(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            compression_level: default_compression_level(),
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            shuffle: default_shuffle(),
            seed: default_seed(),
            degenerate_policy: DegeneratePolicy::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_home: None,
            download: DownloadConfig::default(),
            cache: CacheConfig::default(),
            dataset: DatasetConfig::default(),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> FetchResult<()> {
        if self.compression_level > MAX_COMPRESSION_LEVEL {
            return Err(FetchError::configuration(format!(
                "compression_level {} is out of range 0..={}",
                self.compression_level, MAX_COMPRESSION_LEVEL
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from `olivetti.toml` (or `$CONFIG_FILE`) plus
    /// `OLIVETTI_*` environment overrides.
    pub fn load() -> FetchResult<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from_file(&config_file)
    }

    /// Layer defaults, the TOML file (if it exists) and environment
    /// variables. Nested keys use `__`, e.g. `OLIVETTI_CACHE__COMPRESSION_LEVEL=9`.
    pub fn load_from_file(config_file: &str) -> FetchResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if Path::new(config_file).exists() {
            info!("Loading configuration from: {}", config_file);
            figment = figment.merge(Toml::file(config_file));
        } else {
            debug!("Config file {} not found, using defaults", config_file);
        }
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| FetchError::configuration(e.to_string()))?;
        config.cache.validate()?;
        Ok(config)
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> FetchResult<String> {
        toml::to_string_pretty(self).map_err(|e| FetchError::configuration(e.to_string()))
    }

    /// Build pipeline options from this configuration
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions::new()
            .data_home(resolve_data_home(self.data_home.as_deref()))
            .shuffle(self.dataset.shuffle)
            .random_state(RandomState::Seed(self.dataset.seed))
            .download_if_missing(self.download.download_if_missing)
            .compression_level(self.cache.compression_level)
            .degenerate_policy(self.dataset.degenerate_policy)
    }
}

/// Resolve the cache root directory.
///
/// Order: explicit path, `$OLIVETTI_DATA_HOME`, `$HOME/olivetti_data`,
/// `./olivetti_data`. A leading `~` is expanded against `$HOME`.
pub fn resolve_data_home(explicit: Option<&Path>) -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from);

    let chosen = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(DATA_HOME_ENV).map(PathBuf::from));

    match chosen {
        Some(path) => expand_tilde(&path, home.as_deref()),
        None => match home {
            Some(home) => home.join(DEFAULT_DATA_HOME_DIR),
            None => PathBuf::from(".").join(DEFAULT_DATA_HOME_DIR),
        },
    }
}

fn expand_tilde(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
