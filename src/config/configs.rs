use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{defaults, envconfig::EnvConfig, validate};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub dump: DumpConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        <Self as EnvConfig>::from_env()
    }
}

impl EnvConfig for AppConfig {
    fn validate(&self) -> Result<()> {
        validate::validate(self)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            host: defaults::DEFAULT_HOST.to_string(),
            port: defaults::DEFAULT_PORT as u16,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub rust_log: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            rust_log: defaults::DEFAULT_RUST_LOG.to_string(),
        }
    }
}

/// Directories backing the file and connection-profile stores.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub files_dir: PathBuf,
    pub profiles_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            files_dir: PathBuf::from(defaults::DEFAULT_FILES_DIR),
            profiles_dir: PathBuf::from(defaults::DEFAULT_PROFILES_DIR),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DumpConfig {
    pub timeout_secs: u64,
    pub max_output_bytes: usize,
    pub postgres_program: String,
    pub mysql_program: String,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::DEFAULT_DUMP_TIMEOUT_SECS as u64,
            max_output_bytes: defaults::DEFAULT_DUMP_MAX_OUTPUT_BYTES as usize,
            postgres_program: defaults::DEFAULT_POSTGRES_PROGRAM.to_string(),
            mysql_program: defaults::DEFAULT_MYSQL_PROGRAM.to_string(),
        }
    }
}
