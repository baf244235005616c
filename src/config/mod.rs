pub mod configs;
pub mod defaults;
pub mod envconfig;
pub mod validate;

pub use configs::{AppConfig, DumpConfig, GeneralConfig, LoggingConfig, StorageConfig};
pub use envconfig::EnvConfig;
