use std::path::Path;

use ::config as config_rs;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

pub trait EnvConfig: Sized + DeserializeOwned {
    const PREFIX: &'static str = "APP";
    const SEPARATOR: &'static str = "__";

    fn load_dotenv() {
        // crate root first, then the working directory
        let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
        let _ = dotenvy::from_filename(manifest_dir.join(".env")).or_else(|_| dotenvy::dotenv());
    }

    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn from_env() -> Result<Self> {
        Self::load_dotenv();
        Self::from_source(
            config_rs::Environment::with_prefix(Self::PREFIX)
                .prefix_separator("_")
                .separator(Self::SEPARATOR)
                .try_parsing(true),
        )
    }

    /// Builds from an explicit environment source; `from_env` delegates here.
    fn from_source(source: config_rs::Environment) -> Result<Self> {
        let settings = config_rs::Config::builder()
            .add_source(source)
            .build()
            .context("failed to read environment variables for config")?;

        let cfg = settings
            .try_deserialize::<Self>()
            .context("failed to deserialize environment into config")?;

        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::config::AppConfig;

    fn source(vars: &[(&str, &str)]) -> config_rs::Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        config_rs::Environment::with_prefix("APP")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(Some(map))
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let cfg = AppConfig::from_source(source(&[])).expect("defaults are valid");

        assert_eq!(cfg.general.port, 3000);
        assert_eq!(cfg.dump.timeout_secs, 60);
        assert_eq!(cfg.dump.postgres_program, "pg_dump");
        assert_eq!(cfg.storage.files_dir, Path::new("files_to_edit"));
    }

    #[test]
    fn nested_keys_override_sections() {
        let cfg = AppConfig::from_source(source(&[
            ("APP_GENERAL__PORT", "8088"),
            ("APP_DUMP__TIMEOUT_SECS", "5"),
            ("APP_DUMP__MYSQL_PROGRAM", "/opt/mysql/bin/mysqldump"),
            ("APP_STORAGE__PROFILES_DIR", "/var/lib/profiles"),
        ]))
        .expect("overrides are valid");

        assert_eq!(cfg.general.port, 8088);
        assert_eq!(cfg.dump.timeout_secs, 5);
        assert_eq!(cfg.dump.mysql_program, "/opt/mysql/bin/mysqldump");
        assert_eq!(cfg.storage.profiles_dir, Path::new("/var/lib/profiles"));
    }

    #[test]
    fn invalid_values_are_reported_together() {
        let err = AppConfig::from_source(source(&[
            ("APP_DUMP__TIMEOUT_SECS", "0"),
            ("APP_DUMP__POSTGRES_PROGRAM", " "),
        ]))
        .expect_err("zero timeout is invalid");

        let message = format!("{err:#}");
        assert!(message.contains("dump.timeout_secs"));
        assert!(message.contains("dump.postgres_program"));
    }
}
