use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::diagram::{
    DiagramRequest, OutputFormat,
    dump::REDACTED,
    engine::Engine,
    pipeline::{deserialize_password, deserialize_port},
};

use super::{
    StoreError, create_new, list_names, overwrite, read_to_string, validate_profile_name,
};

/// Saved connection parameters. Older documents use `dbType` and `dbname`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    #[serde(alias = "dbType")]
    pub engine: String,
    #[serde(default)]
    pub host: String,
    #[serde(default, deserialize_with = "deserialize_port")]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: String,
    #[serde(default, deserialize_with = "deserialize_password")]
    pub password: String,
    #[serde(default, alias = "dbname")]
    pub database_name: String,
}

impl Default for ConnectionProfile {
    fn default() -> Self {
        Self {
            engine: Engine::Postgres.to_string(),
            host: "localhost".to_string(),
            port: Some(5432),
            user: "root".to_string(),
            password: String::new(),
            database_name: "my_database".to_string(),
        }
    }
}

impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("engine", &self.engine)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &REDACTED)
            .field("database_name", &self.database_name)
            .finish()
    }
}

impl From<ConnectionProfile> for DiagramRequest {
    fn from(profile: ConnectionProfile) -> Self {
        Self {
            engine: profile.engine,
            host: profile.host,
            port: profile.port,
            user: profile.user,
            password: profile.password,
            database_name: profile.database_name,
            format: OutputFormat::Svg,
        }
    }
}

/// One pretty-printed JSON document per profile.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        list_names(&self.dir, |name| name.ends_with(".json")).await
    }

    pub async fn get(&self, name: &str) -> Result<ConnectionProfile, StoreError> {
        let name = validate_profile_name(name)?;
        let raw = read_to_string(&self.dir.join(name), name).await?;
        serde_json::from_str(&raw).map_err(|err| StoreError::Malformed {
            name: name.to_string(),
            reason: err.to_string(),
        })
    }

    /// Creates `name` filled with placeholder values.
    pub async fn create(&self, name: &str) -> Result<ConnectionProfile, StoreError> {
        let name = validate_profile_name(name)?;
        let profile = ConnectionProfile::default();
        let body = to_document(name, &profile)?;
        create_new(&self.dir, &self.dir.join(name), name, body.as_bytes()).await?;
        tracing::info!(profile = %name, "connection profile created");
        Ok(profile)
    }

    pub async fn put(&self, name: &str, profile: &ConnectionProfile) -> Result<(), StoreError> {
        let name = validate_profile_name(name)?;
        let body = to_document(name, profile)?;
        overwrite(&self.dir, &self.dir.join(name), name, body.as_bytes()).await?;
        tracing::info!(profile = %name, engine = %profile.engine, "connection profile saved");
        Ok(())
    }
}

fn to_document(name: &str, profile: &ConnectionProfile) -> Result<String, StoreError> {
    serde_json::to_string_pretty(profile).map_err(|err| StoreError::Malformed {
        name: name.to_string(),
        reason: err.to_string(),
    })
}
