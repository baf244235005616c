use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{StoreError, create_new, list_names, overwrite, read_to_string, validate_name};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    pub filename: String,
    pub content: String,
}

/// Plain text files kept in one flat directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        list_names(&self.dir, |_| true).await
    }

    pub async fn get(&self, name: &str) -> Result<StoredFile, StoreError> {
        let name = validate_name(name)?;
        let content = read_to_string(&self.dir.join(name), name).await?;
        Ok(StoredFile {
            filename: name.to_string(),
            content,
        })
    }

    pub async fn create(&self, name: &str, content: &str) -> Result<(), StoreError> {
        let name = validate_name(name)?;
        create_new(&self.dir, &self.dir.join(name), name, content.as_bytes()).await?;
        tracing::info!(file = %name, "file created");
        Ok(())
    }

    pub async fn put(&self, name: &str, content: &str) -> Result<(), StoreError> {
        let name = validate_name(name)?;
        overwrite(&self.dir, &self.dir.join(name), name, content.as_bytes()).await?;
        tracing::debug!(file = %name, bytes = content.len(), "file saved");
        Ok(())
    }
}
