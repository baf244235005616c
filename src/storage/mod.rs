//! Directory-backed stores for editor files and connection profiles.

mod error;
mod file_store;
mod names;
mod profile_store;

use std::{io, path::Path};

use tokio::io::AsyncWriteExt;

pub use error::StoreError;
pub use file_store::{FileStore, StoredFile};
pub use names::{validate_name, validate_profile_name};
pub use profile_store::{ConnectionProfile, ProfileStore};

/// Sorted names of the regular files in `dir`. A missing directory is empty.
async fn list_names(dir: &Path, keep: impl Fn(&str) -> bool) -> Result<Vec<String>, StoreError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(StoreError::io(dir.display().to_string(), err)),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|err| StoreError::io(dir.display().to_string(), err))?
    {
        let is_file = entry
            .file_type()
            .await
            .map(|kind| kind.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if keep(name) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

async fn read_to_string(path: &Path, name: &str) -> Result<String, StoreError> {
    tokio::fs::read_to_string(path).await.map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound(name.to_string())
        } else {
            StoreError::io(name, err)
        }
    })
}

/// Writes a new file, failing if `path` already exists.
async fn create_new(dir: &Path, path: &Path, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|err| StoreError::io(dir.display().to_string(), err))?;

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|err| {
            if err.kind() == io::ErrorKind::AlreadyExists {
                StoreError::AlreadyExists(name.to_string())
            } else {
                StoreError::io(name, err)
            }
        })?;
    file.write_all(bytes)
        .await
        .map_err(|err| StoreError::io(name, err))?;
    file.flush().await.map_err(|err| StoreError::io(name, err))
}

/// Replaces the whole file; the last writer wins.
async fn overwrite(dir: &Path, path: &Path, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|err| StoreError::io(dir.display().to_string(), err))?;
    tokio::fs::write(path, bytes)
        .await
        .map_err(|err| StoreError::io(name, err))
}
