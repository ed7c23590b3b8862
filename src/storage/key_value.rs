use std::{
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
};

use anyhow::{bail, Result};
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::debug;

/// Interface for abstracting the local key-value storage. Values are whole documents: every
/// [KeyValueStore::set] replaces what was stored under the key.
pub trait KeyValueStore: Send + Sync {
    /// Returns `None` when nothing was ever stored under `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<()>> + Send;
}

impl<T: Deref + Send + Sync> KeyValueStore for T
where
    T::Target: KeyValueStore,
{
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send {
        self.deref().get(key)
    }

    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<()>> + Send {
        self.deref().set(key, value)
    }
}

/// The main realization of [KeyValueStore]. Every key is a `<key>.json` file inside a directory.
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            bail!("Illegal storage key {key:?}");
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    async fn read_locked(path: &Path) -> Result<String, std::io::Error> {
        debug!("Reading {path:?}");
        let mut file = File::open(path).await?;
        file.lock_shared()?;
        let mut value = String::new();
        let result = file.read_to_string(&mut value).await;
        file.unlock_async().await?;
        result.map(|_| value)
    }

    async fn write_locked(path: &Path, value: &[u8]) -> Result<(), std::io::Error> {
        debug!("Writing {path:?}");
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .await?;
        // Truncation happens only after the lock is held, so readers never see a half-empty file.
        file.lock_exclusive()?;
        let result = async {
            file.set_len(0).await?;
            file.write_all(value).await?;
            file.flush().await?;
            file.sync_data().await
        }
        .await;
        file.unlock_async().await?;
        result
    }
}

impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match Self::read_locked(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e)?,
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let path = self.path_for(key)?;
        Self::write_locked(&path, value.as_bytes()).await?;
        Ok(())
    }
}
