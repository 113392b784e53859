//! Credential storage backends.

use async_trait::async_trait;
use futures::lock::Mutex as AsyncMutex;
use futures_locks::RwLock as RwLockAwait;
use huddle_interface::interface::{KeyValueStore, StoreError};
use std::{
    collections::{BTreeMap, HashMap},
    fs::{self, File, OpenOptions},
    io::{BufRead, BufReader, Seek, SeekFrom, Write},
    path::PathBuf,
};
use tracing::{debug, warn};

struct Disk {
    file: File,
    entries: BTreeMap<String, String>,
}

/// Keeps `key:value` lines in a single file. Every mutation rewrites the
/// whole file, so the store survives restarts of the process.
pub struct FileStore {
    disk: AsyncMutex<Disk>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let mut entries = BTreeMap::new();
        for line in BufReader::new(&file).lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                warn!("Skipping malformed line in {}", path.display());
                continue;
            };
            entries.insert(key.to_owned(), value.to_owned());
        }
        debug!("Loaded {} entries from {}", entries.len(), path.display());

        Ok(FileStore {
            disk: AsyncMutex::new(Disk { file, entries }),
        })
    }
}

impl Disk {
    fn sync(&mut self) -> Result<(), StoreError> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.set_len(0)?;
        for (key, value) in &self.entries {
            writeln!(self.file, "{key}:{value}")?;
        }
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }
}

fn check_entry(key: &str, value: &str) -> Result<(), StoreError> {
    if key.is_empty() || key.contains([':', '\n', '\r']) {
        return Err(StoreError::InvalidKey(key.to_owned()));
    }
    if value.contains(['\n', '\r']) {
        return Err(StoreError::InvalidValue);
    }
    Ok(())
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let disk = self.disk.lock().await;
        Ok(disk.entries.get(key).cloned())
    }
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        check_entry(key, value)?;
        let mut disk = self.disk.lock().await;
        disk.entries.insert(key.to_owned(), value.to_owned());
        disk.sync()
    }
    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut disk = self.disk.lock().await;
        if disk.entries.remove(key).is_some() {
            disk.sync()?;
        }
        Ok(())
    }
}

/// Process-local store, forgotten on exit.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLockAwait<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        check_entry(key, value)?;
        self.entries
            .write()
            .await
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
