//! Append-only file seen-ID store

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thread_relay_domain::{SeenStore, SeenStoreError};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Durable set of already-delivered post IDs, one per line in a text file.
///
/// The whole file is read into memory at open time, so membership checks
/// never touch storage. Writes are append-only and flushed per record: a
/// crash can lose at most the record in flight, never corrupt prior entries.
/// The file is never truncated or compacted.
pub struct FileSeenStore {
    path: PathBuf,
    ids: RwLock<HashSet<String>>,
    file: Mutex<tokio::fs::File>,
}

impl FileSeenStore {
    /// Open the store, loading any previously recorded IDs.
    ///
    /// A missing file is a valid first-run state and yields an empty set.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, SeenStoreError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let ids: HashSet<String> = match fs::read_to_string(&path).await {
            Ok(contents) => contents.split_whitespace().map(String::from).collect(),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(error) => return Err(error.into()),
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        tracing::info!(path = %path.display(), count = ids.len(), "Loaded seen-ID store");

        Ok(Self {
            path,
            ids: RwLock::new(ids),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of IDs currently held in memory
    pub fn len(&self) -> usize {
        self.ids.read().map(|ids| ids.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SeenStore for FileSeenStore {
    async fn contains(&self, id: &str) -> Result<bool, SeenStoreError> {
        let ids = self
            .ids
            .read()
            .map_err(|e| SeenStoreError::Store(e.to_string()))?;
        Ok(ids.contains(id))
    }

    async fn record(&self, id: &str) -> Result<(), SeenStoreError> {
        {
            let mut file = self.file.lock().await;
            file.write_all(id.as_bytes()).await?;
            file.write_all(b"\n").await?;
            file.flush().await?;
        }

        let mut ids = self
            .ids
            .write()
            .map_err(|e| SeenStoreError::Store(e.to_string()))?;
        ids.insert(id.to_string());

        Ok(())
    }
}
