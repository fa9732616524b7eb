// Database - RocksDB handle for the snapshot store
use rocksdb::{Options, WriteBatch, DB};
use std::path::Path;

/// Keys and values are opaque bytes; the snapshot store owns the layout
pub struct Database {
    inner: DB,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DatabaseError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        // Snapshots are written once per block, never compacted hard
        opts.set_keep_log_file_num(3);
        opts.set_max_background_jobs(2);

        let inner = DB::open(&opts, path.as_ref()).map_err(|e| DatabaseError::Open {
            path: path.as_ref().display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { inner })
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DatabaseError> {
        self.inner.get(key).map_err(|e| DatabaseError::Read(e.to_string()))
    }

    /// Commit a batch atomically
    pub fn commit(&self, batch: Batch) -> Result<(), DatabaseError> {
        if batch.is_empty() {
            return Ok(());
        }
        self.inner.write(batch.0).map_err(|e| DatabaseError::Write(e.to_string()))
    }

    /// Keys under `prefix`, ascending. Unreadable entries are logged and
    /// left out.
    pub fn keys_with_prefix<'a>(&'a self, prefix: &'a [u8]) -> impl Iterator<Item = Vec<u8>> + 'a {
        self.inner
            .prefix_iterator(prefix)
            .filter_map(|entry| {
                entry
                    .map(|(key, _)| key.into_vec())
                    .map_err(|e| tracing::warn!(error = %e, "skipping unreadable key"))
                    .ok()
            })
            .take_while(move |key| key.starts_with(prefix))
    }
}

/// Pending writes, applied by `Database::commit`
#[derive(Default)]
pub struct Batch(WriteBatch);

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        self.0.put(key, value);
        self
    }

    pub fn delete(mut self, key: impl AsRef<[u8]>) -> Self {
        self.0.delete(key);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("cannot open {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("read failed: {0}")]
    Read(String),

    #[error("write failed: {0}")]
    Write(String),
}
