//! Durable mapping from item identity to its progress record.
//!
//! The store is one JSON document:
//!
//! ```json
//! { "version": 1, "last_saved": "2024-01-15T08:00:00Z", "items": { "hello": { ... } } }
//! ```
//!
//! Writes are atomic (temporary file, then rename), so a crash mid-save
//! leaves the previous document in place. A document that cannot be decoded
//! is reported as `CorruptStore`; the store never replaces it silently.

use crate::error::{Result, SchedulerError};
use crate::models::{ItemId, ProgressRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

const DOCUMENT_VERSION: u32 = 1;

type Extra = serde_json::Map<String, serde_json::Value>;

#[derive(Deserialize)]
struct ProgressDocument {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    last_saved: Option<DateTime<Utc>>,
    #[serde(default)]
    items: BTreeMap<ItemId, ProgressRecord>,
    #[serde(flatten)]
    extra: Extra,
}

#[derive(Serialize)]
struct ProgressDocumentRef<'a> {
    version: u32,
    last_saved: DateTime<Utc>,
    items: &'a BTreeMap<ItemId, ProgressRecord>,
    #[serde(flatten)]
    extra: &'a Extra,
}

#[derive(Debug, Clone, Default)]
pub struct ProgressStore {
    records: BTreeMap<ItemId, ProgressRecord>,
    extra: Extra,
    /// Version of the loaded document; a newer one is written back as-is.
    version: u32,
    path: Option<PathBuf>,
}

/// Stores are equal when they hold the same records and the same unknown
/// document fields; the backing path does not take part.
impl PartialEq for ProgressStore {
    fn eq(&self, other: &Self) -> bool {
        self.records == other.records && self.extra == other.extra
    }
}

impl ProgressStore {
    /// A store with no backing file; `flush` is a no-op.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Reads the document at `path` and binds the store to it.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `CorruptStore` if it is not a valid
    /// progress document.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| SchedulerError::io(path, e))?;
        let corrupt = |source: serde_json::Error| SchedulerError::CorruptStore {
            path: path.to_path_buf(),
            source,
        };
        let document: ProgressDocument = serde_json::from_slice(&bytes).map_err(corrupt)?;

        for (id, record) in &document.items {
            if record.interval_days < 0.0 || record.ease_factor < 0.0 {
                let message = format!("record '{id}' has a negative interval or ease factor");
                return Err(corrupt(serde::de::Error::custom(message)));
            }
        }

        if document.version > DOCUMENT_VERSION {
            log::warn!(
                "{} was written by a newer version ({}), unknown fields are kept as-is",
                path.display(),
                document.version
            );
        }
        log::info!(
            "loaded {} progress records from {} (last saved {:?})",
            document.items.len(),
            path.display(),
            document.last_saved
        );
        Ok(Self {
            records: document.items,
            extra: document.extra,
            version: document.version,
            path: Some(path.to_path_buf()),
        })
    }

    /// Like `load`, but a missing file gives an empty store bound to `path`.
    /// Corrupt documents are still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(SchedulerError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                log::info!("no progress file at {}, starting empty", path.display());
                Ok(Self {
                    path: Some(path.to_path_buf()),
                    ..Self::default()
                })
            }
            other => other,
        }
    }

    /// Atomically replaces the document at `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SchedulerError::io(parent, e))?;
        }

        let tmp_path = temporary_path(path);
        let result = self
            .write_document(&tmp_path)
            .and_then(|()| fs::rename(&tmp_path, path).map_err(|e| SchedulerError::io(path, e)));

        match &result {
            Ok(()) => log::debug!("saved {} records to {}", self.records.len(), path.display()),
            Err(e) => {
                log::warn!("saving progress failed: {e}");
                if let Err(cleanup) = fs::remove_file(&tmp_path) {
                    log::debug!("could not remove {}: {cleanup}", tmp_path.display());
                }
            }
        }
        result
    }

    fn write_document(&self, tmp_path: &Path) -> Result<()> {
        let document = ProgressDocumentRef {
            version: self.version.max(DOCUMENT_VERSION),
            last_saved: Utc::now(),
            items: &self.records,
            extra: &self.extra,
        };
        let io_err = |e: std::io::Error| SchedulerError::io(tmp_path, e);

        let file = File::create(tmp_path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &document).map_err(|e| io_err(e.into()))?;
        writer.write_all(b"\n").map_err(io_err)?;
        let file = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
        file.sync_all().map_err(io_err)
    }

    /// Saves to the backing file, if the store has one.
    pub fn flush(&self) -> Result<()> {
        match &self.path {
            Some(path) => self.save(path),
            None => Ok(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, id: &ItemId) -> Option<&ProgressRecord> {
        self.records.get(id)
    }

    /// Returns the record for `id`, creating it with `default` on first touch.
    pub fn get_or_insert_with(
        &mut self,
        id: &ItemId,
        default: impl FnOnce() -> ProgressRecord,
    ) -> &ProgressRecord {
        self.records.entry(id.clone()).or_insert_with(default)
    }

    pub fn put(&mut self, id: ItemId, record: ProgressRecord) {
        self.records.insert(id, record);
    }

    /// Puts the record and flushes. If the flush fails the previous record
    /// is restored, so memory never runs ahead of disk.
    pub fn commit(&mut self, id: ItemId, record: ProgressRecord) -> Result<()> {
        let previous = self.records.insert(id.clone(), record);
        if let Err(e) = self.flush() {
            match previous {
                Some(previous) => {
                    self.records.insert(id, previous);
                }
                None => {
                    self.records.remove(&id);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    /// Drops every record. Destructive; callers flush afterwards to make it
    /// durable.
    pub fn reset(&mut self) {
        log::warn!("resetting progress store ({} records)", self.records.len());
        self.records.clear();
        self.extra.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, &ProgressRecord)> {
        self.records.iter()
    }
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// A store shared between sessions. The lock is held for the whole
/// read-modify-persist sequence of a rating.
#[derive(Debug, Clone, Default)]
pub struct SharedProgressStore {
    inner: Arc<Mutex<ProgressStore>>,
}

impl SharedProgressStore {
    pub fn new(store: ProgressStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, ProgressStore> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            // Disk always holds a complete document; keep using memory.
            log::warn!("progress store lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut ProgressStore) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Copy of the current contents, for read-only queries.
    pub fn snapshot(&self) -> ProgressStore {
        self.lock().clone()
    }
}
