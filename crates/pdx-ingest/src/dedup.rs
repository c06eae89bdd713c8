//! Processed-id index
//!
//! Remembers which partner ids were already ingested so repeated runs skip
//! them without touching the directory's detail endpoint or the store.
//!
//! [`FileDedupIndex`] persists ids as a newline-delimited, append-only log
//! that is read once on open. `mark` appends a single line and syncs it
//! before updating the in-memory set, all under one lock, so a returned
//! `mark` survives a crash and concurrent callers never lose each other's
//! entries.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::error::{IngestError, Result};

/// Whether an id is remembered globally or per partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupScope {
    /// An id seen in any partition is skipped everywhere
    #[default]
    Global,
    /// An id is skipped only when seen again in the same partition
    PerPartition,
}

impl DedupScope {
    /// Index key for an entity observed in `partition`
    pub fn key(self, partition: &str, entity_id: &str) -> String {
        match self {
            DedupScope::Global => entity_id.to_string(),
            DedupScope::PerPartition => format!("{partition}:{entity_id}"),
        }
    }
}

impl std::str::FromStr for DedupScope {
    type Err = IngestError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "global" => Ok(DedupScope::Global),
            "partition" | "per_partition" | "per-partition" => Ok(DedupScope::PerPartition),
            _ => Err(IngestError::Config(format!("Invalid dedup scope: {s}"))),
        }
    }
}

/// Set of already-processed keys
pub trait DedupIndex: Send + Sync {
    fn contains(&self, key: &str) -> Result<bool>;

    /// Record `key`. Once this returns, `contains(key)` is true.
    fn mark(&self, key: &str) -> Result<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn validate_key(key: &str) -> Result<&str> {
    let key = key.trim();
    if key.is_empty() || key.contains(['\n', '\r']) {
        return Err(IngestError::Dedup(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("dedup key must be a single non-empty line: {key:?}"),
        )));
    }
    Ok(key)
}

struct LogState {
    file: File,
    seen: HashSet<String>,
}

/// Append-only file-backed index
pub struct FileDedupIndex {
    state: Mutex<LogState>,
}

impl FileDedupIndex {
    /// Open (or create) the log at `path` and load every id it holds
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;

        let mut seen = HashSet::new();
        for line in BufReader::new(&file).lines() {
            let line = line?;
            let id = line.trim();
            if !id.is_empty() {
                seen.insert(id.to_string());
            }
        }

        info!(path = %path.display(), entries = seen.len(), "Loaded dedup index");

        Ok(Self {
            state: Mutex::new(LogState { file, seen }),
        })
    }
}

impl DedupIndex for FileDedupIndex {
    fn contains(&self, key: &str) -> Result<bool> {
        let state = self
            .state
            .lock()
            .map_err(|_| IngestError::LockPoisoned("dedup index"))?;
        Ok(state.seen.contains(key.trim()))
    }

    fn mark(&self, key: &str) -> Result<()> {
        let key = validate_key(key)?;
        let mut state = self
            .state
            .lock()
            .map_err(|_| IngestError::LockPoisoned("dedup index"))?;

        if state.seen.contains(key) {
            return Ok(());
        }

        state.file.write_all(format!("{key}\n").as_bytes())?;
        state.file.sync_data()?;
        state.seen.insert(key.to_string());

        debug!(key, "Marked as processed");
        Ok(())
    }

    fn len(&self) -> usize {
        self.state.lock().map(|s| s.seen.len()).unwrap_or(0)
    }
}

/// Non-durable index for dry runs and tests
#[derive(Default)]
pub struct MemoryDedupIndex {
    seen: Mutex<HashSet<String>>,
}

impl MemoryDedupIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DedupIndex for MemoryDedupIndex {
    fn contains(&self, key: &str) -> Result<bool> {
        let seen = self
            .seen
            .lock()
            .map_err(|_| IngestError::LockPoisoned("dedup index"))?;
        Ok(seen.contains(key.trim()))
    }

    fn mark(&self, key: &str) -> Result<()> {
        let key = validate_key(key)?;
        self.seen
            .lock()
            .map_err(|_| IngestError::LockPoisoned("dedup index"))?
            .insert(key.to_string());
        Ok(())
    }

    fn len(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or(0)
    }
}
