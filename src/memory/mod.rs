//! Memory manager
//!
//! Short-term entries live in process memory; once the short-term buffer
//! exceeds its cap, the most important entries are consolidated into
//! long-term storage, which persists as JSON files under the workspace
//! memory directory.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;

/// Short-term entries kept before a consolidation pass
const SHORT_TERM_CAP: usize = 100;
/// Entries promoted per consolidation pass
const CONSOLIDATE_KEEP: usize = 10;

/// One remembered item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub kind: String,
    pub content: String,
    pub metadata: Value,
    pub timestamp: DateTime<Utc>,
    pub importance: f32,
}

impl MemoryEntry {
    /// Create an entry with a fresh id
    pub fn new(kind: impl Into<String>, content: impl Into<String>, importance: f32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: kind.into(),
            content: content.into(),
            metadata: Value::Null,
            timestamp: Utc::now(),
            importance,
        }
    }

    /// Attach metadata
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Agent memory with short-term and persisted long-term tiers
pub struct MemoryManager {
    storage_dir: PathBuf,
    short_term: Mutex<Vec<MemoryEntry>>,
    long_term: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryManager {
    /// Create a manager storing long-term entries under `storage_dir`,
    /// loading whatever a previous process left there.
    pub fn new(storage_dir: impl Into<PathBuf>) -> Result<Self> {
        let storage_dir = storage_dir.into();
        fs::create_dir_all(&storage_dir)?;

        let manager = Self {
            storage_dir,
            short_term: Mutex::new(Vec::new()),
            long_term: Mutex::new(HashMap::new()),
        };
        manager.load_from_disk()?;
        Ok(manager)
    }

    /// Add a short-term entry, consolidating when the buffer is full
    pub fn add_short_term(&self, entry: MemoryEntry) {
        let overflow = {
            let mut short_term = self.short_term.lock().expect("memory lock poisoned");
            short_term.push(entry);
            short_term.len() > SHORT_TERM_CAP
        };
        if overflow {
            if let Err(e) = self.consolidate() {
                tracing::warn!(error = %e, "Memory consolidation failed");
            }
        }
    }

    /// Add a long-term entry and persist it
    pub fn add_long_term(&self, key: impl Into<String>, entry: MemoryEntry) -> Result<()> {
        let key = key.into();
        self.save_to_disk(&key, &entry)?;
        self.long_term
            .lock()
            .expect("memory lock poisoned")
            .insert(key, entry);
        Ok(())
    }

    /// Substring lookup over long-term content
    pub fn recall(&self, query: &str) -> Vec<MemoryEntry> {
        let needle = query.to_lowercase();
        let long_term = self.long_term.lock().expect("memory lock poisoned");
        let mut results: Vec<MemoryEntry> = long_term
            .values()
            .filter(|e| e.content.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        results.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        results
    }

    /// Number of entries in each tier: (short-term, long-term)
    pub fn counts(&self) -> (usize, usize) {
        (
            self.short_term.lock().expect("memory lock poisoned").len(),
            self.long_term.lock().expect("memory lock poisoned").len(),
        )
    }

    /// Promote the most important short-term entries and drop the rest
    fn consolidate(&self) -> Result<()> {
        let drained = {
            let mut short_term = self.short_term.lock().expect("memory lock poisoned");
            std::mem::take(&mut *short_term)
        };

        let mut ranked = drained;
        ranked.sort_by(|a, b| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let promoted = ranked.into_iter().take(CONSOLIDATE_KEEP);
        for entry in promoted {
            self.add_long_term(entry.id.clone(), entry)?;
        }

        tracing::debug!("Consolidated short-term memory");
        Ok(())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        // Keys are uuids or caller-chosen names; keep them filesystem-safe
        let safe: String = key
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.storage_dir.join(format!("{}.json", safe))
    }

    fn save_to_disk(&self, key: &str, entry: &MemoryEntry) -> Result<()> {
        let file = File::create(self.entry_path(key))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, entry)?;
        Ok(())
    }

    fn load_from_disk(&self) -> Result<()> {
        let mut long_term = self.long_term.lock().expect("memory lock poisoned");

        for dir_entry in fs::read_dir(&self.storage_dir)? {
            let path = dir_entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let file = File::open(&path)?;
            let reader = BufReader::new(file);
            match serde_json::from_reader::<_, MemoryEntry>(reader) {
                Ok(entry) => {
                    long_term.insert(entry.id.clone(), entry);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable memory file");
                }
            }
        }

        if !long_term.is_empty() {
            tracing::info!(count = long_term.len(), "Loaded long-term memory");
        }
        Ok(())
    }

    /// Drop everything from both tiers (persisted files stay on disk)
    pub fn clear(&self) {
        self.short_term.lock().expect("memory lock poisoned").clear();
        self.long_term.lock().expect("memory lock poisoned").clear();
    }
}
