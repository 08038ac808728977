//! Key-value cache of serialized results, persisted to the catalog database.
//!
//! The cache is loaded once at startup and flushed once at shutdown. Writes in
//! between only touch memory; the last write to a key wins.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::db;

#[derive(Debug, Default)]
pub struct ResultCache {
    entries: BTreeMap<String, String>,
    dirty: bool,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every stored entry
    pub fn load(conn: &Connection) -> Result<Self> {
        let entries: BTreeMap<String, String> = db::load_cache_entries(conn)?.into_iter().collect();
        debug!(entries = entries.len(), "loaded result cache");
        Ok(Self {
            entries,
            dirty: false,
        })
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.entries.get(key) {
            Some(raw) => {
                let value = serde_json::from_str(raw)
                    .with_context(|| format!("Corrupt cache entry '{}'", key))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub fn insert<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.entries.insert(key.to_string(), raw);
        self.dirty = true;
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        self.dirty |= removed;
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the whole cache back. No-op when nothing changed since load.
    pub fn flush(&mut self, conn: &mut Connection) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        db::replace_cache_entries(
            conn,
            self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )?;
        debug!(entries = self.entries.len(), "flushed result cache");
        self.dirty = false;
        Ok(())
    }
}
