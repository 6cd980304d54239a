//! In-process identity cache.
//!
//! Maps `(table, id)` to the attribute map last read from the store. The cache
//! is advisory: nothing invalidates it on writes, so code that mutates a row
//! must overwrite or invalidate the matching entry itself.

use crate::error::StoreResult;
use crate::video_store::{AttributeMap, VideoStore};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

type CacheKey = (&'static str, i64);

/// How long a resolver's cache lives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CacheScope {
    /// One cache shared by every request.
    #[default]
    Application,
    /// A fresh cache for every request scope.
    Request,
}

#[derive(Debug, Default)]
pub struct IdentityCache {
    entries: Mutex<HashMap<CacheKey, AttributeMap>>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, AttributeMap>> {
        // A panic while holding the lock cannot leave a half-written entry,
        // so a poisoned map is still usable.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, table: &'static str, id: i64) -> Option<AttributeMap> {
        self.entries().get(&(table, id)).cloned()
    }

    pub fn contains(&self, table: &'static str, id: i64) -> bool {
        self.entries().contains_key(&(table, id))
    }

    /// Unconditional overwrite; last write wins.
    pub fn put(&self, table: &'static str, id: i64, attributes: AttributeMap) {
        self.entries().insert((table, id), attributes);
    }

    pub fn invalidate(&self, table: &'static str, id: i64) -> Option<AttributeMap> {
        self.entries().remove(&(table, id))
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Store every row in the cache under its `id` attribute. Returns how many
    /// rows were stored; rows without an integer id are skipped.
    pub fn put_rows(&self, table: &'static str, rows: Vec<AttributeMap>) -> usize {
        let mut entries = self.entries();
        let mut stored = 0;
        for row in rows {
            if let Some(id) = row.get("id").and_then(|v| v.as_i64()) {
                entries.insert((table, id), row);
                stored += 1;
            }
        }
        stored
    }

    /// Fetch, in one bulk query, every requested id not already cached.
    ///
    /// Empty input, or input that is entirely cached, issues no query. Ids
    /// without a row stay absent and will be queried again next time. A failed
    /// query leaves the cache untouched.
    pub fn warm(&self, store: &dyn VideoStore, table: &'static str, ids: &[i64]) -> StoreResult<usize> {
        let missing: Vec<i64> = {
            let entries = self.entries();
            ids.iter()
                .copied()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .filter(|id| !entries.contains_key(&(table, *id)))
                .collect()
        };
        if missing.is_empty() {
            return Ok(0);
        }

        let rows = store.fetch_rows(table, &missing)?;
        let stored = self.put_rows(table, rows);
        debug!(
            "Warmed {} of {} missing {} entries",
            stored,
            missing.len(),
            table
        );
        Ok(stored)
    }
}
