//! Table-backed subtype capabilities.
//!
//! Each kind knows which of its rows count as orphans: extension rows whose
//! base `video` row is gone, seasons without episodes, shows without seasons.

use super::models::AttributeMap;
use super::models::VideoKind;
use super::trait_def::VideoStore;
use crate::error::StoreResult;
use crate::registry::Subtype;
use std::sync::Arc;
use tracing::debug;

pub struct TableSubtype {
    kind: VideoKind,
    store: Arc<dyn VideoStore>,
}

impl TableSubtype {
    pub fn new(kind: VideoKind, store: Arc<dyn VideoStore>) -> Self {
        Self { kind, store }
    }

    fn orphan_sql(&self) -> Option<&'static str> {
        match self.kind {
            VideoKind::Video => None,
            VideoKind::Episode => {
                Some("DELETE FROM tvshow_episode WHERE id NOT IN (SELECT id FROM video)")
            }
            VideoKind::Movie => Some("DELETE FROM movie WHERE id NOT IN (SELECT id FROM video)"),
            VideoKind::Clip => Some("DELETE FROM clip WHERE id NOT IN (SELECT id FROM video)"),
            VideoKind::PersonalVideo => {
                Some("DELETE FROM personal_video WHERE id NOT IN (SELECT id FROM video)")
            }
            VideoKind::Season => Some(
                "DELETE FROM tvshow_season WHERE id NOT IN (SELECT season FROM tvshow_episode WHERE season IS NOT NULL)",
            ),
            VideoKind::Show => {
                Some("DELETE FROM tvshow WHERE id NOT IN (SELECT tvshow FROM tvshow_season WHERE tvshow IS NOT NULL)")
            }
        }
    }
}

impl Subtype for TableSubtype {
    fn kind(&self) -> VideoKind {
        self.kind
    }

    fn exists_by_id(&self, id: i64) -> StoreResult<bool> {
        self.store.row_exists(self.kind.table_name(), id)
    }

    fn fetch_by_id(&self, id: i64) -> StoreResult<Option<AttributeMap>> {
        self.store.fetch_row(self.kind.table_name(), id)
    }

    fn collect_orphans(&self) -> StoreResult<usize> {
        let Some(sql) = self.orphan_sql() else {
            return Ok(0);
        };
        let removed = self.store.execute(sql, &[])?;
        debug!("Removed {} orphaned {} rows", removed, self.kind);
        Ok(removed)
    }
}
