//! Polymorphic video resolution and batch cache warm-up.

use crate::collector::{self, CollectionReport};
use crate::error::{VideoError, VideoResult};
use crate::identity_cache::{CacheScope, IdentityCache};
use crate::registry::SubtypeRegistry;
use crate::video_store::{
    AttributeMap, ResolvedVideo, VideoKind, VideoRecord, VideoStore, VIDEO_TABLE_NAME,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// What to do when a video has rows in more than one extension table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum IntegrityPolicy {
    /// Check every kind and fail with `IntegrityViolation` on duplicates.
    #[default]
    Strict,
    /// Stop at the first kind in resolution order that has a row.
    #[value(alias = "first_match")]
    FirstMatch,
}

/// Resolves video ids to their specialization, backed by an identity cache.
#[derive(Clone)]
pub struct VideoResolver {
    store: Arc<dyn VideoStore>,
    registry: Arc<SubtypeRegistry>,
    cache: Arc<IdentityCache>,
    integrity_policy: IntegrityPolicy,
    cache_scope: CacheScope,
}

impl VideoResolver {
    /// Resolver with table-backed subtypes for every known kind.
    pub fn new(store: Arc<dyn VideoStore>) -> Self {
        let registry = SubtypeRegistry::with_store(store.clone());
        Self {
            store,
            registry: Arc::new(registry),
            cache: Arc::new(IdentityCache::new()),
            integrity_policy: IntegrityPolicy::default(),
            cache_scope: CacheScope::default(),
        }
    }

    pub fn with_registry(mut self, registry: SubtypeRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_integrity_policy(mut self, policy: IntegrityPolicy) -> Self {
        self.integrity_policy = policy;
        self
    }

    pub fn with_cache_scope(mut self, scope: CacheScope) -> Self {
        self.cache_scope = scope;
        self
    }

    pub fn store(&self) -> &Arc<dyn VideoStore> {
        &self.store
    }

    pub fn registry(&self) -> &SubtypeRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    /// Resolver for a single request. Shares the cache under application
    /// scope, starts from an empty one under request scope.
    pub fn scoped(&self) -> Self {
        let mut scoped = self.clone();
        if self.cache_scope == CacheScope::Request {
            scoped.cache = Arc::new(IdentityCache::new());
        }
        scoped
    }

    fn base_row(&self, id: i64) -> VideoResult<AttributeMap> {
        if let Some(row) = self.cache.get(VIDEO_TABLE_NAME, id) {
            return Ok(row);
        }
        let row = self
            .store
            .fetch_row(VIDEO_TABLE_NAME, id)?
            .ok_or(VideoError::NotFound(id))?;
        self.cache.put(VIDEO_TABLE_NAME, id, row.clone());
        Ok(row)
    }

    /// The base record for `id`, read through the cache.
    pub fn video(&self, id: i64) -> VideoResult<VideoRecord> {
        let row = self.base_row(id)?;
        VideoRecord::from_attributes(&row).map_err(|source| VideoError::MalformedRow {
            table: VIDEO_TABLE_NAME,
            id,
            source,
        })
    }

    /// Re-read the base row from the store and overwrite its cache entry.
    pub fn refresh(&self, id: i64) -> VideoResult<VideoRecord> {
        self.cache.invalidate(VIDEO_TABLE_NAME, id);
        self.video(id)
    }

    /// Determine which specialization owns `id` and load it.
    ///
    /// Subtypes are checked in resolution order with existence queries only;
    /// the extension row is fetched for the first kind that has one.
    pub fn resolve(&self, id: i64) -> VideoResult<ResolvedVideo> {
        let video = self.video(id)?;

        let mut matched: Vec<VideoKind> = Vec::new();
        let mut extension: Option<(VideoKind, AttributeMap)> = None;
        for subtype in self.registry.resolution_order() {
            if !matched.is_empty() && self.integrity_policy == IntegrityPolicy::FirstMatch {
                break;
            }
            if !subtype.exists_by_id(id)? {
                continue;
            }
            let kind = subtype.kind();
            if extension.is_none() {
                match subtype.fetch_by_id(id)? {
                    Some(row) => extension = Some((kind, row)),
                    None => {
                        warn!("{} row {} vanished between existence check and fetch", kind, id);
                        continue;
                    }
                }
            }
            matched.push(kind);
        }

        if matched.len() > 1 {
            warn!(
                "Video {} has extension rows for several kinds: {:?}",
                id, matched
            );
            return Err(VideoError::IntegrityViolation { id, kinds: matched });
        }

        let Some((kind, row)) = extension else {
            debug!("Video {} resolved as generic", id);
            return Ok(ResolvedVideo::Generic(video));
        };
        debug!("Video {} resolved as {}", id, kind);
        ResolvedVideo::from_parts(kind, video, &row).map_err(|source| VideoError::MalformedRow {
            table: kind.table_name(),
            id,
            source,
        })
    }

    /// Load the base rows of `ids` into the cache with one bulk query.
    ///
    /// Duplicates are collapsed and empty input issues no query. Extension
    /// tables are not warmed. Returns how many rows were cached.
    pub fn build_cache(&self, ids: &[i64]) -> VideoResult<usize> {
        let ids: Vec<i64> = ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        if ids.is_empty() {
            return Ok(0);
        }
        let rows = self.store.fetch_rows(VIDEO_TABLE_NAME, &ids)?;
        let cached = self.cache.put_rows(VIDEO_TABLE_NAME, rows);
        debug!("Built video cache: {} of {} ids found", cached, ids.len());
        Ok(cached)
    }

    /// Remove orphaned rows across every registered subtype.
    pub fn collect(&self) -> CollectionReport {
        collector::collect(&self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video_store::SqliteVideoStore;
    use serde_json::{json, Value};

    fn make_resolver() -> (tempfile::TempDir, Arc<SqliteVideoStore>, VideoResolver) {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(SqliteVideoStore::new(temp_dir.path().join("test.db"), 2).unwrap());
        let resolver = VideoResolver::new(store.clone());
        (temp_dir, store, resolver)
    }

    fn insert_base(store: &SqliteVideoStore, id: i64) {
        store
            .execute(
                "INSERT INTO video (id, title, file, catalog, mime, addition_time)
                 VALUES (?1, 'title', '/v/file.mp4', 1, 'video/mp4', 0)",
                &[Value::from(id)],
            )
            .unwrap();
    }

    #[test]
    fn test_resolve_generic() {
        let (_dir, store, resolver) = make_resolver();
        insert_base(&store, 42);

        let resolved = resolver.resolve(42).unwrap();
        assert_eq!(resolved.kind(), VideoKind::Video);
        assert_eq!(resolved.id(), 42);
    }

    #[test]
    fn test_resolve_movie() {
        let (_dir, store, resolver) = make_resolver();
        insert_base(&store, 7);
        store
            .execute("INSERT INTO movie (id, year) VALUES (7, 1995)", &[])
            .unwrap();

        let resolved = resolver.resolve(7).unwrap();
        assert_eq!(resolved.kind(), VideoKind::Movie);
        assert_eq!(resolved.attributes()["year"], json!(1995));
        assert_eq!(resolved.attributes()["title"], json!("title"));
    }

    #[test]
    fn test_resolve_missing_is_not_found() {
        let (_dir, store, resolver) = make_resolver();
        store
            .execute("INSERT INTO movie (id) VALUES (3)", &[])
            .unwrap();
        assert!(matches!(resolver.resolve(3), Err(VideoError::NotFound(3))));
    }

    #[test]
    fn test_duplicate_extension_rows() {
        let (_dir, store, resolver) = make_resolver();
        insert_base(&store, 5);
        store
            .execute("INSERT INTO movie (id) VALUES (5)", &[])
            .unwrap();
        store
            .execute("INSERT INTO clip (id) VALUES (5)", &[])
            .unwrap();

        for _ in 0..2 {
            match resolver.resolve(5) {
                Err(VideoError::IntegrityViolation { id, kinds }) => {
                    assert_eq!(id, 5);
                    assert_eq!(kinds, vec![VideoKind::Movie, VideoKind::Clip]);
                }
                other => panic!("Expected IntegrityViolation, got {:?}", other),
            }
        }

        let lenient = resolver.with_integrity_policy(IntegrityPolicy::FirstMatch);
        assert_eq!(lenient.resolve(5).unwrap().kind(), VideoKind::Movie);
        assert_eq!(lenient.resolve(5).unwrap().kind(), VideoKind::Movie);
    }

    #[test]
    fn test_build_cache_populates_existing_ids_only() {
        let (_dir, store, resolver) = make_resolver();
        insert_base(&store, 1);
        insert_base(&store, 2);

        assert_eq!(resolver.build_cache(&[1, 2, 2, 99]).unwrap(), 2);
        assert!(resolver.cache().contains(VIDEO_TABLE_NAME, 1));
        assert!(resolver.cache().contains(VIDEO_TABLE_NAME, 2));
        assert!(!resolver.cache().contains(VIDEO_TABLE_NAME, 99));
        assert_eq!(resolver.build_cache(&[]).unwrap(), 0);
    }

    #[test]
    fn test_undecodable_base_row_is_malformed() {
        let (_dir, store, resolver) = make_resolver();
        store
            .execute(
                "INSERT INTO video (id, title, file, catalog, resolution_x, mime, addition_time)
                 VALUES (9, 'bad', '/v/bad.mp4', 1, -1, 'video/mp4', 0)",
                &[],
            )
            .unwrap();

        match resolver.resolve(9) {
            Err(VideoError::MalformedRow { table, id, .. }) => {
                assert_eq!(table, VIDEO_TABLE_NAME);
                assert_eq!(id, 9);
            }
            other => panic!("Expected MalformedRow, got {:?}", other),
        }
    }

    struct VanishingEpisodes;

    impl crate::registry::Subtype for VanishingEpisodes {
        fn kind(&self) -> VideoKind {
            VideoKind::Episode
        }

        fn exists_by_id(&self, _id: i64) -> crate::error::StoreResult<bool> {
            Ok(true)
        }

        fn fetch_by_id(&self, _id: i64) -> crate::error::StoreResult<Option<AttributeMap>> {
            Ok(None)
        }

        fn collect_orphans(&self) -> crate::error::StoreResult<usize> {
            Ok(0)
        }
    }

    #[test]
    fn test_vanished_extension_row_does_not_count_as_match() {
        let (_dir, store, resolver) = make_resolver();
        insert_base(&store, 8);
        store
            .execute("INSERT INTO movie (id, year) VALUES (8, 2004)", &[])
            .unwrap();
        let registry =
            SubtypeRegistry::with_store(store.clone()).register(Arc::new(VanishingEpisodes));
        let resolver = resolver.with_registry(registry);

        assert_eq!(resolver.resolve(8).unwrap().kind(), VideoKind::Movie);
    }

    #[test]
    fn test_request_scope_gets_fresh_cache() {
        let (_dir, store, resolver) = make_resolver();
        insert_base(&store, 1);
        resolver.build_cache(&[1]).unwrap();

        let shared = resolver.scoped();
        assert!(shared.cache().contains(VIDEO_TABLE_NAME, 1));

        let per_request = resolver.with_cache_scope(CacheScope::Request).scoped();
        assert!(per_request.cache().is_empty());
    }
}
