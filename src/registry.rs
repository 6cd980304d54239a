//! Subtype registry.
//!
//! Holds one [`Subtype`] capability per specialization. The resolver walks the
//! registered subtypes in [`VideoKind::RESOLUTION_ORDER`]; the collector walks
//! them in [`VideoKind::COLLECTION_ORDER`]. Supporting a new specialization
//! means registering its capability here, nothing else.

use crate::error::StoreResult;
use crate::video_store::{AttributeMap, TableSubtype, VideoKind, VideoStore};
use std::sync::Arc;

/// Capability every specialization exposes to the resolver and the collector.
pub trait Subtype: Send + Sync {
    fn kind(&self) -> VideoKind;

    /// Whether an extension row exists for `id`.
    fn exists_by_id(&self, id: i64) -> StoreResult<bool>;

    /// The extension row for `id`, if any.
    fn fetch_by_id(&self, id: i64) -> StoreResult<Option<AttributeMap>>;

    /// Remove this subtype's orphaned rows. Returns how many were removed.
    fn collect_orphans(&self) -> StoreResult<usize>;
}

fn position(order: &[VideoKind], kind: VideoKind) -> usize {
    order.iter().position(|k| *k == kind).unwrap_or(order.len())
}

#[derive(Clone, Default)]
pub struct SubtypeRegistry {
    subtypes: Vec<Arc<dyn Subtype>>,
}

impl SubtypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a table-backed capability for every known specialization
    /// and container kind.
    pub fn with_store(store: Arc<dyn VideoStore>) -> Self {
        VideoKind::COLLECTION_ORDER
            .iter()
            .fold(Self::new(), |registry, kind| {
                registry.register(Arc::new(TableSubtype::new(*kind, store.clone())))
            })
    }

    /// Register a capability, replacing any previous one for the same kind.
    pub fn register(mut self, subtype: Arc<dyn Subtype>) -> Self {
        let kind = subtype.kind();
        self.subtypes.retain(|s| s.kind() != kind);
        self.subtypes.push(subtype);
        self
    }

    pub fn get(&self, kind: VideoKind) -> Option<&Arc<dyn Subtype>> {
        self.subtypes.iter().find(|s| s.kind() == kind)
    }

    /// Resolvable subtypes in precedence order.
    pub fn resolution_order(&self) -> Vec<&Arc<dyn Subtype>> {
        let mut ordered: Vec<_> = self
            .subtypes
            .iter()
            .filter(|s| s.kind().is_resolvable())
            .collect();
        ordered.sort_by_key(|s| position(&VideoKind::RESOLUTION_ORDER, s.kind()));
        ordered
    }

    /// Every registered subtype in collection order. Kinds outside the
    /// canonical order keep their registration order at the end.
    pub fn collection_order(&self) -> Vec<&Arc<dyn Subtype>> {
        let mut ordered: Vec<_> = self.subtypes.iter().collect();
        ordered.sort_by_key(|s| position(&VideoKind::COLLECTION_ORDER, s.kind()));
        ordered
    }

    /// Kinds in resolution order.
    pub fn list_subtypes(&self) -> Vec<VideoKind> {
        self.resolution_order().iter().map(|s| s.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.subtypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subtypes.is_empty()
    }
}
