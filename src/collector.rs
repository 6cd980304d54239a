//! Cross-subtype orphan collection.
//!
//! Fans out to every registered subtype's own collection routine. A failing
//! subtype never stops the others; every outcome lands in the report.

use crate::error::StoreError;
use crate::registry::SubtypeRegistry;
use crate::video_store::VideoKind;
use std::fmt;
use std::time::Instant;
use tracing::{error, info};

/// One subtype's failed collection pass.
#[derive(Debug)]
pub struct SubtypeCollectionFailure {
    pub kind: VideoKind,
    pub error: StoreError,
}

impl fmt::Display for SubtypeCollectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Collecting {} orphans failed: {}", self.kind, self.error)
    }
}

impl std::error::Error for SubtypeCollectionFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[derive(Debug)]
pub enum CollectionOutcome {
    Collected { kind: VideoKind, removed: usize },
    Failed(SubtypeCollectionFailure),
}

impl CollectionOutcome {
    pub fn kind(&self) -> VideoKind {
        match self {
            CollectionOutcome::Collected { kind, .. } => *kind,
            CollectionOutcome::Failed(failure) => failure.kind,
        }
    }
}

/// Per-kind result of a collection run, in the order the passes ran.
#[derive(Debug, Default)]
pub struct CollectionReport {
    pub outcomes: Vec<CollectionOutcome>,
    pub duration_ms: u64,
}

impl CollectionReport {
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn failures(&self) -> impl Iterator<Item = &SubtypeCollectionFailure> {
        self.outcomes.iter().filter_map(|o| match o {
            CollectionOutcome::Failed(failure) => Some(failure),
            CollectionOutcome::Collected { .. } => None,
        })
    }

    pub fn total_removed(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                CollectionOutcome::Collected { removed, .. } => *removed,
                CollectionOutcome::Failed(_) => 0,
            })
            .sum()
    }

    pub fn outcome(&self, kind: VideoKind) -> Option<&CollectionOutcome> {
        self.outcomes.iter().find(|o| o.kind() == kind)
    }
}

/// Run every registered subtype's orphan collection.
pub fn collect(registry: &SubtypeRegistry) -> CollectionReport {
    let started = Instant::now();
    let outcomes = registry
        .collection_order()
        .into_iter()
        .map(|subtype| {
            let kind = subtype.kind();
            match subtype.collect_orphans() {
                Ok(removed) => CollectionOutcome::Collected { kind, removed },
                Err(error) => {
                    error!("Orphan collection for {} failed: {}", kind, error);
                    CollectionOutcome::Failed(SubtypeCollectionFailure { kind, error })
                }
            }
        })
        .collect();

    let report = CollectionReport {
        outcomes,
        duration_ms: started.elapsed().as_millis() as u64,
    };
    info!(
        "Orphan collection complete: removed={}, failures={}, duration={}ms",
        report.total_removed(),
        report.failures().count(),
        report.duration_ms
    );
    report
}
