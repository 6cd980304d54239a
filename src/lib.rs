//! Video catalog library.
//!
//! Resolves video ids to their specialization (episode, movie, clip, personal
//! video), warms an identity cache in bulk, and collects orphaned extension
//! rows across every registered subtype.

pub mod collector;
pub mod config;
pub mod error;
pub mod identity_cache;
pub mod library;
pub mod mime;
pub mod registry;
pub mod resolver;
pub mod sqlite_persistence;
pub mod video_store;

pub use collector::{CollectionOutcome, CollectionReport, SubtypeCollectionFailure};
pub use error::{StoreError, VideoError};
pub use identity_cache::{CacheScope, IdentityCache};
pub use library::VideoLibrary;
pub use mime::mime_for_extension;
pub use registry::{Subtype, SubtypeRegistry};
pub use resolver::{IntegrityPolicy, VideoResolver};
pub use video_store::{ResolvedVideo, SqliteVideoStore, VideoKind, VideoStore};
