//! Write paths and catalog queries built on top of the resolver.
//!
//! Every write goes straight to the store and then overwrites the cached base
//! row, so the resolver never serves a row older than its own writes.

use crate::error::{VideoError, VideoResult};
use crate::mime::mime_for_extension;
use crate::resolver::VideoResolver;
use crate::video_store::{
    file_type, AttributeMap, Clip, Episode, Movie, NewVideo, PersonalVideo, VideoKind,
    VideoRecord, VIDEO_TABLE_NAME,
};
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Checks that `extension` carries what `kind`'s table requires.
fn check_extension(kind: VideoKind, extension: &AttributeMap) -> VideoResult<()> {
    let value = Value::Object(extension.clone());
    let checked = match kind {
        VideoKind::Episode => serde_json::from_value::<Episode>(value).map(|_| ()),
        VideoKind::Movie => serde_json::from_value::<Movie>(value).map(|_| ()),
        VideoKind::Clip => serde_json::from_value::<Clip>(value).map(|_| ()),
        VideoKind::PersonalVideo => serde_json::from_value::<PersonalVideo>(value).map(|_| ()),
        VideoKind::Video | VideoKind::Season | VideoKind::Show => Ok(()),
    };
    checked.map_err(|e| VideoError::InvalidInput(format!("{} data: {}", kind, e)))
}

#[derive(Clone)]
pub struct VideoLibrary {
    resolver: VideoResolver,
    only_enabled_catalogs: bool,
}

impl VideoLibrary {
    pub fn new(resolver: VideoResolver) -> Self {
        Self {
            resolver,
            only_enabled_catalogs: false,
        }
    }

    /// Exclude videos of disabled catalogs from random selection.
    pub fn with_only_enabled_catalogs(mut self, only_enabled: bool) -> Self {
        self.only_enabled_catalogs = only_enabled;
        self
    }

    pub fn resolver(&self) -> &VideoResolver {
        &self.resolver
    }

    /// Insert a video. The first of `gtypes` picks which extension row, if
    /// any, is written next to the base row. Returns the new id.
    pub fn create_video(&self, video: NewVideo, gtypes: &[&str]) -> VideoResult<i64> {
        if video.title.trim().is_empty() {
            return Err(VideoError::InvalidInput("title is empty".to_string()));
        }
        if video.file.trim().is_empty() {
            return Err(VideoError::InvalidInput("file is empty".to_string()));
        }

        let kind = gtypes
            .first()
            .map(|gtype| VideoKind::classify(gtype))
            .unwrap_or(VideoKind::Video);
        let extension = if kind.is_resolvable() {
            check_extension(kind, &video.extension)?;
            Some((kind.table_name(), &video.extension))
        } else {
            None
        };

        let mime = video
            .mime
            .clone()
            .unwrap_or_else(|| mime_for_extension(&file_type(&video.file)).to_string());
        let base = json!({
            "title": video.title,
            "file": video.file,
            "catalog": video.catalog,
            "video_codec": video.video_codec,
            "audio_codec": video.audio_codec,
            "resolution_x": video.resolution_x,
            "resolution_y": video.resolution_y,
            "size": video.size,
            "time": video.time,
            "mime": mime,
            "release_date": video.release_date,
            "addition_time": now_secs(),
        });
        let base = match base {
            Value::Object(map) => map,
            _ => AttributeMap::new(),
        };

        let id = self.resolver.store().insert_video(&base, extension)?;
        info!("Added video {} ({}) as {}", id, video.file, kind);
        Ok(id)
    }

    /// Update title and release date of a video.
    pub fn update_video(
        &self,
        id: i64,
        title: &str,
        release_date: Option<i64>,
    ) -> VideoResult<VideoRecord> {
        if title.trim().is_empty() {
            return Err(VideoError::InvalidInput("title is empty".to_string()));
        }
        self.resolver.video(id)?;

        let mut changes = AttributeMap::new();
        changes.insert("title".to_string(), Value::from(title));
        changes.insert("release_date".to_string(), json!(release_date));
        self.resolver
            .store()
            .update_row(VIDEO_TABLE_NAME, id, &changes)?;
        self.resolver.refresh(id)
    }

    /// Mark a video as played. Returns false when it already was.
    pub fn set_played(&self, id: i64) -> VideoResult<bool> {
        if self.resolver.video(id)?.played {
            return Ok(false);
        }
        let mut changes = AttributeMap::new();
        changes.insert("played".to_string(), Value::from(1));
        self.resolver
            .store()
            .update_row(VIDEO_TABLE_NAME, id, &changes)?;
        self.resolver.refresh(id)?;
        Ok(true)
    }

    /// Ids of up to `count` enabled videos in random order. A count of zero
    /// is treated as one.
    pub fn random_ids(&self, count: usize) -> VideoResult<Vec<i64>> {
        let count = count.max(1) as i64;
        let sql = if self.only_enabled_catalogs {
            "SELECT DISTINCT video.id FROM video
             LEFT JOIN catalog ON catalog.id = video.catalog
             WHERE video.enabled = 1 AND catalog.enabled = 1
             ORDER BY RANDOM() LIMIT ?1"
        } else {
            "SELECT DISTINCT video.id FROM video
             WHERE video.enabled = 1
             ORDER BY RANDOM() LIMIT ?1"
        };
        Ok(self.resolver.store().query_ids(sql, &[Value::from(count)])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video_store::SqliteVideoStore;
    use std::sync::Arc;

    fn make_library() -> (tempfile::TempDir, VideoLibrary) {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(SqliteVideoStore::new(temp_dir.path().join("test.db"), 2).unwrap());
        (temp_dir, VideoLibrary::new(VideoResolver::new(store)))
    }

    fn new_video(file: &str) -> NewVideo {
        NewVideo {
            title: "Some Video".to_string(),
            file: file.to_string(),
            catalog: 1,
            time: 300,
            ..Default::default()
        }
    }

    #[test]
    fn test_create_generic_video_derives_mime() {
        let (_dir, library) = make_library();
        let id = library.create_video(new_video("/v/a.WEBM"), &[]).unwrap();

        let video = library.resolver().video(id).unwrap();
        assert_eq!(video.mime, "video/webm");
        assert!(video.enabled);
        assert!(!video.played);
        assert_eq!(
            library.resolver().resolve(id).unwrap().kind(),
            VideoKind::Video
        );
    }

    #[test]
    fn test_create_video_with_unknown_gtype_is_generic() {
        let (_dir, library) = make_library();
        let id = library
            .create_video(new_video("/v/b.mkv"), &["documentary"])
            .unwrap();
        assert_eq!(
            library.resolver().resolve(id).unwrap().kind(),
            VideoKind::Video
        );
    }

    #[test]
    fn test_create_movie() {
        let (_dir, library) = make_library();
        let mut video = new_video("/v/c.mkv");
        video.extension = json!({"year": 2010, "summary": "Dreams"})
            .as_object()
            .unwrap()
            .clone();
        let id = library.create_video(video, &["Movie"]).unwrap();

        let resolved = library.resolver().resolve(id).unwrap();
        assert_eq!(resolved.kind(), VideoKind::Movie);
        assert_eq!(resolved.attributes()["year"], json!(2010));
        assert_eq!(resolved.attributes()["summary"], json!("Dreams"));
    }

    #[test]
    fn test_create_episode_requires_season() {
        let (_dir, library) = make_library();
        let err = library
            .create_video(new_video("/v/d.mkv"), &["tvshow"])
            .unwrap_err();
        assert!(matches!(err, VideoError::InvalidInput(_)));
    }

    #[test]
    fn test_create_rejects_empty_title() {
        let (_dir, library) = make_library();
        let mut video = new_video("/v/e.mkv");
        video.title = "  ".to_string();
        assert!(matches!(
            library.create_video(video, &[]),
            Err(VideoError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_set_played_updates_cache() {
        let (_dir, library) = make_library();
        let id = library.create_video(new_video("/v/f.mp4"), &[]).unwrap();
        library.resolver().build_cache(&[id]).unwrap();

        assert!(library.set_played(id).unwrap());
        assert!(!library.set_played(id).unwrap());
        let cached = library.resolver().cache().get(VIDEO_TABLE_NAME, id).unwrap();
        assert_eq!(cached["played"], json!(1));
    }

    #[test]
    fn test_update_video() {
        let (_dir, library) = make_library();
        let id = library.create_video(new_video("/v/g.mp4"), &[]).unwrap();

        let updated = library.update_video(id, "Renamed", Some(946684800)).unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.release_date, Some(946684800));
        assert!(matches!(
            library.update_video(9999, "x", None),
            Err(VideoError::NotFound(9999))
        ));
    }

    #[test]
    fn test_random_ids_skips_disabled() {
        let (_dir, library) = make_library();
        let a = library.create_video(new_video("/v/h.mp4"), &[]).unwrap();
        let b = library.create_video(new_video("/v/i.mp4"), &[]).unwrap();
        let mut disable = AttributeMap::new();
        disable.insert("enabled".to_string(), Value::from(0));
        library
            .resolver()
            .store()
            .update_row(VIDEO_TABLE_NAME, b, &disable)
            .unwrap();

        assert_eq!(library.random_ids(0).unwrap(), vec![a]);
        assert_eq!(library.random_ids(10).unwrap(), vec![a]);
    }

    #[test]
    fn test_random_ids_respects_catalog_state() {
        let (_dir, library) = make_library();
        let library = library.with_only_enabled_catalogs(true);
        library
            .resolver()
            .store()
            .execute(
                "INSERT INTO catalog (id, name, enabled) VALUES (1, 'main', 1), (2, 'old', 0)",
                &[],
            )
            .unwrap();
        let kept = library.create_video(new_video("/v/j.mp4"), &[]).unwrap();
        let mut other = new_video("/v/k.mp4");
        other.catalog = 2;
        library.create_video(other, &[]).unwrap();

        assert_eq!(library.random_ids(5).unwrap(), vec![kept]);
    }
}
