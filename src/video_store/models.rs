//! Video catalog models.
//!
//! Rows come out of the store as raw attribute maps; these types give them
//! a shape once the resolver knows which specialization a video belongs to.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;

/// Raw column-name to value mapping for a single row.
pub type AttributeMap = serde_json::Map<String, Value>;

// =============================================================================
// Kinds
// =============================================================================

/// Every specialization a video can take, plus the containers that only
/// participate in orphan collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoKind {
    /// No specialization: the base row alone.
    Video,
    Episode,
    Movie,
    Clip,
    PersonalVideo,
    Season,
    Show,
}

impl VideoKind {
    /// Resolution precedence. When a video somehow has rows in several
    /// extension tables, the earlier kind here is the one observed.
    pub const RESOLUTION_ORDER: [VideoKind; 4] = [
        VideoKind::Episode,
        VideoKind::Movie,
        VideoKind::Clip,
        VideoKind::PersonalVideo,
    ];

    /// Orphan collection order. Episodes go before seasons and seasons before
    /// shows, so a show emptied by a deleted video is cleared in a single pass.
    pub const COLLECTION_ORDER: [VideoKind; 6] = [
        VideoKind::Movie,
        VideoKind::Episode,
        VideoKind::Season,
        VideoKind::Show,
        VideoKind::PersonalVideo,
        VideoKind::Clip,
    ];

    /// Normalizes a type name against the known specializations.
    /// Matching is case-insensitive; unknown names fall back to `Video`.
    pub fn classify(name: &str) -> VideoKind {
        match name.trim().to_ascii_lowercase().as_str() {
            "episode" | "tvshow_episode" | "tvshow" => VideoKind::Episode,
            "movie" => VideoKind::Movie,
            "clip" => VideoKind::Clip,
            "personal_video" | "personalvideo" => VideoKind::PersonalVideo,
            _ => VideoKind::Video,
        }
    }

    /// Table backing this kind.
    pub fn table_name(&self) -> &'static str {
        match self {
            VideoKind::Video => super::schema::VIDEO_TABLE_NAME,
            VideoKind::Episode => "tvshow_episode",
            VideoKind::Movie => "movie",
            VideoKind::Clip => "clip",
            VideoKind::PersonalVideo => "personal_video",
            VideoKind::Season => "tvshow_season",
            VideoKind::Show => "tvshow",
        }
    }

    /// Whether a video id can resolve to this kind.
    pub fn is_resolvable(&self) -> bool {
        Self::RESOLUTION_ORDER.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoKind::Video => "video",
            VideoKind::Episode => "episode",
            VideoKind::Movie => "movie",
            VideoKind::Clip => "clip",
            VideoKind::PersonalVideo => "personal_video",
            VideoKind::Season => "season",
            VideoKind::Show => "show",
        }
    }
}

impl fmt::Display for VideoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Base record
// =============================================================================

/// SQLite stores booleans as 0/1 integers.
mod int_bool {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(i64::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(i64::deserialize(deserializer)? != 0)
    }
}

/// The shared identity of every video-like asset (a row of the `video` table).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: i64,
    pub title: String,
    pub file: String,
    pub catalog: i64,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub resolution_x: u32,
    pub resolution_y: u32,
    pub size: u64,
    /// Duration in seconds.
    pub time: u32,
    pub mime: String,
    /// Unix timestamp.
    pub release_date: Option<i64>,
    pub addition_time: i64,
    #[serde(with = "int_bool")]
    pub enabled: bool,
    #[serde(with = "int_bool")]
    pub played: bool,
}

impl VideoRecord {
    pub fn from_attributes(attributes: &AttributeMap) -> serde_json::Result<Self> {
        serde_json::from_value(Value::Object(attributes.clone()))
    }

    /// Lower-cased extension of the underlying file.
    pub fn file_type(&self) -> String {
        file_type(&self.file)
    }
}

/// Lower-cased extension of a path, empty when there is none.
pub fn file_type<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

// =============================================================================
// Extensions
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub original_name: Option<String>,
    pub season: i64,
    pub episode_number: i32,
    pub summary: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub original_name: Option<String>,
    pub summary: Option<String>,
    pub year: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clip {
    pub artist: Option<String>,
    pub song: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalVideo {
    pub location: Option<String>,
    pub description: Option<String>,
}

/// A video resolved to its specialization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedVideo {
    Generic(VideoRecord),
    Episode(VideoRecord, Episode),
    Movie(VideoRecord, Movie),
    Clip(VideoRecord, Clip),
    PersonalVideo(VideoRecord, PersonalVideo),
}

fn from_map<T: serde::de::DeserializeOwned>(map: &AttributeMap) -> serde_json::Result<T> {
    serde_json::from_value(Value::Object(map.clone()))
}

fn to_map<T: Serialize>(value: &T) -> AttributeMap {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => AttributeMap::new(),
    }
}

impl ResolvedVideo {
    /// Builds the specialized entity for `kind` from the base record and the
    /// raw extension row. Container kinds and `Video` yield the generic form.
    pub fn from_parts(
        kind: VideoKind,
        video: VideoRecord,
        extension: &AttributeMap,
    ) -> serde_json::Result<Self> {
        Ok(match kind {
            VideoKind::Episode => ResolvedVideo::Episode(video, from_map(extension)?),
            VideoKind::Movie => ResolvedVideo::Movie(video, from_map(extension)?),
            VideoKind::Clip => ResolvedVideo::Clip(video, from_map(extension)?),
            VideoKind::PersonalVideo => ResolvedVideo::PersonalVideo(video, from_map(extension)?),
            VideoKind::Video | VideoKind::Season | VideoKind::Show => {
                ResolvedVideo::Generic(video)
            }
        })
    }

    pub fn kind(&self) -> VideoKind {
        match self {
            ResolvedVideo::Generic(_) => VideoKind::Video,
            ResolvedVideo::Episode(..) => VideoKind::Episode,
            ResolvedVideo::Movie(..) => VideoKind::Movie,
            ResolvedVideo::Clip(..) => VideoKind::Clip,
            ResolvedVideo::PersonalVideo(..) => VideoKind::PersonalVideo,
        }
    }

    pub fn video(&self) -> &VideoRecord {
        match self {
            ResolvedVideo::Generic(video)
            | ResolvedVideo::Episode(video, _)
            | ResolvedVideo::Movie(video, _)
            | ResolvedVideo::Clip(video, _)
            | ResolvedVideo::PersonalVideo(video, _) => video,
        }
    }

    pub fn id(&self) -> i64 {
        self.video().id
    }

    /// Base attributes merged with the extension attributes.
    pub fn attributes(&self) -> AttributeMap {
        let mut merged = to_map(self.video());
        let extension = match self {
            ResolvedVideo::Generic(_) => AttributeMap::new(),
            ResolvedVideo::Episode(_, e) => to_map(e),
            ResolvedVideo::Movie(_, m) => to_map(m),
            ResolvedVideo::Clip(_, c) => to_map(c),
            ResolvedVideo::PersonalVideo(_, p) => to_map(p),
        };
        merged.extend(extension);
        merged
    }

    /// JSON representation tagged with the resolved kind.
    pub fn to_json(&self) -> Value {
        let mut attributes = self.attributes();
        attributes.insert("kind".to_string(), Value::from(self.kind().as_str()));
        Value::Object(attributes)
    }
}

// =============================================================================
// Insertion
// =============================================================================

/// Data for a video about to be inserted.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewVideo {
    pub title: String,
    pub file: String,
    pub catalog: i64,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub resolution_x: u32,
    pub resolution_y: u32,
    pub size: u64,
    pub time: u32,
    /// Derived from the file extension when absent.
    pub mime: Option<String>,
    pub release_date: Option<i64>,
    /// Specialization fields, written to the extension table picked by the
    /// video's classified kind. Ignored for generic videos.
    #[serde(default)]
    pub extension: AttributeMap,
}
