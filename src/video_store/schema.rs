//! SQLite schema for the video catalog.
//!
//! The `video` table holds the shared identity of every video-like asset.
//! Each specialization lives in its own extension table keyed by the same id.
//! Extension tables deliberately carry no foreign key to `video`: removing a
//! base row leaves the extension row behind, and the orphan collector cleans it up.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

pub const VIDEO_TABLE_NAME: &str = "video";
pub const CATALOG_TABLE_NAME: &str = "catalog";

const CATALOG_TABLE: Table = Table {
    name: CATALOG_TABLE_NAME,
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!(
            "enabled",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
    ],
    indices: &[],
};

const VIDEO_TABLE: Table = Table {
    name: VIDEO_TABLE_NAME,
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("file", &SqlType::Text, non_null = true),
        sqlite_column!("catalog", &SqlType::Integer, non_null = true),
        sqlite_column!("video_codec", &SqlType::Text),
        sqlite_column!("audio_codec", &SqlType::Text),
        sqlite_column!(
            "resolution_x",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "resolution_y",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "size",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "time",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("mime", &SqlType::Text, non_null = true),
        sqlite_column!("release_date", &SqlType::Integer),
        sqlite_column!("addition_time", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "enabled",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!(
            "played",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[("idx_video_catalog", "catalog"), ("idx_video_file", "file")],
};

const MOVIE_TABLE: Table = Table {
    name: "movie",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("original_name", &SqlType::Text),
        sqlite_column!("summary", &SqlType::Text),
        sqlite_column!("year", &SqlType::Integer),
    ],
    indices: &[],
};

const TVSHOW_TABLE: Table = Table {
    name: "tvshow",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("summary", &SqlType::Text),
        sqlite_column!("year", &SqlType::Integer),
    ],
    indices: &[],
};

const TVSHOW_SEASON_TABLE: Table = Table {
    name: "tvshow_season",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("season_number", &SqlType::Integer, non_null = true),
        sqlite_column!("tvshow", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_tvshow_season_tvshow", "tvshow")],
};

const TVSHOW_EPISODE_TABLE: Table = Table {
    name: "tvshow_episode",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("original_name", &SqlType::Text),
        sqlite_column!("season", &SqlType::Integer, non_null = true),
        sqlite_column!("episode_number", &SqlType::Integer, non_null = true),
        sqlite_column!("summary", &SqlType::Text),
    ],
    indices: &[("idx_tvshow_episode_season", "season")],
};

const CLIP_TABLE: Table = Table {
    name: "clip",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("artist", &SqlType::Text),
        sqlite_column!("song", &SqlType::Text),
    ],
    indices: &[],
};

const PERSONAL_VIDEO_TABLE: Table = Table {
    name: "personal_video",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("location", &SqlType::Text),
        sqlite_column!("description", &SqlType::Text),
    ],
    indices: &[],
};

pub const VIDEO_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        CATALOG_TABLE,
        VIDEO_TABLE,
        MOVIE_TABLE,
        TVSHOW_TABLE,
        TVSHOW_SEASON_TABLE,
        TVSHOW_EPISODE_TABLE,
        CLIP_TABLE,
        PERSONAL_VIDEO_TABLE,
    ],
    migration: None,
}];

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_creates_successfully() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = &VIDEO_VERSIONED_SCHEMAS[0];
        schema.create(&conn).unwrap();
        schema.validate(&conn).unwrap();
    }

    #[test]
    fn test_extension_row_survives_base_row_deletion() {
        let conn = Connection::open_in_memory().unwrap();
        VIDEO_VERSIONED_SCHEMAS[0].create(&conn).unwrap();

        conn.execute(
            "INSERT INTO video (id, title, file, catalog, mime, addition_time)
             VALUES (7, 'Heat', '/films/heat.mkv', 1, 'video/x-matroska', 0)",
            [],
        )
        .unwrap();
        conn.execute("INSERT INTO movie (id, year) VALUES (7, 1995)", [])
            .unwrap();
        conn.execute("DELETE FROM video WHERE id = 7", []).unwrap();

        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM movie WHERE id = 7", [], |r| r.get(0))
            .unwrap();
        assert_eq!(remaining, 1);
    }
}
