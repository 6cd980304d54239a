//! Test fixture creation for the video database.

use rusqlite::Connection;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use video_catalog::error::StoreResult;
use video_catalog::video_store::AttributeMap;
use video_catalog::{SqliteVideoStore, VideoStore};

pub const GENERIC_VIDEO_ID: i64 = 42;
pub const MOVIE_VIDEO_ID: i64 = 7;
pub const EPISODE_VIDEO_ID: i64 = 11;
pub const CLIP_VIDEO_ID: i64 = 12;
pub const PERSONAL_VIDEO_ID: i64 = 13;
pub const SEASON_ID: i64 = 100;
pub const SHOW_ID: i64 = 200;

pub const ALL_VIDEO_IDS: [i64; 5] = [
    GENERIC_VIDEO_ID,
    MOVIE_VIDEO_ID,
    EPISODE_VIDEO_ID,
    CLIP_VIDEO_ID,
    PERSONAL_VIDEO_ID,
];

/// Wraps a store and counts each kind of call made through it.
pub struct CountingStore {
    inner: SqliteVideoStore,
    pub bulk_fetches: AtomicUsize,
    pub single_fetches: AtomicUsize,
    pub existence_checks: AtomicUsize,
    pub executes: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: SqliteVideoStore) -> Self {
        Self {
            inner,
            bulk_fetches: AtomicUsize::new(0),
            single_fetches: AtomicUsize::new(0),
            existence_checks: AtomicUsize::new(0),
            executes: AtomicUsize::new(0),
        }
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

impl VideoStore for CountingStore {
    fn fetch_row(&self, table: &'static str, id: i64) -> StoreResult<Option<AttributeMap>> {
        self.single_fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_row(table, id)
    }

    fn fetch_rows(&self, table: &'static str, ids: &[i64]) -> StoreResult<Vec<AttributeMap>> {
        self.bulk_fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_rows(table, ids)
    }

    fn row_exists(&self, table: &'static str, id: i64) -> StoreResult<bool> {
        self.existence_checks.fetch_add(1, Ordering::SeqCst);
        self.inner.row_exists(table, id)
    }

    fn insert_video(
        &self,
        base: &AttributeMap,
        extension: Option<(&'static str, &AttributeMap)>,
    ) -> StoreResult<i64> {
        self.inner.insert_video(base, extension)
    }

    fn update_row(
        &self,
        table: &'static str,
        id: i64,
        attributes: &AttributeMap,
    ) -> StoreResult<usize> {
        self.inner.update_row(table, id, attributes)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> StoreResult<usize> {
        self.executes.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(sql, params)
    }

    fn query_ids(&self, sql: &str, params: &[Value]) -> StoreResult<Vec<i64>> {
        self.inner.query_ids(sql, params)
    }
}

fn insert_base(conn: &Connection, id: i64, title: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO video (id, title, file, catalog, video_codec, audio_codec,
                            resolution_x, resolution_y, size, time, mime, addition_time)
         VALUES (?1, ?2, ?3, 1, 'h264', 'aac', 1920, 1080, 1000, 600, 'video/mp4', 0)",
        rusqlite::params![id, title, format!("/videos/{}.mp4", id)],
    )?;
    Ok(())
}

/// Creates a temporary video database with one video of each kind, a season
/// and a show. Returns (temp_dir, db_path).
pub fn create_test_db() -> anyhow::Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("videos.db");

    // Initialize the store (creates schema)
    let _store = SqliteVideoStore::new(&db_path, 1)?;

    let conn = Connection::open(&db_path)?;
    conn.execute("INSERT INTO catalog (id, name) VALUES (1, 'main')", [])?;

    insert_base(&conn, GENERIC_VIDEO_ID, "Home Tour")?;
    insert_base(&conn, MOVIE_VIDEO_ID, "Heat")?;
    insert_base(&conn, EPISODE_VIDEO_ID, "Pilot")?;
    insert_base(&conn, CLIP_VIDEO_ID, "Video Killed the Radio Star")?;
    insert_base(&conn, PERSONAL_VIDEO_ID, "Birthday")?;

    conn.execute(
        "INSERT INTO movie (id, original_name, summary, year) VALUES (?1, 'Heat', 'Crime', 1995)",
        [MOVIE_VIDEO_ID],
    )?;
    conn.execute(
        "INSERT INTO tvshow (id, name, year) VALUES (?1, 'The Show', 2001)",
        [SHOW_ID],
    )?;
    conn.execute(
        "INSERT INTO tvshow_season (id, season_number, tvshow) VALUES (?1, 1, ?2)",
        [SEASON_ID, SHOW_ID],
    )?;
    conn.execute(
        "INSERT INTO tvshow_episode (id, season, episode_number) VALUES (?1, ?2, 1)",
        [EPISODE_VIDEO_ID, SEASON_ID],
    )?;
    conn.execute(
        "INSERT INTO clip (id, artist, song) VALUES (?1, 'The Buggles', 'VKTRS')",
        [CLIP_VIDEO_ID],
    )?;
    conn.execute(
        "INSERT INTO personal_video (id, location) VALUES (?1, 'Rome')",
        [PERSONAL_VIDEO_ID],
    )?;

    Ok((dir, db_path))
}

/// Opens the fixture database behind a counting wrapper.
pub fn open_counting_store() -> (TempDir, Arc<CountingStore>) {
    let (dir, db_path) = create_test_db().expect("Failed to create test db");
    let store = SqliteVideoStore::new(&db_path, 2).expect("Failed to open test db");
    (dir, Arc::new(CountingStore::new(store)))
}
