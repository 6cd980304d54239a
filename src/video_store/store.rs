//! SQLite-backed video store.
//!
//! Reads go through a small round-robin pool of read-only connections, writes
//! through a single read-write connection. Rows are returned as attribute maps
//! keyed by column name.

use super::models::AttributeMap;
use super::schema::{VIDEO_TABLE_NAME, VIDEO_VERSIONED_SCHEMAS};
use super::trait_def::VideoStore;
use crate::error::{StoreError, StoreResult};
use crate::sqlite_persistence::{Table, BASE_DB_VERSION};
use anyhow::{Context, Result};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::vtab::array::{self, Array};
use rusqlite::{params, params_from_iter, Connection, OpenFlags, Row};
use serde_json::Value;
use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// SQLite-backed video store.
#[derive(Clone)]
pub struct SqliteVideoStore {
    read_pool: Vec<Arc<Mutex<Connection>>>,
    write_conn: Arc<Mutex<Connection>>,
    read_index: Arc<AtomicUsize>,
}

fn migrate_if_needed(conn: &mut Connection) -> Result<()> {
    let latest_version = VIDEO_VERSIONED_SCHEMAS.len() - 1;
    let latest_schema = &VIDEO_VERSIONED_SCHEMAS[latest_version];

    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |r| r.get(0),
    )?;

    if table_count == 0 {
        info!("Creating video db schema at version {}", latest_version);
        latest_schema.create(conn)?;
        return Ok(());
    }

    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    if db_version < BASE_DB_VERSION as i64 {
        anyhow::bail!(
            "Database user_version {} was not written by this application",
            db_version
        );
    }
    let mut current_version = (db_version - BASE_DB_VERSION as i64) as usize;

    if current_version < latest_version {
        let tx = conn.transaction()?;
        for schema in VIDEO_VERSIONED_SCHEMAS.iter().skip(current_version + 1) {
            if let Some(migration_fn) = schema.migration {
                info!(
                    "Migrating video db from version {} to {}",
                    current_version, schema.version
                );
                migration_fn(&tx)?;
            }
            current_version = schema.version;
        }
        tx.pragma_update(None, "user_version", BASE_DB_VERSION + current_version)?;
        tx.commit()?;
    }

    latest_schema
        .validate(conn)
        .context("Video db schema does not match the expected layout")
}

fn latest_table(name: &str) -> Option<&'static Table> {
    VIDEO_VERSIONED_SCHEMAS
        .last()
        .and_then(|schema| schema.tables.iter().find(|t| t.name == name))
}

/// Rejects any attribute that is not a column of `table`; attribute names end
/// up in the SQL text.
fn check_columns(table: &'static str, attributes: &AttributeMap) -> StoreResult<()> {
    let known = latest_table(table);
    for key in attributes.keys() {
        let is_column = known
            .map(|t| t.columns.iter().any(|c| c.name == key))
            .unwrap_or(false);
        if !is_column {
            return Err(StoreError::UnknownColumn {
                table,
                column: key.clone(),
            });
        }
    }
    Ok(())
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_sql_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

fn row_to_attributes(row: &Row, columns: &[String]) -> rusqlite::Result<AttributeMap> {
    let mut attributes = AttributeMap::with_capacity(columns.len());
    for (index, name) in columns.iter().enumerate() {
        attributes.insert(name.clone(), from_sql_value(row.get_ref(index)?));
    }
    Ok(attributes)
}

fn insert_row(conn: &Connection, table: &'static str, attributes: &AttributeMap) -> StoreResult<()> {
    check_columns(table, attributes)?;
    let columns: Vec<&str> = attributes.keys().map(String::as_str).collect();
    let placeholders = (1..=columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders
    );
    conn.execute(&sql, params_from_iter(attributes.values().map(to_sql_value)))?;
    Ok(())
}

impl SqliteVideoStore {
    /// Open (creating or migrating as needed) the video database.
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    /// * `read_pool_size` - Number of connections for concurrent reads
    pub fn new<P: AsRef<Path>>(db_path: P, read_pool_size: usize) -> Result<Self> {
        let db_path = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open video database")?;

        migrate_if_needed(&mut write_conn)?;
        write_conn.pragma_update(None, "journal_mode", "WAL")?;

        let video_count: i64 =
            write_conn.query_row("SELECT COUNT(*) FROM video", [], |r| r.get(0))?;
        info!("Opened video catalog: {} videos", video_count);

        let mut read_pool = Vec::with_capacity(read_pool_size.max(1));
        for _ in 0..read_pool_size.max(1) {
            let read_conn = Connection::open_with_flags(
                db_path,
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            array::load_module(&read_conn)?;
            read_pool.push(Arc::new(Mutex::new(read_conn)));
        }

        Ok(SqliteVideoStore {
            read_pool,
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_index: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn get_read_conn(&self) -> Arc<Mutex<Connection>> {
        let index = self.read_index.fetch_add(1, Ordering::SeqCst) % self.read_pool.len();
        self.read_pool[index].clone()
    }

    fn lock(conn: &Mutex<Connection>) -> StoreResult<MutexGuard<'_, Connection>> {
        conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Number of rows in the `video` table.
    pub fn count_videos(&self) -> StoreResult<usize> {
        let read_conn = self.get_read_conn();
        let conn = Self::lock(&read_conn)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM video", [], |r| r.get(0))?;
        Ok(count as usize)
    }
}

impl VideoStore for SqliteVideoStore {
    fn fetch_row(&self, table: &'static str, id: i64) -> StoreResult<Option<AttributeMap>> {
        let read_conn = self.get_read_conn();
        let conn = Self::lock(&read_conn)?;

        let mut stmt = conn.prepare_cached(&format!("SELECT * FROM {} WHERE id = ?1", table))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        match stmt.query_row(params![id], |row| row_to_attributes(row, &columns)) {
            Ok(attributes) => Ok(Some(attributes)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn fetch_rows(&self, table: &'static str, ids: &[i64]) -> StoreResult<Vec<AttributeMap>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let read_conn = self.get_read_conn();
        let conn = Self::lock(&read_conn)?;

        // One bound array parameter, whatever the batch size.
        let id_array: Array = Rc::new(ids.iter().copied().map(SqlValue::from).collect());
        let mut stmt =
            conn.prepare_cached(&format!("SELECT * FROM {} WHERE id IN rarray(?1)", table))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let rows = stmt
            .query_map(params![id_array], |row| row_to_attributes(row, &columns))?
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Bulk fetched {} of {} {} rows", rows.len(), ids.len(), table);
        Ok(rows)
    }

    fn row_exists(&self, table: &'static str, id: i64) -> StoreResult<bool> {
        let read_conn = self.get_read_conn();
        let conn = Self::lock(&read_conn)?;

        let mut stmt = conn.prepare_cached(&format!("SELECT 1 FROM {} WHERE id = ?1", table))?;
        Ok(stmt.exists(params![id])?)
    }

    fn insert_video(
        &self,
        base: &AttributeMap,
        extension: Option<(&'static str, &AttributeMap)>,
    ) -> StoreResult<i64> {
        let mut conn = Self::lock(&self.write_conn)?;
        let tx = conn.transaction()?;

        insert_row(&tx, VIDEO_TABLE_NAME, base)?;
        let id = tx.last_insert_rowid();

        if let Some((table, attributes)) = extension {
            let mut attributes = attributes.clone();
            attributes.insert("id".to_string(), Value::from(id));
            insert_row(&tx, table, &attributes)?;
        }

        tx.commit()?;
        Ok(id)
    }

    fn update_row(
        &self,
        table: &'static str,
        id: i64,
        attributes: &AttributeMap,
    ) -> StoreResult<usize> {
        if attributes.is_empty() {
            return Ok(0);
        }
        check_columns(table, attributes)?;

        let assignments = attributes
            .keys()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", column, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            table,
            assignments,
            attributes.len() + 1
        );
        let values = attributes
            .values()
            .map(to_sql_value)
            .chain(std::iter::once(SqlValue::Integer(id)));

        let conn = Self::lock(&self.write_conn)?;
        Ok(conn.execute(&sql, params_from_iter(values))?)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> StoreResult<usize> {
        let conn = Self::lock(&self.write_conn)?;
        Ok(conn.execute(sql, params_from_iter(params.iter().map(to_sql_value)))?)
    }

    fn query_ids(&self, sql: &str, params: &[Value]) -> StoreResult<Vec<i64>> {
        let read_conn = self.get_read_conn();
        let conn = Self::lock(&read_conn)?;

        let mut stmt = conn.prepare(sql)?;
        let ids = stmt
            .query_map(params_from_iter(params.iter().map(to_sql_value)), |row| {
                row.get::<_, i64>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}
