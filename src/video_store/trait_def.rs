//! VideoStore trait definition.
//!
//! The resolver, cache and collector only ever talk to the persistence layer
//! through this trait, so tests can wrap or replace the SQLite backend.

use super::models::AttributeMap;
use crate::error::StoreResult;
use serde_json::Value;

/// Query/execute interface over the relational video store.
///
/// Table names are always `&'static str` taken from the schema definitions;
/// they are interpolated into SQL and must never come from user input.
pub trait VideoStore: Send + Sync {
    /// Fetch a single row by id.
    fn fetch_row(&self, table: &'static str, id: i64) -> StoreResult<Option<AttributeMap>>;

    /// Fetch every row whose id is in `ids` with a single query.
    /// Ids without a row are simply absent from the result.
    fn fetch_rows(&self, table: &'static str, ids: &[i64]) -> StoreResult<Vec<AttributeMap>>;

    /// Existence check only, without reading the row.
    fn row_exists(&self, table: &'static str, id: i64) -> StoreResult<bool>;

    /// Insert a base `video` row and, when given, one extension row sharing
    /// the generated id. Returns the new id.
    fn insert_video(
        &self,
        base: &AttributeMap,
        extension: Option<(&'static str, &AttributeMap)>,
    ) -> StoreResult<i64>;

    /// Update the given columns of a row. Returns the number of rows touched.
    fn update_row(
        &self,
        table: &'static str,
        id: i64,
        attributes: &AttributeMap,
    ) -> StoreResult<usize>;

    /// Run a parameterized statement. Returns the number of rows touched.
    fn execute(&self, sql: &str, params: &[Value]) -> StoreResult<usize>;

    /// Run a parameterized query whose first column is an id.
    fn query_ids(&self, sql: &str, params: &[Value]) -> StoreResult<Vec<i64>>;
}
