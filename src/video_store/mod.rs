mod models;
mod schema;
mod store;
mod subtype;
mod trait_def;

pub use models::*;
pub use schema::{CATALOG_TABLE_NAME, VIDEO_TABLE_NAME, VIDEO_VERSIONED_SCHEMAS};
pub use store::SqliteVideoStore;
pub use subtype::TableSubtype;
pub use trait_def::VideoStore;
