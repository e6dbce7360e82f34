//! fc-db: the metadata catalog.
//!
//! SQLite-backed storage with r2d2 connection pooling, embedded
//! migrations, the [`models::FileRecord`] model, raw query functions, and
//! the [`catalog::Catalog`] handle that the server injects into its
//! components.

pub mod catalog;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;

pub use catalog::{Catalog, Page};
pub use models::{FileRecord, NewFileRecord};
