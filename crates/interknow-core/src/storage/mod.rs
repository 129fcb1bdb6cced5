//! Storage layer - concept graph persistence and usage counters
//!
//! # Architecture
//!
//! - `repository`: the `ConceptStore` trait the cache coordinator depends on
//! - `memory`: in-process store for tests and `--memory` runs
//! - `sqlite`: durable store over SQLite
//! - `database`: connection pool management and initialization
//! - `migrations`: schema versioning and automatic migration
//!
//! # Usage
//!
//! ```ignore
//! use interknow_core::storage::{Database, SqliteConceptStore};
//!
//! let db = Database::open("/tmp/interknow.db").await?;
//! let store = SqliteConceptStore::from_database(&db);
//! ```

pub mod database;
pub mod memory;
pub mod migrations;
pub mod repository;
pub mod sqlite;

pub use database::Database;
pub use memory::InMemoryConceptStore;
pub use migrations::{CURRENT_VERSION, MigrationStatus, migration_status, run_migrations};
pub use repository::{ConceptStore, UsageTotals};
pub use sqlite::SqliteConceptStore;
