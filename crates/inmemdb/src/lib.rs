//! # inmemdb
//!
//! An in-memory SQLite database materialized from tabular data.
//!
//! A [`TableStore`] owns one private in-memory connection. Tables are created
//! from a [`DataFrame`] or from any JSON sequence/mapping, queried with plain
//! SQL (results come back as frames), and dropped explicitly. Nothing is
//! persisted: every table disappears with the store.
//!
//! ## Quick start
//!
//! ```no_run
//! use inmemdb::TableStore;
//! use serde_json::json;
//!
//! let store = TableStore::new().unwrap();
//!
//! store
//!     .create_table_from_sequence(
//!         "people",
//!         &json!([{"name": "Ana", "age": 30}, {"name": "Bo", "age": 25}]),
//!         None,
//!         None,
//!     )
//!     .unwrap();
//!
//! let adults = store.query("SELECT name FROM people WHERE age > 26").unwrap();
//! assert_eq!(adults.len(), 1);
//! ```

pub mod config;
pub mod error;
pub mod frame;
pub mod schema;
pub mod store;

// Re-exports for convenience.
pub use config::StoreConfig;
pub use error::TableError;
pub use frame::DataFrame;
pub use schema::{ColumnDef, ColumnType};
pub use store::{DropOutcome, TableStore};
