//! Store configuration.
//!
//! | Field          | Default   | Description                                        |
//! |----------------|-----------|----------------------------------------------------|
//! | `foreign_keys` | `true`    | Sets `PRAGMA foreign_keys` on the connection       |
//! | `index_label`  | `"index"` | Column name for a stored row index with no name    |

/// Configuration applied when a [`TableStore`](crate::TableStore) opens its
/// connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Enforce foreign key constraints declared through `query`.
    pub foreign_keys: bool,

    /// Column name given to the row index when a frame is stored with
    /// `include_row_index` and its index has no name of its own.
    pub index_label: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            foreign_keys: true,
            index_label: "index".to_string(),
        }
    }
}

impl StoreConfig {
    /// Turns foreign key enforcement on or off.
    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Sets the column name used for an unnamed stored index.
    pub fn with_index_label(mut self, label: impl Into<String>) -> Self {
        self.index_label = label.into();
        self
    }
}
