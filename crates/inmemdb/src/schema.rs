use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Describes a single column of a stored table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnDef {
    /// The column name.
    pub name: String,
    /// The logical type of the column.
    pub col_type: ColumnType,
    /// Whether the column accepts NULL values.
    pub nullable: bool,
    /// Whether this column is (part of) the primary key.
    pub primary_key: bool,
}

/// Logical column types a frame column can be stored as.
///
/// Each type maps to an underlying SQLite declared type:
/// - `Text` -> TEXT
/// - `Integer` -> INTEGER
/// - `Float` -> REAL
/// - `Bool` -> BOOLEAN (stored as 0/1)
/// - `Json` -> TEXT (nested arrays and objects serialized as JSON)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ColumnType {
    /// A UTF-8 text string. Also used for mixed and all-null columns.
    Text,
    /// A 64-bit signed integer.
    Integer,
    /// A 64-bit floating-point number.
    Float,
    /// A boolean stored as INTEGER (0 or 1).
    Bool,
    /// Arbitrary JSON stored as TEXT.
    Json,
}

impl ColumnType {
    /// Returns the declared SQLite type used in `CREATE TABLE`.
    pub fn to_sqlite_type(self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Float => "REAL",
            ColumnType::Bool => "BOOLEAN",
            ColumnType::Json => "TEXT",
        }
    }

    /// Maps a declared SQLite type back to a logical type, following SQLite's
    /// column affinity rules. Undeclared or unknown types fall back to `Text`.
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.to_ascii_uppercase();
        if upper == "BOOLEAN" || upper == "BOOL" {
            ColumnType::Bool
        } else if upper.contains("INT") {
            ColumnType::Integer
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            ColumnType::Float
        } else {
            ColumnType::Text
        }
    }

    /// Infers the storage type of a column from its cell values.
    ///
    /// Nulls are ignored. A column with no non-null values, or whose values
    /// mix kinds (e.g. strings and numbers), is stored as `Text`. Integers
    /// mixed with floats widen to `Float`.
    pub fn infer<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut inferred: Option<ColumnType> = None;
        for value in values {
            let kind = match value {
                Value::Null => continue,
                Value::Bool(_) => ColumnType::Bool,
                Value::Number(n) if n.is_i64() => ColumnType::Integer,
                Value::Number(_) => ColumnType::Float,
                Value::String(_) => ColumnType::Text,
                Value::Array(_) | Value::Object(_) => ColumnType::Json,
            };
            inferred = Some(match (inferred, kind) {
                (None, k) => k,
                (Some(prev), k) if prev == k => prev,
                (Some(ColumnType::Integer), ColumnType::Float)
                | (Some(ColumnType::Float), ColumnType::Integer) => ColumnType::Float,
                _ => return ColumnType::Text,
            });
        }
        inferred.unwrap_or(ColumnType::Text)
    }
}
