use std::fmt;

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::StoreConfig;
use crate::error::TableError;
use crate::frame::DataFrame;
use crate::schema::{ColumnDef, ColumnType};

/// Fallback name for a stored index whose label collides with a data column.
const FALLBACK_INDEX_LABEL: &str = "level_0";

/// Prefix SQLite reserves for its own objects.
const RESERVED_PREFIX: &str = "sqlite_";

/// An in-memory relational database built from tabular data.
///
/// Each `TableStore` owns a private SQLite connection opened in memory; the
/// tables it holds live exactly as long as the store. Tables are created from
/// a [`DataFrame`] or from any JSON sequence/mapping, queried with plain SQL,
/// and dropped explicitly.
///
/// The store is `Send` but not `Sync`: operations are issued serially by a
/// single owner.
pub struct TableStore {
    conn: Connection,
    config: StoreConfig,
}

/// Result of [`TableStore::drop_table`] on an existing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// The engine removed the table.
    Dropped { table: String },
    /// The engine refused the drop. The error was not raised; the table is
    /// most likely still present.
    Suppressed { table: String, reason: String },
}

impl DropOutcome {
    /// Name of the table the drop was issued for.
    pub fn table(&self) -> &str {
        match self {
            DropOutcome::Dropped { table } | DropOutcome::Suppressed { table, .. } => table,
        }
    }

    /// Whether the engine actually removed the table.
    pub fn is_dropped(&self) -> bool {
        matches!(self, DropOutcome::Dropped { .. })
    }
}

impl fmt::Display for DropOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropOutcome::Dropped { table } => write!(f, "{} has been deleted", table),
            DropOutcome::Suppressed { table, reason } => {
                write!(f, "{} was not deleted: {}", table, reason)
            }
        }
    }
}

impl TableStore {
    /// Opens a fresh, empty in-memory database with the default configuration.
    pub fn new() -> Result<Self, TableError> {
        Self::with_config(StoreConfig::default())
    }

    /// Opens a fresh, empty in-memory database.
    pub fn with_config(config: StoreConfig) -> Result<Self, TableError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", config.foreign_keys)?;
        debug!(foreign_keys = config.foreign_keys, "Opened in-memory TableStore");
        Ok(Self { conn, config })
    }

    /// The configuration this store was opened with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Creates a new table from a frame.
    ///
    /// The row index becomes the leading column only when `include_row_index`
    /// is set. Returns [`TableError::DuplicateTableName`] if the name is taken
    /// and [`TableError::InvalidInput`] if the frame is not a well-formed
    /// table; the database is unchanged in both cases.
    #[instrument(skip_all, fields(table = %table_name))]
    pub fn create_table_from_frame(
        &self,
        table_name: &str,
        frame: &DataFrame,
        include_row_index: bool,
    ) -> Result<String, TableError> {
        self.ensure_creatable(table_name)?;
        frame.validate()?;
        self.write_frame(table_name, frame, include_row_index)?;
        Ok(format!("{} table has been created successfully", table_name))
    }

    /// Creates a new table from a JSON sequence or mapping.
    ///
    /// `data` is normalized with [`DataFrame::from_sequence`] using the given
    /// `columns` and `row_index`; the index is never stored. Shapes that do
    /// not fit the requested columns or index fail with
    /// [`TableError::InvalidInput`].
    #[instrument(skip_all, fields(table = %table_name))]
    pub fn create_table_from_sequence(
        &self,
        table_name: &str,
        data: &Value,
        columns: Option<&[String]>,
        row_index: Option<&[Value]>,
    ) -> Result<String, TableError> {
        self.ensure_creatable(table_name)?;
        let frame = DataFrame::from_sequence(data, columns, row_index)?;
        frame.validate()?;
        self.write_frame(table_name, &frame, false)?;
        Ok(format!("{} table has been created successfully", table_name))
    }

    /// Drops a table by name.
    ///
    /// Returns [`TableError::TableNotFound`] if it does not exist. An engine
    /// failure while dropping is logged and reported as
    /// [`DropOutcome::Suppressed`] rather than returned as an error.
    #[instrument(skip_all, fields(table = %table_name))]
    pub fn drop_table(&self, table_name: &str) -> Result<DropOutcome, TableError> {
        if !self.has_table(table_name)? {
            return Err(TableError::TableNotFound(table_name.to_string()));
        }

        let sql = format!("DROP TABLE {}", quote_ident(table_name));
        match self.conn.execute(&sql, []) {
            Ok(_) => {
                debug!("Dropped table {}", table_name);
                Ok(DropOutcome::Dropped {
                    table: table_name.to_string(),
                })
            }
            Err(e) => {
                warn!(error = %e, "DROP TABLE failed, suppressing");
                Ok(DropOutcome::Suppressed {
                    table: table_name.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Runs a SQL statement and returns its result set as a frame with a
    /// positional index.
    ///
    /// Engine errors (syntax, unknown tables or columns, constraint
    /// violations) are returned unchanged as [`TableError::Engine`].
    #[instrument(skip_all)]
    pub fn query(&self, query_text: &str) -> Result<DataFrame, TableError> {
        if query_text.trim().is_empty() {
            return Err(TableError::InvalidInput(
                "query text must be a non-empty SQL string".into(),
            ));
        }

        debug!(sql = %query_text, "Running query");
        let mut stmt = self.conn.prepare(query_text)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(width);
            for i in 0..width {
                cells.push(sql_to_json(row.get_ref(i)?));
            }
            out.push(cells);
        }

        debug!("Query returned {} rows", out.len());
        DataFrame::new(columns, out)
    }

    /// Lists user table names (SQLite's internal tables excluded), ordered by
    /// name.
    pub fn list_table_names(&self) -> Result<Vec<String>, TableError> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Checks whether a table exists. Table names are case-insensitive, as
    /// in SQLite.
    pub fn has_table(&self, name: &str) -> Result<bool, TableError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1 COLLATE NOCASE",
            rusqlite::params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Describes the columns of an existing table.
    ///
    /// Returns [`TableError::TableNotFound`] if the table does not exist.
    pub fn table_columns(&self, name: &str) -> Result<Vec<ColumnDef>, TableError> {
        if !self.has_table(name)? {
            return Err(TableError::TableNotFound(name.to_string()));
        }

        let mut stmt = self
            .conn
            .prepare("SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1)")?;
        let columns = stmt
            .query_map(rusqlite::params![name], |row| {
                let declared: String = row.get(1)?;
                let not_null: bool = row.get(2)?;
                let pk: i64 = row.get(3)?;
                Ok(ColumnDef {
                    name: row.get(0)?,
                    col_type: ColumnType::from_declared(&declared),
                    nullable: !not_null,
                    primary_key: pk > 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn ensure_creatable(&self, table_name: &str) -> Result<(), TableError> {
        if table_name.trim().is_empty() {
            return Err(TableError::InvalidInput("table name must not be empty".into()));
        }
        if table_name
            .get(..RESERVED_PREFIX.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(RESERVED_PREFIX))
        {
            return Err(TableError::InvalidInput(format!(
                "table names starting with '{}' are reserved by SQLite",
                RESERVED_PREFIX
            )));
        }

        // Tables, views and indexes share one name space.
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view', 'index') AND name=?1 COLLATE NOCASE",
            rusqlite::params![table_name],
            |row| row.get(0),
        )?;
        if count > 0 {
            return Err(TableError::DuplicateTableName(table_name.to_string()));
        }
        Ok(())
    }

    /// Column name for a stored index. A named index that collides with a
    /// data column is rejected; the default label falls back to `level_0`.
    fn index_label(&self, frame: &DataFrame) -> Result<String, TableError> {
        match &frame.index_name {
            Some(name) if has_column(frame, name) => Err(TableError::InvalidInput(
                format!("index name '{}' collides with a column of the same name", name),
            )),
            Some(name) => Ok(name.clone()),
            None if has_column(frame, &self.config.index_label) => {
                Ok(FALLBACK_INDEX_LABEL.to_string())
            }
            None => Ok(self.config.index_label.clone()),
        }
    }

    /// Creates the table and inserts every row inside one transaction, so a
    /// failure leaves no table behind.
    fn write_frame(
        &self,
        table_name: &str,
        frame: &DataFrame,
        include_row_index: bool,
    ) -> Result<(), TableError> {
        let mut col_defs: Vec<String> = Vec::with_capacity(frame.columns.len() + 1);
        if include_row_index {
            let label = self.index_label(frame)?;
            let col_type = ColumnType::infer(&frame.index);
            col_defs.push(format!("{} {}", quote_ident(&label), col_type.to_sqlite_type()));
        }
        for (i, name) in frame.columns.iter().enumerate() {
            let col_type = ColumnType::infer(frame.rows.iter().map(|row| &row[i]));
            col_defs.push(format!("{} {}", quote_ident(name), col_type.to_sqlite_type()));
        }

        let create_sql = format!(
            "CREATE TABLE {} ({})",
            quote_ident(table_name),
            col_defs.join(", ")
        );
        let placeholders: Vec<String> = (1..=col_defs.len()).map(|i| format!("?{}", i)).collect();
        let insert_sql = format!(
            "INSERT INTO {} VALUES ({})",
            quote_ident(table_name),
            placeholders.join(", ")
        );
        debug!("CREATE TABLE SQL: {}", create_sql);

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(&create_sql, [])?;
        {
            let mut stmt = tx.prepare(&insert_sql)?;
            for (label, row) in frame.index.iter().zip(&frame.rows) {
                let mut values = Vec::with_capacity(col_defs.len());
                if include_row_index {
                    values.push(json_to_sql(label)?);
                }
                for cell in row {
                    values.push(json_to_sql(cell)?);
                }
                stmt.execute(params_from_iter(values))?;
            }
        }
        tx.commit()?;

        debug!("Inserted {} rows into {}", frame.len(), table_name);
        Ok(())
    }
}

/// Whether the frame has a column SQLite would consider the same as `name`.
fn has_column(frame: &DataFrame, name: &str) -> bool {
    frame.columns.iter().any(|c| c.eq_ignore_ascii_case(name))
}

/// Quotes an identifier for use in generated SQL.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Converts a JSON cell into an owned SQLite value. Booleans are stored as
/// 0/1; nested arrays and objects are stored as JSON text.
fn json_to_sql(val: &Value) -> Result<SqlValue, TableError> {
    Ok(match val {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(*b as i64),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(serde_json::to_string(val)?),
    })
}

/// Converts a SQLite value into a JSON cell. Non-finite reals become null
/// and blobs become arrays of bytes.
fn sql_to_json(val: ValueRef<'_>) -> Value {
    match val {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::from(n),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Array(b.iter().map(|&byte| Value::from(byte)).collect()),
    }
}
