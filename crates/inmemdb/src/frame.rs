use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TableError;

/// An in-memory table: named columns, a row index, and row-major cells.
///
/// This is the currency exchanged with [`TableStore`](crate::TableStore):
/// tables are created from frames and queries return frames. Cells are plain
/// [`serde_json::Value`]s so any JSON-shaped data can be loaded without a
/// separate schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFrame {
    /// Column labels, in order.
    pub columns: Vec<String>,
    /// One label per row.
    pub index: Vec<Value>,
    /// Name of the index, used as its column name when the index is stored.
    #[serde(default)]
    pub index_name: Option<String>,
    /// Row-major cells; every row has exactly `columns.len()` cells.
    pub rows: Vec<Vec<Value>>,
}

impl DataFrame {
    /// Builds a frame from column labels and rows, with a positional index.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, TableError> {
        let frame = Self {
            columns,
            index: positional_index(rows.len()),
            index_name: None,
            rows,
        };
        frame.check_shape()?;
        Ok(frame)
    }

    /// Builds a frame from a slice of JSON objects, one per row.
    ///
    /// Columns are the union of the record keys in first-seen order; keys a
    /// record lacks become nulls.
    pub fn from_records(records: &[Value]) -> Result<Self, TableError> {
        Self::from_items(records, None)
    }

    /// Normalizes a generic JSON sequence or mapping into a frame.
    ///
    /// Accepted shapes:
    /// - `{"col": [..], ..}` column arrays of equal length; scalars broadcast.
    /// - `{"col": {"label": v, ..}, ..}` columns keyed by row label.
    /// - `[{"col": v, ..}, ..]` records.
    /// - `[[v, ..], ..]` rows; short rows are padded with nulls.
    /// - `[v, ..]` a single column labelled `0`.
    ///
    /// `columns` selects (mappings, records) or names (rows) the columns and
    /// `row_index` replaces the positional index. Both default to positional
    /// integer labels.
    pub fn from_sequence(
        data: &Value,
        columns: Option<&[String]>,
        row_index: Option<&[Value]>,
    ) -> Result<Self, TableError> {
        match data {
            Value::Object(map) => Self::from_column_map(map, columns, row_index),
            Value::Array(items) => {
                let frame = Self::from_items(items, columns)?;
                match row_index {
                    Some(index) => frame.with_index(index.to_vec()),
                    None => Ok(frame),
                }
            }
            other => Err(TableError::InvalidInput(format!(
                "cannot build a table from a {} value",
                kind_name(other)
            ))),
        }
    }

    /// Replaces the row index. The new index must have one label per row.
    pub fn with_index(mut self, index: Vec<Value>) -> Result<Self, TableError> {
        if index.len() != self.rows.len() {
            return Err(TableError::InvalidInput(format!(
                "length of index ({}) does not match number of rows ({})",
                index.len(),
                self.rows.len()
            )));
        }
        self.index = index;
        Ok(self)
    }

    /// Names the index.
    pub fn with_index_name(mut self, name: impl Into<String>) -> Self {
        self.index_name = Some(name.into());
        self
    }

    /// Checks that the frame can be stored as a table: at least one column,
    /// unique non-empty column labels, and a consistent row shape. Labels
    /// are compared case-insensitively, as SQLite compares column names.
    pub fn validate(&self) -> Result<(), TableError> {
        if self.columns.is_empty() {
            return Err(TableError::InvalidInput(
                "a table must have at least one column".into(),
            ));
        }
        let mut seen = HashSet::new();
        for col in &self.columns {
            if col.is_empty() {
                return Err(TableError::InvalidInput("column names must not be empty".into()));
            }
            if !seen.insert(col.to_ascii_lowercase()) {
                return Err(TableError::InvalidInput(format!("duplicate column name: {}", col)));
            }
        }
        self.check_shape()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the named column.
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All cells of the named column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let pos = self.column_position(name)?;
        Some(self.rows.iter().map(|row| &row[pos]).collect())
    }

    /// The cell at `row` in the named column.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let pos = self.column_position(column)?;
        self.rows.get(row).and_then(|r| r.get(pos))
    }

    /// Converts each row into a JSON object keyed by column label.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let obj: Map<String, Value> = self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect();
                Value::Object(obj)
            })
            .collect()
    }

    fn check_shape(&self) -> Result<(), TableError> {
        if self.index.len() != self.rows.len() {
            return Err(TableError::InvalidInput(format!(
                "length of index ({}) does not match number of rows ({})",
                self.index.len(),
                self.rows.len()
            )));
        }
        let width = self.columns.len();
        if let Some((i, row)) = self.rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(TableError::InvalidInput(format!(
                "row {} has {} cells but the frame has {} columns",
                i,
                row.len(),
                width
            )));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Sequence conversion
    // -----------------------------------------------------------------------

    fn from_items(items: &[Value], columns: Option<&[String]>) -> Result<Self, TableError> {
        if items.is_empty() {
            let columns = columns.map(<[String]>::to_vec).unwrap_or_default();
            return Self::new(columns, Vec::new());
        }

        if items.iter().all(Value::is_object) {
            let labels = match columns {
                Some(cols) => cols.to_vec(),
                None => {
                    let mut labels: Vec<String> = Vec::new();
                    for item in items {
                        if let Value::Object(obj) = item {
                            for key in obj.keys() {
                                if !labels.contains(key) {
                                    labels.push(key.clone());
                                }
                            }
                        }
                    }
                    labels
                }
            };
            let rows: Vec<Vec<Value>> = items
                .iter()
                .map(|item| {
                    labels
                        .iter()
                        .map(|label| item.get(label).cloned().unwrap_or(Value::Null))
                        .collect()
                })
                .collect();
            return Self::new(labels, rows);
        }

        if items.iter().all(Value::is_array) {
            let width = items
                .iter()
                .filter_map(Value::as_array)
                .map(Vec::len)
                .max()
                .unwrap_or(0);
            let labels = match columns {
                Some(cols) if cols.len() != width => {
                    return Err(TableError::InvalidInput(format!(
                        "{} columns passed, passed data had {} columns",
                        cols.len(),
                        width
                    )));
                }
                Some(cols) => cols.to_vec(),
                None => positional_labels(width),
            };
            let rows: Vec<Vec<Value>> = items
                .iter()
                .filter_map(Value::as_array)
                .map(|cells| {
                    let mut row = cells.clone();
                    row.resize(width, Value::Null);
                    row
                })
                .collect();
            return Self::new(labels, rows);
        }

        if items.iter().any(|v| v.is_array() || v.is_object()) {
            return Err(TableError::InvalidInput(
                "sequence mixes rows of different kinds".into(),
            ));
        }

        let labels = match columns {
            Some(cols) if cols.len() != 1 => {
                return Err(TableError::InvalidInput(format!(
                    "{} columns passed, passed data had 1 columns",
                    cols.len()
                )));
            }
            Some(cols) => cols.to_vec(),
            None => positional_labels(1),
        };
        let rows: Vec<Vec<Value>> = items.iter().map(|v| vec![v.clone()]).collect();
        Self::new(labels, rows)
    }

    fn from_column_map(
        map: &Map<String, Value>,
        columns: Option<&[String]>,
        row_index: Option<&[Value]>,
    ) -> Result<Self, TableError> {
        let has_arrays = map.values().any(Value::is_array);
        let has_objects = map.values().any(Value::is_object);
        if has_arrays && has_objects {
            return Err(TableError::InvalidInput(
                "mapping mixes column arrays and labelled columns".into(),
            ));
        }

        let index: Vec<Value> = if has_objects {
            match row_index {
                Some(index) => index.to_vec(),
                None => {
                    let mut labels: Vec<String> = Vec::new();
                    for inner in map.values().filter_map(Value::as_object) {
                        for key in inner.keys() {
                            if !labels.contains(key) {
                                labels.push(key.clone());
                            }
                        }
                    }
                    labels.into_iter().map(Value::String).collect()
                }
            }
        } else if has_arrays {
            let mut lengths = map.values().filter_map(Value::as_array).map(Vec::len);
            let n = lengths.next().unwrap_or(0);
            if lengths.any(|len| len != n) {
                return Err(TableError::InvalidInput(
                    "all arrays must be of the same length".into(),
                ));
            }
            match row_index {
                Some(index) if index.len() != n => {
                    return Err(TableError::InvalidInput(format!(
                        "length of values ({}) does not match length of index ({})",
                        n,
                        index.len()
                    )));
                }
                Some(index) => index.to_vec(),
                None => positional_index(n),
            }
        } else {
            match row_index {
                Some(index) => index.to_vec(),
                None if map.is_empty() => Vec::new(),
                None => {
                    return Err(TableError::InvalidInput(
                        "if using all scalar values, you must pass an index".into(),
                    ));
                }
            }
        };

        let labels: Vec<String> = match columns {
            Some(cols) => cols.to_vec(),
            None => map.keys().cloned().collect(),
        };

        let n = index.len();
        let mut column_cells: Vec<Vec<Value>> = Vec::with_capacity(labels.len());
        for label in &labels {
            let cells = match map.get(label) {
                None => vec![Value::Null; n],
                Some(Value::Array(values)) => values.clone(),
                Some(Value::Object(by_label)) => index
                    .iter()
                    .map(|row_label| {
                        by_label
                            .get(&label_key(row_label))
                            .cloned()
                            .unwrap_or(Value::Null)
                    })
                    .collect(),
                Some(scalar) => vec![scalar.clone(); n],
            };
            column_cells.push(cells);
        }

        let rows: Vec<Vec<Value>> = (0..n)
            .map(|i| column_cells.iter().map(|cells| cells[i].clone()).collect())
            .collect();

        Ok(Self {
            columns: labels,
            index,
            index_name: None,
            rows,
        })
    }
}

fn positional_index(n: usize) -> Vec<Value> {
    (0..n).map(|i| Value::from(i as u64)).collect()
}

fn positional_labels(n: usize) -> Vec<String> {
    (0..n).map(|i| i.to_string()).collect()
}

/// Key used to look a row label up in a JSON object.
fn label_key(label: &Value) -> String {
    match label {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
