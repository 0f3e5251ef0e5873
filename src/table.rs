//! The tabular value model shared by ingestion, the rule engine and export.

use std::fmt::Display;

use rusqlite::{
    ToSql,
    types::{ToSqlOutput, Value as SqlValue, ValueRef},
};

use crate::csv_import::ColumnType;

/// A single cell in an uploaded table or a rule result.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A missing value.
    Null,
    /// A whole number.
    Integer(i64),
    /// A floating point number.
    Real(f64),
    /// Anything that was not inferred to be numeric.
    Text(String),
}

impl Value {
    /// Returns the value as a float if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(integer) => Some(*integer as f64),
            Value::Real(real) => Some(*real),
            Value::Null | Value::Text(_) => None,
        }
    }

    /// The text written to a CSV field for this value.
    ///
    /// Nulls are written as empty fields and reals always carry a decimal
    /// point, so that parsing the field again infers the same type.
    pub fn to_csv_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Integer(integer) => integer.to_string(),
            Value::Real(real) => format_real(*real),
            Value::Text(text) => text.clone(),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Integer(integer) => write!(f, "{integer}"),
            Value::Real(real) => write!(f, "{}", format_real(*real)),
            Value::Text(text) => write!(f, "{text}"),
        }
    }
}

fn format_real(real: f64) -> String {
    let text = real.to_string();

    // f64's Display never uses exponents, so a missing '.' means a whole number.
    if text.contains('.') || !real.is_finite() {
        text
    } else {
        format!("{text}.0")
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(integer) => ToSqlOutput::Owned(SqlValue::Integer(*integer)),
            Value::Real(real) => ToSqlOutput::Owned(SqlValue::Real(*real)),
            Value::Text(text) => ToSqlOutput::Borrowed(ValueRef::Text(text.as_bytes())),
        })
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(integer) => Value::Integer(integer),
            ValueRef::Real(real) => Value::Real(real),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                Value::Text(String::from_utf8_lossy(bytes).to_string())
            }
        }
    }
}

/// An ordered set of named columns and rows of values.
///
/// Used for rule results, the data overview and exports.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    /// The column names in display order.
    pub columns: Vec<String>,
    /// The rows, each with one value per column.
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// The type each column would be stored as, derived from its values.
    ///
    /// A column holding any text is text, otherwise any real makes it real.
    /// Columns of only nulls are text.
    pub fn column_types(&self) -> Vec<ColumnType> {
        (0..self.columns.len())
            .map(|index| {
                let values = || self.rows.iter().filter_map(move |row| row.get(index));

                if values().any(|value| matches!(value, Value::Text(_))) {
                    ColumnType::Text
                } else if values().any(|value| matches!(value, Value::Real(_))) {
                    ColumnType::Real
                } else if values().any(|value| matches!(value, Value::Integer(_))) {
                    ColumnType::Integer
                } else {
                    ColumnType::Text
                }
            })
            .collect()
    }

    /// The position of the column named `name`, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Iterate over the values of the column named `name`.
    ///
    /// Yields nothing if the column does not exist.
    pub fn column_values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Value> + 'a {
        let index = self.column_index(name);

        self.rows
            .iter()
            .filter_map(move |row| index.and_then(|index| row.get(index)))
    }
}
