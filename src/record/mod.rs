//! # Record Module
//!
//! One row of the session file per acquisition tick.
//!
//! A [`Schema`] is fixed when the session starts and every [`Record`] is
//! built against it, so rows always carry the same columns in the same order
//! no matter which sensors answered.

use std::fmt;
use std::sync::Arc;

pub mod sink;

pub use sink::{session_file_name, CsvSession, RecordSink};

/// Wall-clock timestamp format for the first column
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Format for the optional receiver time column
pub const GPS_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// A single cell
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// No value this tick (rendered as an empty cell, never as zero)
    Absent,
    Number(f64),
    Text(String),
}

impl Field {
    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Field::Number(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<Option<f64>> for Field {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) => Field::Number(v),
            None => Field::Absent,
        }
    }
}

impl From<String> for Field {
    fn from(value: String) -> Self {
        Field::Text(value)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Absent => Ok(()),
            // NaN and infinities are not measurements
            Field::Number(v) if !v.is_finite() => Ok(()),
            Field::Number(v) => write!(f, "{}", v),
            Field::Text(s) => f.write_str(s),
        }
    }
}

/// Ordered column names for a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<String>,
}

impl Schema {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Header line without terminator
    pub fn header(&self) -> String {
        self.columns.join(",")
    }
}

/// One row, always exactly as wide as its schema
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<Schema>,
    values: Vec<Field>,
}

impl Record {
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn values(&self) -> &[Field] {
        &self.values
    }

    /// Field by column name
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.schema.position(name).map(|i| &self.values[i])
    }

    /// Row line without terminator
    pub fn to_line(&self) -> String {
        self.values
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Accumulates fields in column order
pub struct RecordBuilder {
    schema: Arc<Schema>,
    values: Vec<Field>,
}

impl RecordBuilder {
    pub fn new(schema: Arc<Schema>) -> Self {
        let capacity = schema.len();
        Self {
            schema,
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, field: impl Into<Field>) -> &mut Self {
        self.values.push(field.into());
        self
    }

    pub fn extend<I: IntoIterator<Item = Field>>(&mut self, fields: I) -> &mut Self {
        self.values.extend(fields);
        self
    }

    /// Finish the row; missing trailing fields become absent, extras are dropped
    pub fn finish(mut self) -> Record {
        let width = self.schema.len();
        self.values.resize(width, Field::Absent);
        Record {
            schema: self.schema,
            values: self.values,
        }
    }
}
