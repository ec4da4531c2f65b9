use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnRole {
    Timestamp,
    Value,
}

impl ColumnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnRole::Timestamp => "timestamp",
            ColumnRole::Value => "value",
        }
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source header names that were bound to the timestamp and value roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnBinding {
    pub timestamp: String,
    pub value: String,
}

impl ColumnBinding {
    pub fn new(timestamp: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            value: value.into(),
        }
    }
}

/// One raw CSV column: its header and every cell in file order.
#[derive(Debug, Clone)]
pub struct RawColumn {
    pub name: String,
    pub cells: Vec<String>,
    /// 1-based file line where each cell's record starts.
    pub lines: Vec<usize>,
}

/// A column that parsed completely as timestamps (microseconds since the epoch).
#[derive(Debug, Clone)]
pub struct TimestampColumn {
    pub name: String,
    pub micros: Vec<i64>,
}

/// A column that parsed completely as finite numbers.
#[derive(Debug, Clone)]
pub struct NumericColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// Timestamp/value pairs in file order, before any sorting or scaling.
#[derive(Debug, Clone)]
pub struct ParsedSeries {
    pub layout: &'static str,
    pub binding: ColumnBinding,
    pub timestamps: Vec<i64>,
    pub values: Vec<f64>,
}

impl ParsedSeries {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}
