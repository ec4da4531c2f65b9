use crate::errors::{ColumnAttempt, ParserError};
use crate::model::{
    ColumnBinding, ColumnRole, NumericColumn, ParsedSeries, RawColumn, TimestampColumn,
};
use crate::registry::SeriesLayout;

use super::{parse_finite_f64, parse_timestamp_micros, read_columns, reader_builder};

/// Arbitrary columns; the timestamp is the first column that parses completely as date/times
/// and the value is the first remaining column that parses completely as numbers.
pub struct DetectedLayout;

impl Default for DetectedLayout {
    fn default() -> Self {
        Self
    }
}

impl DetectedLayout {
    const NAME: &'static str = "DETECTED";
}

impl SeriesLayout for DetectedLayout {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(&self, content: &str) -> Result<ParsedSeries, ParserError> {
        let columns = read_columns(Self::NAME, &reader_builder(), content)?;
        let row_count = columns
            .first()
            .map(|column| column.cells.len())
            .unwrap_or(0);
        if row_count == 0 {
            return Err(ParserError::EmptyData { layout: Self::NAME });
        }

        let (timestamp_index, timestamp) = detect_timestamp(&columns)?;
        let value = detect_value(&columns, timestamp_index)?;

        Ok(ParsedSeries {
            layout: Self::NAME,
            binding: ColumnBinding::new(timestamp.name, value.name),
            timestamps: timestamp.micros,
            values: value.values,
        })
    }
}

/// Returns the column as timestamps if every cell parses and there is at least one cell.
pub fn try_as_timestamp_column(column: &RawColumn) -> Option<TimestampColumn> {
    check_timestamp_column(column).ok()
}

/// Returns the column as numbers if every cell is a finite number and there is at least one cell.
pub fn try_as_numeric_column(column: &RawColumn) -> Option<NumericColumn> {
    check_numeric_column(column).ok()
}

fn detect_timestamp(columns: &[RawColumn]) -> Result<(usize, TimestampColumn), ParserError> {
    let mut attempts = Vec::new();
    for (index, column) in columns.iter().enumerate() {
        match check_timestamp_column(column) {
            Ok(parsed) => return Ok((index, parsed)),
            Err(reason) => attempts.push(ColumnAttempt::new(&column.name, reason)),
        }
    }
    Err(ParserError::ColumnDetection {
        role: ColumnRole::Timestamp,
        attempts,
    })
}

fn detect_value(columns: &[RawColumn], skip: usize) -> Result<NumericColumn, ParserError> {
    let mut attempts = Vec::new();
    for (index, column) in columns.iter().enumerate() {
        if index == skip {
            continue;
        }
        match check_numeric_column(column) {
            Ok(parsed) => return Ok(parsed),
            Err(reason) => attempts.push(ColumnAttempt::new(&column.name, reason)),
        }
    }
    Err(ParserError::ColumnDetection {
        role: ColumnRole::Value,
        attempts,
    })
}

fn check_timestamp_column(column: &RawColumn) -> Result<TimestampColumn, String> {
    if column.cells.is_empty() {
        return Err("column has no values".to_string());
    }
    let micros = column
        .cells
        .iter()
        .zip(column.lines.iter())
        .map(|(cell, line)| {
            parse_timestamp_micros(cell)
                .ok_or_else(|| format!("line {line}: '{}' is not a timestamp", cell.trim()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TimestampColumn {
        name: column.name.clone(),
        micros,
    })
}

fn check_numeric_column(column: &RawColumn) -> Result<NumericColumn, String> {
    if column.cells.is_empty() {
        return Err("column has no values".to_string());
    }
    let values = column
        .cells
        .iter()
        .zip(column.lines.iter())
        .map(|(cell, line)| {
            parse_finite_f64(cell)
                .ok_or_else(|| format!("line {line}: '{}' is not a finite number", cell.trim()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(NumericColumn {
        name: column.name.clone(),
        values,
    })
}
