use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{Position, ReaderBuilder, Trim};

use crate::errors::ParserError;
use crate::model::RawColumn;

static DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

static DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

pub(crate) fn reader_builder() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder.has_headers(true).trim(Trim::All);
    builder
}

/// Reads a headed CSV into columns, preserving file order for both columns and cells.
pub(crate) fn read_columns(
    layout: &'static str,
    builder: &ReaderBuilder,
    content: &str,
) -> Result<Vec<RawColumn>, ParserError> {
    let mut reader = builder.from_reader(content.as_bytes());
    let headers = reader
        .headers()
        .map_err(|source| ParserError::Csv { layout, source })?
        .clone();

    let mut columns: Vec<RawColumn> = headers
        .iter()
        .map(|name| RawColumn {
            name: name.to_string(),
            cells: Vec::new(),
            lines: Vec::new(),
        })
        .collect();

    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|source| ParserError::Csv { layout, source })?;
        let line = record
            .position()
            .map(|pos| record_start_line(content, pos))
            .unwrap_or(row + 2);
        for (column, cell) in columns.iter_mut().zip(record.iter()) {
            column.cells.push(cell.to_string());
            column.lines.push(line);
        }
    }

    Ok(columns)
}

/// File line on which a record's first field sits.
///
/// The reader stamps a record with its position before skipping any blank lines in front of
/// it, so those are counted here.
pub fn record_start_line(content: &str, position: &Position) -> usize {
    let start = usize::try_from(position.byte()).unwrap_or(usize::MAX);
    let skipped = content
        .as_bytes()
        .get(start..)
        .unwrap_or_default()
        .iter()
        .take_while(|&&byte| byte == b'\n' || byte == b'\r')
        .filter(|&&byte| byte == b'\n')
        .count();
    position.line() as usize + skipped
}

/// Parses a single timestamp cell into microseconds since the epoch.
///
/// Offset-aware RFC 3339 values are converted to UTC; everything else is taken as naive.
pub fn parse_timestamp_micros(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.and_utc().timestamp_micros());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp_micros());
        }
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.naive_utc().and_utc().timestamp_micros())
}

/// Parses a single numeric cell; empty and non-finite values are rejected.
pub fn parse_finite_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub(crate) fn parse_timestamp(
    layout: &'static str,
    value: &str,
    line_index: usize,
) -> Result<i64, ParserError> {
    parse_timestamp_micros(value).ok_or_else(|| ParserError::DataRow {
        layout,
        line_index,
        message: format!("invalid timestamp '{}'", value.trim()),
    })
}

pub(crate) fn parse_required_f64(
    layout: &'static str,
    value: &str,
    line_index: usize,
    column: &str,
) -> Result<f64, ParserError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ParserError::DataRow {
            layout,
            line_index,
            message: format!("column '{column}' is empty"),
        });
    }

    match trimmed.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => Ok(parsed),
        Ok(parsed) => Err(ParserError::DataRow {
            layout,
            line_index,
            message: format!("column '{column}' holds non-finite value {parsed}"),
        }),
        Err(err) => Err(ParserError::DataRow {
            layout,
            line_index,
            message: format!("failed to parse column '{column}' as float: {err}"),
        }),
    }
}
