use std::fs::{self, File};
use std::path::Path;

use autoshield_parser::{
    parse_finite_f64, parse_timestamp_micros, record_start_line, ParserError,
};
use csv::{ReaderBuilder, StringRecord, Trim};
use polars::prelude::*;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::preprocessing::stable_order;
use crate::summary::anomalous_rows;
use crate::table::{TimeSeriesTable, ANOMALY, TIMESTAMP, VALUE, VALUE_SCALED};

/// Timestamp rendering for every CSV this crate writes.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const LABELED_LAYOUT: &str = "LABELED";
const PROCESSED_LAYOUT: &str = "PROCESSED";

/// Writes `df` as a headed CSV, creating missing parent directories.
pub fn write_table_csv(df: &DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(path)?;
    let mut frame = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_datetime_format(Some(DATETIME_FORMAT.to_string()))
        .finish(&mut frame)?;
    Ok(())
}

/// Persists a scored table; the `anomaly` column must be present.
pub fn write_labeled_csv(table: &TimeSeriesTable, path: &Path) -> Result<()> {
    if !table.has_anomaly_labels() {
        return Err(PipelineError::MissingColumn(ANOMALY));
    }
    write_table_csv(table.dataframe(), path)?;
    info!(path = %path.display(), rows = table.height(), "Labeled data saved");
    Ok(())
}

/// Exports only the flagged rows (timestamp, value, value_scaled). Returns the row count.
pub fn write_anomalous_rows(table: &TimeSeriesTable, path: &Path) -> Result<usize> {
    let rows = anomalous_rows(table)?;
    write_table_csv(&rows, path)?;
    info!(path = %path.display(), rows = rows.height(), "Anomalous rows exported");
    Ok(rows.height())
}

/// Loads a table previously written by [`write_labeled_csv`].
pub fn read_labeled_csv(path: impl AsRef<Path>) -> Result<TimeSeriesTable> {
    let content = fs::read_to_string(path.as_ref())?;
    parse_labeled_csv(&content)
}

/// Loads a preprocessed table (`timestamp,value,value_scaled`) ready for scoring. Any
/// `anomaly` column from an earlier run is dropped.
pub fn read_processed_csv(path: impl AsRef<Path>) -> Result<TimeSeriesTable> {
    let content = fs::read_to_string(path.as_ref())?;
    parse_persisted_csv(&content, PROCESSED_LAYOUT, false)
}

/// Parses labeled CSV text. Columns are located by header name, so extra columns are
/// ignored; rows are re-sorted by timestamp.
pub fn parse_labeled_csv(content: &str) -> Result<TimeSeriesTable> {
    parse_persisted_csv(content, LABELED_LAYOUT, true)
}

fn parse_persisted_csv(
    content: &str,
    layout: &'static str,
    with_labels: bool,
) -> Result<TimeSeriesTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|source| ParserError::Csv { layout, source })?
        .clone();
    let ts_idx = header_index(&headers, layout, TIMESTAMP)?;
    let value_idx = header_index(&headers, layout, VALUE)?;
    let scaled_idx = header_index(&headers, layout, VALUE_SCALED)?;
    let anomaly_idx = if with_labels {
        Some(header_index(&headers, layout, ANOMALY)?)
    } else {
        None
    };

    let mut timestamps = Vec::new();
    let mut values = Vec::new();
    let mut scaled = Vec::new();
    let mut labels = Vec::new();

    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|source| ParserError::Csv { layout, source })?;
        let line_index = record
            .position()
            .map(|pos| record_start_line(content, pos))
            .unwrap_or(row + 2);
        let cell = |idx: usize| record.get(idx).unwrap_or("");
        let invalid = |column: &str, idx: usize| row_error(layout, line_index, column, cell(idx));

        let ts = parse_timestamp_micros(cell(ts_idx)).ok_or_else(|| invalid(TIMESTAMP, ts_idx))?;
        let value = parse_finite_f64(cell(value_idx)).ok_or_else(|| invalid(VALUE, value_idx))?;
        let value_scaled =
            parse_finite_f64(cell(scaled_idx)).ok_or_else(|| invalid(VALUE_SCALED, scaled_idx))?;
        if let Some(idx) = anomaly_idx {
            let label = match cell(idx) {
                "0" => 0,
                "1" => 1,
                _ => return Err(invalid(ANOMALY, idx)),
            };
            labels.push(label);
        }

        timestamps.push(ts);
        values.push(value);
        scaled.push(value_scaled);
    }

    if timestamps.is_empty() {
        return Err(ParserError::EmptyData { layout }.into());
    }

    let order = stable_order(&timestamps);
    let pick_i64 = |src: &[i64]| order.iter().map(|&i| src[i]).collect::<Vec<_>>();
    let pick_f64 = |src: &[f64]| order.iter().map(|&i| src[i]).collect::<Vec<_>>();
    let pick_i32 = |src: &[i32]| order.iter().map(|&i| src[i]).collect::<Vec<_>>();

    TimeSeriesTable::from_columns(
        pick_i64(&timestamps),
        pick_f64(&values),
        pick_f64(&scaled),
        with_labels.then(|| pick_i32(&labels)),
    )
}

fn header_index(headers: &StringRecord, layout: &'static str, name: &str) -> Result<usize> {
    headers.iter().position(|h| h == name).ok_or_else(|| {
        ParserError::InvalidHeader {
            layout,
            message: format!("missing '{name}' column"),
        }
        .into()
    })
}

fn row_error(layout: &'static str, line_index: usize, column: &str, cell: &str) -> PipelineError {
    ParserError::DataRow {
        layout,
        line_index,
        message: format!("invalid {column} '{cell}'"),
    }
    .into()
}
