// crates/autoshield-core/src/preprocessing.rs

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use autoshield_parser::{parse_detected, parse_positional, parse_time_series, ParsedSeries};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::outputs::write_table_csv;
use crate::table::TimeSeriesTable;

/// How the raw CSV's columns are bound to timestamp and value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnMode {
    /// Exactly two columns, taken by position.
    #[default]
    Positional,
    /// First date-like column and first numeric column, by header order.
    Detect,
    /// Positional when the file has two columns, detection otherwise.
    Auto,
}

impl ColumnMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnMode::Positional => "positional",
            ColumnMode::Detect => "detect",
            ColumnMode::Auto => "auto",
        }
    }
}

impl fmt::Display for ColumnMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnMode {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "positional" => Ok(ColumnMode::Positional),
            "detect" => Ok(ColumnMode::Detect),
            "auto" => Ok(ColumnMode::Auto),
            other => Err(format!(
                "unknown column mode '{other}' (expected positional, detect or auto)"
            )),
        }
    }
}

/// Loads a two-column CSV, sorts it by time and adds the z-scored `value_scaled` column.
///
/// When `destination` is given the processed table is also written there as CSV.
pub fn load_and_process(
    source: impl AsRef<Path>,
    destination: Option<&Path>,
) -> Result<TimeSeriesTable> {
    load_and_process_with(source, destination, ColumnMode::Positional)
}

/// Same pipeline as [`load_and_process`] for files whose timestamp and value columns have to
/// be found among arbitrary columns.
pub fn load_and_process_detected(
    source: impl AsRef<Path>,
    destination: Option<&Path>,
) -> Result<TimeSeriesTable> {
    load_and_process_with(source, destination, ColumnMode::Detect)
}

pub fn load_and_process_with(
    source: impl AsRef<Path>,
    destination: Option<&Path>,
    mode: ColumnMode,
) -> Result<TimeSeriesTable> {
    let source = source.as_ref();
    let content = fs::read_to_string(source)?;
    let table = process_content(&content, mode)?;

    if let Some(destination) = destination {
        write_table_csv(table.dataframe(), destination)?;
        info!(
            path = %destination.display(),
            rows = table.height(),
            "Processed data saved"
        );
    }

    Ok(table)
}

pub fn process_content(content: &str, mode: ColumnMode) -> Result<TimeSeriesTable> {
    let series = match mode {
        ColumnMode::Positional => parse_positional(content)?,
        ColumnMode::Detect => parse_detected(content)?,
        ColumnMode::Auto => parse_time_series(content)?,
    };
    debug!(
        layout = series.layout,
        timestamp_column = %series.binding.timestamp,
        value_column = %series.binding.value,
        rows = series.len(),
        "Parsed raw series"
    );
    process_series(series)
}

/// Sorts the parsed rows and scales the values once over the full series.
pub fn process_series(series: ParsedSeries) -> Result<TimeSeriesTable> {
    let (timestamps, values) = sort_chronologically(&series.timestamps, &series.values);
    let scaled = z_scores(&values)?;
    TimeSeriesTable::from_columns(timestamps, values, scaled, None)
}

/// Stable ascending reorder by timestamp; rows sharing a timestamp keep their input order.
pub fn sort_chronologically(timestamps: &[i64], values: &[f64]) -> (Vec<i64>, Vec<f64>) {
    let order = stable_order(timestamps);
    let sorted_ts = order.iter().map(|&idx| timestamps[idx]).collect();
    let sorted_values = order.iter().map(|&idx| values[idx]).collect();
    (sorted_ts, sorted_values)
}

pub(crate) fn stable_order(timestamps: &[i64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..timestamps.len()).collect();
    order.sort_by_key(|&idx| timestamps[idx]);
    order
}

/// `(x - mean) / std` using the sample standard deviation (n - 1 denominator).
///
/// Constant series and series shorter than two rows are rejected instead of producing
/// non-finite scores. Values are divided by their largest magnitude first so the sums stay
/// finite for very large readings.
pub fn z_scores(values: &[f64]) -> Result<Vec<f64>> {
    if values.len() < 2 {
        return Err(PipelineError::DegenerateInput(format!(
            "need at least 2 values to compute a standard deviation, got {}",
            values.len()
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(PipelineError::DegenerateInput(
            "value column holds non-finite values".to_string(),
        ));
    }

    let magnitude = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if magnitude == 0.0 {
        return Err(zero_variance());
    }

    let n = values.len() as f64;
    let normalized: Vec<f64> = values.iter().map(|v| v / magnitude).collect();
    let mean = normalized.iter().sum::<f64>() / n;
    let variance = normalized.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();

    if std_dev == 0.0 {
        return Err(zero_variance());
    }

    Ok(normalized.iter().map(|v| (v - mean) / std_dev).collect())
}

fn zero_variance() -> PipelineError {
    PipelineError::DegenerateInput(
        "value column has zero variance; z-scores are undefined".to_string(),
    )
}
