use polars::prelude::*;

use crate::error::{PipelineError, Result};

pub const TIMESTAMP: &str = "timestamp";
pub const VALUE: &str = "value";
pub const VALUE_SCALED: &str = "value_scaled";
pub const ANOMALY: &str = "anomaly";

/// Chronologically ordered sensor readings backed by a polars DataFrame.
///
/// Columns are `timestamp` (naive `Datetime[μs]`), `value`, `value_scaled` and, once a
/// detector has run, `anomaly` (`i32`, 1 = flagged).
#[derive(Debug, Clone)]
pub struct TimeSeriesTable {
    df: DataFrame,
}

impl TimeSeriesTable {
    pub(crate) fn from_columns(
        timestamps: Vec<i64>,
        values: Vec<f64>,
        scaled: Vec<f64>,
        anomaly: Option<Vec<i32>>,
    ) -> Result<Self> {
        let rows = timestamps.len();
        if values.len() != rows || scaled.len() != rows {
            return Err(PipelineError::DegenerateInput(format!(
                "column length mismatch: {rows} timestamps, {} values, {} scaled values",
                values.len(),
                scaled.len()
            )));
        }

        let ts_series = Series::new(TIMESTAMP.into(), timestamps)
            .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;

        let mut cols: Vec<Column> = vec![
            ts_series.into(),
            Series::new(VALUE.into(), values).into(),
            Series::new(VALUE_SCALED.into(), scaled).into(),
        ];

        if let Some(labels) = anomaly {
            if labels.len() != rows {
                return Err(PipelineError::DegenerateInput(format!(
                    "{} anomaly labels for {rows} rows",
                    labels.len()
                )));
            }
            cols.push(Series::new(ANOMALY.into(), labels).into());
        }

        Ok(Self {
            df: DataFrame::new(cols)?,
        })
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn into_dataframe(self) -> DataFrame {
        self.df
    }

    pub fn has_anomaly_labels(&self) -> bool {
        self.df.column(ANOMALY).is_ok()
    }

    /// Timestamps as microseconds since the epoch.
    pub fn timestamps(&self) -> Result<Vec<i64>> {
        let physical = self
            .df
            .column(TIMESTAMP)
            .map_err(|_| PipelineError::MissingColumn(TIMESTAMP))?
            .cast(&DataType::Int64)?;
        physical
            .i64()?
            .into_iter()
            .enumerate()
            .map(|(row, ts)| {
                ts.ok_or(PipelineError::NonFiniteFeature {
                    column: TIMESTAMP,
                    row,
                })
            })
            .collect()
    }

    pub fn values(&self) -> Result<Vec<f64>> {
        self.finite_f64(VALUE)
    }

    /// The model feature; every entry is guaranteed finite.
    pub fn scaled_values(&self) -> Result<Vec<f64>> {
        self.finite_f64(VALUE_SCALED)
    }

    pub fn anomaly_labels(&self) -> Result<Vec<i32>> {
        let column = self
            .df
            .column(ANOMALY)
            .map_err(|_| PipelineError::MissingColumn(ANOMALY))?;
        column
            .i32()?
            .into_iter()
            .enumerate()
            .map(|(row, label)| {
                label.ok_or(PipelineError::NonFiniteFeature {
                    column: ANOMALY,
                    row,
                })
            })
            .collect()
    }

    /// Returns a copy of the table carrying `labels` as its `anomaly` column, replacing any
    /// labels from an earlier run.
    pub fn with_anomaly_labels(&self, labels: Vec<i32>) -> Result<Self> {
        if labels.len() != self.height() {
            return Err(PipelineError::DegenerateInput(format!(
                "{} anomaly labels for {} rows",
                labels.len(),
                self.height()
            )));
        }
        let mut df = self.df.clone();
        df.with_column(Series::new(ANOMALY.into(), labels))?;
        Ok(Self { df })
    }

    fn finite_f64(&self, name: &'static str) -> Result<Vec<f64>> {
        let column = self
            .df
            .column(name)
            .map_err(|_| PipelineError::MissingColumn(name))?;
        column
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| match value {
                Some(v) if v.is_finite() => Ok(v),
                _ => Err(PipelineError::NonFiniteFeature { column: name, row }),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TimeSeriesTable {
        TimeSeriesTable::from_columns(
            vec![0, 60_000_000, 120_000_000],
            vec![1.0, 2.0, 3.0],
            vec![-1.0, 0.0, 1.0],
            None,
        )
        .expect("build table")
    }

    #[test]
    fn builds_expected_schema() {
        let table = sample();
        assert_eq!(
            table.dataframe().get_column_names_str(),
            [TIMESTAMP, VALUE, VALUE_SCALED]
        );
        assert!(matches!(
            table.dataframe().column(TIMESTAMP).unwrap().dtype(),
            DataType::Datetime(TimeUnit::Microseconds, None)
        ));
        assert!(!table.has_anomaly_labels());
        assert_eq!(table.timestamps().unwrap(), vec![0, 60_000_000, 120_000_000]);
    }

    #[test]
    fn attaching_labels_replaces_previous_run() {
        let labeled = sample().with_anomaly_labels(vec![0, 0, 1]).unwrap();
        assert_eq!(labeled.anomaly_labels().unwrap(), vec![0, 0, 1]);

        let relabeled = labeled.with_anomaly_labels(vec![1, 0, 0]).unwrap();
        assert_eq!(relabeled.anomaly_labels().unwrap(), vec![1, 0, 0]);
        assert_eq!(relabeled.dataframe().width(), 4);
    }

    #[test]
    fn rejects_label_length_mismatch() {
        let err = sample().with_anomaly_labels(vec![0]).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateInput(_)));
    }

    #[test]
    fn missing_labels_are_reported_by_name() {
        let err = sample().anomaly_labels().unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(ANOMALY)));
    }
}
