use polars::prelude::*;
use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::table::{TimeSeriesTable, ANOMALY, TIMESTAMP, VALUE, VALUE_SCALED};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalySummary {
    pub total_rows: usize,
    pub anomaly_count: usize,
    /// `100 * anomaly_count / total_rows`, 0 for an empty table.
    pub anomaly_rate_percent: f64,
}

impl AnomalySummary {
    pub fn anomaly_rate_display(&self) -> String {
        format!("{:.2}%", self.anomaly_rate_percent)
    }
}

pub fn summarize(table: &TimeSeriesTable) -> Result<AnomalySummary> {
    if !table.has_anomaly_labels() {
        return Err(PipelineError::MissingColumn(ANOMALY));
    }
    let labels = table.anomaly_labels()?;
    let total_rows = labels.len();
    let anomaly_count = labels.iter().filter(|&&label| label == 1).count();
    let anomaly_rate_percent = if total_rows == 0 {
        0.0
    } else {
        anomaly_count as f64 / total_rows as f64 * 100.0
    };

    Ok(AnomalySummary {
        total_rows,
        anomaly_count,
        anomaly_rate_percent,
    })
}

/// Flagged rows in chronological order, without the label column.
pub fn anomalous_rows(table: &TimeSeriesTable) -> Result<DataFrame> {
    if !table.has_anomaly_labels() {
        return Err(PipelineError::MissingColumn(ANOMALY));
    }
    let df = table.dataframe();
    let flagged = df.column(ANOMALY)?.i32()?.equal(1);
    let rows = df.filter(&flagged)?.select([TIMESTAMP, VALUE, VALUE_SCALED])?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(labels: Vec<i32>) -> TimeSeriesTable {
        let n = labels.len();
        TimeSeriesTable::from_columns(
            (0..n as i64).map(|i| i * 60_000_000).collect(),
            (0..n).map(|i| i as f64).collect(),
            (0..n).map(|i| i as f64 / 10.0).collect(),
            Some(labels),
        )
        .unwrap()
    }

    #[test]
    fn counts_and_rate() {
        let summary = summarize(&table(vec![0, 1, 0, 0, 1, 0, 0, 0])).unwrap();
        assert_eq!(summary.total_rows, 8);
        assert_eq!(summary.anomaly_count, 2);
        assert!((summary.anomaly_rate_percent - 25.0).abs() < 1e-12);
        assert_eq!(summary.anomaly_rate_display(), "25.00%");
    }

    #[test]
    fn empty_table_has_zero_rate() {
        let summary = summarize(&table(Vec::new())).unwrap();
        assert_eq!(summary.total_rows, 0);
        assert_eq!(summary.anomaly_rate_percent, 0.0);
        assert_eq!(summary.anomaly_rate_display(), "0.00%");
    }

    #[test]
    fn unlabeled_table_cannot_be_summarized() {
        let unlabeled =
            TimeSeriesTable::from_columns(vec![0, 1], vec![1.0, 2.0], vec![0.0, 1.0], None)
                .unwrap();
        assert!(matches!(
            summarize(&unlabeled),
            Err(PipelineError::MissingColumn(ANOMALY))
        ));
    }

    #[test]
    fn anomalous_rows_drop_label_column() {
        let rows = anomalous_rows(&table(vec![0, 1, 0, 1])).unwrap();
        assert_eq!(rows.height(), 2);
        assert_eq!(rows.get_column_names_str(), [TIMESTAMP, VALUE, VALUE_SCALED]);
        let expected = df!(
            VALUE => [1.0, 3.0],
            VALUE_SCALED => [0.1, 0.3]
        )
        .unwrap();
        assert!(rows.select([VALUE, VALUE_SCALED]).unwrap().equals(&expected));
    }

    #[test]
    fn anomalous_rows_of_clean_table_is_empty() {
        let rows = anomalous_rows(&table(vec![0, 0])).unwrap();
        assert_eq!(rows.height(), 0);
        assert_eq!(rows.width(), 3);
    }

    #[test]
    fn anomalous_rows_after_scoring() {
        let mut values = vec![10.0; 100];
        values[50] = 1000.0;
        let scaled = crate::preprocessing::z_scores(&values).unwrap();
        let timestamps = (0..100).map(|i| i * 60_000_000).collect();
        let processed = TimeSeriesTable::from_columns(timestamps, values, scaled, None).unwrap();
        let labeled = crate::scoring::detect_anomalies(&processed, 0.01).unwrap();

        let rows = anomalous_rows(&labeled).unwrap();
        assert_eq!(rows.height(), summarize(&labeled).unwrap().anomaly_count);
        let flagged: Vec<f64> = rows
            .column(VALUE)
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert!(flagged.contains(&1000.0));
    }
}
