// crates/autoshield-core/src/scoring/mod.rs

mod isolation_forest;
mod lof;
mod threshold;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::table::TimeSeriesTable;

pub use isolation_forest::{
    FittedIsolationForest, IsolationForestConfig, DEFAULT_MAX_SAMPLES, DEFAULT_SEED,
    DEFAULT_TREES,
};
pub use lof::{LocalOutlierFactor, LofOutcome, DEFAULT_NEIGHBORS};

pub const DEFAULT_CONTAMINATION: f64 = 0.01;

/// Expected share of outliers, in `(0, 0.5]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Contamination(f64);

impl Contamination {
    pub fn new(value: f64) -> Result<Self> {
        if value.is_finite() && value > 0.0 && value <= 0.5 {
            Ok(Self(value))
        } else {
            Err(PipelineError::InvalidContamination(value))
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }

    pub(crate) fn as_percent(self) -> f64 {
        self.0 * 100.0
    }
}

impl Default for Contamination {
    fn default() -> Self {
        Self(DEFAULT_CONTAMINATION)
    }
}

impl TryFrom<f64> for Contamination {
    type Error = PipelineError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Contamination> for f64 {
    fn from(value: Contamination) -> Self {
        value.0
    }
}

impl fmt::Display for Contamination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Detector {
    #[default]
    IsolationForest,
    #[serde(alias = "lof")]
    LocalOutlierFactor,
}

impl Detector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Detector::IsolationForest => "isolation-forest",
            Detector::LocalOutlierFactor => "lof",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Detector::IsolationForest => "Isolation Forest",
            Detector::LocalOutlierFactor => "Local Outlier Factor",
        }
    }
}

impl fmt::Display for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Detector {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "isolation-forest" | "isolation_forest" | "iforest" => Ok(Detector::IsolationForest),
            "lof" | "local-outlier-factor" | "local_outlier_factor" => {
                Ok(Detector::LocalOutlierFactor)
            }
            other => Err(format!(
                "unknown detector '{other}' (expected isolation-forest or lof)"
            )),
        }
    }
}

/// Labels every row of `table` with the chosen detector, returning a new table with an
/// `anomaly` column (1 = outlier, 0 = normal).
pub fn score(
    table: &TimeSeriesTable,
    detector: Detector,
    contamination: Contamination,
) -> Result<TimeSeriesTable> {
    let feature = table.scaled_values()?;
    let labels = match detector {
        Detector::IsolationForest => IsolationForestConfig::default()
            .fit(&feature, contamination)?
            .predict(&feature),
        Detector::LocalOutlierFactor => {
            LocalOutlierFactor::default()
                .fit_predict(&feature, contamination)?
                .labels
        }
    };

    debug!(
        detector = detector.as_str(),
        contamination = contamination.get(),
        rows = labels.len(),
        flagged = labels.iter().filter(|&&label| label == 1).count(),
        "Scored series"
    );

    table.with_anomaly_labels(labels)
}

/// Isolation Forest labelling of `value_scaled` (100 trees, seed 42).
pub fn detect_anomalies(table: &TimeSeriesTable, contamination: f64) -> Result<TimeSeriesTable> {
    score(
        table,
        Detector::IsolationForest,
        Contamination::new(contamination)?,
    )
}

/// Local Outlier Factor labelling of `value_scaled` (20 neighbours).
pub fn detect_anomalies_lof(
    table: &TimeSeriesTable,
    contamination: f64,
) -> Result<TimeSeriesTable> {
    score(
        table,
        Detector::LocalOutlierFactor,
        Contamination::new(contamination)?,
    )
}

/// Fits the same forest [`detect_anomalies`] uses and hands it back for scoring other points.
pub fn fit_isolation_forest(
    table: &TimeSeriesTable,
    contamination: f64,
) -> Result<FittedIsolationForest> {
    let feature = table.scaled_values()?;
    IsolationForestConfig::default().fit(&feature, Contamination::new(contamination)?)
}
