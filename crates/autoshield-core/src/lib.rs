pub mod config;
pub mod error;
pub mod outputs;
pub mod preprocessing;
pub mod scoring;
pub mod summary;
pub mod table;

pub use config::AppConfig;
pub use error::{PipelineError, Result};
pub use outputs::{
    read_labeled_csv, read_processed_csv, write_anomalous_rows, write_labeled_csv, write_table_csv,
};
pub use preprocessing::{
    load_and_process, load_and_process_detected, load_and_process_with, ColumnMode,
};
pub use scoring::{
    detect_anomalies, detect_anomalies_lof, fit_isolation_forest, score, Contamination, Detector,
    FittedIsolationForest,
};
pub use summary::{anomalous_rows, summarize, AnomalySummary};
pub use table::TimeSeriesTable;
