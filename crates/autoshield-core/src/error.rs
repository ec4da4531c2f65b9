// crates/autoshield-core/src/error.rs

use autoshield_parser::ParserError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to parse input: {0}")]
    Parser(#[from] ParserError),

    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    #[error("Contamination must be in (0, 0.5], got {0}")]
    InvalidContamination(f64),

    #[error("{detector} needs at least {required} rows, got {found}")]
    InsufficientRows {
        detector: &'static str,
        required: usize,
        found: usize,
    },

    #[error("Column '{0}' is missing from the table")]
    MissingColumn(&'static str),

    #[error("Column '{column}' holds a missing or non-finite value at row {row}")]
    NonFiniteFeature { column: &'static str, row: usize },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
