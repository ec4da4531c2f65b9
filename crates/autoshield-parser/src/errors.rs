use std::fmt;

use thiserror::Error;

use crate::model::ColumnRole;

#[derive(Debug, Clone)]
pub struct LayoutAttempt {
    pub layout: &'static str,
    pub message: String,
}

impl LayoutAttempt {
    pub fn new(layout: &'static str, message: impl Into<String>) -> Self {
        Self {
            layout,
            message: message.into(),
        }
    }
}

impl fmt::Display for LayoutAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.layout, self.message)
    }
}

/// Why a candidate column was not bound to a role during detection.
#[derive(Debug, Clone)]
pub struct ColumnAttempt {
    pub column: String,
    pub reason: String,
}

impl ColumnAttempt {
    pub fn new(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ColumnAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': {}", self.column, self.reason)
    }
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("{layout} format mismatch: {reason}")]
    FormatMismatch {
        layout: &'static str,
        reason: String,
    },

    #[error("{layout} header invalid: {message}")]
    InvalidHeader {
        layout: &'static str,
        message: String,
    },

    #[error("{layout} CSV error: {source}")]
    Csv {
        layout: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("{layout} data row {line_index} invalid: {message}")]
    DataRow {
        layout: &'static str,
        line_index: usize,
        message: String,
    },

    #[error("{layout} file did not contain any data rows")]
    EmptyData { layout: &'static str },

    #[error("no {role} column found; candidates: {}", format_attempts(.attempts))]
    ColumnDetection {
        role: ColumnRole,
        attempts: Vec<ColumnAttempt>,
    },

    #[error("no layout recognized this file; attempts: {attempts:?}")]
    NoMatchingLayout { attempts: Vec<LayoutAttempt> },
}

fn format_attempts(attempts: &[ColumnAttempt]) -> String {
    if attempts.is_empty() {
        return "none".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
