pub mod errors;
pub mod formats;
pub mod model;
mod registry;

pub use errors::{ColumnAttempt, LayoutAttempt, ParserError};
pub use formats::{
    parse_finite_f64, parse_timestamp_micros, record_start_line, try_as_numeric_column,
    try_as_timestamp_column, DetectedLayout, PositionalLayout,
};
pub use model::{
    ColumnBinding, ColumnRole, NumericColumn, ParsedSeries, RawColumn, TimestampColumn,
};
pub use registry::{
    parse_detected, parse_positional, parse_time_series, parse_with_layouts, SeriesLayout,
};

#[cfg(test)]
mod tests;
