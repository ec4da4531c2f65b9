mod common;
mod detected;
mod positional;

pub use common::{parse_finite_f64, parse_timestamp_micros, record_start_line};
pub use detected::{try_as_numeric_column, try_as_timestamp_column, DetectedLayout};
pub use positional::PositionalLayout;

pub(crate) use common::{parse_required_f64, parse_timestamp, read_columns, reader_builder};
