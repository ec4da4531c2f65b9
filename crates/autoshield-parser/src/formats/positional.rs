use crate::errors::ParserError;
use crate::model::{ColumnBinding, ParsedSeries, RawColumn};
use crate::registry::SeriesLayout;

use super::{parse_required_f64, parse_timestamp, read_columns, reader_builder};

/// Exactly two columns, read as (timestamp, value) by position whatever their headers say.
///
/// Any unparseable cell is a hard error: nothing is skipped or defaulted.
pub struct PositionalLayout;

impl Default for PositionalLayout {
    fn default() -> Self {
        Self
    }
}

impl PositionalLayout {
    const NAME: &'static str = "POSITIONAL";

    fn split_columns(columns: Vec<RawColumn>) -> Result<(RawColumn, RawColumn), ParserError> {
        if columns.len() != 2 {
            return Err(ParserError::FormatMismatch {
                layout: Self::NAME,
                reason: format!("expected exactly 2 columns, found {}", columns.len()),
            });
        }
        let mut iter = columns.into_iter();
        match (iter.next(), iter.next()) {
            (Some(timestamp), Some(value)) => Ok((timestamp, value)),
            _ => Err(ParserError::InvalidHeader {
                layout: Self::NAME,
                message: "header row is incomplete".to_string(),
            }),
        }
    }
}

impl SeriesLayout for PositionalLayout {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(&self, content: &str) -> Result<ParsedSeries, ParserError> {
        let columns = read_columns(Self::NAME, &reader_builder(), content)?;
        let (timestamp_col, value_col) = Self::split_columns(columns)?;

        if timestamp_col.cells.is_empty() {
            return Err(ParserError::EmptyData { layout: Self::NAME });
        }

        let mut timestamps = Vec::with_capacity(timestamp_col.cells.len());
        let mut values = Vec::with_capacity(value_col.cells.len());

        for ((ts_cell, value_cell), &line_index) in timestamp_col
            .cells
            .iter()
            .zip(value_col.cells.iter())
            .zip(timestamp_col.lines.iter())
        {
            timestamps.push(parse_timestamp(Self::NAME, ts_cell, line_index)?);
            values.push(parse_required_f64(
                Self::NAME,
                value_cell,
                line_index,
                &value_col.name,
            )?);
        }

        Ok(ParsedSeries {
            layout: Self::NAME,
            binding: ColumnBinding::new(timestamp_col.name, value_col.name),
            timestamps,
            values,
        })
    }
}
