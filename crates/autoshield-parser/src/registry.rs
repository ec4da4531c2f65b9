use crate::errors::{LayoutAttempt, ParserError};
use crate::formats::{DetectedLayout, PositionalLayout};
use crate::model::ParsedSeries;

pub trait SeriesLayout {
    fn name(&self) -> &'static str;
    fn parse(&self, content: &str) -> Result<ParsedSeries, ParserError>;
}

/// Strict two-column parse; row-level failures propagate as-is.
pub fn parse_positional(content: &str) -> Result<ParsedSeries, ParserError> {
    PositionalLayout.parse(content)
}

/// Column-detecting parse for files with arbitrary headers.
pub fn parse_detected(content: &str) -> Result<ParsedSeries, ParserError> {
    DetectedLayout.parse(content)
}

/// Tries the positional layout first and falls back to column detection when the
/// file does not have the two-column shape.
pub fn parse_time_series(content: &str) -> Result<ParsedSeries, ParserError> {
    let positional = PositionalLayout;
    let detected = DetectedLayout;
    let layouts: [&dyn SeriesLayout; 2] = [&positional, &detected];
    parse_with_layouts(content, &layouts)
}

pub fn parse_with_layouts(
    content: &str,
    layouts: &[&dyn SeriesLayout],
) -> Result<ParsedSeries, ParserError> {
    let mut attempts = Vec::new();

    for layout in layouts {
        match layout.parse(content) {
            Ok(parsed) => return Ok(parsed),
            Err(ParserError::FormatMismatch { reason, .. }) => {
                attempts.push(LayoutAttempt::new(layout.name(), reason));
            }
            Err(err) => return Err(err),
        }
    }

    Err(ParserError::NoMatchingLayout { attempts })
}
