use std::fs;
use std::path::PathBuf;

use crate::errors::ParserError;
use crate::formats::{DetectedLayout, PositionalLayout};
use crate::model::ColumnRole;
use crate::registry::SeriesLayout;
use crate::{parse_detected, parse_positional, parse_time_series, parse_timestamp_micros};

fn fixture(path: &str) -> String {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let full_path = base.join("tests/data").join(path);
    fs::read_to_string(&full_path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {}", full_path.display(), err))
}

#[test]
fn parses_two_column_file_in_file_order() {
    let content = fixture("ambient_temperature_sample.csv");
    let parsed = parse_positional(&content).expect("positional parse failed");

    assert_eq!(parsed.layout, "POSITIONAL");
    assert_eq!(parsed.binding.timestamp, "timestamp");
    assert_eq!(parsed.binding.value, "value");
    assert_eq!(parsed.len(), 10);
    assert!((parsed.values[0] - 69.88083514).abs() < 1e-12);
    assert_eq!(
        parsed.timestamps[1] - parsed.timestamps[0],
        3_600 * 1_000_000
    );
}

#[test]
fn positional_layout_ignores_header_names() {
    let content = fixture("renamed_unsorted.csv");
    let parsed = parse_positional(&content).expect("renamed headers parse");

    assert_eq!(parsed.binding.timestamp, "time");
    assert_eq!(parsed.binding.value, "temp");
    assert_eq!(parsed.values, vec![12.5, 10.0, 11.25]);
    assert_eq!(
        parsed.timestamps[0],
        parse_timestamp_micros("2024-01-01 00:02:00").unwrap()
    );
}

#[test]
fn positional_layout_propagates_bad_timestamp() {
    let content = fixture("malformed_timestamp.csv");
    let err = parse_positional(&content).expect_err("malformed timestamp must fail");

    match err {
        ParserError::DataRow {
            line_index,
            message,
            ..
        } => {
            assert_eq!(line_index, 3);
            assert!(message.contains("not-a-date"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn positional_layout_rejects_wrong_column_count() {
    let content = fixture("sensor_export.csv");
    let err = PositionalLayout.parse(&content).expect_err("three columns");
    assert!(matches!(err, ParserError::FormatMismatch { .. }));
}

#[test]
fn positional_layout_rejects_blank_values() {
    let content = "timestamp,value\n2024-01-01 00:00:00,\n";
    let err = parse_positional(content).expect_err("blank value");
    assert!(matches!(err, ParserError::DataRow { line_index: 2, .. }));
}

#[test]
fn reported_line_skips_blank_lines_and_multiline_cells() {
    let content = "timestamp,value\n2024-01-01 00:00:00,1.0\n\nnot-a-date,2.0\n";
    let err = parse_positional(content).expect_err("bad timestamp");
    assert!(matches!(err, ParserError::DataRow { line_index: 4, .. }));

    let content = "when,reading\n2024-01-01 00:00:00,\"1.0\n\"\nnot-a-date,3\n";
    let err = parse_positional(content).expect_err("bad timestamp after quoted newline");
    assert!(matches!(err, ParserError::DataRow { line_index: 4, .. }));
}

#[test]
fn header_only_file_is_empty_data() {
    let err = parse_positional("timestamp,value\n").expect_err("no rows");
    assert!(matches!(err, ParserError::EmptyData { .. }));
}

#[test]
fn detects_timestamp_and_reading_columns() {
    let content = fixture("sensor_export.csv");
    let parsed = parse_detected(&content).expect("detection failed");

    assert_eq!(parsed.layout, "DETECTED");
    assert_eq!(parsed.binding.timestamp, "ts_raw");
    assert_eq!(parsed.binding.value, "reading");
    assert_eq!(parsed.values, vec![10.5, 10.7, 10.4, 55.0]);
}

#[test]
fn detection_skips_malformed_timestamp_column() {
    let content = fixture("sensor_export_malformed.csv");
    let err = DetectedLayout
        .parse(&content)
        .expect_err("no clean timestamp column");

    match err {
        ParserError::ColumnDetection { role, attempts } => {
            assert_eq!(role, ColumnRole::Timestamp);
            assert_eq!(attempts.len(), 3);
            assert_eq!(attempts[0].column, "ts_raw");
            assert!(attempts[0].reason.contains("not-a-date"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn detection_fails_without_date_or_numeric_columns() {
    let content = fixture("labels_only.csv");
    let err = parse_detected(&content).expect_err("nothing to bind");
    assert!(matches!(
        err,
        ParserError::ColumnDetection {
            role: ColumnRole::Timestamp,
            ..
        }
    ));
    assert!(err.to_string().starts_with("no timestamp column found"));
}

#[test]
fn detection_reports_missing_value_column() {
    let content = "when,label\n2024-01-01,a\n2024-01-02,b\n";
    let err = parse_detected(content).expect_err("no numeric column");
    match err {
        ParserError::ColumnDetection { role, attempts } => {
            assert_eq!(role, ColumnRole::Value);
            assert_eq!(attempts.len(), 1);
            assert_eq!(attempts[0].column, "label");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn registry_falls_back_to_detection_on_shape_mismatch() {
    let two_column = parse_time_series(&fixture("renamed_unsorted.csv")).expect("two column");
    assert_eq!(two_column.layout, "POSITIONAL");

    let wide = parse_time_series(&fixture("sensor_export.csv")).expect("wide file");
    assert_eq!(wide.layout, "DETECTED");
    assert_eq!(wide.binding.value, "reading");
}

#[test]
fn registry_does_not_mask_row_errors() {
    let err = parse_time_series(&fixture("malformed_timestamp.csv")).expect_err("row error");
    assert!(matches!(err, ParserError::DataRow { .. }));
}

#[test]
fn registry_lists_attempts_when_nothing_matches() {
    let layouts: [&dyn SeriesLayout; 1] = [&PositionalLayout];
    let err = crate::parse_with_layouts(&fixture("sensor_export.csv"), &layouts)
        .expect_err("positional only");
    match err {
        ParserError::NoMatchingLayout { attempts } => {
            assert_eq!(attempts.len(), 1);
            assert_eq!(attempts[0].layout, "POSITIONAL");
        }
        other => panic!("unexpected error: {other}"),
    }
}
