use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use autoshield_core::config::{AppConfig, CONFIG_ENV_VAR};
use autoshield_core::{
    anomalous_rows, load_and_process_with, read_labeled_csv, read_processed_csv, score, summarize,
    write_anomalous_rows, write_labeled_csv, AnomalySummary, ColumnMode, Contamination, Detector,
    TimeSeriesTable,
};
use clap::{Args, Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use polars::prelude::DataFrame;
use tracing::info;
use tracing_subscriber::EnvFilter;

const CLI_MIN_CONTAMINATION: f64 = 0.001;
const CLI_MAX_CONTAMINATION: f64 = 0.1;

#[derive(Parser, Debug)]
#[command(author, version, about = "AutoShield time-series anomaly detection", long_about = None)]
struct Cli {
    /// TOML config file (falls back to $AUTOSHIELD_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Preprocess the raw CSV, score it, and save the labeled table
    Run(RunArgs),
    /// Parse, sort and scale a raw CSV without scoring it
    Preprocess(PreprocessArgs),
    /// Score an already processed CSV
    Detect(DetectArgs),
    /// Print anomaly metrics and the flagged rows
    Report(ReportArgs),
}

#[derive(Args, Debug, Default)]
struct DetectionArgs {
    /// Expected share of anomalies, between 0.001 and 0.1
    #[arg(long, value_parser = parse_contamination)]
    contamination: Option<f64>,

    /// isolation-forest or lof
    #[arg(long)]
    detector: Option<Detector>,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Raw two-column CSV
    #[arg(long)]
    raw: Option<PathBuf>,

    /// Where to save the processed table
    #[arg(long)]
    processed: Option<PathBuf>,

    /// Where to save the labeled table
    #[arg(long)]
    output: Option<PathBuf>,

    /// positional, detect or auto
    #[arg(long)]
    columns: Option<ColumnMode>,

    #[command(flatten)]
    detection: DetectionArgs,
}

#[derive(Args, Debug)]
struct PreprocessArgs {
    /// Raw CSV to read
    #[arg(long)]
    raw: Option<PathBuf>,

    /// Where to save the processed table
    #[arg(long)]
    output: Option<PathBuf>,

    /// positional, detect or auto
    #[arg(long)]
    columns: Option<ColumnMode>,
}

#[derive(Args, Debug)]
struct DetectArgs {
    /// Processed CSV with timestamp, value and value_scaled columns
    #[arg(long)]
    processed: Option<PathBuf>,

    /// Where to save the labeled table
    #[arg(long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    detection: DetectionArgs,
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Labeled CSV to summarize
    #[arg(long, conflicts_with = "processed")]
    labeled: Option<PathBuf>,

    /// Score this processed CSV instead of reading saved labels
    #[arg(long)]
    processed: Option<PathBuf>,

    /// Write the anomalous rows to this CSV
    #[arg(long)]
    export: Option<PathBuf>,

    /// Print the metrics as JSON instead of tables
    #[arg(long)]
    json: bool,

    /// Expected share of anomalies when scoring --processed
    #[arg(long, value_parser = parse_contamination, requires = "processed")]
    contamination: Option<f64>,

    /// Detector used with --processed
    #[arg(long, requires = "processed")]
    detector: Option<Detector>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Run(args) => run(&config, args),
        Command::Preprocess(args) => preprocess(&config, args),
        Command::Detect(args) => detect(&config, args),
        Command::Report(args) => report(&config, args),
    }
}

fn load_config(flag: Option<&Path>) -> Result<AppConfig> {
    let from_env = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
    let path = flag.map(Path::to_path_buf).or(from_env);
    AppConfig::load_optional(path.as_deref())
        .with_context(|| format!("failed to load configuration from {path:?}"))
}

fn parse_contamination(value: &str) -> std::result::Result<f64, String> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    check_contamination(parsed)
}

fn check_contamination(value: f64) -> std::result::Result<f64, String> {
    if (CLI_MIN_CONTAMINATION..=CLI_MAX_CONTAMINATION).contains(&value) {
        Ok(value)
    } else {
        Err(format!(
            "contamination must be between {CLI_MIN_CONTAMINATION} and {CLI_MAX_CONTAMINATION}, \
             got {value}"
        ))
    }
}

/// Flags win over the config file. Both sources share the CLI contamination bounds.
fn resolve_detection(
    config: &AppConfig,
    args: &DetectionArgs,
) -> Result<(Detector, Contamination)> {
    let detector = args.detector.unwrap_or(config.detection.detector);
    let fraction = args.contamination.unwrap_or(config.detection.contamination);
    let fraction = check_contamination(fraction).map_err(anyhow::Error::msg)?;
    Ok((detector, Contamination::new(fraction)?))
}

fn run(config: &AppConfig, args: RunArgs) -> Result<()> {
    let raw = args.raw.unwrap_or_else(|| config.paths.raw.clone());
    let processed = args
        .processed
        .unwrap_or_else(|| config.paths.processed.clone());
    let output = args.output.unwrap_or_else(|| config.paths.labeled.clone());
    let columns = args.columns.unwrap_or(config.detection.columns);
    let (detector, contamination) = resolve_detection(config, &args.detection)?;

    let table = load_and_process_with(&raw, Some(processed.as_path()), columns)
        .with_context(|| format!("failed to preprocess {}", raw.display()))?;
    let labeled = score(&table, detector, contamination)
        .with_context(|| format!("{} scoring failed", detector.label()))?;
    write_labeled_csv(&labeled, &output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    info!(
        detector = detector.as_str(),
        contamination = contamination.get(),
        rows = labeled.height(),
        "Anomaly detection complete"
    );
    println!("{}", labeled.dataframe().head(Some(5)));
    Ok(())
}

fn preprocess(config: &AppConfig, args: PreprocessArgs) -> Result<()> {
    let raw = args.raw.unwrap_or_else(|| config.paths.raw.clone());
    let columns = args.columns.unwrap_or(config.detection.columns);

    let table = load_and_process_with(&raw, args.output.as_deref(), columns)
        .with_context(|| format!("failed to preprocess {}", raw.display()))?;
    println!("{}", table.dataframe().head(Some(5)));
    Ok(())
}

fn detect(config: &AppConfig, args: DetectArgs) -> Result<()> {
    let processed = args
        .processed
        .unwrap_or_else(|| config.paths.processed.clone());
    let output = args.output.unwrap_or_else(|| config.paths.labeled.clone());
    let (detector, contamination) = resolve_detection(config, &args.detection)?;

    let table = read_processed_csv(&processed)
        .with_context(|| format!("failed to read {}", processed.display()))?;
    let labeled = score(&table, detector, contamination)
        .with_context(|| format!("{} scoring failed", detector.label()))?;
    write_labeled_csv(&labeled, &output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    print_summary(&summarize(&labeled)?);
    Ok(())
}

fn report(config: &AppConfig, args: ReportArgs) -> Result<()> {
    let labeled = match &args.processed {
        Some(processed) => {
            let detection = DetectionArgs {
                contamination: args.contamination,
                detector: args.detector,
            };
            let (detector, contamination) = resolve_detection(config, &detection)?;
            let table = read_processed_csv(processed)
                .with_context(|| format!("failed to read {}", processed.display()))?;
            score(&table, detector, contamination)
                .with_context(|| format!("{} scoring failed", detector.label()))?
        }
        None => {
            let path = args
                .labeled
                .clone()
                .unwrap_or_else(|| config.paths.labeled.clone());
            read_labeled_csv(&path)
                .with_context(|| format!("failed to read {}", path.display()))?
        }
    };

    let summary = summarize(&labeled)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
        print_anomalies(&labeled)?;
    }

    if let Some(export) = &args.export {
        let exported = write_anomalous_rows(&labeled, export)
            .with_context(|| format!("failed to export {}", export.display()))?;
        info!(path = %export.display(), rows = exported, "Export finished");
    }
    Ok(())
}

fn print_summary(summary: &AnomalySummary) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Total Data Points", "Detected Anomalies", "Anomaly Rate"])
        .add_row(vec![
            summary.total_rows.to_string(),
            summary.anomaly_count.to_string(),
            summary.anomaly_rate_display(),
        ]);
    println!("{table}");
}

fn print_anomalies(labeled: &TimeSeriesTable) -> Result<()> {
    let rows = anomalous_rows(labeled)?;
    if rows.height() == 0 {
        println!("No anomalies detected.");
        return Ok(());
    }
    println!("{}", render_rows(&rows)?);
    Ok(())
}

fn render_rows(rows: &DataFrame) -> Result<Table> {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(rows.get_column_names_str());

    for idx in 0..rows.height() {
        let cells = rows
            .get_columns()
            .iter()
            .map(|column| column.get(idx).map(|value| value.to_string()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        table.add_row(cells);
    }
    Ok(table)
}
