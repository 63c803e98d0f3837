//! Command-line front end: argument definitions and command handlers.
//!
//! Results go to stdout in the selected [`OutputFormat`]; diagnostics go to
//! stderr. Every handler returns an [`ExitCode`].

use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tl_common::{Error, OutputFormat, RecordKind, Result, SCHEMA_VERSION};
use tl_config::resolve::load_file;
use tl_config::{
    resolve_config, validate, ConfigError, ConfigPaths, PipelineConfig, ResolvedConfig,
    ValidationResult,
};
use tracing::debug;

use crate::aggregate::{EntityFilter, SeriesReport};
use crate::catalog::{Catalog, CatalogSnapshot};
use crate::exit_codes::ExitCode;
use crate::logging::LogFormat;
use crate::pipeline::{load_paths, BatchReport, Session};

/// Telemetry Lens: load CSV telemetry and produce chart-ready series.
#[derive(Parser, Debug)]
#[command(name = "tl-core", version, about)]
pub struct Cli {
    /// Config file (.toml or .json); overrides TL_CONFIG and the user config
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Human)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load files or directories and report what was found
    Scan {
        /// CSV files or directories (walked recursively)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Aggregate one record kind into a bucketed, downsampled series
    Aggregate(AggregateArgs),
    /// List services, components, KPIs, dates, time range and row counts
    Catalog {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Also report records containing this text (case-insensitive)
        #[arg(long)]
        search: Option<String>,
    },
    /// Inspect the configuration
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct AggregateArgs {
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Record kind to aggregate
    #[arg(long, value_enum)]
    pub kind: RecordKind,

    /// Service or component id, or `all`
    #[arg(long, default_value = "all")]
    pub entity: String,

    /// Window start, epoch seconds
    #[arg(long, requires = "end", allow_hyphen_values = true)]
    pub start: Option<f64>,

    /// Window end, epoch seconds
    #[arg(long, requires = "start", allow_hyphen_values = true)]
    pub end: Option<f64>,

    /// KPI to chart (metric_container); repeatable
    #[arg(long = "kpi", value_name = "NAME")]
    pub kpis: Vec<String>,

    /// Point budget; defaults to the configured value
    #[arg(long)]
    pub max_points: Option<usize>,

    /// Bucket width in seconds; defaults to the configured value
    #[arg(long)]
    pub bucket_secs: Option<i64>,

    /// Print flat chart rows instead of the full series
    #[arg(long)]
    pub chart: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration and where it came from
    Show,
    /// Print the configuration JSON Schema
    Schema,
    /// Validate a config file, or the effective configuration
    Validate {
        file: Option<PathBuf>,
    },
}

// ── Output ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    #[serde(flatten)]
    data: &'a T,
}

fn emit<T: Serialize>(
    format: OutputFormat,
    command: &str,
    data: &T,
    summary: impl FnOnce() -> String,
) -> Result<()> {
    let envelope = Envelope {
        schema_version: SCHEMA_VERSION,
        command,
        data,
    };
    let text = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&envelope)?,
        OutputFormat::Jsonl => serde_json::to_string(&envelope)?,
        OutputFormat::Summary => summary(),
    };
    println!("{text}");
    Ok(())
}

fn fail(err: &Error) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

fn config_error(err: ConfigError) -> Error {
    match err {
        ConfigError::Invalid(errors) => Error::InvalidConfig(
            errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        ),
        other => Error::Config(other.to_string()),
    }
}

// ── Dispatch ────────────────────────────────────────────────────────────

pub fn run(cli: &Cli) -> ExitCode {
    let format = cli.format;
    let outcome = match &cli.command {
        Commands::Scan { paths } => with_config(cli, |c| run_scan(format, c, paths)),
        Commands::Aggregate(args) => with_config(cli, |c| run_aggregate(format, c, args)),
        Commands::Catalog { paths, search } => {
            with_config(cli, |c| run_catalog(format, c, paths, search.as_deref()))
        }
        Commands::Config(args) => run_config(cli, &args.command),
    };
    outcome.unwrap_or_else(|err| fail(&err))
}

fn with_config(
    cli: &Cli,
    f: impl FnOnce(&PipelineConfig) -> Result<ExitCode>,
) -> Result<ExitCode> {
    let resolved = resolve_effective(cli)?;
    for warning in &resolved.warnings {
        eprintln!("warning: {warning}");
    }
    f(&resolved.config)
}

fn resolve_effective(cli: &Cli) -> Result<ResolvedConfig> {
    let paths = ConfigPaths::discover(cli.config.as_deref());
    let resolved = resolve_config(&paths).map_err(config_error)?;
    debug!(source = ?resolved.source, "using configuration");
    Ok(resolved)
}

/// Load inputs and report whether at least one file loaded.
fn load(config: &PipelineConfig, paths: &[PathBuf]) -> (BatchReport, bool) {
    let report = load_paths(paths, &config.ingest);
    for failure in &report.failures {
        eprintln!("warning: {}", failure.message);
    }
    let loaded = report.summary.files_loaded > 0;
    (report, loaded)
}

fn nothing_loaded(report: &BatchReport) -> ExitCode {
    eprintln!(
        "error: no loadable input ({} failed, {} skipped)",
        report.summary.files_failed, report.summary.files_skipped
    );
    ExitCode::InputError
}

fn load_exit(report: &BatchReport) -> ExitCode {
    if report.has_warnings() {
        ExitCode::Warnings
    } else {
        ExitCode::Clean
    }
}

// ── scan ────────────────────────────────────────────────────────────────

fn run_scan(format: OutputFormat, config: &PipelineConfig, paths: &[PathBuf]) -> Result<ExitCode> {
    let (report, loaded) = load(config, paths);
    emit(format, "scan", &report, || scan_summary(&report))?;
    Ok(if loaded {
        load_exit(&report)
    } else {
        nothing_loaded(&report)
    })
}

fn scan_summary(report: &BatchReport) -> String {
    let s = &report.summary;
    let mut out = format!(
        "# Batch {}\n\n{} loaded, {} failed, {} skipped; {} rows ({} dropped)\n",
        report.batch_id, s.files_loaded, s.files_failed, s.files_skipped, s.rows_loaded, s.rows_dropped
    );
    for file in &report.files {
        out.push_str(&format!(
            "  {:<16} {:>10} rows  {}{}\n",
            file.kind.as_str(),
            file.rows,
            file.file_name,
            file.date
                .as_deref()
                .map(|d| format!("  [{d}]"))
                .unwrap_or_default()
        ));
    }
    for skipped in &report.skipped {
        out.push_str(&format!("  skipped: {}\n", skipped.reason));
    }
    for failure in &report.failures {
        out.push_str(&format!("  failed:  {}\n", failure.message));
    }
    out.trim_end().to_string()
}

// ── aggregate ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChartOutput<'a> {
    kind: RecordKind,
    downsampled: bool,
    rows: &'a [Map<String, Value>],
}

fn run_aggregate(
    format: OutputFormat,
    config: &PipelineConfig,
    args: &AggregateArgs,
) -> Result<ExitCode> {
    let (report, loaded) = load(config, &args.paths);
    if !loaded {
        return Ok(nothing_loaded(&report));
    }
    let exit = load_exit(&report);
    let session = Session::new(config.aggregate.clone()).with_datasets(report.datasets);

    let mut query = session
        .query(args.kind)
        .with_entity(args.entity.parse::<EntityFilter>().unwrap_or_default());
    if let (Some(start), Some(end)) = (args.start, args.end) {
        query = query.with_window(start, end);
    }
    if !args.kpis.is_empty() {
        query = query.with_kpis(args.kpis.iter().cloned());
    }
    if let Some(max_points) = args.max_points {
        query = query.with_max_points(max_points);
    }
    if let Some(bucket_secs) = args.bucket_secs {
        query.bucket_secs = bucket_secs;
    }

    let series = session.aggregate(&query)?;
    if args.chart {
        let rows = series.series.chart_rows();
        let chart = ChartOutput {
            kind: series.kind,
            downsampled: series.downsampled,
            rows: &rows,
        };
        emit(format, "aggregate", &chart, || series_summary(&series))?;
    } else {
        emit(format, "aggregate", &series, || series_summary(&series))?;
    }
    Ok(exit)
}

fn series_summary(report: &SeriesReport) -> String {
    let rows = report.series.chart_rows();
    let mut out = format!(
        "# {} series: {} rows from {} records{}\n",
        report.kind,
        rows.len(),
        report.records_in,
        if report.downsampled {
            format!(" (downsampled from {})", report.rows_before_sampling)
        } else {
            String::new()
        }
    );
    for row in &rows {
        let time = row.get("time").and_then(Value::as_str).unwrap_or_default();
        let values: Vec<String> = row
            .iter()
            .filter(|(k, _)| k.as_str() != "time" && k.as_str() != "timestamp")
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        out.push_str(&format!("  {time}  {}\n", values.join(" ")));
    }
    out.trim_end().to_string()
}

// ── catalog ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SearchHit {
    file_name: String,
    matches: Vec<usize>,
}

#[derive(Serialize)]
struct CatalogOutput {
    #[serde(flatten)]
    snapshot: CatalogSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<Vec<SearchHit>>,
}

fn run_catalog(
    format: OutputFormat,
    config: &PipelineConfig,
    paths: &[PathBuf],
    search: Option<&str>,
) -> Result<ExitCode> {
    let (report, loaded) = load(config, paths);
    if !loaded {
        return Ok(nothing_loaded(&report));
    }
    let exit = load_exit(&report);
    let session = Session::new(config.aggregate.clone()).with_datasets(report.datasets);
    let catalog = session.catalog();

    let hits = search.map(|text| {
        session
            .datasets()
            .iter()
            .map(|ds| SearchHit {
                file_name: ds.file_name.clone(),
                matches: Catalog::search(ds, text),
            })
            .filter(|hit| !hit.matches.is_empty())
            .collect::<Vec<_>>()
    });
    let output = CatalogOutput {
        snapshot: catalog.snapshot(),
        search: hits,
    };
    emit(format, "catalog", &output, || catalog_summary(&output))?;
    Ok(exit)
}

fn catalog_summary(output: &CatalogOutput) -> String {
    let s = &output.snapshot;
    let mut out = format!(
        "# Catalog: {} files, {} rows\n",
        s.statistics.total_files, s.statistics.total_rows
    );
    for (kind, rows) in &s.statistics.rows_by_kind {
        out.push_str(&format!("  {:<16} {rows:>10} rows\n", kind.as_str()));
    }
    let list = |name: &str, items: &[String]| format!("{name}: {}\n", items.join(", "));
    out.push_str(&list("services", &s.services));
    out.push_str(&list("components", &s.components));
    out.push_str(&list("kpis", &s.kpis));
    out.push_str(&list("dates", &s.dates));
    if let Some(range) = s.time_range {
        out.push_str(&format!("time range: {} .. {}\n", range.start, range.end));
    }
    if let Some(hits) = &output.search {
        for hit in hits {
            out.push_str(&format!("match: {} ({} rows)\n", hit.file_name, hit.matches.len()));
        }
    }
    out.trim_end().to_string()
}

// ── config ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ValidateOutput<'a> {
    path: Option<&'a Path>,
    valid: bool,
    #[serde(flatten)]
    result: ValidationResult,
}

fn run_config(cli: &Cli, command: &ConfigCommands) -> Result<ExitCode> {
    match command {
        ConfigCommands::Show => {
            let resolved = resolve_effective(cli)?;
            emit(cli.format, "config show", &resolved, || {
                resolved.config.to_json().unwrap_or_default()
            })?;
            Ok(ExitCode::Clean)
        }
        ConfigCommands::Schema => {
            let schema = PipelineConfig::json_schema();
            let text = serde_json::to_string_pretty(&schema)?;
            println!("{text}");
            Ok(ExitCode::Clean)
        }
        ConfigCommands::Validate { file } => {
            let result = match file {
                Some(path) => validate(&load_file(path).map_err(config_error)?),
                None => match resolve_config(&ConfigPaths::discover(cli.config.as_deref())) {
                    Ok(resolved) => ValidationResult {
                        errors: Vec::new(),
                        warnings: resolved.warnings,
                    },
                    Err(ConfigError::Invalid(errors)) => ValidationResult {
                        errors,
                        warnings: Vec::new(),
                    },
                    Err(other) => return Err(config_error(other)),
                },
            };
            let valid = result.is_valid();
            let output = ValidateOutput {
                path: file.as_deref(),
                valid,
                result,
            };
            emit(cli.format, "config validate", &output, || {
                validate_summary(&output)
            })?;
            Ok(if !valid {
                ExitCode::ConfigError
            } else if output.result.warnings.is_empty() {
                ExitCode::Clean
            } else {
                ExitCode::Warnings
            })
        }
    }
}

fn validate_summary(output: &ValidateOutput<'_>) -> String {
    let mut out = String::from(if output.valid {
        "configuration is valid\n"
    } else {
        "configuration is invalid\n"
    });
    for err in &output.result.errors {
        out.push_str(&format!("  error: {err}\n"));
    }
    for warning in &output.result.warnings {
        out.push_str(&format!("  warning: {warning}\n"));
    }
    out.trim_end().to_string()
}
