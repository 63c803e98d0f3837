//! Load orchestration: detect → read → coerce, per file and per batch.
//!
//! Row problems stay inside each dataset's [`ParseReport`]; a file that
//! cannot be read lands in [`BatchReport::failures`]; a batch never fails as
//! a whole.

use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tl_common::{BatchId, Error, RecordKind, Result};
use tl_config::{AggregateConfig, IngestConfig};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::aggregate::{aggregate, AggregateQuery, SeriesReport};
use crate::catalog::Catalog;
use crate::coerce::RecordsBuilder;
use crate::detect::{date_label, detect};
use crate::ingest::{parse, ParseReport, ParseStats, ReaderOptions};
use crate::records::Records;

// ── Dataset ─────────────────────────────────────────────────────────────

/// Typed records parsed from one file. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadedDataset {
    pub kind: RecordKind,
    /// `YYYY_MM_DD` label from the file name, if any.
    pub date: Option<String>,
    pub records: Records,
    pub file_name: String,
    pub parse: ParseReport,
}

impl LoadedDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn info(&self) -> DatasetInfo {
        DatasetInfo {
            file_name: self.file_name.clone(),
            kind: self.kind,
            date: self.date.clone(),
            rows: self.len() as u64,
            parse: self.parse.stats,
        }
    }
}

/// Record-free description of a loaded dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetInfo {
    pub file_name: String,
    pub kind: RecordKind,
    pub date: Option<String>,
    pub rows: u64,
    pub parse: ParseStats,
}

/// Parse one named byte stream.
///
/// Returns `Ok(None)` when the name matches no record kind. The kind comes
/// from the last path component only; the date label falls back to the full
/// name so `2024_01_01/log_service.csv` still carries its date.
pub fn load_reader<R: Read>(
    file_name: &str,
    reader: R,
    config: &IngestConfig,
) -> Result<Option<LoadedDataset>> {
    let base = base_name(file_name);
    let Some(kind) = detect(base) else {
        warn!(file = file_name, "unknown record kind, skipping");
        return Ok(None);
    };

    let mut options =
        ReaderOptions::new(file_name).with_progress_every(config.progress_every_rows);
    if !config.has_header {
        options = options.without_header();
    }

    let mut rows = parse(reader, options);
    let mut builder = RecordsBuilder::new(kind);
    for row in rows.by_ref() {
        builder.push(&row);
    }
    let parse = rows.finish()?;
    let records = builder.finish();

    if records.is_empty() {
        let empty = Error::EmptyResult {
            file: file_name.to_string(),
        };
        warn!(file = file_name, kind = %kind, "{empty}");
    } else {
        info!(
            file = file_name,
            kind = %kind,
            rows = records.len(),
            dropped = parse.stats.dropped(),
            "dataset loaded"
        );
    }

    Ok(Some(LoadedDataset {
        kind,
        date: date_label(base).or_else(|| date_label(file_name)),
        records,
        file_name: file_name.to_string(),
        parse,
    }))
}

fn base_name(file_name: &str) -> &str {
    file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
}

/// Open and parse one file from disk.
pub fn load_file(path: &Path, config: &IngestConfig) -> Result<Option<LoadedDataset>> {
    let name = path.display().to_string();
    let file = File::open(path).map_err(|e| Error::unreadable(&name, e))?;
    load_reader(&name, file, config)
}

// ── Batch ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileFailure {
    pub path: String,
    pub code: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// Counts over one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub files_loaded: u64,
    pub files_failed: u64,
    pub files_skipped: u64,
    pub rows_loaded: u64,
    pub rows_dropped: u64,
    pub empty_datasets: u64,
}

/// Outcome of a multi-file load.
///
/// Serializes without the records themselves; `files` describes each
/// dataset instead.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub batch_id: BatchId,
    pub files: Vec<DatasetInfo>,
    pub failures: Vec<FileFailure>,
    pub skipped: Vec<SkippedFile>,
    pub warnings: Vec<String>,
    pub summary: LoadSummary,
    #[serde(skip)]
    pub datasets: Vec<LoadedDataset>,
}

impl Default for BatchReport {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchReport {
    pub fn new() -> Self {
        Self {
            batch_id: BatchId::new(),
            files: Vec::new(),
            failures: Vec::new(),
            skipped: Vec::new(),
            warnings: Vec::new(),
            summary: LoadSummary::default(),
            datasets: Vec::new(),
        }
    }

    /// Fold one file's outcome into the report.
    pub fn record(&mut self, path: &str, outcome: Result<Option<LoadedDataset>>) {
        match outcome {
            Ok(Some(dataset)) => {
                self.summary.files_loaded += 1;
                self.summary.rows_loaded += dataset.len() as u64;
                self.summary.rows_dropped += dataset.parse.stats.dropped();
                if dataset.is_empty() {
                    self.summary.empty_datasets += 1;
                    self.warnings.push(
                        Error::EmptyResult {
                            file: dataset.file_name.clone(),
                        }
                        .to_string(),
                    );
                }
                self.files.push(dataset.info());
                self.datasets.push(dataset);
            }
            Ok(None) => {
                self.summary.files_skipped += 1;
                self.skipped.push(SkippedFile {
                    path: path.to_string(),
                    reason: Error::UnknownKind {
                        file: path.to_string(),
                    }
                    .to_string(),
                });
            }
            Err(err) => {
                warn!(file = path, error = %err, "file failed to load");
                self.summary.files_failed += 1;
                self.failures.push(FileFailure {
                    path: path.to_string(),
                    code: err.code(),
                    message: err.to_string(),
                });
            }
        }
    }

    /// Merge another batch into this one, keeping this batch's id.
    pub fn merge(&mut self, other: BatchReport) {
        self.files.extend(other.files);
        self.failures.extend(other.failures);
        self.skipped.extend(other.skipped);
        self.warnings.extend(other.warnings);
        self.datasets.extend(other.datasets);
        let s = &mut self.summary;
        let o = other.summary;
        s.files_loaded += o.files_loaded;
        s.files_failed += o.files_failed;
        s.files_skipped += o.files_skipped;
        s.rows_loaded += o.rows_loaded;
        s.rows_dropped += o.rows_dropped;
        s.empty_datasets += o.empty_datasets;
    }

    /// Anything a caller should surface: failed, skipped or empty files.
    pub fn has_warnings(&self) -> bool {
        !self.failures.is_empty() || !self.skipped.is_empty() || !self.warnings.is_empty()
    }
}

/// Load each path independently. Directories are walked recursively.
pub fn load_paths<P: AsRef<Path>>(paths: &[P], config: &IngestConfig) -> BatchReport {
    let mut report = BatchReport::new();
    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            report.merge(load_directory(path, config));
        } else {
            report.record(&path.display().to_string(), load_file(path, config));
        }
    }
    info!(
        batch = %report.batch_id,
        loaded = report.summary.files_loaded,
        failed = report.summary.files_failed,
        skipped = report.summary.files_skipped,
        rows = report.summary.rows_loaded,
        "batch load finished"
    );
    report
}

/// Load every file under `root` whose extension matches, in sorted path order.
pub fn load_directory(root: &Path, config: &IngestConfig) -> BatchReport {
    let mut report = BatchReport::new();
    let wanted = config.file_extension.trim_start_matches('.');
    let mut files: Vec<PathBuf> = Vec::new();

    for entry in WalkDir::new(root).follow_links(config.follow_links) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .unwrap_or(root)
                    .display()
                    .to_string();
                report.record(&path, Err(Error::unreadable(&path, err)));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(wanted));
        if matches {
            files.push(entry.into_path());
        }
    }

    files.sort();
    debug!(root = %root.display(), files = files.len(), "directory scanned");
    for path in files {
        report.record(&path.display().to_string(), load_file(&path, config));
    }
    report
}

// ── Session ─────────────────────────────────────────────────────────────

/// Owns loaded datasets and answers read-only queries over them.
#[derive(Debug, Clone, Default)]
pub struct Session {
    aggregate: AggregateConfig,
    datasets: Vec<LoadedDataset>,
}

impl Session {
    pub fn new(aggregate: AggregateConfig) -> Self {
        Self {
            aggregate,
            datasets: Vec::new(),
        }
    }

    pub fn with_datasets(mut self, datasets: impl IntoIterator<Item = LoadedDataset>) -> Self {
        self.extend(datasets);
        self
    }

    pub fn extend(&mut self, datasets: impl IntoIterator<Item = LoadedDataset>) {
        self.datasets.extend(datasets);
    }

    pub fn datasets(&self) -> &[LoadedDataset] {
        &self.datasets
    }

    /// A query for `kind` carrying this session's aggregation defaults.
    pub fn query(&self, kind: RecordKind) -> AggregateQuery {
        AggregateQuery::from_config(kind, &self.aggregate)
    }

    pub fn aggregate(&self, query: &AggregateQuery) -> Result<SeriesReport> {
        aggregate(self.datasets.iter().map(|d| &d.records), query)
    }

    pub fn catalog(&self) -> Catalog<'_> {
        Catalog::new(&self.datasets)
    }
}
