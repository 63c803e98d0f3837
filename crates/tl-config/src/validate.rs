//! Semantic validation of a parsed configuration.

use serde::Serialize;
use std::fmt;

use crate::pipeline::PipelineConfig;

/// A single rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `aggregate.bucket_secs`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Outcome of validating a configuration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check value ranges that serde cannot express.
pub fn validate(config: &PipelineConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if !tl_common::schema::is_compatible(&config.schema_version) {
        result.errors.push(ValidationError::new(
            "schema_version",
            format!(
                "unsupported version {} (expected {}.x)",
                config.schema_version,
                crate::CONFIG_SCHEMA_VERSION.split('.').next().unwrap_or("1")
            ),
        ));
    }

    let ingest = &config.ingest;
    if ingest.progress_every_rows == 0 {
        result.errors.push(ValidationError::new(
            "ingest.progress_every_rows",
            "must be at least 1",
        ));
    }
    if ingest.file_extension.trim().is_empty() {
        result.errors.push(ValidationError::new(
            "ingest.file_extension",
            "must not be empty",
        ));
    } else if ingest.file_extension.starts_with('.') {
        result.warnings.push(format!(
            "ingest.file_extension {:?} includes a leading dot; it is stripped when matching",
            ingest.file_extension
        ));
    }

    let agg = &config.aggregate;
    if agg.bucket_secs < 1 {
        result.errors.push(ValidationError::new(
            "aggregate.bucket_secs",
            format!("must be at least 1, got {}", agg.bucket_secs),
        ));
    }
    if !agg.window_pad_secs.is_finite() || agg.window_pad_secs < 0.0 {
        result.errors.push(ValidationError::new(
            "aggregate.window_pad_secs",
            format!("must be a finite non-negative number, got {}", agg.window_pad_secs),
        ));
    }
    if agg.service_cap == 0 {
        result
            .errors
            .push(ValidationError::new("aggregate.service_cap", "must be at least 1"));
    }
    if agg.kpi_cap == 0 {
        result
            .errors
            .push(ValidationError::new("aggregate.kpi_cap", "must be at least 1"));
    }
    if agg.max_points == 0 {
        result
            .errors
            .push(ValidationError::new("aggregate.max_points", "must be at least 1"));
    } else if agg.max_points > 100_000 {
        result.warnings.push(format!(
            "aggregate.max_points = {} is far above what a chart can render",
            agg.max_points
        ));
    }

    result
}
