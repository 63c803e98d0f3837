//! Pipeline configuration types.
//!
//! Every field has a default, so a config file only needs to name the values
//! it overrides. Unknown keys are rejected to catch typos early.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::CONFIG_SCHEMA_VERSION;

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub schema_version: String,

    /// Streaming reader and file discovery settings.
    pub ingest: IngestConfig,

    /// Bucketing, grouping caps and output budget.
    pub aggregate: AggregateConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION.to_string(),
            ingest: IngestConfig::default(),
            aggregate: AggregateConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parse from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// JSON Schema describing the configuration file.
    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(PipelineConfig)
    }
}

/// Settings for the streaming CSV reader and directory walks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// First line holds column names.
    pub has_header: bool,

    /// Emit a progress log line every N accepted rows.
    pub progress_every_rows: u64,

    /// Extension (without dot) of files picked up by directory walks.
    pub file_extension: String,

    /// Follow symlinks during directory walks.
    pub follow_links: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            has_header: true,
            progress_every_rows: 100_000,
            file_extension: "csv".to_string(),
            follow_links: false,
        }
    }
}

/// Settings for the aggregation engine and downsampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct AggregateConfig {
    /// Bucket width in seconds.
    pub bucket_secs: i64,

    /// Padding applied on both sides of a time window, in seconds.
    pub window_pad_secs: f64,

    /// Maximum number of services charted for log/metric_app kinds.
    pub service_cap: usize,

    /// Number of KPIs charted when no allow-list is given.
    pub kpi_cap: usize,

    /// Point budget handed to the downsampler.
    pub max_points: usize,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            bucket_secs: 60,
            window_pad_secs: 1.0,
            service_cap: 5,
            kpi_cap: 20,
            max_points: 1500,
        }
    }
}
