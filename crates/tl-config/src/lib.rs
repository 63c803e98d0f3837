//! Telemetry Lens configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the pipeline configuration file
//! - Config resolution (CLI → env → XDG → defaults)
//! - Semantic validation
//! - JSON Schema export for editors and agents

pub mod pipeline;
pub mod resolve;
pub mod validate;

pub use pipeline::{AggregateConfig, IngestConfig, PipelineConfig};
pub use resolve::{resolve_config, ConfigError, ConfigPaths, ConfigSource, ResolvedConfig};
pub use validate::{validate, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
