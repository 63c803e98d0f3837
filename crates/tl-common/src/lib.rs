//! Telemetry Lens common types, IDs, and errors.
//!
//! This crate provides foundational types shared across tl-core modules:
//! - The closed set of telemetry record kinds
//! - Batch identity for multi-file loads
//! - Common error types with stable codes
//! - Output format specifications

pub mod error;
pub mod id;
pub mod kind;
pub mod output;
pub mod schema;

pub use error::{Error, Result};
pub use id::BatchId;
pub use kind::RecordKind;
pub use output::OutputFormat;
pub use schema::SCHEMA_VERSION;
