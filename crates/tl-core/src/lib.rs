//! Telemetry Lens core library.
//!
//! Loads telemetry CSV exports (application logs and metrics, container
//! metrics, trace spans, incident records and query logs), detects their kind
//! from the file name, coerces rows into typed records and turns them into
//! time-bucketed, downsampled series ready for charting.
//!
//! The pipeline runs in four stages:
//! - [`ingest`]: tolerant CSV reading with a parse report
//! - [`coerce`]: raw rows to typed [`records`]
//! - [`aggregate`]: bucketing by time, then [`downsample`] to a point budget
//! - [`catalog`]: entity lists, time range and counts over a session

pub mod aggregate;
pub mod catalog;
pub mod cli;
pub mod coerce;
pub mod detect;
pub mod downsample;
pub mod exit_codes;
pub mod ingest;
pub mod logging;
pub mod pipeline;
pub mod records;

pub use aggregate::{aggregate, AggregateQuery, EntityFilter, Series, SeriesReport};
pub use catalog::{Catalog, CatalogSnapshot};
pub use exit_codes::ExitCode;
pub use pipeline::{load_directory, load_file, load_paths, load_reader, BatchReport, LoadedDataset, Session};
pub use records::Records;
