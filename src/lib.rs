//! Optical Core Library
//!
//! This library provides the query pipeline for the `optical` tool, a
//! read-only command-line client for Optica, a host-registration service.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`filter`] - `FIELD=FILTER` token parsing (exact, regex, set)
//! - [`query`] - Request building and canonical URI rendering
//! - [`cache`] - Time-bounded on-disk response cache keyed by request URI
//! - [`fetch`] - Streaming HTTP GET with progress reporting
//! - [`pipeline`] - Parse, build, cache-or-fetch, decode records

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod fetch;
pub mod filter;
pub mod pipeline;
pub mod query;
mod user_agent;

// Re-export commonly used types
pub use cache::{CacheEntry, CacheError, DEFAULT_MAX_AGE, ResponseCache};
pub use fetch::{FetchError, HttpClient, ProgressEvent};
pub use filter::{Filter, FilterError, FilterKind, FilterMap, parse_filter, parse_filters};
pub use pipeline::{Pipeline, PipelineError, QueryResult, Record};
pub use query::{FieldMode, QueryBuilder, QueryDescriptor};
