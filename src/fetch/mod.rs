//! HTTP fetching with streaming progress.
//!
//! # Features
//!
//! - Single GET per request, TLS when the scheme is https
//! - Streaming body with a progress callback per chunk
//! - No automatic retries and no timeout unless configured
//! - Structured error types with full context

mod client;
mod error;
mod progress;

pub use client::HttpClient;
pub use error::FetchError;
pub use progress::ProgressEvent;
