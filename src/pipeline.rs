//! Query pipeline: filter tokens in, records out.
//!
//! One call parses the tokens, builds the request, serves it from the cache
//! or fetches it, and decodes the `nodes` mapping of the response. Records
//! come back in the order the service listed them.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::ResponseCache;
use crate::fetch::{FetchError, HttpClient, ProgressEvent};
use crate::filter::{FilterError, FilterKind, parse_filters};
use crate::query::{FieldMode, QueryBuilder, QueryDescriptor};

/// One node's attribute mapping, in the service's key order.
pub type Record = Map<String, Value>;

/// Successful query outcome. An empty `records` list is a valid result.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Request URI (also the cache key).
    pub uri: Url,
    /// Matching records.
    pub records: Vec<Record>,
}

impl QueryResult {
    /// True when the query matched nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Errors that can occur while running a query.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A filter token could not be parsed.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// The request failed.
    #[error(transparent)]
    Transport(#[from] FetchError),

    /// The body is not a JSON object with a `nodes` mapping.
    #[error("malformed response from {uri}: {source}")]
    MalformedResponse {
        /// Request URI.
        uri: String,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

impl PipelineError {
    /// True for errors caused by the user's input rather than the service.
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Self::Filter(_))
    }
}

#[derive(Debug, Deserialize)]
struct NodesResponse {
    nodes: Map<String, Value>,
}

/// Composes filter parsing, request building, caching and fetching.
///
/// The target host is fixed at construction; nothing is read from global
/// configuration.
#[derive(Debug, Clone)]
pub struct Pipeline {
    host: Url,
    client: HttpClient,
    cache: Option<ResponseCache>,
}

impl Pipeline {
    /// Creates a pipeline for `host`. Pass `None` for `cache` to always fetch.
    #[must_use]
    pub fn new(host: Url, client: HttpClient, cache: Option<ResponseCache>) -> Self {
        Self {
            host,
            client,
            cache,
        }
    }

    /// Optica host queries are sent to.
    #[must_use]
    pub fn host(&self) -> &Url {
        &self.host
    }

    /// Response cache, if enabled.
    #[must_use]
    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    /// Builds the request descriptor for the given tokens and fields.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Filter`] for the first bad token.
    pub fn descriptor<S: AsRef<str>>(
        &self,
        tokens: &[S],
        fields: FieldMode,
    ) -> Result<QueryDescriptor, PipelineError> {
        let filters = parse_filters(tokens)?;
        Ok(QueryBuilder::new(self.host.clone())
            .where_filters(filters)
            .fields(fields)
            .build())
    }

    /// Runs a query end to end.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Filter`] for the first bad token; nothing is fetched
    /// - [`PipelineError::Transport`] when the fetch fails; nothing is cached
    /// - [`PipelineError::MalformedResponse`] when the body cannot be decoded;
    ///   a fresh body is not cached and a cached copy is dropped
    ///
    /// A filter on an empty set (`key=[]`) matches nothing, so the result is
    /// empty and no request is sent.
    pub async fn query<S, P>(
        &self,
        tokens: &[S],
        fields: FieldMode,
        on_progress: P,
    ) -> Result<QueryResult, PipelineError>
    where
        S: AsRef<str>,
        P: FnMut(ProgressEvent),
    {
        let descriptor = self.descriptor(tokens, fields)?;
        self.execute(&descriptor, on_progress).await
    }

    /// Runs an already built request.
    ///
    /// # Errors
    ///
    /// Same as [`query`](Self::query), minus filter errors.
    pub async fn execute<P>(
        &self,
        descriptor: &QueryDescriptor,
        on_progress: P,
    ) -> Result<QueryResult, PipelineError>
    where
        P: FnMut(ProgressEvent),
    {
        let uri = descriptor.to_uri();
        let key = uri.as_str();

        if let Some(filter) = descriptor
            .filters()
            .values()
            .find(|filter| matches!(&filter.kind, FilterKind::Set(members) if members.is_empty()))
        {
            info!(key = %filter.key, "empty set filter matches nothing; skipping request");
            return Ok(QueryResult {
                uri,
                records: Vec::new(),
            });
        }

        info!(
            host = %descriptor.base(),
            filters = ?descriptor.query_params(),
            fields = ?descriptor.field_mode(),
            "GET {uri}"
        );

        let records = match &self.cache {
            Some(cache) => {
                // Fresh bodies are decoded before they are stored, so a
                // malformed response never reaches the cache.
                let mut fetched = None;
                let uri_ref = &uri;
                let body = cache
                    .get_or_fetch(key, || {
                        let slot = &mut fetched;
                        async move {
                            let body = self.client.fetch(uri_ref, on_progress).await?;
                            *slot = Some(decode_response(key, &body)?);
                            Ok::<_, PipelineError>(body)
                        }
                    })
                    .await?;
                match fetched {
                    Some(records) => records,
                    None => self.decode_cached(key, &body)?,
                }
            }
            None => {
                let body = self.client.fetch(&uri, on_progress).await?;
                decode_response(key, &body)?
            }
        };

        info!(entries = records.len(), "got {} entries", records.len());
        Ok(QueryResult { uri, records })
    }

    /// Decodes a body served from the cache, dropping the entry if it is
    /// not a valid response.
    fn decode_cached(&self, key: &str, body: &[u8]) -> Result<Vec<Record>, PipelineError> {
        decode_response(key, body).inspect_err(|_| {
            if let Some(cache) = &self.cache
                && let Err(error) = cache.invalidate(key)
            {
                warn!(%error, "failed to drop malformed cache entry");
            }
        })
    }
}

fn decode_response(uri: &str, body: &[u8]) -> Result<Vec<Record>, PipelineError> {
    decode_records(body).map_err(|source| PipelineError::MalformedResponse {
        uri: uri.to_string(),
        source,
    })
}

/// Decodes `{"nodes": {id: record, ...}}` into records, keeping order.
/// Non-object node values are skipped.
fn decode_records(body: &[u8]) -> Result<Vec<Record>, serde_json::Error> {
    let response: NodesResponse = serde_json::from_slice(body)?;
    Ok(response
        .nodes
        .into_iter()
        .filter_map(|(id, node)| match node {
            Value::Object(record) => Some(record),
            other => {
                debug!(id, value = %other, "skipping non-object node");
                None
            }
        })
        .collect())
}
