//! Request building for the Optica query endpoint.
//!
//! A [`QueryBuilder`] collects filters and a field selection, then freezes
//! them into a [`QueryDescriptor`] that renders to a request URI. By default
//! a query asks for the minimal field set through the `/roles` endpoint;
//! [`QueryBuilder::select`] adds fields on top of it and
//! [`QueryBuilder::select_all`] switches to the full record at the service
//! root.
//!
//! Rendered URIs double as cache keys, so rendering is deterministic:
//! parameters appear in filter insertion order with `_extra_fields` last.
//!
//! # Example
//!
//! ```
//! use optical_core::filter::parse_filters;
//! use optical_core::query::QueryBuilder;
//! use url::Url;
//!
//! let base = Url::parse("https://optica.example.com").unwrap();
//! let filters = parse_filters(&["role=web"]).unwrap();
//! let uri = QueryBuilder::new(base)
//!     .where_filters(filters)
//!     .select(["hostname"])
//!     .to_uri();
//! assert_eq!(uri.path(), "/roles");
//! ```

use url::Url;

use crate::filter::{Filter, FilterKind, FilterMap};

/// Path of the minimal-fields endpoint.
pub const ROLES_PATH: &str = "/roles";

/// Query parameter naming fields requested on top of the `/roles` defaults.
pub const EXTRA_FIELDS_PARAM: &str = "_extra_fields";

/// Which record fields the service should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMode {
    /// Full records from the service root.
    All,
    /// `/roles` defaults plus these fields (may be empty).
    Explicit(Vec<String>),
}

impl Default for FieldMode {
    fn default() -> Self {
        Self::Explicit(Vec::new())
    }
}

/// Accumulates filters and field selection for one request.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    base: Url,
    filters: FilterMap,
    fields: FieldMode,
}

/// Immutable, fully specified request shape.
#[derive(Debug, Clone)]
pub struct QueryDescriptor {
    base: Url,
    filters: FilterMap,
    fields: FieldMode,
}

impl QueryBuilder {
    /// Starts a request against the given service root.
    #[must_use]
    pub fn new(base: Url) -> Self {
        Self {
            base,
            filters: FilterMap::new(),
            fields: FieldMode::default(),
        }
    }

    /// Merges filters into the request. Later keys replace earlier ones.
    #[must_use]
    pub fn where_filters(mut self, filters: FilterMap) -> Self {
        for (key, filter) in filters {
            self.filters.insert(key, filter);
        }
        self
    }

    /// Adds extra fields to fetch. Ignored once all fields are selected.
    #[must_use]
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let FieldMode::Explicit(selected) = &mut self.fields {
            for field in fields {
                let field = field.into();
                if !selected.contains(&field) {
                    selected.push(field);
                }
            }
        }
        self
    }

    /// Requests full records, discarding any explicit field list.
    #[must_use]
    pub fn select_all(mut self) -> Self {
        self.fields = FieldMode::All;
        self
    }

    /// Applies a [`FieldMode`] as if by `select` or `select_all`.
    #[must_use]
    pub fn fields(self, mode: FieldMode) -> Self {
        match mode {
            FieldMode::All => self.select_all(),
            FieldMode::Explicit(fields) => self.select(fields),
        }
    }

    /// Freezes the builder.
    #[must_use]
    pub fn build(self) -> QueryDescriptor {
        QueryDescriptor {
            base: self.base,
            filters: self.filters,
            fields: self.fields,
        }
    }

    /// Renders the request URI without consuming the builder.
    #[must_use]
    pub fn to_uri(&self) -> Url {
        render_uri(&self.base, &self.filters, &self.fields)
    }
}

impl QueryDescriptor {
    /// Service root the request targets.
    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Filters in rendering order.
    #[must_use]
    pub fn filters(&self) -> &FilterMap {
        &self.filters
    }

    /// Field selection.
    #[must_use]
    pub fn field_mode(&self) -> &FieldMode {
        &self.fields
    }

    /// Renders the request URI.
    #[must_use]
    pub fn to_uri(&self) -> Url {
        render_uri(&self.base, &self.filters, &self.fields)
    }

    /// Query parameters as rendered, before form encoding.
    #[must_use]
    pub fn query_params(&self) -> Vec<(String, String)> {
        query_params(&self.filters, &self.fields)
    }
}

fn render_uri(base: &Url, filters: &FilterMap, fields: &FieldMode) -> Url {
    let mut uri = base.clone();
    if !matches!(fields, FieldMode::All) {
        uri.set_path(ROLES_PATH);
    }

    let params = query_params(filters, fields);
    if params.is_empty() {
        uri.set_query(None);
    } else {
        uri.query_pairs_mut().clear().extend_pairs(params);
    }
    uri
}

fn query_params(filters: &FilterMap, fields: &FieldMode) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = filters
        .iter()
        .map(|(key, filter)| (key.clone(), filter_to_param(filter)))
        .collect();

    if let FieldMode::Explicit(selected) = fields
        && !selected.is_empty()
    {
        params.push((EXTRA_FIELDS_PARAM.to_string(), selected.join(",")));
    }
    params
}

/// Encodes a filter the way the service expects: every parameter is a regex.
fn filter_to_param(filter: &Filter) -> String {
    match &filter.kind {
        FilterKind::Exact(literal) => format!("^{}$", regex::escape(literal)),
        FilterKind::Regex(pattern) => pattern.as_str().to_string(),
        FilterKind::Set(members) => members.join(","),
    }
}
