//! Document store contract.
//!
//! Collections hold schemaless JSON objects keyed by a store-assigned id.
//! Queries support equality filters and ordering on a single field. The
//! repository layer is the only consumer of this contract.

mod memory;
mod timestamp;

pub use memory::MemoryDocumentStore;
pub use timestamp::{TIMESTAMP_TAG, Timestamp};

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use thiserror::Error;

/// A schemaless document body.
pub type Document = Map<String, Value>;

/// Failures reported by a document store backend.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("precondition on field '{field}' failed for {collection}/{id}")]
    PreconditionFailed {
        collection: String,
        id: String,
        field: String,
    },

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl DocumentError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed(reason.into())
    }
}

pub type DocumentResult<T> = Result<T, DocumentError>;

/// Sort direction for a query's ordering field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Equality filters plus an optional ordering field.
#[derive(Debug, Clone, Default)]
pub struct Query {
    filters: Vec<(String, Value)>,
    order_by: Option<(String, Direction)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only documents whose `field` equals `value`.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    /// Order results by `field`. A later call replaces an earlier one.
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected))
    }

    /// Filter and order `(id, document)` pairs. Ties keep their input order.
    pub fn apply<I>(&self, docs: I) -> Vec<(String, Document)>
    where
        I: IntoIterator<Item = (String, Document)>,
    {
        let mut matched: Vec<(String, Document)> =
            docs.into_iter().filter(|(_, doc)| self.matches(doc)).collect();

        if let Some((field, direction)) = &self.order_by {
            matched.sort_by(|(_, a), (_, b)| {
                let ord = compare_values(a.get(field), b.get(field));
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        matched
    }
}

/// Total order over field values used by query ordering.
///
/// Missing fields sort first. Timestamps compare chronologically, numbers
/// numerically, strings lexically. Values of different types order by type.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (a, b) = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Less,
        (Some(_), None) => return Ordering::Greater,
        (Some(a), Some(b)) => (a, b),
    };

    if let (Some(x), Some(y)) = (Timestamp::from_value(a), Timestamp::from_value(b)) {
        return x.cmp(&y);
    }

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Object(_) if Timestamp::from_value(value).is_some() => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

/// Shallow merge of `fields` into `target`. A `null` field removes the key.
pub fn merge_fields(target: &mut Document, fields: Document) {
    for (key, value) in fields {
        if value.is_null() {
            target.remove(&key);
        } else {
            target.insert(key, value);
        }
    }
}

/// Collection-scoped CRUD and query operations of a document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document. The store assigns and returns a fresh id.
    async fn add(&self, collection: &str, data: Document) -> DocumentResult<String>;

    /// Fetch a document by id. A missing document is `Ok(None)`.
    async fn get(&self, collection: &str, id: &str) -> DocumentResult<Option<Document>>;

    /// Create or replace the document stored under a caller-chosen id.
    async fn set(&self, collection: &str, id: &str, data: Document) -> DocumentResult<()>;

    /// Merge fields into an existing document.
    ///
    /// Fails with [`DocumentError::NotFound`] if the document does not exist.
    async fn update(&self, collection: &str, id: &str, fields: Document) -> DocumentResult<()>;

    /// Merge fields only if `field` currently equals `expected`.
    ///
    /// The check and the write happen atomically. Fails with
    /// [`DocumentError::PreconditionFailed`] on mismatch.
    async fn update_if(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        expected: &Value,
        fields: Document,
    ) -> DocumentResult<()>;

    /// Remove a document. Removing a missing document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> DocumentResult<()>;

    /// Run a query over one collection, returning `(id, document)` pairs.
    async fn query(
        &self,
        collection: &str,
        query: &Query,
    ) -> DocumentResult<Vec<(String, Document)>>;
}
