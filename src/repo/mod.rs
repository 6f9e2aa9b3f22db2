//! Entity repositories.
//!
//! The only code that talks to a [`DocumentStore`]. Each entity kind maps
//! its typed fields to a document through [`DocumentModel`]; the generic
//! [`DocumentRepository`] supplies create/read/update/delete/list on top of
//! that mapping. Every backend failure is converted to a [`RepoError`]
//! before it leaves this module.
//!
//! Ordering: `list_by_owner` asks the store for `createdAt` descending for
//! every kind and does not re-sort.

pub mod categories;
pub mod projects;
pub mod task_categories;
pub mod tasks;
pub mod users;

pub use task_categories::TaskCategoryRepository;
pub use users::UserRepository;

use crate::clock::Clock;
use crate::document::{
    Direction, Document, DocumentError, DocumentResult, DocumentStore, Query, Timestamp,
};
use crate::error::{RepoError, RepoResult};
use crate::types::{Category, DueDate, Entity, EntityKind, Project, Task};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

pub const FIELD_USER_ID: &str = "userId";
pub const FIELD_CREATED_AT: &str = "createdAt";
pub const FIELD_UPDATED_AT: &str = "updatedAt";

pub type TaskRepository = DocumentRepository<Task>;
pub type ProjectRepository = DocumentRepository<Project>;
pub type CategoryRepository = DocumentRepository<Category>;

/// Typed CRUD operations for one entity kind.
#[async_trait]
pub trait EntityRepository: Send + Sync {
    type Entity: Entity;
    type Create: Send + 'static;
    type Update: Send + 'static;

    fn kind(&self) -> EntityKind;

    /// Create an entity. The repository assigns id, `created_at` and
    /// `updated_at` (equal on creation).
    async fn create(&self, data: Self::Create) -> RepoResult<Self::Entity>;

    /// Read by id; a missing entity is `Ok(None)`.
    async fn read(&self, id: &str) -> RepoResult<Option<Self::Entity>>;

    /// Merge `updates` into the stored entity and refresh `updated_at`.
    async fn update(&self, id: &str, updates: Self::Update) -> RepoResult<Self::Entity>;

    /// Like [`update`](Self::update), but fails with `Conflict` unless the
    /// stored `updated_at` still equals `expected_updated_at`.
    async fn update_checked(
        &self,
        id: &str,
        expected_updated_at: DateTime<Utc>,
        updates: Self::Update,
    ) -> RepoResult<Self::Entity>;

    /// Delete by id. Deleting a missing entity succeeds.
    async fn delete(&self, id: &str) -> RepoResult<()>;

    /// All entities owned by `user_id`, newest first.
    async fn list_by_owner(&self, user_id: &str) -> RepoResult<Vec<Self::Entity>>;
}

/// Mapping between an entity type and its document representation.
pub trait DocumentModel: Entity + Sized {
    type Create: Send + 'static;
    type Update: Send + 'static;

    const KIND: EntityKind;
    const COLLECTION: &'static str;

    /// Document fields for a new entity, without id or timestamps.
    fn create_document(data: Self::Create) -> Document;

    /// Fields to merge for an update. `null` values clear a field.
    fn update_document(updates: Self::Update) -> Document;

    fn from_document(id: &str, doc: &Document) -> DocumentResult<Self>;
}

/// Repository for any [`DocumentModel`] over a shared document store.
pub struct DocumentRepository<M> {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    _model: PhantomData<fn() -> M>,
}

impl<M: DocumentModel> DocumentRepository<M> {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            _model: PhantomData,
        }
    }

    async fn read_back(&self, id: &str) -> DocumentResult<Option<M>> {
        match self.store.get(M::COLLECTION, id).await? {
            Some(doc) => M::from_document(id, &doc).map(Some),
            None => Ok(None),
        }
    }
}

impl<M> Clone for DocumentRepository<M> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            _model: PhantomData,
        }
    }
}

#[async_trait]
impl<M: DocumentModel> EntityRepository for DocumentRepository<M> {
    type Entity = M;
    type Create = M::Create;
    type Update = M::Update;

    fn kind(&self) -> EntityKind {
        M::KIND
    }

    async fn create(&self, data: M::Create) -> RepoResult<M> {
        let now = timestamp_value(self.clock.now());
        let mut doc = M::create_document(data);
        doc.insert(FIELD_CREATED_AT.to_string(), now.clone());
        doc.insert(FIELD_UPDATED_AT.to_string(), now);

        let id = self
            .store
            .add(M::COLLECTION, doc)
            .await
            .map_err(|e| RepoError::create_failed(M::KIND, e))?;

        let created = self
            .read_back(&id)
            .await
            .map_err(|e| RepoError::create_failed(M::KIND, e))?
            .ok_or_else(|| {
                RepoError::create_failed(M::KIND, format!("document {} missing after write", id))
            })?;

        debug!(kind = M::KIND.singular(), id = %id, "created");
        Ok(created)
    }

    async fn read(&self, id: &str) -> RepoResult<Option<M>> {
        self.read_back(id)
            .await
            .map_err(|e| RepoError::fetch_failed(M::KIND, e))
    }

    async fn update(&self, id: &str, updates: M::Update) -> RepoResult<M> {
        let mut fields = M::update_document(updates);
        fields.insert(FIELD_UPDATED_AT.to_string(), timestamp_value(self.clock.now()));

        self.store
            .update(M::COLLECTION, id, fields)
            .await
            .map_err(|e| RepoError::from_update(M::KIND, id, e))?;

        let updated = self.updated(id).await?;
        debug!(kind = M::KIND.singular(), id = %id, "updated");
        Ok(updated)
    }

    async fn update_checked(
        &self,
        id: &str,
        expected_updated_at: DateTime<Utc>,
        updates: M::Update,
    ) -> RepoResult<M> {
        let mut fields = M::update_document(updates);
        fields.insert(FIELD_UPDATED_AT.to_string(), timestamp_value(self.clock.now()));
        let expected = timestamp_value(expected_updated_at);

        self.store
            .update_if(M::COLLECTION, id, FIELD_UPDATED_AT, &expected, fields)
            .await
            .map_err(|e| RepoError::from_update(M::KIND, id, e))?;

        let updated = self.updated(id).await?;
        debug!(kind = M::KIND.singular(), id = %id, "updated with precondition");
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        self.store
            .delete(M::COLLECTION, id)
            .await
            .map_err(|e| RepoError::delete_failed(M::KIND, id, e))?;
        debug!(kind = M::KIND.singular(), id = %id, "deleted");
        Ok(())
    }

    async fn list_by_owner(&self, user_id: &str) -> RepoResult<Vec<M>> {
        let query = Query::new()
            .where_eq(FIELD_USER_ID, user_id)
            .order_by(FIELD_CREATED_AT, Direction::Descending);

        let docs = self
            .store
            .query(M::COLLECTION, &query)
            .await
            .map_err(|e| RepoError::fetch_failed(M::KIND, e))?;

        let entities = docs
            .iter()
            .map(|(id, doc)| M::from_document(id, doc))
            .collect::<DocumentResult<Vec<M>>>()
            .map_err(|e| RepoError::fetch_failed(M::KIND, e))?;

        debug!(kind = M::KIND.singular(), user_id = %user_id, count = entities.len(), "listed");
        Ok(entities)
    }
}

impl<M: DocumentModel> DocumentRepository<M> {
    /// Read back after an update; a vanished document is an update failure.
    async fn updated(&self, id: &str) -> RepoResult<M> {
        self.read_back(id)
            .await
            .map_err(|e| RepoError::update_failed(M::KIND, id, e))?
            .ok_or_else(|| RepoError::update_failed(M::KIND, id, "not found after write"))
    }
}

// =============================================================================
// Field helpers shared by the document mappings
// =============================================================================

pub(crate) fn timestamp_value(dt: DateTime<Utc>) -> Value {
    Timestamp::from_datetime(dt).to_value()
}

/// Convert a caller-supplied due date to the store-native timestamp.
pub fn normalize_due_date(due: DueDate) -> Timestamp {
    match due {
        DueDate::Date(date) => Timestamp::from_date(date),
        DueDate::Instant(instant) => Timestamp::from_datetime(instant),
    }
}

pub(crate) fn due_date_value(due: DueDate) -> Value {
    normalize_due_date(due).to_value()
}

/// Accept a tagged store timestamp or an RFC 3339 string.
fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(ts) = Timestamp::from_value(value) {
        return ts.to_datetime();
    }
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn missing(field: &str) -> DocumentError {
    DocumentError::malformed(format!("missing field '{}'", field))
}

pub(crate) fn req_str(doc: &Document, field: &str) -> DocumentResult<String> {
    opt_str(doc, field)?.ok_or_else(|| missing(field))
}

pub(crate) fn opt_str(doc: &Document, field: &str) -> DocumentResult<Option<String>> {
    match doc.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(DocumentError::malformed(format!("field '{}' is not a string", field))),
    }
}

pub(crate) fn req_instant(doc: &Document, field: &str) -> DocumentResult<DateTime<Utc>> {
    opt_instant(doc, field)?.ok_or_else(|| missing(field))
}

pub(crate) fn opt_instant(doc: &Document, field: &str) -> DocumentResult<Option<DateTime<Utc>>> {
    match doc.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => parse_instant(value)
            .map(Some)
            .ok_or_else(|| {
                DocumentError::malformed(format!("field '{}' is not a timestamp", field))
            }),
    }
}

pub(crate) fn opt_str_list(doc: &Document, field: &str) -> DocumentResult<Option<Vec<String>>> {
    match doc.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| {
                        DocumentError::malformed(format!("field '{}' holds a non-string", field))
                    })
            })
            .collect::<DocumentResult<Vec<_>>>()
            .map(Some),
        Some(_) => Err(DocumentError::malformed(format!("field '{}' is not a list", field))),
    }
}

/// Insert `value` only when present.
pub(crate) fn put_opt(doc: &mut Document, field: &str, value: Option<Value>) {
    if let Some(value) = value {
        doc.insert(field.to_string(), value);
    }
}

/// Encode a partial-update field: untouched, cleared (`null`), or set.
pub(crate) fn patch(doc: &mut Document, field: &str, value: Option<Option<Value>>) {
    match value {
        None => {}
        Some(None) => {
            doc.insert(field.to_string(), Value::Null);
        }
        Some(Some(value)) => {
            doc.insert(field.to_string(), value);
        }
    }
}
