//! Task-to-category links.

use super::req_str;
use crate::document::{Document, DocumentResult, DocumentStore, Query};
use crate::error::{RepoError, RepoResult};
use crate::types::{EntityKind, TaskCategory};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub const TASK_CATEGORIES_COLLECTION: &str = "taskCategories";

const FIELD_TASK_ID: &str = "taskId";
const FIELD_CATEGORY_ID: &str = "categoryId";

fn parse_link_doc(doc: &Document) -> DocumentResult<TaskCategory> {
    Ok(TaskCategory {
        task_id: req_str(doc, FIELD_TASK_ID)?,
        category_id: req_str(doc, FIELD_CATEGORY_ID)?,
    })
}

fn pair_query(link: &TaskCategory) -> Query {
    Query::new()
        .where_eq(FIELD_TASK_ID, link.task_id.as_str())
        .where_eq(FIELD_CATEGORY_ID, link.category_id.as_str())
}

#[derive(Clone)]
pub struct TaskCategoryRepository {
    store: Arc<dyn DocumentStore>,
}

impl TaskCategoryRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Link a task to a category. Linking an existing pair is a no-op.
    pub async fn add(&self, link: &TaskCategory) -> RepoResult<()> {
        let existing = self
            .store
            .query(TASK_CATEGORIES_COLLECTION, &pair_query(link))
            .await
            .map_err(|e| RepoError::create_failed(EntityKind::TaskCategory, e))?;
        if !existing.is_empty() {
            return Ok(());
        }

        let mut doc = Document::new();
        doc.insert(FIELD_TASK_ID.to_string(), Value::from(link.task_id.as_str()));
        doc.insert(FIELD_CATEGORY_ID.to_string(), Value::from(link.category_id.as_str()));
        self.store
            .add(TASK_CATEGORIES_COLLECTION, doc)
            .await
            .map_err(|e| RepoError::create_failed(EntityKind::TaskCategory, e))?;

        debug!(task_id = %link.task_id, category_id = %link.category_id, "linked");
        Ok(())
    }

    pub async fn list_for_task(&self, task_id: &str) -> RepoResult<Vec<TaskCategory>> {
        let query = Query::new().where_eq(FIELD_TASK_ID, task_id);
        let docs = self
            .store
            .query(TASK_CATEGORIES_COLLECTION, &query)
            .await
            .map_err(|e| RepoError::fetch_failed(EntityKind::TaskCategory, e))?;
        docs.iter()
            .map(|(_, doc)| parse_link_doc(doc))
            .collect::<DocumentResult<Vec<_>>>()
            .map_err(|e| RepoError::fetch_failed(EntityKind::TaskCategory, e))
    }

    /// Remove a link. Removing a missing pair succeeds.
    pub async fn remove(&self, link: &TaskCategory) -> RepoResult<()> {
        let pair = format!("{}/{}", link.task_id, link.category_id);
        let docs = self
            .store
            .query(TASK_CATEGORIES_COLLECTION, &pair_query(link))
            .await
            .map_err(|e| RepoError::delete_failed(EntityKind::TaskCategory, &pair, e))?;
        for (id, _) in docs {
            self.store
                .delete(TASK_CATEGORIES_COLLECTION, &id)
                .await
                .map_err(|e| RepoError::delete_failed(EntityKind::TaskCategory, &pair, e))?;
        }
        Ok(())
    }
}
