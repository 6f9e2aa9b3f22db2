//! Integration tests for the client state stores.
//!
//! Every test runs against the in-memory document store, which can be
//! switched offline to drive the failure paths.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use taskdeck::clock::SystemClock;
use taskdeck::document::{
    Document, DocumentResult, DocumentStore, MemoryDocumentStore, Query, Timestamp,
};
use taskdeck::error::ErrorKind;
use taskdeck::repo::{EntityRepository, ProjectRepository, TaskRepository};
use taskdeck::store::{ProjectStore, TaskStore};
use taskdeck::types::{NewProject, NewTask, ProjectUpdate, TaskStatus, TaskUpdate};

/// Helper to create a task store over a fresh in-memory document store.
fn setup() -> (Arc<MemoryDocumentStore>, TaskStore) {
    let documents = Arc::new(MemoryDocumentStore::new());
    let repo = TaskRepository::new(documents.clone(), Arc::new(SystemClock::new()));
    (documents, TaskStore::new(repo))
}

fn task_doc(user_id: &str, title: &str, created: i64) -> Document {
    let at = Timestamp::new(created, 0).to_value();
    let value: Value = json!({
        "userId": user_id,
        "title": title,
        "status": "todo",
        "priority": "medium",
        "createdAt": at,
        "updatedAt": at,
    });
    value.as_object().cloned().unwrap()
}

/// Accepts writes but never finds a document when asked for it by id.
struct ForgetfulStore {
    inner: MemoryDocumentStore,
}

#[async_trait]
impl DocumentStore for ForgetfulStore {
    async fn add(&self, collection: &str, data: Document) -> DocumentResult<String> {
        self.inner.add(collection, data).await
    }

    async fn get(&self, _collection: &str, _id: &str) -> DocumentResult<Option<Document>> {
        Ok(None)
    }

    async fn set(&self, collection: &str, id: &str, data: Document) -> DocumentResult<()> {
        self.inner.set(collection, id, data).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> DocumentResult<()> {
        self.inner.update(collection, id, fields).await
    }

    async fn update_if(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        expected: &Value,
        fields: Document,
    ) -> DocumentResult<()> {
        self.inner.update_if(collection, id, field, expected, fields).await
    }

    async fn delete(&self, collection: &str, id: &str) -> DocumentResult<()> {
        self.inner.delete(collection, id).await
    }

    async fn query(
        &self,
        collection: &str,
        query: &Query,
    ) -> DocumentResult<Vec<(String, Document)>> {
        self.inner.query(collection, query).await
    }
}

fn ids(store: &TaskStore) -> Vec<String> {
    store.entities().into_iter().map(|t| t.id).collect()
}

mod fetch_tests {
    use super::*;

    #[tokio::test]
    async fn fetch_orders_newest_first() {
        let (documents, store) = setup();
        documents.set("tasks", "t1", task_doc("u1", "older", 3)).await.unwrap();
        documents.set("tasks", "t2", task_doc("u1", "newer", 5)).await.unwrap();

        assert!(store.fetch("u1").await);

        assert_eq!(ids(&store), vec!["t2", "t1"]);
        let state = store.snapshot();
        assert!(!state.loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn fetch_only_returns_owned_tasks() {
        let (documents, store) = setup();
        documents.set("tasks", "mine", task_doc("u1", "a", 1)).await.unwrap();
        documents.set("tasks", "theirs", task_doc("u2", "b", 2)).await.unwrap();

        assert!(store.fetch("u1").await);
        assert_eq!(ids(&store), vec!["mine"]);
    }

    #[tokio::test]
    async fn fetch_failure_keeps_stale_list() {
        let (documents, store) = setup();
        documents.set("tasks", "t1", task_doc("u1", "a", 1)).await.unwrap();
        assert!(store.fetch("u1").await);

        documents.set_online(false);
        assert!(!store.fetch("u1").await);

        let state = store.snapshot();
        assert_eq!(state.error.as_deref(), Some("Failed to fetch tasks"));
        assert!(!state.loading);
        assert_eq!(state.entities.len(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_for_another_owner_drops_stale_entities() {
        let (documents, store) = setup();
        documents.set("tasks", "t1", task_doc("u1", "a", 1)).await.unwrap();
        assert!(store.fetch("u1").await);

        documents.set_online(false);
        assert!(!store.fetch("u2").await);

        assert!(store.entities().is_empty());
        assert_eq!(store.snapshot().error.as_deref(), Some("Failed to fetch tasks"));
    }

    #[tokio::test]
    async fn malformed_document_fails_fetch() {
        let (documents, store) = setup();
        let mut bad = task_doc("u1", "a", 1);
        bad.insert("status".to_string(), json!("someday"));
        documents.set("tasks", "bad", bad).await.unwrap();

        assert!(!store.fetch("u1").await);
        assert_eq!(store.snapshot().error.as_deref(), Some("Failed to fetch tasks"));
    }
}

mod add_tests {
    use super::*;

    #[tokio::test]
    async fn add_prepends_created_task() {
        let (documents, store) = setup();
        documents.set("tasks", "t1", task_doc("u1", "existing", 1)).await.unwrap();
        assert!(store.fetch("u1").await);

        assert!(store.add(NewTask::new("u1", "fresh")).await);

        let tasks = store.entities();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "fresh");
        assert!(!tasks[0].id.is_empty());
        assert_eq!(tasks[0].created_at, tasks[0].updated_at);
        assert_eq!(tasks[1].id, "t1");
    }

    #[tokio::test]
    async fn add_assigns_unique_ids() {
        let (_documents, store) = setup();
        assert!(store.add(NewTask::new("u1", "a")).await);
        assert!(store.add(NewTask::new("u1", "b")).await);

        let tasks = store.entities();
        assert_ne!(tasks[0].id, tasks[1].id);
    }

    #[tokio::test]
    async fn add_while_offline_leaves_list_unchanged() {
        let (documents, store) = setup();
        documents.set("tasks", "t1", task_doc("u1", "a", 1)).await.unwrap();
        assert!(store.fetch("u1").await);
        let before = store.entities();

        documents.set_online(false);
        assert!(!store.add(NewTask::new("u1", "lost")).await);

        let state = store.snapshot();
        assert_eq!(state.entities, before);
        assert_eq!(state.error.as_deref(), Some("Failed to add task"));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn add_fails_when_created_task_cannot_be_read_back() {
        let documents = Arc::new(ForgetfulStore {
            inner: MemoryDocumentStore::new(),
        });
        documents.set("tasks", "t1", task_doc("u1", "existing", 1)).await.unwrap();
        let repo = TaskRepository::new(documents.clone(), Arc::new(SystemClock::new()));

        let err = repo.create(NewTask::new("u1", "vanishing")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::CreateFailed);

        let store = TaskStore::new(repo);
        assert!(store.fetch("u1").await);
        let before = store.entities();

        assert!(!store.add(NewTask::new("u1", "vanishing")).await);

        let state = store.snapshot();
        assert_eq!(state.entities, before);
        assert_eq!(state.error.as_deref(), Some("Failed to add task"));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn success_clears_previous_error() {
        let (documents, store) = setup();
        documents.set_online(false);
        assert!(!store.add(NewTask::new("u1", "a")).await);
        assert!(store.snapshot().error.is_some());

        documents.set_online(true);
        assert!(store.add(NewTask::new("u1", "a")).await);
        assert!(store.snapshot().error.is_none());
    }
}

mod edit_tests {
    use super::*;

    #[tokio::test]
    async fn edit_replaces_in_place() {
        let (documents, store) = setup();
        documents.set("tasks", "t1", task_doc("u1", "first", 3)).await.unwrap();
        documents.set("tasks", "t2", task_doc("u1", "second", 5)).await.unwrap();
        assert!(store.fetch("u1").await);
        let before = store.entities();

        assert!(store.edit("t1", TaskUpdate::status(TaskStatus::Completed)).await);

        let tasks = store.entities();
        assert_eq!(tasks[0], before[0]);
        assert_eq!(tasks[1].id, "t1");
        assert_eq!(tasks[1].status, TaskStatus::Completed);
        assert_eq!(tasks[1].title, "first");
        assert!(tasks[1].updated_at > tasks[1].created_at);
    }

    #[tokio::test]
    async fn edit_clears_optional_field() {
        let (_documents, store) = setup();
        let mut data = NewTask::new("u1", "with notes");
        data.description = Some("notes".to_string());
        assert!(store.add(data).await);
        let id = store.entities()[0].id.clone();

        let updates = TaskUpdate {
            description: Some(None),
            ..TaskUpdate::default()
        };
        assert!(store.edit(&id, updates).await);
        assert!(store.entities()[0].description.is_none());
    }

    #[tokio::test]
    async fn edit_missing_task_fails() {
        let (_documents, store) = setup();
        assert!(!store.edit("nope", TaskUpdate::status(TaskStatus::Completed)).await);
        assert_eq!(store.snapshot().error.as_deref(), Some("Failed to update task"));
    }

    #[tokio::test]
    async fn edit_checked_detects_concurrent_change() {
        let (_documents, store) = setup();
        assert!(store.add(NewTask::new("u1", "shared")).await);
        let seen = store.entities()[0].clone();

        // Someone else edits first
        assert!(store.edit(&seen.id, TaskUpdate::status(TaskStatus::InProgress)).await);

        let stale = TaskUpdate::status(TaskStatus::Completed);
        assert!(!store.edit_checked(&seen.id, seen.updated_at, stale).await);

        let state = store.snapshot();
        assert_eq!(state.error.as_deref(), Some("Failed to update task"));
        assert_eq!(state.entities[0].status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn edit_checked_applies_when_unchanged() {
        let (_documents, store) = setup();
        assert!(store.add(NewTask::new("u1", "solo")).await);
        let seen = store.entities()[0].clone();

        let updates = TaskUpdate::status(TaskStatus::Completed);
        assert!(store.edit_checked(&seen.id, seen.updated_at, updates).await);
        assert_eq!(store.entities()[0].status, TaskStatus::Completed);
    }
}

mod remove_tests {
    use super::*;

    #[tokio::test]
    async fn remove_filters_list() {
        let (documents, store) = setup();
        documents.set("tasks", "t1", task_doc("u1", "a", 1)).await.unwrap();
        documents.set("tasks", "t2", task_doc("u1", "b", 2)).await.unwrap();
        assert!(store.fetch("u1").await);

        assert!(store.remove("t1").await);

        assert_eq!(ids(&store), vec!["t2"]);
        assert_eq!(documents.count("tasks").await, 1);
    }

    #[tokio::test]
    async fn remove_missing_id_succeeds() {
        let (_documents, store) = setup();
        assert!(store.remove("never-existed").await);
        assert!(store.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn remove_while_offline_keeps_entity() {
        let (documents, store) = setup();
        documents.set("tasks", "t1", task_doc("u1", "a", 1)).await.unwrap();
        assert!(store.fetch("u1").await);

        documents.set_online(false);
        assert!(!store.remove("t1").await);
        assert_eq!(ids(&store), vec!["t1"]);
        assert_eq!(store.snapshot().error.as_deref(), Some("Failed to remove task"));
    }
}

mod notification_tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_final_state() {
        let (_documents, store) = setup();
        let mut rx = store.subscribe();

        assert!(store.add(NewTask::new("u1", "watched")).await);

        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update().clone();
        assert_eq!(state.entities.len(), 1);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn clear_resets_state() {
        let (_documents, store) = setup();
        assert!(store.add(NewTask::new("u1", "a")).await);
        store.clear();
        let state = store.snapshot();
        assert!(state.entities.is_empty());
        assert!(state.error.is_none());
    }
}

mod project_store_tests {
    use super::*;

    fn setup_projects() -> (Arc<MemoryDocumentStore>, ProjectStore) {
        let documents = Arc::new(MemoryDocumentStore::new());
        let repo = ProjectRepository::new(documents.clone(), Arc::new(SystemClock::new()));
        (documents, ProjectStore::new(repo))
    }

    #[tokio::test]
    async fn project_lifecycle() {
        let (documents, store) = setup_projects();
        let data = NewProject {
            name: "Home".to_string(),
            description: None,
            user_id: "u1".to_string(),
        };
        assert!(store.add(data).await);
        let id = store.entities()[0].id.clone();

        let updates = ProjectUpdate {
            name: Some("House".to_string()),
            ..ProjectUpdate::default()
        };
        assert!(store.edit(&id, updates).await);
        assert_eq!(store.entities()[0].name, "House");

        documents.set_online(false);
        assert!(!store.remove(&id).await);
        assert_eq!(store.snapshot().error.as_deref(), Some("Failed to remove project"));

        documents.set_online(true);
        assert!(store.remove(&id).await);
        assert!(store.entities().is_empty());
    }
}
