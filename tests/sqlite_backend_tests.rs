//! Integration tests for the SQLite document store.
//!
//! These run the same repository and store operations as the in-memory
//! tests, against an in-memory SQLite database or a temp file.

use serde_json::json;
use std::sync::Arc;
use taskdeck::clock::SystemClock;
use taskdeck::db::Database;
use taskdeck::document::{Direction, Document, DocumentError, DocumentStore, Query, Timestamp};
use taskdeck::repo::TaskRepository;
use taskdeck::store::TaskStore;
use taskdeck::types::{NewTask, TaskStatus, TaskUpdate};

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

fn doc(value: serde_json::Value) -> Document {
    value.as_object().cloned().unwrap()
}

mod document_tests {
    use super::*;

    #[tokio::test]
    async fn add_then_get() {
        let db = setup_db();
        let id = db.add("notes", doc(json!({ "text": "hi" }))).await.unwrap();
        let stored = db.get("notes", &id).await.unwrap().unwrap();
        assert_eq!(stored["text"], json!("hi"));
        assert!(db.get("notes", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn collections_are_separate() {
        let db = setup_db();
        db.set("a", "x", doc(json!({ "n": 1 }))).await.unwrap();
        assert!(db.get("b", "x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_merges_and_null_removes() {
        let db = setup_db();
        db.set("notes", "n1", doc(json!({ "a": 1, "b": 2 }))).await.unwrap();
        db.update("notes", "n1", doc(json!({ "a": 10, "b": null, "c": 3 })))
            .await
            .unwrap();

        let stored = db.get("notes", "n1").await.unwrap().unwrap();
        assert_eq!(stored, doc(json!({ "a": 10, "c": 3 })));
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let db = setup_db();
        let err = db.update("notes", "nope", Document::new()).await.unwrap_err();
        assert!(matches!(err, DocumentError::NotFound { .. }));
    }

    #[tokio::test]
    async fn update_if_checks_field() {
        let db = setup_db();
        db.set("notes", "n1", doc(json!({ "rev": 1 }))).await.unwrap();

        let err = db
            .update_if("notes", "n1", "rev", &json!(0), doc(json!({ "rev": 2 })))
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::PreconditionFailed { .. }));

        db.update_if("notes", "n1", "rev", &json!(1), doc(json!({ "rev": 2 })))
            .await
            .unwrap();
        assert_eq!(db.get("notes", "n1").await.unwrap().unwrap()["rev"], json!(2));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let db = setup_db();
        db.set("notes", "n1", doc(json!({}))).await.unwrap();
        db.delete("notes", "n1").await.unwrap();
        db.delete("notes", "n1").await.unwrap();
        assert!(db.get("notes", "n1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn query_filters_and_orders() {
        let db = setup_db();
        for (id, owner, created) in [("a", "u1", 3), ("b", "u2", 4), ("c", "u1", 5)] {
            let data = doc(json!({
                "userId": owner,
                "createdAt": Timestamp::new(created, 0).to_value(),
            }));
            db.set("tasks", id, data).await.unwrap();
        }

        let query = Query::new()
            .where_eq("userId", "u1")
            .order_by("createdAt", Direction::Descending);
        let ids: Vec<String> = db
            .query("tasks", &query)
            .await
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["c", "a"]);
    }
}

mod persistence_tests {
    use super::*;

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taskdeck.db");

        let id = {
            let db = Database::open(&path).unwrap();
            db.add("notes", doc(json!({ "text": "kept" }))).await.unwrap()
        };

        let db = Database::open(&path).unwrap();
        let stored = db.get("notes", &id).await.unwrap().unwrap();
        assert_eq!(stored["text"], json!("kept"));
    }

    #[tokio::test]
    async fn task_store_over_sqlite() {
        let db: Arc<dyn DocumentStore> = Arc::new(setup_db());
        let store = TaskStore::new(TaskRepository::new(db, Arc::new(SystemClock::new())));

        assert!(store.add(NewTask::new("u1", "first")).await);
        assert!(store.add(NewTask::new("u1", "second")).await);
        let id = store.entities()[1].id.clone();
        assert!(store.edit(&id, TaskUpdate::status(TaskStatus::Completed)).await);

        // A fresh fetch agrees with the locally patched list
        let patched = store.entities();
        assert!(store.fetch("u1").await);
        assert_eq!(store.entities(), patched);
    }
}
