//! In-memory document store.
//!
//! Holds each collection in a `tokio::sync::RwLock<HashMap<..>>`. The store
//! can be switched offline, after which every call fails with
//! [`DocumentError::Unavailable`] until it is switched back on.

use super::{Document, DocumentError, DocumentResult, DocumentStore, Query, merge_fields};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Collections keyed by name; documents keyed by id. Ids are UUID7, so the
/// `BTreeMap` iterates in insertion order.
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
    online: AtomicBool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            online: AtomicBool::new(true),
        }
    }

    /// Simulate losing (or regaining) the connection to the remote store.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Number of documents in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        let collections = self.collections.read().await;
        collections.get(collection).map_or(0, BTreeMap::len)
    }

    fn check_online(&self) -> DocumentResult<()> {
        if self.is_online() {
            Ok(())
        } else {
            Err(DocumentError::Unavailable("remote store is offline".to_string()))
        }
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn add(&self, collection: &str, data: Document) -> DocumentResult<String> {
        self.check_online()?;
        let id = Uuid::now_v7().to_string();
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), data);
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> DocumentResult<Option<Document>> {
        self.check_online()?;
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn set(&self, collection: &str, id: &str, data: Document) -> DocumentResult<()> {
        self.check_online()?;
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> DocumentResult<()> {
        self.check_online()?;
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| DocumentError::not_found(collection, id))?;
        merge_fields(doc, fields);
        Ok(())
    }

    async fn update_if(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        expected: &Value,
        fields: Document,
    ) -> DocumentResult<()> {
        self.check_online()?;
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| DocumentError::not_found(collection, id))?;
        if doc.get(field) != Some(expected) {
            return Err(DocumentError::PreconditionFailed {
                collection: collection.to_string(),
                id: id.to_string(),
                field: field.to_string(),
            });
        }
        merge_fields(doc, fields);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> DocumentResult<()> {
        self.check_online()?;
        let mut collections = self.collections.write().await;
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query: &Query,
    ) -> DocumentResult<Vec<(String, Document)>> {
        self.check_online()?;
        let collections = self.collections.read().await;
        let docs = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Ok(query.apply(docs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_add_assigns_distinct_ids() {
        let store = MemoryDocumentStore::new();
        let a = store.add("tasks", doc(json!({ "title": "a" }))).await.unwrap();
        let b = store.add("tasks", doc(json!({ "title": "b" }))).await.unwrap();
        assert!(!a.is_empty());
        assert_ne!(a, b);
        assert_eq!(store.count("tasks").await, 2);
    }

    #[tokio::test]
    async fn test_update_missing_document_fails() {
        let store = MemoryDocumentStore::new();
        let err = store
            .update("tasks", "nope", doc(json!({ "title": "x" })))
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_if_checks_precondition() {
        let store = MemoryDocumentStore::new();
        store.set("tasks", "t1", doc(json!({ "rev": 1 }))).await.unwrap();

        let err = store
            .update_if("tasks", "t1", "rev", &json!(2), doc(json!({ "rev": 3 })))
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::PreconditionFailed { .. }));

        store
            .update_if("tasks", "t1", "rev", &json!(1), doc(json!({ "rev": 2 })))
            .await
            .unwrap();
        let stored = store.get("tasks", "t1").await.unwrap().unwrap();
        assert_eq!(stored.get("rev"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryDocumentStore::new();
        let id = store.add("tasks", doc(json!({}))).await.unwrap();
        store.delete("tasks", &id).await.unwrap();
        store.delete("tasks", &id).await.unwrap();
        store.delete("never-created", "x").await.unwrap();
        assert!(store.get("tasks", &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_offline_rejects_every_call() {
        let store = MemoryDocumentStore::new();
        store.set_online(false);
        assert!(matches!(
            store.add("tasks", doc(json!({}))).await,
            Err(DocumentError::Unavailable(_))
        ));
        assert!(matches!(
            store.query("tasks", &Query::new()).await,
            Err(DocumentError::Unavailable(_))
        ));
        store.set_online(true);
        assert!(store.query("tasks", &Query::new()).await.unwrap().is_empty());
    }
}
