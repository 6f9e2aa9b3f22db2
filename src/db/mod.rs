//! SQLite-backed document store.
//!
//! Documents live in a single `documents` table as JSON text, keyed by
//! `(collection, id)`. Queries load one collection and filter/order in
//! process with the same rules as the in-memory store.

use crate::document::{
    Document, DocumentError, DocumentResult, DocumentStore, Query, merge_fields,
};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Database handle wrapping a SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for concurrent access
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA busy_timeout=5000;",
        )?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.run_migrations()?;

        Ok(db)
    }

    fn run_migrations(&self) -> anyhow::Result<()> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database connection lock poisoned"))?;
        embedded::migrations::runner().run(&mut *conn)?;
        Ok(())
    }

    /// Execute a function with exclusive access to the connection.
    ///
    /// The whole closure runs under the connection lock, so read-modify-write
    /// sequences inside it are atomic with respect to other callers.
    pub fn with_conn<F, T>(&self, f: F) -> DocumentResult<T>
    where
        F: FnOnce(&Connection) -> DocumentResult<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|_| DocumentError::Backend("database connection lock poisoned".to_string()))?;
        f(&conn)
    }
}

fn backend(err: rusqlite::Error) -> DocumentError {
    DocumentError::Backend(err.to_string())
}

fn encode(doc: &Document) -> DocumentResult<String> {
    serde_json::to_string(doc).map_err(|e| DocumentError::malformed(e.to_string()))
}

fn decode(data: &str) -> DocumentResult<Document> {
    serde_json::from_str(data).map_err(|e| DocumentError::malformed(e.to_string()))
}

fn get_internal(conn: &Connection, collection: &str, id: &str) -> DocumentResult<Option<Document>> {
    let data: Option<String> = conn
        .query_row(
            "SELECT data FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
            |row| row.get(0),
        )
        .optional()
        .map_err(backend)?;
    data.as_deref().map(decode).transpose()
}

fn put_internal(
    conn: &Connection,
    collection: &str,
    id: &str,
    doc: &Document,
) -> DocumentResult<()> {
    conn.execute(
        "INSERT INTO documents (collection, id, data) VALUES (?1, ?2, ?3)
         ON CONFLICT(collection, id) DO UPDATE SET data = excluded.data",
        params![collection, id, encode(doc)?],
    )
    .map_err(backend)?;
    Ok(())
}

#[async_trait]
impl DocumentStore for Database {
    async fn add(&self, collection: &str, data: Document) -> DocumentResult<String> {
        let id = Uuid::now_v7().to_string();
        self.with_conn(|conn| put_internal(conn, collection, &id, &data))?;
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> DocumentResult<Option<Document>> {
        self.with_conn(|conn| get_internal(conn, collection, id))
    }

    async fn set(&self, collection: &str, id: &str, data: Document) -> DocumentResult<()> {
        self.with_conn(|conn| put_internal(conn, collection, id, &data))
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> DocumentResult<()> {
        self.with_conn(|conn| {
            let mut doc = get_internal(conn, collection, id)?
                .ok_or_else(|| DocumentError::not_found(collection, id))?;
            merge_fields(&mut doc, fields);
            put_internal(conn, collection, id, &doc)
        })
    }

    async fn update_if(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        expected: &Value,
        fields: Document,
    ) -> DocumentResult<()> {
        self.with_conn(|conn| {
            let mut doc = get_internal(conn, collection, id)?
                .ok_or_else(|| DocumentError::not_found(collection, id))?;
            if doc.get(field) != Some(expected) {
                return Err(DocumentError::PreconditionFailed {
                    collection: collection.to_string(),
                    id: id.to_string(),
                    field: field.to_string(),
                });
            }
            merge_fields(&mut doc, fields);
            put_internal(conn, collection, id, &doc)
        })
    }

    async fn delete(&self, collection: &str, id: &str) -> DocumentResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            )
            .map_err(backend)?;
            Ok(())
        })
    }

    async fn query(
        &self,
        collection: &str,
        query: &Query,
    ) -> DocumentResult<Vec<(String, Document)>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, data FROM documents WHERE collection = ?1 ORDER BY id")
                .map_err(backend)?;
            let rows = stmt
                .query_map(params![collection], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(backend)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(backend)?;
            Ok(rows)
        })?;

        let docs = rows
            .into_iter()
            .map(|(id, data)| decode(&data).map(|doc| (id, doc)))
            .collect::<DocumentResult<Vec<_>>>()?;
        Ok(query.apply(docs))
    }
}
