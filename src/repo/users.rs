//! User profile records.
//!
//! Profiles are keyed by the identity provider's user id rather than a
//! store-assigned one, so they are written with `set` instead of `add`.

use super::{FIELD_CREATED_AT, FIELD_UPDATED_AT, req_instant, req_str, timestamp_value};
use crate::clock::Clock;
use crate::document::{Document, DocumentResult, DocumentStore};
use crate::error::{RepoError, RepoResult};
use crate::types::{EntityKind, User};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

pub const USERS_COLLECTION: &str = "users";

const FIELD_NAME: &str = "name";
const FIELD_EMAIL: &str = "email";

/// Name stored when the identity provider has no display name.
pub const DEFAULT_USER_NAME: &str = "User";

fn parse_user_doc(id: &str, doc: &Document) -> DocumentResult<User> {
    Ok(User {
        id: id.to_string(),
        name: req_str(doc, FIELD_NAME)?,
        email: req_str(doc, FIELD_EMAIL)?,
        created_at: req_instant(doc, FIELD_CREATED_AT)?,
        updated_at: req_instant(doc, FIELD_UPDATED_AT)?,
    })
}

#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Write a profile under `user_id`, replacing any existing one.
    pub async fn create(&self, user_id: &str, name: &str, email: &str) -> RepoResult<User> {
        let now = self.clock.now();
        let mut doc = Document::new();
        doc.insert(FIELD_NAME.to_string(), Value::from(name));
        doc.insert(FIELD_EMAIL.to_string(), Value::from(email));
        doc.insert(FIELD_CREATED_AT.to_string(), timestamp_value(now));
        doc.insert(FIELD_UPDATED_AT.to_string(), timestamp_value(now));

        self.store
            .set(USERS_COLLECTION, user_id, doc)
            .await
            .map_err(|e| RepoError::create_failed(EntityKind::User, e))?;

        debug!(user_id = %user_id, "user profile written");
        Ok(User {
            id: user_id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get(&self, user_id: &str) -> RepoResult<Option<User>> {
        let doc = self
            .store
            .get(USERS_COLLECTION, user_id)
            .await
            .map_err(|e| RepoError::fetch_failed(EntityKind::User, e))?;
        doc.map(|doc| parse_user_doc(user_id, &doc))
            .transpose()
            .map_err(|e| RepoError::fetch_failed(EntityKind::User, e))
    }

    /// Return the existing profile, creating one on first sign-in.
    pub async fn ensure(&self, user_id: &str, name: Option<&str>, email: &str) -> RepoResult<User> {
        if let Some(user) = self.get(user_id).await? {
            return Ok(user);
        }
        let name = name.filter(|n| !n.trim().is_empty()).unwrap_or(DEFAULT_USER_NAME);
        info!(user_id = %user_id, "creating profile on first sign-in");
        self.create(user_id, name, email).await
    }

    pub async fn update_name(&self, user_id: &str, name: &str) -> RepoResult<User> {
        let mut fields = Document::new();
        fields.insert(FIELD_NAME.to_string(), Value::from(name));
        fields.insert(FIELD_UPDATED_AT.to_string(), timestamp_value(self.clock.now()));

        self.store
            .update(USERS_COLLECTION, user_id, fields)
            .await
            .map_err(|e| RepoError::from_update(EntityKind::User, user_id, e))?;

        self.get(user_id)
            .await?
            .ok_or_else(|| {
                RepoError::update_failed(EntityKind::User, user_id, "not found after write")
            })
    }
}
