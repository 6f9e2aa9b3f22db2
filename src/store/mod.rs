//! Client state stores.
//!
//! One [`EntityStore`] per entity kind holds the signed-in user's entities
//! for the session, plus `loading`/`error` flags. State lives in a
//! `tokio::sync::watch` channel: the presentation side subscribes and
//! re-renders whenever a store operation changes it.
//!
//! The list is a derived cache. `fetch` replaces it wholesale; `add`, `edit`
//! and `remove` patch it only after the repository confirms the write. A
//! repository failure is logged, reduced to a fixed message in `error`, and
//! leaves the list as it was.
//!
//! No lock is held across an await. Two overlapping `edit`s of the same id
//! therefore resolve last-response-wins; use [`EntityStore::edit_checked`]
//! to detect that case instead.

use crate::error::RepoError;
use crate::repo::{CategoryRepository, EntityRepository, ProjectRepository, TaskRepository};
use crate::types::{Entity, EntityKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

pub type TaskStore = EntityStore<TaskRepository>;
pub type ProjectStore = EntityStore<ProjectRepository>;
pub type CategoryStore = EntityStore<CategoryRepository>;

/// What a store exposes to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreState<E> {
    pub entities: Vec<E>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<E> Default for StoreState<E> {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            loading: false,
            error: None,
        }
    }
}

impl<E: Entity> StoreState<E> {
    pub fn get(&self, id: &str) -> Option<&E> {
        self.entities.iter().find(|e| e.id() == id)
    }
}

/// Store operations, used to pick the failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreAction {
    Fetch,
    Add,
    Edit,
    Remove,
}

impl StoreAction {
    fn verb(&self) -> &'static str {
        match self {
            StoreAction::Fetch => "fetch",
            StoreAction::Add => "add",
            StoreAction::Edit => "update",
            StoreAction::Remove => "remove",
        }
    }
}

/// The fixed, user-facing message stored in `error` when `action` fails.
pub fn failure_message(kind: EntityKind, action: StoreAction) -> String {
    let noun = match action {
        StoreAction::Fetch => kind.plural(),
        _ => kind.singular(),
    };
    format!("Failed to {} {}", action.verb(), noun)
}

/// Session-wide cache of one entity kind for the signed-in user.
pub struct EntityStore<R: EntityRepository> {
    repo: R,
    state: watch::Sender<StoreState<R::Entity>>,
}

impl<R: EntityRepository> EntityStore<R> {
    pub fn new(repo: R) -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self { repo, state }
    }

    pub fn kind(&self) -> EntityKind {
        self.repo.kind()
    }

    /// Receive a notification on every state change.
    pub fn subscribe(&self) -> watch::Receiver<StoreState<R::Entity>> {
        self.state.subscribe()
    }

    /// Current state.
    pub fn snapshot(&self) -> StoreState<R::Entity> {
        self.state.borrow().clone()
    }

    /// The message left by the last failed operation, if it has not been
    /// cleared by a later success.
    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn entities(&self) -> Vec<R::Entity> {
        self.state.borrow().entities.clone()
    }

    /// Replace the list with everything `user_id` owns.
    ///
    /// On failure the previous list stays in place, minus anything owned by
    /// someone other than `user_id`.
    pub async fn fetch(&self, user_id: &str) -> bool {
        self.begin();
        match self.repo.list_by_owner(user_id).await {
            Ok(entities) => {
                debug!(kind = self.kind().singular(), count = entities.len(), "fetched");
                self.state.send_modify(|s| {
                    s.entities = entities;
                    s.loading = false;
                });
                true
            }
            Err(err) => {
                self.state
                    .send_modify(|s| s.entities.retain(|e| e.owner_id() == user_id));
                self.fail(StoreAction::Fetch, &err);
                false
            }
        }
    }

    /// Create an entity and, once confirmed, prepend it to the list.
    pub async fn add(&self, data: R::Create) -> bool {
        self.begin();
        match self.repo.create(data).await {
            Ok(created) => {
                self.state.send_modify(|s| {
                    s.entities.insert(0, created);
                    s.loading = false;
                    s.error = None;
                });
                true
            }
            Err(err) => {
                self.fail(StoreAction::Add, &err);
                false
            }
        }
    }

    /// Update an entity and replace it in place, keeping its list position.
    pub async fn edit(&self, id: &str, updates: R::Update) -> bool {
        self.begin();
        let result = self.repo.update(id, updates).await;
        self.finish_edit(id, result)
    }

    /// Update only if the stored entity's `updated_at` still equals
    /// `expected_updated_at`; a concurrent change sets the update error.
    pub async fn edit_checked(
        &self,
        id: &str,
        expected_updated_at: DateTime<Utc>,
        updates: R::Update,
    ) -> bool {
        self.begin();
        let result = self.repo.update_checked(id, expected_updated_at, updates).await;
        self.finish_edit(id, result)
    }

    /// Delete an entity and drop it from the list once confirmed.
    pub async fn remove(&self, id: &str) -> bool {
        self.begin();
        match self.repo.delete(id).await {
            Ok(()) => {
                self.state.send_modify(|s| {
                    s.entities.retain(|e| e.id() != id);
                    s.loading = false;
                    s.error = None;
                });
                true
            }
            Err(err) => {
                self.fail(StoreAction::Remove, &err);
                false
            }
        }
    }

    /// Drop all cached state (sign-out).
    pub fn clear(&self) {
        self.state.send_replace(StoreState::default());
    }

    fn finish_edit(&self, id: &str, result: Result<R::Entity, RepoError>) -> bool {
        match result {
            Ok(updated) => {
                self.state.send_modify(|s| {
                    if let Some(slot) = s.entities.iter_mut().find(|e| e.id() == id) {
                        *slot = updated;
                    }
                    s.loading = false;
                    s.error = None;
                });
                true
            }
            Err(err) => {
                self.fail(StoreAction::Edit, &err);
                false
            }
        }
    }

    fn begin(&self) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
    }

    fn fail(&self, action: StoreAction, err: &RepoError) {
        let message = failure_message(self.kind(), action);
        warn!(
            kind = self.kind().singular(),
            code = err.kind.as_str(),
            error = %err,
            "{}",
            message
        );
        self.state.send_modify(|s| {
            s.loading = false;
            s.error = Some(message);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_messages() {
        assert_eq!(
            failure_message(EntityKind::Task, StoreAction::Fetch),
            "Failed to fetch tasks"
        );
        assert_eq!(
            failure_message(EntityKind::Task, StoreAction::Add),
            "Failed to add task"
        );
        assert_eq!(
            failure_message(EntityKind::Project, StoreAction::Edit),
            "Failed to update project"
        );
        assert_eq!(
            failure_message(EntityKind::Category, StoreAction::Remove),
            "Failed to remove category"
        );
        assert_eq!(
            failure_message(EntityKind::Category, StoreAction::Fetch),
            "Failed to fetch categories"
        );
    }
}
