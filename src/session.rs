//! Composition root for one signed-in session.
//!
//! Owns the document store handle, the per-kind state stores and the
//! repositories that have no store of their own. Nothing here is global:
//! callers build a `Session` and pass it by reference.

use crate::clock::{Clock, SystemClock};
use crate::document::DocumentStore;
use crate::error::RepoResult;
use crate::identity::{AuthUser, IdentityError, IdentityProvider};
use crate::repo::{
    CategoryRepository, ProjectRepository, TaskCategoryRepository, TaskRepository, UserRepository,
};
use crate::store::{CategoryStore, ProjectStore, TaskStore};
use crate::types::User;
use crate::validation::{self, ValidationError};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Repo(#[from] crate::error::RepoError),
}

pub struct Session {
    pub tasks: TaskStore,
    pub projects: ProjectStore,
    pub categories: CategoryStore,
    pub task_categories: TaskCategoryRepository,
    users: UserRepository,
    current: Mutex<Option<AuthUser>>,
}

impl Session {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self::with_clock(documents, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(documents: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            tasks: TaskStore::new(TaskRepository::new(Arc::clone(&documents), Arc::clone(&clock))),
            projects: ProjectStore::new(ProjectRepository::new(
                Arc::clone(&documents),
                Arc::clone(&clock),
            )),
            categories: CategoryStore::new(CategoryRepository::new(
                Arc::clone(&documents),
                Arc::clone(&clock),
            )),
            task_categories: TaskCategoryRepository::new(Arc::clone(&documents)),
            users: UserRepository::new(documents, clock),
            current: Mutex::new(None),
        }
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.lock_current().clone()
    }

    /// React to a signed-in-user change.
    ///
    /// Signing in makes sure a profile exists and loads every store for the
    /// new owner. Signing out, or switching to a different owner, clears the
    /// stores first. Returns the profile. A store that failed to load keeps
    /// its message in [`load_errors`](Self::load_errors).
    pub async fn on_auth_change(&self, user: Option<AuthUser>) -> RepoResult<Option<User>> {
        let previous = std::mem::replace(&mut *self.lock_current(), user.clone());

        let Some(user) = user else {
            info!("signed out, clearing stores");
            self.clear_stores();
            return Ok(None);
        };

        if previous.as_ref().map(|p| p.uid.as_str()) != Some(user.uid.as_str()) {
            self.clear_stores();
        }

        let profile = self
            .users
            .ensure(
                &user.uid,
                user.display_name.as_deref(),
                user.email.as_deref().unwrap_or_default(),
            )
            .await?;

        info!(user_id = %user.uid, "signed in, loading stores");
        if !self.refresh().await {
            warn!(user_id = %user.uid, errors = ?self.load_errors(), "stores failed to load");
        }
        Ok(Some(profile))
    }

    /// Messages of every store whose last operation failed.
    pub fn load_errors(&self) -> Vec<String> {
        [self.tasks.error(), self.projects.error(), self.categories.error()]
            .into_iter()
            .flatten()
            .collect()
    }

    fn clear_stores(&self) {
        self.tasks.clear();
        self.projects.clear();
        self.categories.clear();
    }

    /// Re-fetch every store for the current user. Returns `false` if any
    /// fetch failed or nobody is signed in.
    pub async fn refresh(&self) -> bool {
        let Some(user) = self.current_user() else {
            return false;
        };
        let (tasks, projects, categories) = tokio::join!(
            self.tasks.fetch(&user.uid),
            self.projects.fetch(&user.uid),
            self.categories.fetch(&user.uid),
        );
        tasks && projects && categories
    }

    /// Apply identity changes until the provider goes away.
    pub async fn follow(&self, mut changes: watch::Receiver<Option<AuthUser>>) {
        loop {
            let user = changes.borrow_and_update().clone();
            if let Err(err) = self.on_auth_change(user).await {
                warn!(error = %err, "failed to apply sign-in change");
            }
            if changes.changed().await.is_err() {
                break;
            }
        }
    }

    /// Rename the signed-in user at the provider and in the profile record.
    pub async fn update_display_name(
        &self,
        identity: &dyn IdentityProvider,
        raw_name: &str,
    ) -> Result<User, ProfileError> {
        let name = validation::display_name(raw_name).map_err(rejected)?;
        let updated = identity.update_profile(&name).await?;
        *self.lock_current() = Some(updated.clone());
        Ok(self.users.update_name(&updated.uid, &name).await?)
    }

    /// Register an account with the provider, then sign it in here. The new
    /// profile carries the trimmed name and email.
    pub async fn sign_up(
        &self,
        identity: &dyn IdentityProvider,
        name: &str,
        email: &str,
        password: &str,
        confirm: &str,
    ) -> Result<User, ProfileError> {
        validation::signup(name, email, password, confirm).map_err(rejected)?;
        let user = identity.sign_up(email.trim(), password, name.trim()).await?;
        let profile = self.on_auth_change(Some(user)).await?;
        Ok(profile.ok_or(IdentityError::NotSignedIn)?)
    }

    /// Change the signed-in user's password. The new password is checked
    /// locally before the provider verifies `current`.
    pub async fn change_password(
        &self,
        identity: &dyn IdentityProvider,
        current: &str,
        new_password: &str,
        confirm: &str,
    ) -> Result<(), ProfileError> {
        validation::password_change(new_password, confirm).map_err(rejected)?;
        identity.change_password(current, new_password).await?;
        info!("password changed");
        Ok(())
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, Option<AuthUser>> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn rejected(err: ValidationError) -> ValidationError {
    debug!(code = err.kind().as_str(), error = %err, "input rejected");
    err
}
