//! Identity provider contract.
//!
//! The core only consumes a stable user id and a few profile fields. Sign-in
//! protocols belong to the provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl AuthUser {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("no user is signed in")]
    NotSignedIn,

    #[error("identity provider rejected the request: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The user currently signed in, if any.
    fn current(&self) -> Option<AuthUser>;

    /// Signed-in-user change notifications. `None` means signed out.
    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>>;

    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// Change the signed-in user's display name.
    async fn update_profile(&self, display_name: &str) -> Result<AuthUser, IdentityError>;

    /// Register a new account and sign it in.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<AuthUser, IdentityError>;

    /// Replace the signed-in user's password. The current password must be
    /// presented again and is checked before anything changes.
    async fn change_password(&self, current: &str, new: &str) -> Result<(), IdentityError>;
}

struct Credential {
    email: Option<String>,
    display_name: Option<String>,
    password: String,
}

/// Process-local provider: whoever the host signs in is the current user.
///
/// Passwords are held in process memory only, keyed by user id.
pub struct LocalIdentity {
    state: watch::Sender<Option<AuthUser>>,
    credentials: Mutex<HashMap<String, Credential>>,
}

impl LocalIdentity {
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            state,
            credentials: Mutex::new(HashMap::new()),
        }
    }

    pub fn signed_in(user: AuthUser) -> Self {
        let identity = Self::new();
        identity.sign_in(user);
        identity
    }

    pub fn sign_in(&self, user: AuthUser) {
        self.state.send_replace(Some(user));
    }

    /// Set the password of the signed-in user without checking an old one.
    pub fn set_password(&self, password: &str) -> Result<(), IdentityError> {
        let user = self.current().ok_or(IdentityError::NotSignedIn)?;
        self.lock_credentials().insert(
            user.uid,
            Credential {
                email: user.email,
                display_name: user.display_name,
                password: password.to_string(),
            },
        );
        Ok(())
    }

    /// Sign in a registered account by email and password.
    pub fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, IdentityError> {
        let user = self
            .lock_credentials()
            .iter()
            .find(|(_, c)| c.email.as_deref() == Some(email) && c.password == password)
            .map(|(uid, c)| AuthUser {
                uid: uid.clone(),
                email: c.email.clone(),
                display_name: c.display_name.clone(),
            })
            .ok_or_else(|| IdentityError::Rejected("invalid email or password".to_string()))?;
        self.sign_in(user.clone());
        Ok(user)
    }

    fn lock_credentials(&self) -> MutexGuard<'_, HashMap<String, Credential>> {
        self.credentials
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for LocalIdentity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    fn current(&self) -> Option<AuthUser> {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.state.subscribe()
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.state.send_replace(None);
        Ok(())
    }

    async fn update_profile(&self, display_name: &str) -> Result<AuthUser, IdentityError> {
        let mut updated = self.current().ok_or(IdentityError::NotSignedIn)?;
        updated.display_name = Some(display_name.to_string());
        if let Some(credential) = self.lock_credentials().get_mut(&updated.uid) {
            credential.display_name = updated.display_name.clone();
        }
        self.state.send_replace(Some(updated.clone()));
        Ok(updated)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<AuthUser, IdentityError> {
        let user = {
            let mut credentials = self.lock_credentials();
            if credentials
                .values()
                .any(|c| c.email.as_deref() == Some(email))
            {
                return Err(IdentityError::Rejected("email is already registered".to_string()));
            }
            let user = AuthUser::new(Uuid::now_v7().to_string())
                .with_email(email)
                .with_display_name(display_name);
            credentials.insert(
                user.uid.clone(),
                Credential {
                    email: Some(email.to_string()),
                    display_name: Some(display_name.to_string()),
                    password: password.to_string(),
                },
            );
            user
        };
        self.sign_in(user.clone());
        Ok(user)
    }

    async fn change_password(&self, current: &str, new: &str) -> Result<(), IdentityError> {
        let user = self.current().ok_or(IdentityError::NotSignedIn)?;
        let mut credentials = self.lock_credentials();
        match credentials.get_mut(&user.uid) {
            Some(credential) if credential.password == current => {
                credential.password = new.to_string();
                Ok(())
            }
            _ => Err(IdentityError::Rejected("current password is incorrect".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_in_and_out_notify() {
        let identity = LocalIdentity::new();
        let mut rx = identity.subscribe();
        assert!(rx.borrow().is_none());

        identity.sign_in(AuthUser::new("u1").with_email("u1@example.com"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().map(|u| u.uid.as_str()), Some("u1"));

        identity.sign_out().await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
    }

    #[tokio::test]
    async fn test_update_profile_requires_user() {
        let identity = LocalIdentity::new();
        assert!(matches!(
            identity.update_profile("Ada").await,
            Err(IdentityError::NotSignedIn)
        ));

        identity.sign_in(AuthUser::new("u1"));
        let updated = identity.update_profile("Ada").await.unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Ada"));
        assert_eq!(identity.current(), Some(updated));
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in_again() {
        let identity = LocalIdentity::new();
        let user = identity
            .sign_up("ada@example.com", "secret1", "Ada")
            .await
            .unwrap();
        assert_eq!(identity.current(), Some(user.clone()));
        assert!(matches!(
            identity.sign_up("ada@example.com", "other1", "Ada").await,
            Err(IdentityError::Rejected(_))
        ));

        identity.sign_out().await.unwrap();
        assert!(identity.sign_in_with_password("ada@example.com", "wrong").is_err());
        let back = identity
            .sign_in_with_password("ada@example.com", "secret1")
            .unwrap();
        assert_eq!(back, user);
    }

    #[tokio::test]
    async fn test_change_password_checks_current() {
        let identity = LocalIdentity::signed_in(AuthUser::new("u1"));
        // No password on record yet
        assert!(identity.change_password("", "secret2").await.is_err());

        identity.set_password("secret1").unwrap();
        assert!(matches!(
            identity.change_password("nope", "secret2").await,
            Err(IdentityError::Rejected(_))
        ));
        identity.change_password("secret1", "secret2").await.unwrap();
        assert!(identity.change_password("secret1", "secret3").await.is_err());
    }
}
