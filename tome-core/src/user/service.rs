use super::password::{hash_password, verify_password};
use super::repository::UserRepository;
use super::types::{NewUser, User};
use super::{Result, UserError};
use std::sync::Arc;
use tracing::{debug, info};

/// Registration and lookup on top of a [`UserRepository`].
#[derive(Clone)]
pub struct UserService {
    repository: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }

    /// Finds a user by username, then by email.
    pub async fn find_user(&self, identifier: &str) -> Result<Option<User>> {
        if let Some(user) = self.repository.get_user_by_username(identifier).await? {
            return Ok(Some(user));
        }
        self.repository.get_user_by_email(identifier).await
    }

    /// Whether `identifier` names a registered user (by username or email).
    pub async fn user_exists(&self, identifier: &str) -> Result<bool> {
        Ok(self.find_user(identifier).await?.is_some())
    }

    /// Registers a new user. The display name starts out as the username.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<User> {
        let username = username.trim();
        let email = email.trim();
        if username.is_empty() || email.is_empty() {
            return Err(UserError::Invalid("username and email are required".to_string()));
        }
        if password.is_empty() {
            return Err(UserError::Invalid("password is required".to_string()));
        }

        let user = self
            .repository
            .insert_user(NewUser {
                name: username.to_string(),
                email: email.to_string(),
                username: username.to_string(),
                password_hash: hash_password(password)?,
            })
            .await?;

        info!(user_id = user.id, username = %user.username, "Registered user");
        Ok(user)
    }

    /// Returns the user when `password` matches; `None` for unknown users or
    /// a wrong password.
    pub async fn authenticate(&self, identifier: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.find_user(identifier).await? else {
            debug!(identifier, "Unknown user");
            return Ok(None);
        };

        if verify_password(password, &user.password_hash) {
            Ok(Some(user))
        } else {
            debug!(identifier, "Password mismatch");
            Ok(None)
        }
    }
}
