//! User registration and lookup.

mod password;
mod repository;
mod service;
mod types;

pub use password::{hash_password, verify_password};
pub use repository::{SqliteUserRepository, UserRepository};
pub use service::UserService;
pub use types::{NewUser, User};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("User already exists: {0}")]
    Conflict(String),

    #[error("Invalid user data: {0}")]
    Invalid(String),

    #[error("Failed to hash password: {0}")]
    PasswordHash(String),
}

pub type Result<T> = std::result::Result<T, UserError>;
