//! User storage port and the in-memory adapter.

mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use memory::InMemoryUserRepository;

/// A stored user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by callers when creating or updating a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

/// Position of one listed page within the full result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

/// Errors raised by a [`UserRepository`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("user not found")]
    NotFound,

    #[error("email {0} already in use")]
    EmailExists(String),
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Persistence operations on users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user, assigning its id and timestamps.
    async fn create(&self, user: NewUser) -> RepositoryResult<User>;

    async fn get_by_id(&self, id: i64) -> RepositoryResult<User>;

    /// Replace name and email of an existing user, bumping `updated_at`.
    async fn update(&self, id: i64, user: NewUser) -> RepositoryResult<User>;

    async fn delete(&self, id: i64) -> RepositoryResult<()>;

    /// List users ordered by id. `page` is 1-based.
    async fn list(&self, page: u32, per_page: u32) -> RepositoryResult<(Vec<User>, Paginator)>;
}
