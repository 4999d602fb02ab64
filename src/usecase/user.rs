//! User management usecase.

use std::sync::Arc;

use crate::error::{AppError, ErrorCode};
use crate::repository::{NewUser, Paginator, RepositoryError, User, UserRepository};

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;
/// Largest page size served.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// User management operations on top of a [`UserRepository`].
#[derive(Clone)]
pub struct UserUsecase {
    repository: Arc<dyn UserRepository>,
}

impl UserUsecase {
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }

    pub async fn create(&self, user: NewUser) -> Result<User, AppError> {
        let user = validate_user(user)?;
        self.repository.create(user).await.map_err(map_error)
    }

    pub async fn get(&self, id: i64) -> Result<User, AppError> {
        validate_id(id)?;
        self.repository.get_by_id(id).await.map_err(map_error)
    }

    pub async fn update(&self, id: i64, user: NewUser) -> Result<User, AppError> {
        validate_id(id)?;
        let user = validate_user(user)?;
        self.repository.update(id, user).await.map_err(map_error)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        validate_id(id)?;
        self.repository.delete(id).await.map_err(map_error)
    }

    /// List one page of users. Non-positive `page` or `limit` select the
    /// defaults; `limit` is capped at [`MAX_PAGE_LIMIT`].
    pub async fn list(&self, page: i64, limit: i64) -> Result<(Vec<User>, Paginator), AppError> {
        let page = if page > 0 {
            u32::try_from(page).unwrap_or(u32::MAX)
        } else {
            1
        };
        let limit = if limit > 0 {
            u32::try_from(limit.min(MAX_PAGE_LIMIT as i64)).unwrap_or(MAX_PAGE_LIMIT)
        } else {
            DEFAULT_PAGE_LIMIT
        };

        self.repository.list(page, limit).await.map_err(map_error)
    }
}

fn map_error(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::new(ErrorCode::UserNotFound),
        RepositoryError::EmailExists(email) => {
            AppError::with_message(ErrorCode::UserEmailExists, email)
        }
    }
}

fn validate_id(id: i64) -> Result<(), AppError> {
    if id <= 0 {
        return Err(AppError::validation("id must be positive"));
    }
    Ok(())
}

fn validate_user(user: NewUser) -> Result<NewUser, AppError> {
    let name = user.name.trim();
    let email = user.email.trim();

    if name.is_empty() {
        return Err(AppError::validation("name is required"));
    }
    if email.is_empty() {
        return Err(AppError::validation("email is required"));
    }
    if !email.contains('@') {
        return Err(AppError::validation("email is invalid"));
    }

    Ok(NewUser {
        name: name.to_string(),
        email: email.to_string(),
    })
}
