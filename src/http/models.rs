//! JSON bodies exchanged by the HTTP gateway.

use serde::{Deserialize, Serialize};

use crate::repository::{NewUser, Paginator, User};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub service_name: String,
    pub version: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HelloResponse {
    pub message: String,
}

/// Body of create and update requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl From<UserRequest> for NewUser {
    fn from(body: UserRequest) -> Self {
        NewUser {
            name: body.name,
            email: body.email,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

/// Query string of `GET /v1/users`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationResponse {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl From<Paginator> for PaginationResponse {
    fn from(paginator: Paginator) -> Self {
        PaginationResponse {
            total: paginator.total,
            page: paginator.page,
            limit: paginator.per_page,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListUsersResponse {
    pub users: Vec<UserResponse>,
    pub pagination: PaginationResponse,
}
