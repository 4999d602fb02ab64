//! Route handlers. Each handler runs its usecase through the shared pipeline
//! under the matching gRPC method name.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{ConnectInfo, FromRequestParts, Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::models::{
    HealthResponse, HelloResponse, ListQuery, ListUsersResponse, UserRequest, UserResponse,
};
use super::AppState;
use crate::context::{CallContext, REQUEST_ID_HEADER};
use crate::error::AppError;
use crate::grpc::methods;

/// Caller details needed to build a [`CallContext`].
pub struct Inbound {
    headers: HeaderMap,
    peer: Option<SocketAddr>,
}

impl Inbound {
    fn context(&self, method: &str) -> CallContext {
        CallContext::from_headers(method, &self.headers, self.peer)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Inbound {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(Self {
            headers: parts.headers.clone(),
            peer,
        })
    }
}

/// Render a pipeline result, echoing the request id.
fn reply<T: Serialize>(ctx: &CallContext, status: StatusCode, result: Result<T, AppError>) -> Response {
    let mut response = match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(err) => err.into_response(),
    };

    if let Some(value) = ctx
        .request_id
        .as_deref()
        .and_then(|id| HeaderValue::from_str(id).ok())
    {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Extractor rejections are surfaced from inside the pipeline handler, never
/// before the pipeline runs.
fn invalid_input(rejection: String) -> AppError {
    AppError::validation(rejection)
}

fn path_id(id: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    id.map(|Path(id)| id)
        .map_err(|rejection| invalid_input(rejection.body_text()))
}

fn json_body(body: Result<Json<UserRequest>, JsonRejection>) -> Result<UserRequest, AppError> {
    body.map(|Json(body)| body)
        .map_err(|rejection| invalid_input(rejection.body_text()))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        service_name: state.config.app_name.clone(),
        version: state.config.app_version.clone(),
        status: "healthy".to_string(),
    })
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => AppError::internal(err).into_response(),
    }
}

pub async fn get_hello(
    State(state): State<AppState>,
    inbound: Inbound,
    Path(name): Path<String>,
) -> Response {
    let mut ctx = inbound.context(methods::GET_HELLO);
    let usecase = state.hello;

    let result = state
        .pipeline
        .call(&mut ctx, move |_| async move {
            usecase.greet(&name).map(|message| HelloResponse { message })
        })
        .await;

    reply(&ctx, StatusCode::OK, result)
}

pub async fn create_user(
    State(state): State<AppState>,
    inbound: Inbound,
    body: Result<Json<UserRequest>, JsonRejection>,
) -> Response {
    let mut ctx = inbound.context(methods::CREATE_USER);
    let usecase = state.users.clone();
    let body = json_body(body);

    let result = state
        .pipeline
        .call(&mut ctx, move |_| async move {
            let body = body?;
            usecase.create(body.into()).await.map(UserResponse::from)
        })
        .await;

    reply(&ctx, StatusCode::CREATED, result)
}

pub async fn get_user(
    State(state): State<AppState>,
    inbound: Inbound,
    id: Result<Path<i64>, PathRejection>,
) -> Response {
    let mut ctx = inbound.context(methods::GET_USER);
    let usecase = state.users.clone();
    let id = path_id(id);

    let result = state
        .pipeline
        .call(&mut ctx, move |_| async move {
            usecase.get(id?).await.map(UserResponse::from)
        })
        .await;

    reply(&ctx, StatusCode::OK, result)
}

pub async fn update_user(
    State(state): State<AppState>,
    inbound: Inbound,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UserRequest>, JsonRejection>,
) -> Response {
    let mut ctx = inbound.context(methods::UPDATE_USER);
    let usecase = state.users.clone();
    let (id, body) = (path_id(id), json_body(body));

    let result = state
        .pipeline
        .call(&mut ctx, move |_| async move {
            let (id, body) = (id?, body?);
            usecase.update(id, body.into()).await.map(UserResponse::from)
        })
        .await;

    reply(&ctx, StatusCode::OK, result)
}

pub async fn delete_user(
    State(state): State<AppState>,
    inbound: Inbound,
    id: Result<Path<i64>, PathRejection>,
) -> Response {
    let mut ctx = inbound.context(methods::DELETE_USER);
    let usecase = state.users.clone();
    let id = path_id(id);

    let result = state
        .pipeline
        .call(&mut ctx, move |_| async move {
            usecase.delete(id?).await.map(|()| serde_json::json!({}))
        })
        .await;

    reply(&ctx, StatusCode::OK, result)
}

pub async fn list_users(
    State(state): State<AppState>,
    inbound: Inbound,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Response {
    let mut ctx = inbound.context(methods::LIST_USERS);
    let usecase = state.users.clone();
    let query = query
        .map(|Query(query)| query)
        .map_err(|rejection| invalid_input(rejection.body_text()));

    let result = state
        .pipeline
        .call(&mut ctx, move |_| async move {
            let query = query?;
            let (users, paginator) = usecase
                .list(query.page.unwrap_or(0), query.limit.unwrap_or(0))
                .await?;
            Ok(ListUsersResponse {
                users: users.into_iter().map(UserResponse::from).collect(),
                pagination: paginator.into(),
            })
        })
        .await;

    reply(&ctx, StatusCode::OK, result)
}
