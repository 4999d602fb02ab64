//! `user.v1.UserService` implementation.

use std::future::Future;

use tonic::{Request, Response, Status};

use super::proto::user::v1::{
    user_service_server::UserService, CreateUserRequest, CreateUserResponse, DeleteUserRequest,
    DeleteUserResponse, GetUserRequest, GetUserResponse, ListUsersRequest, ListUsersResponse,
    PaginationResponse, UpdateUserRequest, UpdateUserResponse, UserDto, UserEntity,
};
use super::{methods, respond};
use crate::context::CallContext;
use crate::error::AppError;
use crate::middleware::Pipeline;
use crate::repository::{NewUser, User};
use crate::usecase::UserUsecase;

pub struct UserServiceImpl {
    pipeline: Pipeline,
    usecase: UserUsecase,
}

impl UserServiceImpl {
    pub fn new(pipeline: Pipeline, usecase: UserUsecase) -> Self {
        Self { pipeline, usecase }
    }

    async fn run<Req, Resp, F, Fut>(
        &self,
        method: &str,
        request: Request<Req>,
        handler: F,
    ) -> Result<Response<Resp>, Status>
    where
        Resp: Send + 'static,
        F: FnOnce(UserUsecase, Req) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Resp, AppError>> + Send + 'static,
        Req: Send + 'static,
    {
        let mut ctx = CallContext::from_grpc(method, &request);
        let request = request.into_inner();
        let usecase = self.usecase.clone();

        let result = self
            .pipeline
            .call(&mut ctx, move |_| handler(usecase, request))
            .await;

        respond(&ctx, result)
    }
}

impl From<User> for UserEntity {
    fn from(user: User) -> Self {
        UserEntity {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

fn required_user(user: Option<UserDto>) -> Result<UserDto, AppError> {
    user.ok_or_else(|| AppError::validation("user is required"))
}

fn new_user(dto: UserDto) -> NewUser {
    NewUser {
        name: dto.name,
        email: dto.email,
    }
}

#[tonic::async_trait]
impl UserService for UserServiceImpl {
    async fn create_user(
        &self,
        request: Request<CreateUserRequest>,
    ) -> Result<Response<CreateUserResponse>, Status> {
        self.run(methods::CREATE_USER, request, |usecase, req| async move {
            let dto = required_user(req.user)?;
            let user = usecase.create(new_user(dto)).await?;
            Ok(CreateUserResponse {
                user: Some(user.into()),
            })
        })
        .await
    }

    async fn get_user(
        &self,
        request: Request<GetUserRequest>,
    ) -> Result<Response<GetUserResponse>, Status> {
        self.run(methods::GET_USER, request, |usecase, req| async move {
            let user = usecase.get(req.id).await?;
            Ok(GetUserResponse {
                user: Some(user.into()),
            })
        })
        .await
    }

    async fn update_user(
        &self,
        request: Request<UpdateUserRequest>,
    ) -> Result<Response<UpdateUserResponse>, Status> {
        self.run(methods::UPDATE_USER, request, |usecase, req| async move {
            let dto = required_user(req.user)?;
            let user = usecase.update(dto.id, new_user(dto)).await?;
            Ok(UpdateUserResponse {
                user: Some(user.into()),
            })
        })
        .await
    }

    async fn delete_user(
        &self,
        request: Request<DeleteUserRequest>,
    ) -> Result<Response<DeleteUserResponse>, Status> {
        self.run(methods::DELETE_USER, request, |usecase, req| async move {
            usecase.delete(req.id).await?;
            Ok(DeleteUserResponse {})
        })
        .await
    }

    async fn list_users(
        &self,
        request: Request<ListUsersRequest>,
    ) -> Result<Response<ListUsersResponse>, Status> {
        self.run(methods::LIST_USERS, request, |usecase, req| async move {
            let pagination = req.pagination.unwrap_or_default();
            let (users, paginator) = usecase
                .list(i64::from(pagination.page), i64::from(pagination.limit))
                .await?;

            Ok(ListUsersResponse {
                users: users.into_iter().map(UserEntity::from).collect(),
                pagination: Some(PaginationResponse {
                    total: i64::try_from(paginator.total).unwrap_or(i64::MAX),
                    page: i32::try_from(paginator.page).unwrap_or(i32::MAX),
                    limit: i32::try_from(paginator.per_page).unwrap_or(i32::MAX),
                }),
            })
        })
        .await
    }
}
