//! gRPC transport: generated stubs, service implementations and the server.
//!
//! Every RPC builds a [`CallContext`] from the inbound request, runs its
//! usecase through the shared [`crate::middleware::Pipeline`] and echoes the
//! resolved request id back in response or error metadata.

mod hello;
mod server;
mod user;

use tonic::{Response, Status};

use crate::context::{CallContext, REQUEST_ID_HEADER};
use crate::error::AppError;

pub use hello::HelloServiceImpl;
pub use server::GrpcServer;
pub use user::UserServiceImpl;

// Include the generated protobuf code
pub mod proto {
    pub mod hello {
        pub mod v1 {
            tonic::include_proto!("hello.v1");
        }
    }
    pub mod user {
        pub mod v1 {
            tonic::include_proto!("user.v1");
        }
    }
}

// Re-export commonly used types
pub use proto::hello::v1::hello_service_server::HelloServiceServer;
pub use proto::user::v1::user_service_server::UserServiceServer;

/// Fully-qualified method names, shared with the HTTP gateway so both
/// transports draw from the same rate-limit budgets.
pub mod methods {
    pub const GET_HELLO: &str = "/hello.v1.HelloService/GetHello";
    pub const CREATE_USER: &str = "/user.v1.UserService/CreateUser";
    pub const GET_USER: &str = "/user.v1.UserService/GetUser";
    pub const UPDATE_USER: &str = "/user.v1.UserService/UpdateUser";
    pub const DELETE_USER: &str = "/user.v1.UserService/DeleteUser";
    pub const LIST_USERS: &str = "/user.v1.UserService/ListUsers";
}

/// Turn a pipeline result into a tonic reply carrying `x-request-id`.
fn respond<T>(ctx: &CallContext, result: Result<T, AppError>) -> Result<Response<T>, Status> {
    match result {
        Ok(reply) => {
            let mut response = Response::new(reply);
            if let Some(value) = request_id_value(ctx) {
                response.metadata_mut().insert(REQUEST_ID_HEADER, value);
            }
            Ok(response)
        }
        Err(err) => {
            let mut status = Status::from(err);
            if let Some(value) = request_id_value(ctx) {
                status.metadata_mut().insert(REQUEST_ID_HEADER, value);
            }
            Err(status)
        }
    }
}

fn request_id_value(ctx: &CallContext) -> Option<tonic::metadata::AsciiMetadataValue> {
    ctx.request_id.as_deref().and_then(|id| id.parse().ok())
}
