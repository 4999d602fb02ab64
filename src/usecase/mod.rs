//! Application logic shared by the gRPC and HTTP transports.

mod hello;
mod user;

pub use hello::{HelloUsecase, MAX_NAME_LEN};
pub use user::{UserUsecase, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
