//! `hello.v1.HelloService` implementation.

use tonic::{Request, Response, Status};

use super::proto::hello::v1::{hello_service_server::HelloService, HelloRequest, HelloResponse};
use super::{methods, respond};
use crate::context::CallContext;
use crate::middleware::Pipeline;
use crate::usecase::HelloUsecase;

pub struct HelloServiceImpl {
    pipeline: Pipeline,
    usecase: HelloUsecase,
}

impl HelloServiceImpl {
    pub fn new(pipeline: Pipeline, usecase: HelloUsecase) -> Self {
        Self { pipeline, usecase }
    }
}

#[tonic::async_trait]
impl HelloService for HelloServiceImpl {
    async fn get_hello(
        &self,
        request: Request<HelloRequest>,
    ) -> Result<Response<HelloResponse>, Status> {
        let mut ctx = CallContext::from_grpc(methods::GET_HELLO, &request);
        let name = request.into_inner().name;
        let usecase = self.usecase;

        let result = self
            .pipeline
            .call(&mut ctx, move |_| async move {
                usecase
                    .greet(&name)
                    .map(|message| HelloResponse { message })
            })
            .await;

        respond(&ctx, result)
    }
}
