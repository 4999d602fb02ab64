//! Rate limiting across both transports sharing one pipeline.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request as HttpRequest, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use protoserve::config::AppConfig;
use protoserve::grpc::proto::hello::v1::hello_service_server::HelloService;
use protoserve::grpc::proto::hello::v1::HelloRequest;
use protoserve::grpc::HelloServiceImpl;
use protoserve::http::{create_router, AppState};
use protoserve::middleware::{standard_pipeline, Pipeline};
use protoserve::ratelimit::{KeyStrategy, ManualClock};
use protoserve::repository::InMemoryUserRepository;
use protoserve::telemetry::Metrics;
use protoserve::usecase::{HelloUsecase, UserUsecase};

struct Harness {
    grpc: HelloServiceImpl,
    router: axum::Router,
    clock: ManualClock,
    metrics: Arc<Metrics>,
}

fn harness(rps: i64, burst: i64, strategy: KeyStrategy) -> Harness {
    let config = AppConfig {
        rate_limit_requests_per_sec: rps,
        rate_limit_burst_size: burst,
        rate_limit_strategy: strategy,
        ..AppConfig::default()
    };
    let clock = ManualClock::new();
    let metrics = Arc::new(Metrics::new().unwrap());
    let pipeline: Pipeline =
        standard_pipeline(&config, Arc::clone(&metrics), Arc::new(clock.clone()));

    let router = create_router(AppState {
        config: Arc::new(config),
        pipeline: pipeline.clone(),
        hello: HelloUsecase::new(),
        users: UserUsecase::new(Arc::new(InMemoryUserRepository::new())),
        metrics: Arc::clone(&metrics),
    });

    Harness {
        grpc: HelloServiceImpl::new(pipeline, HelloUsecase::new()),
        router,
        clock,
        metrics,
    }
}

async fn grpc_hello(harness: &Harness) -> Result<String, tonic::Status> {
    let request = tonic::Request::new(HelloRequest {
        name: "grpc".to_string(),
    });
    harness
        .grpc
        .get_hello(request)
        .await
        .map(|response| response.into_inner().message)
}

async fn http_get(harness: &Harness, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = harness
        .router
        .clone()
        .oneshot(HttpRequest::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_global_budget_is_shared_across_transports() {
    let harness = harness(2, 2, KeyStrategy::Global);

    assert_eq!(grpc_hello(&harness).await.unwrap(), "Hello, grpc!");
    let (status, _) = http_get(&harness, "/v1/hello/http").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = http_get(&harness, "/v1/hello/http").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "ERR429P08");
    assert_eq!(
        body["message"],
        "Rate limit exceeded. Maximum 2 requests per second allowed."
    );

    let status = grpc_hello(&harness).await.unwrap_err();
    assert_eq!(status.code(), tonic::Code::ResourceExhausted);
    assert!(status.metadata().get("x-request-id").is_some());

    harness.clock.advance(Duration::from_millis(500));
    assert!(grpc_hello(&harness).await.is_ok());
    assert!(grpc_hello(&harness).await.is_err());

    assert_eq!(
        harness
            .metrics
            .rate_limit_exceeded("/hello.v1.HelloService/GetHello", "global"),
        3
    );
}

#[tokio::test]
async fn test_per_method_budgets_span_transports() {
    let harness = harness(1, 1, KeyStrategy::PerMethod);

    assert!(grpc_hello(&harness).await.is_ok());
    let (status, _) = http_get(&harness, "/v1/hello/again").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let (status, body) = http_get(&harness, "/v1/users").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_health_and_metrics_bypass_the_pipeline() {
    let harness = harness(1, 1, KeyStrategy::Global);
    assert!(grpc_hello(&harness).await.is_ok());

    for _ in 0..3 {
        let (status, body) = http_get(&harness, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    let response = harness
        .router
        .clone()
        .oneshot(HttpRequest::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("grpc_requests_total"));
}

#[tokio::test]
async fn test_malformed_requests_are_rate_limited() {
    let harness = harness(1, 1, KeyStrategy::Global);

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let response = harness
            .router
            .clone()
            .oneshot(
                HttpRequest::post("/v1/users")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.headers().get("x-request-id").is_some());
        statuses.push(response.status());
    }

    assert_eq!(
        statuses,
        vec![
            StatusCode::BAD_REQUEST,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::TOO_MANY_REQUESTS
        ]
    );
    assert_eq!(
        harness
            .metrics
            .rate_limit_exceeded("/user.v1.UserService/CreateUser", "global"),
        2
    );
    assert_eq!(
        harness
            .metrics
            .requests("/user.v1.UserService/CreateUser", tonic::Code::InvalidArgument),
        1
    );
}
