//! Per-call context shared by every middleware stage.

use std::net::SocketAddr;

use axum::http::HeaderMap;

/// Header / metadata key carrying the request identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// What the pipeline knows about one inbound call.
///
/// Built by the transport before the pipeline runs. Stages may augment it
/// (the request-id stage fills in `request_id`); the transport reads it back
/// after the call to echo the identifier to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// Fully-qualified method, e.g. `/hello.v1.HelloService/GetHello`
    pub method: String,
    /// Request identifier, propagated from the caller or generated
    pub request_id: Option<String>,
    /// Remote address of the caller, when the transport knows it
    pub peer: Option<SocketAddr>,
}

impl CallContext {
    /// Create a context for `method` with nothing else known.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            request_id: None,
            peer: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Build a context from an inbound tonic request.
    pub fn from_grpc<T>(method: &str, request: &tonic::Request<T>) -> Self {
        let request_id = request
            .metadata()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(non_empty);

        Self {
            method: method.to_string(),
            request_id,
            peer: request.remote_addr(),
        }
    }

    /// Build a context from inbound HTTP gateway headers.
    pub fn from_headers(method: &str, headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(non_empty);

        Self {
            method: method.to_string(),
            request_id,
            peer,
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
