//! HTTP Server
//!
//! OpenAI-compatible surface over a shared [`RequestRouter`]:
//!
//! | route | handler |
//! |-------|---------|
//! | `GET /` | service info |
//! | `GET /health` | health and registered providers |
//! | `GET /v1/models` | model list |
//! | `POST /v1/chat/completions` | chat completion, JSON or SSE |
//!
//! Every error is rendered as the OpenAI error envelope.

pub mod sse;

use std::future::Future;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;

use crate::error::GatewayError;
use crate::router::{RequestRouter, RouterResponse};
use crate::types::{CompletionRequest, ErrorBody, ErrorEnvelope};

pub use sse::to_sse_response;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    router: Arc<RequestRouter>,
}

/// `GET /` body
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<&'static str>,
    pub total_models: usize,
}

const ENDPOINTS: &[&str] = &[
    "GET /",
    "GET /health",
    "GET /v1/models",
    "POST /v1/chat/completions",
];

/// Build the axum application
pub fn app(router: Arc<RequestRouter>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/v1/models", get(list_models))
        .route("/v1/chat/completions", post(chat_completions))
        .fallback(not_found)
        .with_state(AppState { router })
}

/// Serve on `listener` until `shutdown` resolves
pub async fn serve<F>(
    listener: TcpListener,
    router: Arc<RequestRouter>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "listening");
    }
    axum::serve(listener, app(router))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn root(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        endpoints: ENDPOINTS.to_vec(),
        total_models: state.router.registry().len(),
    })
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.router.health())
}

async fn list_models(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.router.models())
}

async fn chat_completions(
    State(state): State<AppState>,
    payload: Result<Json<CompletionRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return GatewayError::InvalidRequest(rejection.body_text()).into_response();
        }
    };

    match state.router.route(request).await {
        Ok(RouterResponse::Completion(body)) => Json(body).into_response(),
        Ok(RouterResponse::Stream(increments)) => to_sse_response(increments).into_response(),
        Err(error) => error.into_response(),
    }
}

async fn not_found() -> Response {
    let envelope = ErrorEnvelope {
        error: ErrorBody {
            message: "Not found".to_string(),
            r#type: "invalid_request_error".to_string(),
            code: "not_found".to_string(),
        },
    };
    (StatusCode::NOT_FOUND, Json(envelope)).into_response()
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_envelope())).into_response()
    }
}
