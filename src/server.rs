use crate::ai_sdk::{MessageRequest, MessageResponse};
use crate::stream::sse_response;
use crate::{schema, telemetry};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use clap::Parser;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Clone, Parser)]
#[command(name = "twin", about = "Messages API shim in front of a function-calling backend")]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8080", env = "TWIN_LISTEN")]
    pub listen: String,

    /// Default log filter, overridden by RUST_LOG
    #[arg(long, default_value = "info", env = "TWIN_LOG")]
    pub log: String,
}

impl ServerConfig {
    /// Reads `.env` if present, then the environment. The process argv
    /// belongs to the embedding binary and is not consulted; use
    /// [`Parser::try_parse_from`] to pass flags explicitly.
    pub fn from_env() -> Result<Self, clap::Error> {
        dotenvy::dotenv().ok();
        Self::try_parse_from([env!("CARGO_PKG_NAME")])
    }
}

pub type ServerResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Produces a complete, already translated message for a request.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn complete(&self, request: MessageRequest) -> Result<MessageResponse, BackendError>;
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failures that surface to the client. All of them happen before a stream
/// is opened.
#[derive(Debug, thiserror::Error)]
pub enum ShimError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("backend request failed: {0}")]
    Backend(#[from] BackendError),
}

impl IntoResponse for ShimError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            ShimError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request_error"),
            ShimError::Backend(_) => (StatusCode::BAD_GATEWAY, "api_error"),
        };
        let body = json!({
            "type": "error",
            "error": {"type": kind, "message": self.to_string()},
        });
        (status, Json(body)).into_response()
    }
}

pub fn router(backend: Arc<dyn Backend>) -> Router {
    Router::new()
        .route("/v1/messages", post(create_message))
        .with_state(backend)
}

pub async fn run(config: ServerConfig, backend: Arc<dyn Backend>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    tracing::info!(listen = %config.listen, "twin listening");
    axum::serve(listener, router(backend)).await
}

/// Loads configuration, installs logging, then serves like [`run`].
pub async fn run_from_env(backend: Arc<dyn Backend>) -> ServerResult<()> {
    let config = ServerConfig::from_env()?;
    telemetry::init(&config.log);
    run(config, backend).await?;
    Ok(())
}

async fn create_message(
    State(backend): State<Arc<dyn Backend>>,
    payload: Result<Json<MessageRequest>, JsonRejection>,
) -> Result<Response, ShimError> {
    let Json(mut request) =
        payload.map_err(|rejection| ShimError::InvalidRequest(rejection.body_text()))?;

    for tool in &mut request.tools {
        schema::normalize_in_place(&mut tool.input_schema);
    }

    let stream = request.stream;
    tracing::info!(
        model = %request.model,
        stream,
        tools = request.tools.len(),
        "forwarding message request"
    );

    let response = backend.complete(request).await.map_err(|err| {
        tracing::warn!(error = %err, "backend request failed");
        ShimError::from(err)
    })?;

    if stream {
        Ok(sse_response(response))
    } else {
        Ok(Json(response).into_response())
    }
}
