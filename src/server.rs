//! HTTP surface: a status route and the tricolor upload route.

use std::sync::Arc;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::task::JoinError;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::compositor::{encode_jpeg, Compositor, EmblemOutcome, JPEG_QUALITY};
use crate::config::Config;
use crate::error::{Error, Result};

/// Multipart field carrying the uploaded image.
pub const IMAGE_FIELD: &str = "image";

/// Message returned by the status route.
pub const STATUS_MESSAGE: &str = "Independence Day Image API is running.";

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Compositor shared by every request.
    pub compositor: Arc<Compositor>,
}

impl AppState {
    /// Wrap a compositor for sharing across requests.
    #[must_use]
    pub fn new(compositor: Compositor) -> Self {
        Self {
            compositor: Arc::new(compositor),
        }
    }
}

/// Body of the status route.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Human-readable status.
    pub message: &'static str,
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

/// Failures of the upload route, each mapped to an HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request carried no `image` field, or was not multipart at all.
    #[error("No image uploaded")]
    NoImage,

    /// The multipart body could not be read (malformed or over the size limit).
    #[error("{}", .0.body_text())]
    Upload(#[from] MultipartError),

    /// Decoding, compositing or encoding failed.
    #[error(transparent)]
    Processing(#[from] Error),

    /// The blocking worker running the composite panicked or was cancelled.
    #[error("processing task failed: {0}")]
    Task(#[from] JoinError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NoImage => StatusCode::BAD_REQUEST,
            Self::Upload(e) => e.status(),
            Self::Processing(_) | Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("tricolor request failed: {}", self);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

async fn home() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: STATUS_MESSAGE,
    })
}

async fn tricolor(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Response, ApiError> {
    let mut multipart = multipart.map_err(|_| ApiError::NoImage)?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        // Only file parts count as an upload.
        if field.name() == Some(IMAGE_FIELD) && field.file_name().is_some() {
            upload = Some(field.bytes().await?);
            break;
        }
    }
    let bytes = upload.ok_or(ApiError::NoImage)?;

    let compositor = Arc::clone(&state.compositor);
    let jpeg = tokio::task::spawn_blocking(move || render_jpeg(&compositor, &bytes)).await??;

    Ok(([(header::CONTENT_TYPE, "image/jpeg")], jpeg).into_response())
}

/// Decode an uploaded image, apply the overlay and emblem, and encode the
/// result as JPEG.
///
/// # Errors
///
/// Returns [`Error::Image`] if the upload cannot be decoded or the result
/// cannot be encoded, and [`Error::EmblemDecode`] for a corrupt emblem.
pub fn render_jpeg(compositor: &Compositor, bytes: &[u8]) -> Result<Vec<u8>> {
    let source = image::load_from_memory(bytes)?;
    let composite = compositor.composite(&source, true)?;
    if let EmblemOutcome::Applied(placement) = &composite.emblem {
        tracing::debug!(side = placement.side, "emblem applied to upload");
    }
    encode_jpeg(&composite.image, JPEG_QUALITY)
}

/// Build the router with CORS open to every origin.
pub fn router(state: AppState, max_upload_size: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(home))
        .route("/tricolor", post(tricolor))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_size))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Bind to the configured address and serve until the process exits.
///
/// # Errors
///
/// Returns [`Error::Io`] if the listener cannot be bound or the server fails.
pub async fn serve(config: &Config) -> Result<()> {
    let compositor = Compositor::new(&config.assets_dir);
    if !compositor.emblem().path().exists() {
        tracing::warn!(
            path = %compositor.emblem().path().display(),
            "emblem asset not found; images will be served without it"
        );
    }

    let app = router(AppState::new(compositor), config.max_upload_size);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!("tricolor server listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
