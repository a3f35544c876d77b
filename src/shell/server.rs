//! HTTP surface of the interactive shell.
//!
//! One [`Session`] per process sits behind an async mutex. The lock is held
//! for the whole of each action, so a generate request blocks every other
//! request until the model answers and the document is built.

use crate::error::Result;
use crate::render::ExportDocument;
use crate::shell::page::render_page;
use crate::shell::session::Session;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Application state shared across routes.
#[derive(Clone)]
pub struct AppState {
    session: Arc<Mutex<Session>>,
}

#[derive(Debug, Serialize)]
struct StateView {
    state: &'static str,
    error: Option<String>,
    upload_error: Option<String>,
    image: Option<String>,
    paragraphs: Option<usize>,
}

pub fn router(session: Session) -> Router {
    let state = AppState {
        session: Arc::new(Mutex::new(session)),
    };

    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/image", get(image))
        .route("/generate", post(generate))
        .route("/report", get(report))
        .route("/state", get(state_view))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
#[instrument(skip(session))]
pub async fn serve(addr: SocketAddr, session: Session) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("X-ray report shell listening on http://{}", addr);
    axum::serve(listener, router(session)).await?;
    Ok(())
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let session = state.session.lock().await;
    Html(render_page(&session))
}

async fn upload(State(state): State<AppState>, multipart: Multipart) -> Response {
    let (file_name, bytes) = match read_file_field(multipart).await {
        Ok(file) => file,
        Err(rejection) => return rejection.into_response(),
    };

    let mut session = state.session.lock().await;
    // Decode failures are kept on the session and shown on the page.
    let _ = session.upload(&file_name, bytes);

    Redirect::to("/").into_response()
}

async fn read_file_field(
    mut multipart: Multipart,
) -> std::result::Result<(String, Vec<u8>), (StatusCode, String)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (e.status(), e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| (e.status(), e.body_text()))?;
        return Ok((file_name, bytes.to_vec()));
    }

    Err((StatusCode::BAD_REQUEST, "missing multipart field `file`".to_string()))
}

async fn image(State(state): State<AppState>) -> Response {
    let session = state.session.lock().await;

    match session.state().image() {
        Some(image) => (
            [(header::CONTENT_TYPE, image.format().mime_type())],
            image.bytes().to_vec(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn generate(State(state): State<AppState>) -> Redirect {
    let mut session = state.session.lock().await;

    if let Err(e) = session.generate().await {
        warn!("Generate request ended with error: {}", e);
    }

    Redirect::to("/")
}

async fn report(State(state): State<AppState>) -> Response {
    let session = state.session.lock().await;

    match session.state().document() {
        Some(document) => (
            [
                (header::CONTENT_TYPE, ExportDocument::MIME_TYPE.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", ExportDocument::FILE_NAME),
                ),
            ],
            document.bytes().to_vec(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn state_view(State(state): State<AppState>) -> Json<StateView> {
    let session = state.session.lock().await;
    let current = session.state();

    Json(StateView {
        state: current.name(),
        error: current.error().map(String::from),
        upload_error: session.upload_error().map(String::from),
        image: current.image().map(|i| i.file_name().to_string()),
        paragraphs: current.document().map(ExportDocument::paragraph_count),
    })
}
