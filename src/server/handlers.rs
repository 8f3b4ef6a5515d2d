use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Path as AxumPath, State};
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode, header};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::path::PathBuf;
use std::sync::Arc;

use crate::settings::Settings;

use super::generate::generate_request;
use super::models::{ErrorResponse, GenerateRequest, GenerateResponse};
use super::state::ServerState;

pub async fn run_server(settings: Settings, addr: String) -> Result<()> {
    let state = Arc::new(ServerState { settings });
    let app = Router::new()
        .route("/health", get(health))
        .route("/generate", post(generate))
        .route("/static/*path", get(serve_static))
        .with_state(state)
        .layer(axum::middleware::from_fn(cors_middleware));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| "failed to bind server address")?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type,authorization"),
    );
}

async fn generate(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, (StatusCode, Json<ErrorResponse>)> {
    let state = state.clone();
    let handle = tokio::runtime::Handle::current();
    // Compositing and encoding are CPU-bound; keep them off the accept loop.
    let result = tokio::task::spawn_blocking(move || {
        handle.block_on(generate_request(state.as_ref(), payload))
    })
    .await
    .map_err(|err| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("server task failed: {}", err),
            }),
        )
    })?;

    match result {
        Ok(response) => Ok(Json(response)),
        Err(err) => Err((err.status, Json(ErrorResponse { error: err.message }))),
    }
}

/// Serves artifacts from the output directory. Paths are canonicalized and
/// must stay under the output root.
async fn serve_static(
    State(state): State<Arc<ServerState>>,
    AxumPath(path): AxumPath<String>,
) -> Result<Response<Body>, (StatusCode, Json<ErrorResponse>)> {
    let output_dir = PathBuf::from(&state.settings.output_dir);
    let canonical_root = std::fs::canonicalize(&output_dir).unwrap_or(output_dir.clone());
    let requested = output_dir.join(path.trim_start_matches('/'));
    let canonical = std::fs::canonicalize(&requested).map_err(|_| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "artifact not found".to_string(),
            }),
        )
    })?;
    if !canonical.starts_with(&canonical_root) {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse {
                error: "path is not allowed".to_string(),
            }),
        ));
    }
    let bytes = std::fs::read(&canonical).map_err(|err| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("failed to read artifact: {}", err),
            }),
        )
    })?;
    let mime = mime_for_path(&canonical);
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime)
        .body(Body::from(bytes))
        .map_err(|err| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("failed to build response: {}", err),
                }),
            )
        })?;
    Ok(response)
}

fn mime_for_path(path: &std::path::Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_extensions_map_to_image_mimes() {
        assert_eq!(
            mime_for_path(std::path::Path::new("a/b-result.jpg")),
            "image/jpeg"
        );
        assert_eq!(mime_for_path(std::path::Path::new("x.PNG")), "image/png");
        assert_eq!(
            mime_for_path(std::path::Path::new("noext")),
            "application/octet-stream"
        );
    }
}
