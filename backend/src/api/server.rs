//! HTTP server for the Meta2 analysis API.
//!
//! # API Endpoints
//!
//! | Method | Path           | Description                            |
//! |--------|----------------|----------------------------------------|
//! | GET    | `/health`      | Health check                           |
//! | POST   | `/api/analyze` | Upload a .csv/.xlsx file and analyze it |
//! | GET    | `/api/logs`    | SSE stream for real-time logs          |
//!
//! `/api/analyze` takes a multipart form with a `file` part and optional
//! `cutoffYear`, `delimiterCandidates`, `quoteChar`, `showOnlyMeta2` and
//! repeated `taskName` parts.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, LOG_BROADCASTER};
use super::types::{error_response, AnalysisResponse};
use crate::config::Settings;
use crate::error::{ServerError, ServerResult};
use crate::models::RawFile;
use crate::transform::pipeline::{analyze_file, AnalysisOptions};

/// Start the HTTP server
pub async fn start_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let port = settings.port;
    let app = router(settings);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Meta2 server running on http://localhost:{}", port);
    println!("   POST /api/analyze - Upload and analyze a .csv/.xlsx file");
    println!("   GET  /api/logs    - SSE log stream");
    println!("   GET  /health      - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the application router.
pub fn router(settings: Settings) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    let max_upload = settings.max_upload_bytes;

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/analyze", post(analyze))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(cors)
        .with_state(Arc::new(settings))
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "meta2",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "analyze": "POST /api/analyze",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // Lagged receivers skip what they missed.
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload-and-analyze endpoint
async fn analyze(
    State(settings): State<Arc<Settings>>,
    multipart: Multipart,
) -> ServerResult<Json<AnalysisResponse>> {
    let (file, options) = read_form(multipart, &settings).await?;

    eprintln!("\n{}", "=".repeat(70));
    eprintln!("📄 NEW UPLOAD: {} ({} bytes)", file.name, file.bytes.len());
    eprintln!("{}\n", "=".repeat(70));

    let result = tokio::task::spawn_blocking(move || analyze_file(&file, &options))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;

    Ok(Json(AnalysisResponse::from(result)))
}

/// Collect the uploaded file and the analysis options from the form.
async fn read_form(mut multipart: Multipart, settings: &Settings) -> ServerResult<(RawFile, AnalysisOptions)> {
    let mut file: Option<RawFile> = None;
    let mut options = AnalysisOptions {
        cutoff_year: settings.cutoff_year,
        ..AnalysisOptions::default()
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            let file_name = field.file_name().unwrap_or("").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
            file = Some(RawFile::new(file_name, bytes.to_vec()));
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
        apply_field(&mut options, &name, &text)?;
    }

    let file = file.ok_or_else(|| ServerError::BadRequest("No file provided".to_string()))?;
    Ok((file, options))
}

/// Apply one text form field to the options. Unknown fields are ignored.
fn apply_field(options: &mut AnalysisOptions, name: &str, value: &str) -> ServerResult<()> {
    match name {
        "cutoffYear" => {
            options.cutoff_year = value
                .trim()
                .parse()
                .map_err(|_| ServerError::BadRequest(format!("cutoffYear must be an integer, got '{}'", value)))?;
        }
        "delimiterCandidates" if !value.is_empty() => {
            options.delimiter_candidates = Some(value.to_string());
        }
        "quoteChar" => {
            let mut chars = value.chars();
            options.quote_char = match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => {
                    return Err(ServerError::BadRequest(format!(
                        "quoteChar must be a single character, got '{}'",
                        value
                    )))
                }
            };
        }
        "showOnlyMeta2" => {
            options.selection.show_only_meta2 = parse_flag(value)
                .ok_or_else(|| ServerError::BadRequest(format!("showOnlyMeta2 must be a boolean, got '{}'", value)))?;
        }
        "taskName" => {
            options
                .selection
                .task_names
                .get_or_insert_with(Vec::new)
                .push(value.to_string());
        }
        _ => {}
    }
    Ok(())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::Pipeline(_) | ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(details) => {
                log_error(format!("Internal error: {}", details));
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_fields() {
        let mut options = AnalysisOptions::default();
        apply_field(&mut options, "cutoffYear", " 2019 ").unwrap();
        apply_field(&mut options, "delimiterCandidates", ",;\\t").unwrap();
        apply_field(&mut options, "quoteChar", "'").unwrap();
        apply_field(&mut options, "showOnlyMeta2", "false").unwrap();
        apply_field(&mut options, "taskName", "Triagem").unwrap();
        apply_field(&mut options, "taskName", "Decisão").unwrap();
        apply_field(&mut options, "unknown", "ignored").unwrap();

        assert_eq!(options.cutoff_year, 2019);
        assert_eq!(options.delimiter_candidates.as_deref(), Some(",;\\t"));
        assert_eq!(options.quote_char, '\'');
        assert!(!options.selection.show_only_meta2);
        assert_eq!(
            options.selection.task_names,
            Some(vec!["Triagem".to_string(), "Decisão".to_string()])
        );
    }

    #[test]
    fn test_invalid_fields_are_bad_requests() {
        let mut options = AnalysisOptions::default();
        assert!(matches!(
            apply_field(&mut options, "cutoffYear", "dois mil"),
            Err(ServerError::BadRequest(_))
        ));
        assert!(matches!(
            apply_field(&mut options, "quoteChar", "''"),
            Err(ServerError::BadRequest(_))
        ));
        assert!(matches!(
            apply_field(&mut options, "showOnlyMeta2", "maybe"),
            Err(ServerError::BadRequest(_))
        ));
    }

    #[test]
    fn test_error_status_codes() {
        let bad = ServerError::BadRequest("No file provided".into()).into_response();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let internal = ServerError::Internal("join error".into()).into_response();
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
