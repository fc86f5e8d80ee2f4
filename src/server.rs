use crate::config::Config;
use crate::engines::{EngineContext, EngineInfo};
use crate::enhance::Enhancer;
use crate::error::AnprError;
use crate::pipeline::{PipelineResult, PlatePipeline};
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Used when the upload carries no filename
const DEFAULT_FILENAME: &str = "upload";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: PlatePipeline,
    pub engines: Arc<EngineContext>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(engines: Arc<EngineContext>, config: Config) -> Self {
        Self {
            pipeline: PlatePipeline::new(engines.clone()),
            engines,
            config: Arc::new(config),
        }
    }
}

/// Plate reading response
#[derive(Serialize)]
pub struct DetectResponse {
    #[serde(flatten)]
    pub result: PipelineResult,
    pub processing_time_ms: u64,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub detector: EngineInfo,
    pub recognizer: EngineInfo,
    pub enhancement_steps: Vec<&'static str>,
    pub max_file_size_bytes: usize,
}

/// Routes over an already built state
pub fn router(state: AppState) -> Router {
    let max_body = state.config.max_file_size.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", get(handle_home))
        .route("/detect", post(handle_detect))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let engines = Arc::new(EngineContext::new(&config)?);
    let addr = format!("{}:{}", config.host, config.port);

    let app = router(AppState::new(engines.clone(), config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    engines.shutdown();
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Handle plate reading requests
async fn handle_detect(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<DetectResponse>, AnprError> {
    let start = Instant::now();

    let max = state.config.max_file_size;
    let mut file_data: Option<Bytes> = None;
    let mut filename: Option<String> = None;

    // Parse multipart form
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max, "Failed to parse multipart"))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            filename = field.file_name().map(|s| s.to_string());
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, max, "Failed to read file data"))?,
            );
        }
    }

    let data = file_data.ok_or(AnprError::MissingFile)?;

    if data.len() > max {
        return Err(AnprError::ImageTooLarge {
            size: data.len(),
            max,
        });
    }

    let filename = filename.unwrap_or_else(|| DEFAULT_FILENAME.to_string());

    // Model inference is CPU-bound; keep it off the async workers
    let pipeline = state.pipeline.clone();
    let result = tokio::task::spawn_blocking(move || pipeline.run_bytes(&filename, &data))
        .await
        .map_err(|e| AnprError::Internal(format!("Pipeline task failed: {}", e)))??;

    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        "Plate read in {}ms: '{}' at {}",
        processing_time_ms,
        result.cleaned_text,
        result.bounding_box
    );

    Ok(Json(DetectResponse {
        result,
        processing_time_ms,
    }))
}

/// Bodies cut off by the request limit are reported as oversized uploads
fn multipart_error(e: MultipartError, max: usize, context: &str) -> AnprError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AnprError::BodyTooLarge { max }
    } else {
        AnprError::InvalidRequest(format!("{}: {}", context, e))
    }
}

async fn handle_home() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "ANPR System is Running!" }))
}

/// Handle health check requests
async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let status = if state.engines.is_loaded() {
        "ok"
    } else {
        "shutting_down"
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        detector: state.engines.detector_info().clone(),
        recognizer: state.engines.recognizer_info().clone(),
        enhancement_steps: Enhancer::new().step_names(),
        max_file_size_bytes: state.config.max_file_size,
    })
}
