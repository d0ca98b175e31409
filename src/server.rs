use axum::{
    extract::{DefaultBodyLimit, Multipart},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Router,
};
use hyper::Server;
use serde_json::json;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::app::PipelineUseCase;
use crate::config::Config;
use crate::constants::UPLOAD_FILE_STEM;
use crate::observability::metrics::{emit_counter, emit_histogram, render_metrics, MetricName};

const PREVIEW_ROWS: usize = 10;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}

/// Root banner
async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "CRM Pipeline API is running. POST to /upload-and-process to use."
    }))
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "crm-pipeline",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Prometheus scrape endpoint
async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        render_metrics().unwrap_or_default(),
    )
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "status": "error", "message": message.into() })),
    )
        .into_response()
}

/// Stored name for an upload: the fixed stem plus the uploaded extension, `csv` by default
pub fn upload_path(upload_dir: &Path, file_name: Option<&str>) -> PathBuf {
    let extension = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "csv".to_string());
    upload_dir.join(format!("{}.{}", UPLOAD_FILE_STEM, extension))
}

async fn upload_and_process(Extension(state): Extension<AppState>, mut multipart: Multipart) -> Response {
    let mut upload: Option<(Option<String>, Vec<u8>)> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                let file_name = field.file_name().map(str::to_string);
                match field.bytes().await {
                    Ok(bytes) => {
                        upload = Some((file_name, bytes.to_vec()));
                        break;
                    }
                    Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
                }
            }
            Ok(None) => break,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
        }
    }

    let Some((file_name, bytes)) = upload else {
        return error_response(StatusCode::BAD_REQUEST, "Missing multipart field 'file'");
    };

    emit_counter(MetricName::UploadsReceived, 1);
    emit_histogram(MetricName::UploadBytes, bytes.len() as f64);

    let upload_dir = state.config.paths.upload_dir.clone();
    let path = upload_path(&upload_dir, file_name.as_deref());
    if let Err(e) = tokio::fs::create_dir_all(&upload_dir).await {
        error!("Failed to create upload directory {}: {}", upload_dir.display(), e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }
    if let Err(e) = tokio::fs::write(&path, &bytes).await {
        error!("Failed to store upload at {}: {}", path.display(), e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }
    info!("Stored {} byte upload at {}", bytes.len(), path.display());

    let config = state.config.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        PipelineUseCase::from_config(&config.entity_resolution).run(&path)
    })
    .await;

    let run = match outcome {
        Ok(Ok(run)) => run,
        Ok(Err(e)) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)),
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    let pipeline_metrics = match run.metrics.to_json() {
        Ok(value) => value,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    let kpi_summary = match serde_json::to_value(&run.kpi_summary) {
        Ok(value) => value,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    Json(json!({
        "status": "success",
        "message": "Pipeline executed successfully",
        "pipeline_metrics": pipeline_metrics,
        "kpi_summary": kpi_summary,
        "preview_data": run.dataset.preview(PREVIEW_ROWS),
    }))
    .into_response()
}

/// Create the HTTP server with all routes
pub fn create_server(config: Arc<Config>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);
    let upload_limit = match config.server.max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/upload-and-process", post(upload_and_process))
        .layer(upload_limit)
        .layer(Extension(AppState { config }))
        .layer(ServiceBuilder::new().layer(cors))
}

/// Start the HTTP server on the configured host and port
pub async fn start_server(config: Arc<Config>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = create_server(config);

    println!("🚀 CRM pipeline API running on http://{addr}");
    println!("💚 Health check: http://{addr}/health");
    println!("📈 Metrics:      http://{addr}/metrics");
    println!("📤 Upload:       POST http://{addr}/upload-and-process");

    Server::bind(&addr).serve(app.into_make_service()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    const BOUNDARY: &str = "crm-test-boundary";

    fn multipart_request(field: &str, file_name: &str, contents: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {contents}\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/upload-and-process")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn config_in(dir: &Path) -> Arc<Config> {
        let mut config = Config::default();
        config.paths.upload_dir = dir.join("uploads");
        Arc::new(config)
    }

    #[test]
    fn test_upload_path_keeps_extension() {
        let dir = Path::new("data/raw");
        assert_eq!(upload_path(dir, Some("export.JSON")), dir.join("crm_raw_data.json"));
        assert_eq!(upload_path(dir, Some("export")), dir.join("crm_raw_data.csv"));
        assert_eq!(upload_path(dir, None), dir.join("crm_raw_data.csv"));
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_server(config_in(dir.path()));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_upload_and_process() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_server(config_in(dir.path()));
        let csv = "Company,Email,Close Date,Revenue,Deal Stage\r\n\
                   Globex Inc,j@globex.com,2024-01-01,2000000,closed won\r\n\
                   Globex Inc.,j@globex.com,2024-06-01,2500000,negotiation\r\n\
                   Initech,p@initech.com,2023-05-05,,lead";

        let response = app.oneshot(multipart_request("file", "export.csv", csv)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["preview_data"].as_array().unwrap().len(), 2);
        assert_eq!(body["pipeline_metrics"]["stages"].as_array().unwrap().len(), 5);
        assert!(dir.path().join("uploads/crm_raw_data.csv").exists());
    }

    fn large_export(min_bytes: usize) -> String {
        let mut csv = String::from("Company,Email,Close Date,Revenue,Deal Stage\r\n");
        let mut row = 0;
        while csv.len() < min_bytes {
            csv.push_str(&format!("Globex Inc,rep{row}@globex.com,2024-01-01,{row},lead\r\n"));
            row += 1;
        }
        csv.push_str("Initech,p@initech.com,2023-05-05,1,lead");
        csv
    }

    #[tokio::test]
    async fn test_upload_larger_than_default_body_limit() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_server(config_in(dir.path()));
        let csv = large_export(3 * 1024 * 1024);

        let response = app.oneshot(multipart_request("file", "export.csv", &csv)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "success");
    }

    #[tokio::test]
    async fn test_configured_upload_limit_rejects_oversized_body() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.paths.upload_dir = dir.path().join("uploads");
        config.server.max_upload_bytes = Some(1024);
        let app = create_server(Arc::new(config));

        let response = app
            .oneshot(multipart_request("file", "export.csv", &large_export(4096)))
            .await
            .unwrap();

        assert_ne!(response.status(), StatusCode::OK);
        assert!(!dir.path().join("uploads/crm_raw_data.csv").exists());
    }

    #[tokio::test]
    async fn test_upload_failure_returns_error_body() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_server(config_in(dir.path()));

        let response = app
            .oneshot(multipart_request("file", "export.txt", "not,a,pipeline"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["status"], "error");
        assert!(body["message"].as_str().unwrap().contains("Ingestion"));
    }

    #[tokio::test]
    async fn test_upload_without_file_field() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_server(config_in(dir.path()));

        let response = app
            .oneshot(multipart_request("document", "export.csv", "a,b"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
