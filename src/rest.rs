/*!
flowmap REST server

Serves the dashboard page and JSON APIs over the activity aggregates.

## Usage

```bash
flowmap-rest --host 127.0.0.1 --port 3000 --data-dir data
```

## Endpoints

- `GET  /`                 - Dashboard page (`?view=distribution|flows`)
- `GET  /api/v1/map`       - deck.gl map document for a view
- `GET  /api/v1/insights`  - Headline metrics and top-5 rankings
- `POST /api/v1/reload`    - Invalidate the load cache
- `GET  /api/v1/health`    - Health check
- `GET  /api/v1/version`   - Version information
*/

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flowmap::page::{self, DashboardView};
use flowmap::reader::{self, DemoReader, LoadOutcome, LoadSource, RankedCity, DEFAULT_SEED};
use flowmap::{FlowmapError, LoadCache, VERSION};

/// CLI arguments for the REST server
#[derive(Parser)]
#[command(name = "flowmap-rest")]
#[command(about = "flowmap REST server")]
#[command(version = VERSION)]
struct Cli {
    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind to
    #[arg(long, default_value = "3400")]
    port: u16,

    /// CORS allowed origins (comma-separated)
    #[arg(long, default_value = "*")]
    cors_origin: String,

    /// Directory containing the five input CSVs
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Seed for flow sampling / demo generation
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Serve demo data without trying the input files
    #[arg(long)]
    demo: bool,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    cache: Arc<LoadCache>,
    data_dir: PathBuf,
    seed: u64,
    demo: bool,
}

impl AppState {
    fn cache_key(&self) -> String {
        format!(
            "{}#{}#{}",
            self.data_dir.display(),
            self.seed,
            if self.demo { "demo" } else { "files" }
        )
    }

    fn load(&self) -> flowmap::Result<LoadOutcome> {
        self.cache.get_or_load(&self.cache_key(), || {
            if self.demo {
                Ok(LoadOutcome {
                    data: DemoReader::new().with_seed(self.seed).load()?,
                    source: LoadSource::Demo {
                        reason: "demo data requested".to_string(),
                    },
                })
            } else {
                reader::load_with_fallback(&self.data_dir, self.seed)
            }
        })
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// `?view=` query on the dashboard and map endpoints
#[derive(Debug, Deserialize)]
struct ViewQuery {
    view: Option<String>,
}

/// Successful API response
#[derive(Debug, Serialize)]
struct ApiSuccess<T> {
    status: String,
    data: T,
}

impl<T> ApiSuccess<T> {
    fn new(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data,
        }
    }
}

/// Error API response
#[derive(Debug, Serialize)]
struct ApiError {
    status: String,
    error: ErrorDetails,
}

#[derive(Debug, Serialize)]
struct ErrorDetails {
    message: String,
    #[serde(rename = "type")]
    error_type: String,
}

/// Map endpoint result data
#[derive(Debug, Serialize)]
struct MapResult {
    view: String,
    /// The deck.gl map document
    spec: serde_json::Value,
    metadata: MapMetadata,
}

#[derive(Debug, Serialize)]
struct MapMetadata {
    layers: usize,
    /// Where the underlying data came from ("files" or "demo")
    source: String,
}

/// Insights endpoint result data
#[derive(Debug, Serialize)]
struct InsightsResult {
    source: String,
    primary_hub: Option<RankedCity>,
    total_customers: i64,
    total_sellers: i64,
    flow_edges: usize,
    top_by_customers: Vec<RankedCity>,
    top_by_sellers: Vec<RankedCity>,
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Version response
#[derive(Debug, Serialize)]
struct VersionResponse {
    version: String,
    features: Vec<String>,
}

// ============================================================================
// Error Handling
// ============================================================================

/// Custom error type for API responses
struct ApiErrorResponse {
    status: StatusCode,
    error: ApiError,
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<FlowmapError> for ApiErrorResponse {
    fn from(err: FlowmapError) -> Self {
        let (status, error_type) = match &err {
            FlowmapError::DataUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "DataUnavailable"),
            FlowmapError::MapUnavailable(_) => (StatusCode::UNPROCESSABLE_ENTITY, "MapUnavailable"),
            FlowmapError::WriterError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "WriterError"),
            FlowmapError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };

        ApiErrorResponse {
            status,
            error: ApiError {
                status: "error".to_string(),
                error: ErrorDetails {
                    message: err.to_string(),
                    error_type: error_type.to_string(),
                },
            },
        }
    }
}

// ============================================================================
// Handler Functions
// ============================================================================

/// GET / - the dashboard page
async fn dashboard_handler(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Result<Html<String>, ApiErrorResponse> {
    let view = DashboardView::from_query(query.view.as_deref());
    let outcome = state.load()?;
    let html = page::render_page(&outcome.data, view, &outcome.source)?;
    Ok(Html(html))
}

/// GET /api/v1/map - the deck.gl map document for a view
async fn map_handler(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<ApiSuccess<MapResult>>, ApiErrorResponse> {
    let view = DashboardView::from_query(query.view.as_deref());
    let outcome = state.load()?;

    let doc = page::map_document(&outcome.data, view)?.ok_or_else(|| {
        FlowmapError::MapUnavailable(format!(
            "no data available for the {} view",
            view.label().to_lowercase()
        ))
    })?;
    let spec: serde_json::Value = serde_json::from_str(&doc)
        .map_err(|e| FlowmapError::WriterError(format!("failed to parse map JSON: {}", e)))?;

    let layers = spec["layers"].as_array().map(Vec::len).unwrap_or(0);
    Ok(Json(ApiSuccess::new(MapResult {
        view: view.as_query().to_string(),
        spec,
        metadata: MapMetadata {
            layers,
            source: source_name(&outcome.source).to_string(),
        },
    })))
}

/// GET /api/v1/insights - headline metrics and rankings
async fn insights_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiSuccess<InsightsResult>>, ApiErrorResponse> {
    let outcome = state.load()?;
    let data = &outcome.data;

    Ok(Json(ApiSuccess::new(InsightsResult {
        source: source_name(&outcome.source).to_string(),
        primary_hub: data.busiest_city()?,
        total_customers: data.total_customers()?,
        total_sellers: data.total_sellers()?,
        flow_edges: data.flows.height(),
        top_by_customers: data.top_by_customers(5)?,
        top_by_sellers: data.top_by_sellers(5)?,
    })))
}

/// POST /api/v1/reload - drop the cached load outcome
async fn reload_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiSuccess<String>>, ApiErrorResponse> {
    state.cache.invalidate()?;
    info!("load cache invalidated");
    Ok(Json(ApiSuccess::new("reloaded".to_string())))
}

/// GET /api/v1/health - health check
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: VERSION.to_string(),
    })
}

/// GET /api/v1/version - version information
async fn version_handler() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: VERSION.to_string(),
        features: vec!["rest-api".to_string()],
    })
}

fn source_name(source: &LoadSource) -> &'static str {
    match source {
        LoadSource::Files => "files",
        LoadSource::Demo { .. } => "demo",
    }
}

fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/api/v1/map", get(map_handler))
        .route("/api/v1/insights", get(insights_handler))
        .route("/api/v1/reload", post(reload_handler))
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/version", get(version_handler))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flowmap_rest=info,flowmap=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let state = AppState {
        cache: Arc::new(LoadCache::new()),
        data_dir: cli.data_dir,
        seed: cli.seed,
        demo: cli.demo,
    };

    // Configure CORS
    let cors = if cli.cors_origin == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(vec![header::CONTENT_TYPE])
    } else {
        let origins: Vec<_> = cli
            .cors_origin
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(vec![header::CONTENT_TYPE])
    };

    let app = build_router(state, cors);

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid host or port: {e}"))?;

    info!("starting flowmap REST server on {}", addr);
    info!("  GET  /                 - dashboard page");
    info!("  GET  /api/v1/map       - map document");
    info!("  GET  /api/v1/insights  - headline metrics");
    info!("  POST /api/v1/reload    - invalidate load cache");
    info!("  GET  /api/v1/health    - health check");
    info!("  GET  /api/v1/version   - version info");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let state = AppState {
            cache: Arc::new(LoadCache::new()),
            data_dir: PathBuf::from("unused"),
            seed: DEFAULT_SEED,
            demo: true,
        };
        build_router(state, CorsLayer::permissive())
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert!(json["version"].is_string());
    }

    #[tokio::test]
    async fn test_version_endpoint() {
        let app = create_test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/version")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["features"], serde_json::json!(["rest-api"]));
    }

    #[tokio::test]
    async fn test_dashboard_serves_html() {
        let app = create_test_app();
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8_lossy(&body);
        assert!(html.contains("Brazil E-Commerce Activity Map"));
        assert!(html.contains("Geographic Distribution Legend"));
        // The demo substitution is visible to the user.
        assert!(html.contains("Demo data in use"));
    }

    #[tokio::test]
    async fn test_map_endpoint_distribution() {
        let app = create_test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/map?view=distribution")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"]["metadata"]["layers"], 2);
        assert_eq!(json["data"]["metadata"]["source"], "demo");
        assert_eq!(
            json["data"]["spec"]["layers"][0]["@@type"],
            "ScatterplotLayer"
        );
    }

    #[tokio::test]
    async fn test_insights_endpoint() {
        let app = create_test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/insights")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["total_customers"], 55_468);
        assert_eq!(json["data"]["total_sellers"], 9_355);
        assert_eq!(json["data"]["primary_hub"]["city"], "São Paulo");
        assert_eq!(json["data"]["top_by_customers"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_reload_invalidates_the_cache() {
        let state = AppState {
            cache: Arc::new(LoadCache::new()),
            data_dir: PathBuf::from("unused"),
            seed: DEFAULT_SEED,
            demo: true,
        };
        let cache = state.cache.clone();
        let key = state.cache_key();
        let app = build_router(state, CorsLayer::permissive());

        // Prime the cache via the insights endpoint.
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/insights")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(cache.cached_key().as_deref(), Some(key.as_str()));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/reload")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(cache.cached_key(), None);
    }
}
