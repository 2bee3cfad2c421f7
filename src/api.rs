//! HTTP API for Atlas
//!
//! Provides the REST surface:
//! - `GET /allocation?by=&category=&store=&inventory=` for allocation plans
//! - `GET /forecast/store/:store` / `GET /forecast/product/:category`
//! - `GET /historical/:mode/:days?name=` for daily demand breakdowns
//! - `GET /health`, `GET /ready`, `GET /metrics`
//!
//! Handlers translate query parameters into allocation requests and map
//! domain errors onto status codes; no optimization logic lives here.

use crate::allocator::{AllocationMode, AllocationPlan, AllocationRequest};
use crate::error::{AtlasError, Result};
use crate::history::BreakdownAxis;
use crate::runtime::Atlas;
use crate::types::{CategoryId, ForecastPoint, StoreId};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    /// Bind address
    pub bind_addr: SocketAddr,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], 8080).into(),
            timeout_secs: 30,
        }
    }
}

impl HttpServerConfig {
    /// Create with custom bind address
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Parse from string address
    pub fn with_addr_str(mut self, addr: &str) -> Result<Self> {
        self.bind_addr = addr
            .parse()
            .map_err(|e| AtlasError::config(format!("Invalid address: {}", e)))?;
        Ok(self)
    }
}

/// HTTP server wrapper
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(config: HttpServerConfig) -> Self {
        Self {
            config,
            router: Router::new(),
        }
    }

    /// Set the router
    pub fn with_router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    /// Start the server
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|e| AtlasError::network(format!("Failed to bind: {}", e)))?;

        info!(addr = %self.config.bind_addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .await
            .map_err(|e| AtlasError::network(format!("Server error: {}", e)))?;

        Ok(())
    }
}

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct ApiState {
    /// The Atlas runtime
    pub atlas: Arc<Atlas>,
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable message
    pub error: String,
    /// Stable error kind label
    pub kind: &'static str,
    /// HTTP status code
    pub code: u16,
}

impl ErrorResponse {
    fn from_error(err: &AtlasError) -> Self {
        Self {
            error: err.to_string(),
            kind: err.kind(),
            code: status_for(err).as_u16(),
        }
    }
}

impl From<AtlasError> for ErrorResponse {
    fn from(err: AtlasError) -> Self {
        Self::from_error(&err)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Map a domain error onto an HTTP status code
pub fn status_for(err: &AtlasError) -> StatusCode {
    match err {
        AtlasError::InvalidMode(_)
        | AtlasError::MissingSelector(_)
        | AtlasError::UnknownInventory(_)
        | AtlasError::InvalidTotal(_)
        | AtlasError::EmptyConsumerSet => StatusCode::BAD_REQUEST,
        AtlasError::NoForecast(_) => StatusCode::NOT_FOUND,
        AtlasError::MisalignedCalendars(_) | AtlasError::NonFiniteForecast(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AtlasError::Forecast(_) | AtlasError::History(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Build the full API router
pub fn router(atlas: Arc<Atlas>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/allocation", get(allocation_handler))
        .route("/forecast/store/:store", get(forecast_store_handler))
        .route("/forecast/product/:category", get(forecast_product_handler))
        .route("/historical/:mode/:days", get(historical_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(ApiState { atlas })
}

// Query parameters

/// Query parameters for the allocation endpoint
#[derive(Debug, Deserialize)]
pub struct AllocationParams {
    /// Allocation mode: `product` or `store`
    pub by: Option<String>,
    /// Category selector (product mode)
    pub category: Option<String>,
    /// Store selector (store mode)
    pub store: Option<String>,
    /// Caller-supplied total, overriding inventory defaults
    pub inventory: Option<f64>,
}

/// Query parameters for the historical endpoint
#[derive(Debug, Deserialize)]
pub struct HistoricalParams {
    /// Optional store/category to narrow the breakdown to
    pub name: Option<String>,
}

// Response bodies

/// One observed (date, quantity) pair
#[derive(Debug, Clone, Serialize)]
pub struct SeriesPoint {
    /// Calendar date
    pub date: NaiveDate,
    /// Observed quantity
    pub quantity: f64,
}

/// Recent actuals plus forecast horizon for one (store, category) pair
#[derive(Debug, Clone, Serialize)]
pub struct PairWindow {
    /// Observed daily quantities over the trailing week
    pub past_7_days: Vec<SeriesPoint>,
    /// Forecast points over the horizon
    pub next_7_days: Vec<ForecastPoint>,
}

// Handlers

async fn health_handler(State(state): State<ApiState>) -> Json<serde_json::Value> {
    let snapshot = state.atlas.snapshot().map(|s| s.id().to_string());
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "snapshot": snapshot,
    }))
}

async fn ready_handler(State(state): State<ApiState>) -> StatusCode {
    if state.atlas.snapshot().is_some() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn allocation_handler(
    State(state): State<ApiState>,
    Query(params): Query<AllocationParams>,
) -> std::result::Result<Json<AllocationPlan>, ErrorResponse> {
    let result = allocation_request(&params).and_then(|request| state.atlas.plan(&request));

    match result {
        Ok(plan) => {
            state.record_http("GET", "/allocation", StatusCode::OK);
            Ok(Json(plan))
        }
        Err(err) => {
            state.record_http("GET", "/allocation", status_for(&err));
            Err(err.into())
        }
    }
}

/// Translate query parameters into an allocation request
fn allocation_request(params: &AllocationParams) -> Result<AllocationRequest> {
    let by = params
        .by
        .as_deref()
        .ok_or_else(|| AtlasError::InvalidMode("query parameter 'by' is required".to_string()))?;
    let mode: AllocationMode = by.parse()?;

    let selector = match mode {
        AllocationMode::ByProduct => params.category.clone().ok_or_else(|| {
            AtlasError::missing_selector("product allocation requires a 'category' parameter")
        })?,
        AllocationMode::ByStore => params.store.clone().ok_or_else(|| {
            AtlasError::missing_selector("store allocation requires a 'store' parameter")
        })?,
    };

    Ok(AllocationRequest {
        mode,
        selector,
        total: params.inventory,
    })
}

async fn forecast_store_handler(
    State(state): State<ApiState>,
    Path(store): Path<String>,
) -> std::result::Result<Json<BTreeMap<CategoryId, Option<PairWindow>>>, ErrorResponse> {
    let store = StoreId::new(store);

    // Every known category gets a key; pairs without a forecast come out
    // null rather than being omitted.
    let result = state.atlas.snapshot_required().and_then(|snapshot| {
        let history = state.atlas.history_required()?;
        let windows = history
            .categories()
            .into_iter()
            .map(|category| {
                let window = snapshot.series(&store, &category).map(|points| PairWindow {
                    past_7_days: state.past_week(&store, &category),
                    next_7_days: points.to_vec(),
                });
                (category, window)
            })
            .collect();
        Ok(windows)
    });

    match result {
        Ok(windows) => {
            state.record_http("GET", "/forecast/store", StatusCode::OK);
            Ok(Json(windows))
        }
        Err(err) => {
            state.record_http("GET", "/forecast/store", status_for(&err));
            Err(err.into())
        }
    }
}

async fn forecast_product_handler(
    State(state): State<ApiState>,
    Path(category): Path<String>,
) -> std::result::Result<Json<BTreeMap<StoreId, Option<PairWindow>>>, ErrorResponse> {
    let category = CategoryId::new(category);

    // Every known store gets a key; pairs without a forecast come out null
    // rather than being omitted, and an all-null map is still a success.
    let result = state.atlas.snapshot_required().and_then(|snapshot| {
        let history = state.atlas.history_required()?;
        let windows = history
            .stores()
            .into_iter()
            .map(|store| {
                let window = snapshot.series(&store, &category).map(|points| PairWindow {
                    past_7_days: state.past_week(&store, &category),
                    next_7_days: points.to_vec(),
                });
                (store, window)
            })
            .collect();
        Ok(windows)
    });

    match result {
        Ok(windows) => {
            state.record_http("GET", "/forecast/product", StatusCode::OK);
            Ok(Json(windows))
        }
        Err(err) => {
            state.record_http("GET", "/forecast/product", status_for(&err));
            Err(err.into())
        }
    }
}

async fn historical_handler(
    State(state): State<ApiState>,
    Path((mode, days)): Path<(String, u32)>,
    Query(params): Query<HistoricalParams>,
) -> std::result::Result<Json<Vec<crate::history::BreakdownRow>>, ErrorResponse> {
    let result = historical_rows(&state, &mode, days, params.name.as_deref());

    match result {
        Ok(rows) => {
            state.record_http("GET", "/historical", StatusCode::OK);
            Ok(Json(rows))
        }
        Err(err) => {
            state.record_http("GET", "/historical", status_for(&err));
            Err(err.into())
        }
    }
}

/// A store-mode breakdown for one store shows its per-category mix; a
/// product-mode breakdown for one category shows its per-store mix.
fn historical_rows(
    state: &ApiState,
    mode: &str,
    days: u32,
    name: Option<&str>,
) -> Result<Vec<crate::history::BreakdownRow>> {
    let mode: AllocationMode = mode.parse()?;
    let history = state.atlas.history_required()?;

    let rows = match (mode, name) {
        (AllocationMode::ByStore, Some(store)) => history.daily_breakdown(
            days,
            BreakdownAxis::Category,
            Some(&StoreId::new(store)),
            None,
        ),
        (AllocationMode::ByStore, None) => {
            history.daily_breakdown(days, BreakdownAxis::Store, None, None)
        }
        (AllocationMode::ByProduct, Some(category)) => history.daily_breakdown(
            days,
            BreakdownAxis::Store,
            None,
            Some(&CategoryId::new(category)),
        ),
        (AllocationMode::ByProduct, None) => {
            history.daily_breakdown(days, BreakdownAxis::Category, None, None)
        }
    };

    Ok(rows)
}

async fn metrics_handler(
    State(state): State<ApiState>,
) -> std::result::Result<String, StatusCode> {
    match state.atlas.metrics() {
        Some(metrics) => metrics
            .gather_text()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR),
        None => Err(StatusCode::NOT_FOUND),
    }
}

impl ApiState {
    fn record_http(&self, method: &str, path: &str, status: StatusCode) {
        if let Some(metrics) = self.atlas.metrics() {
            metrics.record_http_request(method, path, status.as_u16());
        }
    }

    fn past_week(&self, store: &StoreId, category: &CategoryId) -> Vec<SeriesPoint> {
        self.atlas
            .history()
            .map(|history| {
                history
                    .tail_series(store, category, 7)
                    .into_iter()
                    .map(|(date, quantity)| SeriesPoint { date, quantity })
                    .collect()
            })
            .unwrap_or_default()
    }
}
