//! HTTP surface for ingestion and dashboard data
//!
//! Thin axum layer over the store, aggregation and clustering modules. The
//! store is the only shared mutable resource; appends go through the writer
//! lock and every read endpoint works from an owned snapshot.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

use crate::cluster::{cluster_points, Cluster, GeoPoint};
use crate::enrich::Enricher;
use crate::models::EnrichedPackage;
use crate::stats;
use crate::store::BoundedStore;
use crate::validate::{parse_package, ValidationError};

/// Shared state injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<BoundedStore>>,
    pub enricher: Arc<Enricher>,
    pub cluster_radius_km: f64,
}

impl AppState {
    pub fn new(store_capacity: usize, enricher: Arc<Enricher>, cluster_radius_km: f64) -> Self {
        AppState {
            store: Arc::new(RwLock::new(BoundedStore::new(store_capacity))),
            enricher,
            cluster_radius_km,
        }
    }
}

/// Error response carrying an HTTP status and a JSON error body
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::bad_request(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/packages", post(receive_package).get(list_packages))
        .route("/api/stats", get(get_stats))
        .route("/api/activity", get(get_activity))
        .route("/api/map", get(get_map_data))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn serve(bind_address: &str, state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    log::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        log::info!("Received shutdown signal, gracefully stopping...");
    }
}

async fn health() -> &'static str {
    "ok"
}

/// POST /api/packages — validate, enrich, store. One package per request.
async fn receive_package(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let fields = body
        .as_object()
        .ok_or_else(|| ApiError::bad_request("Invalid package format"))?;

    let record = parse_package(fields)?;
    let enriched = state.enricher.enrich(record).await;
    state.store.write().await.push(enriched);

    Ok(Json(serde_json::json!({ "status": "success" })))
}

/// GET /api/packages — the full store snapshot, oldest first.
async fn list_packages(State(state): State<AppState>) -> Json<Vec<EnrichedPackage>> {
    Json(state.store.read().await.snapshot())
}

/// GET /api/stats — totals, country breakdown, top locations.
async fn get_stats(State(state): State<AppState>) -> Json<stats::StatsSummary> {
    let snapshot = state.store.read().await.snapshot();
    Json(stats::summarize(&snapshot))
}

/// GET /api/activity — hour-of-day and day-of-week histograms.
async fn get_activity(State(state): State<AppState>) -> Json<stats::ActivitySummary> {
    let snapshot = state.store.read().await.snapshot();
    Json(stats::activity(&snapshot))
}

#[derive(Deserialize)]
pub struct MapQuery {
    radius_km: Option<f64>,
}

#[derive(Serialize)]
pub struct MapPoint {
    pub ip: String,
    pub latitude: f64,
    pub longitude: f64,
    pub suspicious: bool,
    pub country: String,
    pub human_time: String,
}

impl From<EnrichedPackage> for MapPoint {
    fn from(p: EnrichedPackage) -> Self {
        MapPoint {
            ip: p.ip,
            latitude: p.latitude,
            longitude: p.longitude,
            suspicious: p.suspicious,
            country: p.country,
            human_time: p.human_time,
        }
    }
}

#[derive(Serialize)]
pub struct MapData {
    pub points: Vec<MapPoint>,
    pub radius_km: f64,
    pub clusters: Vec<Cluster>,
}

/// GET /api/map — per-point rendering data plus greedy clusters.
async fn get_map_data(
    State(state): State<AppState>,
    Query(query): Query<MapQuery>,
) -> Json<MapData> {
    let snapshot = state.store.read().await.snapshot();
    let radius_km = query.radius_km.unwrap_or(state.cluster_radius_km);

    let points: Vec<GeoPoint> = snapshot
        .iter()
        .map(|p| GeoPoint {
            latitude: p.latitude,
            longitude: p.longitude,
        })
        .collect();
    let clusters = cluster_points(points, radius_km);

    Json(MapData {
        points: snapshot.into_iter().map(MapPoint::from).collect(),
        radius_km,
        clusters,
    })
}
