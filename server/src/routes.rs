use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use visionpay_core::models::{CheckoutRequest, UpsellOffer, UpsellRequest};

use crate::error::ApiError;
use crate::state::AppState;
use crate::{checkout, dlr, upsell};

pub const INVALID_BODY_MESSAGE: &str = "Corpo da requisição inválido";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/pagar", post(pagar))
        .route("/webhooks/infobip/dlr", post(delivery_report))
        .route("/api/upsell1", post(upsell1))
        .route("/api/upsell2", post(upsell2))
        .route("/api/upsell3", post(upsell3))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Decodes a JSON body; an empty body reads as `{}`.
fn json_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    let parsed = if bytes.iter().all(u8::is_ascii_whitespace) {
        serde_json::from_value(json!({}))
    } else {
        serde_json::from_slice(bytes)
    };
    parsed.map_err(|e| {
        tracing::warn!(error = %e, "Rejected request body");
        ApiError::BadRequest(INVALID_BODY_MESSAGE.to_string())
    })
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn pagar(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let req: CheckoutRequest = json_body(&body)?;
    let request_id = uuid::Uuid::new_v4();
    checkout::process(&state, req)
        .instrument(tracing::info_span!("checkout", %request_id))
        .await
        .map(Json)
}

async fn delivery_report(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let body = dlr::parse_body(&body);
    let stored = dlr::ingest(&state, &body).await;
    tracing::debug!(stored, "Delivery reports processed");
    StatusCode::OK.into_response()
}

async fn run_upsell(state: &AppState, offer: UpsellOffer, body: &[u8]) -> Result<Json<Value>, ApiError> {
    let req: UpsellRequest = json_body(body)?;
    upsell::process(state, offer, req).await.map(Json)
}

async fn upsell1(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Json<Value>, ApiError> {
    run_upsell(&state, UpsellOffer::First, &body).await
}

async fn upsell2(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Json<Value>, ApiError> {
    run_upsell(&state, UpsellOffer::Second, &body).await
}

async fn upsell3(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Json<Value>, ApiError> {
    run_upsell(&state, UpsellOffer::Third, &body).await
}
