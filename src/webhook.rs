//! Webhook update sources
//!
//! One HTTP POST per update. The endpoint acknowledges with a fixed `"ok"`
//! immediately and processes the update on a detached background task — the
//! HTTP response never reflects processing success or failure, so dispatch
//! errors go to the log instead.
//!
//! Multi-tenant apps encode the instance id as a path segment; single-tenant
//! apps use a static pre-shared token segment as a minimal anti-abuse
//! measure (plain path match, nothing cryptographic).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use teloxide::types::Update;
use tokio::net::TcpListener;

use crate::engine::BotEngine;
use crate::single::SingleBotEngine;

/// Router for a multi-tenant engine: `POST /webhook/:instance_id`.
pub fn instance_app(engine: Arc<BotEngine>) -> Router {
    Router::new()
        .route("/webhook/:instance_id", post(instance_webhook))
        .with_state(engine)
}

async fn instance_webhook(
    Path(instance_id): Path<i64>,
    State(engine): State<Arc<BotEngine>>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    tokio::spawn(async move {
        // Deserialize via a string: teloxide's Update does not deserialize
        // from a serde_json::Value (RawValue/flatten limitation) and would
        // silently degrade to UpdateKind::Error.
        let update: Update = match serde_json::from_str(&payload.to_string()) {
            Ok(update) => update,
            Err(e) => {
                log::warn!("Discarding malformed update payload: {}", e);
                return;
            }
        };
        if let Err(e) = engine.process_update(instance_id, update).await {
            log::error!("Webhook update for instance {} failed: {}", instance_id, e);
        }
    });

    (StatusCode::OK, "ok")
}

/// Router for a single-tenant engine: `POST /webhook/<security_token>`.
pub fn single_app(engine: Arc<SingleBotEngine>, security_token: &str) -> Router {
    Router::new()
        .route(&format!("/webhook/{security_token}"), post(single_webhook))
        .with_state(engine)
}

async fn single_webhook(
    State(engine): State<Arc<SingleBotEngine>>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    tokio::spawn(async move {
        // Deserialize via a string: teloxide's Update does not deserialize
        // from a serde_json::Value (RawValue/flatten limitation) and would
        // silently degrade to UpdateKind::Error.
        let update: Update = match serde_json::from_str(&payload.to_string()) {
            Ok(update) => update,
            Err(e) => {
                log::warn!("Discarding malformed update payload: {}", e);
                return;
            }
        };
        if let Err(e) = engine.process_update(update).await {
            log::error!("Webhook update failed: {}", e);
        }
    });

    (StatusCode::OK, "ok")
}

/// Bind `port` on all interfaces and serve `app` until the process exits.
pub async fn serve(app: Router, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    log::info!("Starting webhook server on http://{}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await
}
