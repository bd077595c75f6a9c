use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::upstream::UpstreamClient;

#[derive(Debug, Default, Deserialize)]
pub struct ProxyQuery {
    pub endpoint: Option<String>,
}

/// `GET /api/proxy?endpoint=<path>`: relays to the bank with the API key
/// attached and hands back its status and JSON body untouched.
pub fn router(upstream: UpstreamClient) -> Router {
    Router::new()
        .route("/api/proxy", get(proxy_handler))
        .with_state(Arc::new(upstream))
}

async fn proxy_handler(
    State(upstream): State<Arc<UpstreamClient>>,
    Query(query): Query<ProxyQuery>,
) -> Response {
    relay(&upstream, query.endpoint.as_deref()).await
}

pub async fn relay(upstream: &UpstreamClient, endpoint: Option<&str>) -> Response {
    let Some(endpoint) = endpoint.filter(|e| !e.is_empty()) else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "Endpoint required" }))).into_response();
    };

    match upstream.relay(endpoint).await {
        Ok(relayed) => {
            debug!(endpoint, status = relayed.status, "proxied");
            let status = StatusCode::from_u16(relayed.status).unwrap_or(StatusCode::BAD_GATEWAY);
            (status, Json(relayed.body)).into_response()
        }
        Err(e) => {
            warn!(endpoint, error = %e, "proxy relay failed");
            (StatusCode::BAD_GATEWAY, Json(json!({ "error": "Network Failure" }))).into_response()
        }
    }
}
