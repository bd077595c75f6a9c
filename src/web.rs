use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::analytics::Analytics;
use crate::config::Settings;
use crate::dashboard::{Dashboard, DashboardLoader, DashboardSnapshot};
use crate::fetch::MonitoredFetch;
use crate::filter::MovementFilter;
use crate::logstore::LogStore;
use crate::monitor::{Monitor, MonitorSnapshot};
use crate::proxy;
use crate::types::SystemStatus;
use crate::upstream::UpstreamClient;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardView<'a> {
    loading: bool,
    status: SystemStatus,
    snapshot: Option<&'a DashboardSnapshot>,
}

pub struct AppState {
    pub dashboard: Dashboard<UpstreamClient>,
}

impl AppState {
    fn monitor(&self) -> &Arc<Monitor> {
        self.dashboard.monitor()
    }
}

/// All HTTP and WebSocket routes, with the static dashboard as fallback.
pub fn router(state: Arc<AppState>, upstream: UpstreamClient, static_dir: PathBuf) -> Router {
    Router::new()
        .route("/api/dashboard", get(dashboard_handler))
        .route("/api/dashboard/refresh", post(refresh_handler))
        .route("/api/movements", get(movements_handler))
        .route("/api/monitor", get(monitor_handler))
        .route("/api/monitor/simulate", post(simulate_handler))
        .route("/ws", get(ws_handler))
        .with_state(state)
        .merge(proxy::router(upstream))
        .fallback_service(ServeDir::new(static_dir))
}

pub async fn run(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let upstream = settings.upstream_client()?;
    let monitor = Arc::new(Monitor::new(LogStore::open(&settings.data_dir)));
    let loader = DashboardLoader::new(
        MonitoredFetch::new(upstream.clone(), monitor),
        settings.account_id.clone(),
        Analytics::new(settings.invalid_amounts),
    );
    let state = Arc::new(AppState { dashboard: Dashboard::new(loader) });

    // Initial load; failures are already logged and the dashboard stays empty.
    let initial = state.clone();
    tokio::spawn(async move {
        let _ = initial.dashboard.refresh().await;
    });

    let app = router(state, upstream, settings.static_dir.clone());

    let addr = format!("0.0.0.0:{}", settings.port);
    info!(%addr, account = %settings.account_id, "dashboard listening");
    println!("Dashboard at http://localhost:{}", settings.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn dashboard_handler(State(state): State<Arc<AppState>>) -> Response {
    let current = state.dashboard.current();
    Json(DashboardView {
        loading: state.dashboard.is_loading(),
        status: state.monitor().status(),
        snapshot: current.as_deref(),
    })
    .into_response()
}

async fn refresh_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.dashboard.refresh().await {
        Ok(snapshot) => Json(&*snapshot).into_response(),
        Err(e) => (StatusCode::BAD_GATEWAY, Json(json!({ "error": e.to_string() }))).into_response(),
    }
}

async fn movements_handler(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<MovementFilter>,
) -> Response {
    Json(state.dashboard.filtered(&filter)).into_response()
}

async fn monitor_handler(State(state): State<Arc<AppState>>) -> Json<MonitorSnapshot> {
    Json(state.monitor().snapshot())
}

async fn simulate_handler(State(state): State<Arc<AppState>>) -> Response {
    let event = state.monitor().simulate_failure();
    (StatusCode::CREATED, Json(event)).into_response()
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let initial = state.monitor().snapshot();
    let rx = state.monitor().subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, initial, rx))
}

async fn handle_socket(
    mut socket: WebSocket,
    initial: MonitorSnapshot,
    mut rx: broadcast::Receiver<MonitorSnapshot>,
) {
    if send_snapshot(&mut socket, &initial).await.is_err() {
        return;
    }
    loop {
        match rx.recv().await {
            Ok(snapshot) => {
                if send_snapshot(&mut socket, &snapshot).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "websocket client lagging behind monitor updates");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn send_snapshot(socket: &mut WebSocket, snapshot: &MonitorSnapshot) -> Result<(), axum::Error> {
    let text = serde_json::to_string(snapshot).unwrap_or_default();
    socket.send(Message::Text(text)).await
}
