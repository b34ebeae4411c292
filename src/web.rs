//! HTTP surface
//!
//! Thin axum layer over the snapshot cache and the device handle. Reading a
//! snapshot never waits on the device; `/raw` queues behind the poller like
//! any other device request. Open `/events` streams end once the shutdown
//! flag is raised, so graceful shutdown does not wait on them.

use crate::device::DeviceHandle;
use crate::error::{HeliosError, Result};
use crate::logging::get_logger;
use crate::snapshot::{Snapshot, SnapshotCache};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[cfg(feature = "openapi")]
use utoipa::OpenApi;
#[cfg(feature = "openapi")]
use utoipa_swagger_ui::SwaggerUi;

/// Version reported by `/status`
pub const VERSION: &str = env!("APP_VERSION");

#[derive(Clone)]
pub struct AppState {
    pub snapshots: SnapshotCache,
    pub device: DeviceHandle,
    /// Turns true when the process is stopping
    pub shutdown: watch::Receiver<bool>,
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct RawParams {
    /// Command text, e.g. `QPIWS` or `MCHGC030`
    pub cmd: Option<String>,
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/status", responses(
    (status = 200, description = "Service is up")
)))]
async fn status() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok", "version": VERSION }))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/query", responses(
    (status = 200, description = "Latest snapshot with its age in LastUpdated", body = crate::snapshot::Snapshot)
)))]
async fn query(State(state): State<AppState>) -> Response {
    let cached = state.snapshots.read();
    match serde_json::to_string_pretty(&cached.view()) {
        Ok(mut body) => {
            body.push('\n');
            ([(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/raw", params(RawParams), responses(
    (status = 200, description = "Unparsed reply payload"),
    (status = 400, description = "Missing or invalid command"),
    (status = 503, description = "Inverter did not answer")
)))]
async fn raw(State(state): State<AppState>, Query(params): Query<RawParams>) -> Response {
    let Some(cmd) = params.cmd.filter(|c| !c.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "missing query parameter 'cmd'");
    };

    match state.device.raw_query(&cmd).await {
        Ok(mut payload) => {
            payload.push('\n');
            (
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                payload,
            )
                .into_response()
        }
        Err(e) => {
            let code = status_for(&e);
            get_logger("web")
                .for_command(cmd.trim())
                .warn(&format!("Raw command failed: {}", e));
            error_response(code, &e.to_string())
        }
    }
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/events", responses(
    (status = 200, description = "Server-sent events, one `snapshot` event per publish")
)))]
async fn events(State(state): State<AppState>) -> impl IntoResponse {
    let stopping = WatchStream::new(state.shutdown.clone())
        .filter(|stop| *stop)
        .map(|_| None::<Arc<Snapshot>>);
    let stream = WatchStream::from_changes(state.snapshots.subscribe())
        .map(Some)
        .merge(stopping)
        .map_while(|snapshot| snapshot)
        .filter_map(|snapshot| {
            serde_json::to_string(&*snapshot).ok().map(|data| {
                Ok::<Event, std::convert::Infallible>(Event::default().event("snapshot").data(data))
            })
        });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(feature = "openapi")]
#[utoipa::path(get, path = "/config/schema", responses((status = 200)))]
async fn get_config_schema() -> impl IntoResponse {
    let schema = schemars::schema_for!(crate::config::Config);
    Json(serde_json::to_value(&schema).unwrap_or(serde_json::json!({"error":"schema"})))
}

fn status_for(err: &HeliosError) -> StatusCode {
    match err {
        HeliosError::Validation { .. } => StatusCode::BAD_REQUEST,
        e if e.is_device_fault() => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(code: StatusCode, message: &str) -> Response {
    (code, Json(serde_json::json!({ "error": message }))).into_response()
}

#[cfg(feature = "openapi")]
#[derive(OpenApi)]
#[openapi(
    paths(status, query, raw, events, get_config_schema),
    components(schemas(crate::snapshot::Snapshot)),
    tags((name = "helios", description = "Helios inverter bridge API"))
)]
pub struct ApiDoc;

pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(status))
        .route("/status", get(status))
        .route("/query", get(query))
        .route("/raw", get(raw))
        .route("/events", get(events));

    #[cfg(feature = "openapi")]
    let router = router
        .route("/config/schema", get(get_config_schema))
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()));

    router
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind `host:port` and serve until `shutdown` resolves
pub async fn serve<F>(state: AppState, host: &str, port: u16, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let logger = get_logger("web");

    let addr = match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port),
        Err(_) => {
            logger.warn(&format!("Invalid host '{}'; falling back to 127.0.0.1", host));
            ([127, 0, 0, 1], port).into()
        }
    };

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| HeliosError::web(format!("Failed to bind {}: {}", addr, e)))?;
    serve_on(listener, state, shutdown).await
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn serve_on<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = build_router(state);
    let logger = get_logger("web");

    let local_addr = listener.local_addr()?;
    logger.info(&format!(
        "Web server listening at http://{}:{} (/query, /raw, /events)",
        local_addr.ip(),
        local_addr.port()
    ));

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| HeliosError::web(format!("Server error: {}", e)))?;
    logger.info("Web server stopped");
    Ok(())
}
