//! HTTP surface of the control panel.
//!
//! Every route is a `GET` with query parameters, matching what the embedded
//! single-page panel sends:
//!
//! | Route              | Parameters        | Response                          |
//! |--------------------|-------------------|-----------------------------------|
//! | `/`                |                   | control panel HTML                |
//! | `/list-vms`        |                   | JSON array of VM names            |
//! | `/control-vm`      | `vm`, `action`    | [`ControlResponse`]               |
//! | `/send-keystrokes` | `vm`, `keys`      | [`KeysResponse`]                  |
//! | `/vm-status`       | `vm`              | [`StatusResponse`]                |
//! | `/vm-info`         | `vm`              | [`InfoResponse`]                  |
//! | `/screenshot.png`  | `vm`, `download`  | PNG, or the SVG placeholder       |
//!
//! Failures are JSON [`ErrorResponse`]s.  The screenshot route never fails,
//! not even on an unreadable query string.
//!
//! The handlers only move data between HTTP and the [`VmOrchestrator`]; all
//! validation and locking happens there.
//!
//! # Client disconnects
//!
//! Hyper drops a handler's future when the browser hangs up.  Each VM
//! operation therefore runs on its own Tokio task and the handler only waits
//! for it, so a closed tab cannot cut a keystroke batch short, release a VM
//! lock early, or kill a running `VBoxManage` process.
//!
//! [`ControlResponse`]: crate::domain::ControlResponse
//! [`KeysResponse`]: crate::domain::KeysResponse
//! [`StatusResponse`]: crate::domain::StatusResponse
//! [`InfoResponse`]: crate::domain::InfoResponse

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::application::orchestrator::{ControlError, VmOrchestrator};
use crate::application::screenshot::ScreenshotService;
use crate::domain::{ErrorResponse, Screenshot};
use crate::infrastructure::gateway::GatewayErrorKind;

/// The control panel page, compiled into the binary.
const INDEX_HTML: &str = include_str!("../../assets/index.html");

/// Query parameters accepted by the routes; each route reads the ones it needs.
#[derive(Debug, Default, Deserialize)]
pub struct VmQuery {
    pub vm: Option<String>,
    pub action: Option<String>,
    pub keys: Option<String>,
    pub download: Option<String>,
}

// ============================================================================
// Error mapping
// ============================================================================

fn status_for(err: &ControlError) -> StatusCode {
    if err.is_validation() {
        return StatusCode::BAD_REQUEST;
    }
    match err {
        ControlError::Gateway(e) => match e.kind() {
            GatewayErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            GatewayErrorKind::NonZeroExit => StatusCode::BAD_GATEWAY,
            GatewayErrorKind::NotFound | GatewayErrorKind::IoFailure => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        },
        _ => StatusCode::NOT_FOUND,
    }
}

fn error_response(err: &ControlError) -> Response {
    (status_for(err), Json(err.to_response())).into_response()
}

fn missing_parameter(name: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: format!("missing query parameter '{name}'"),
            kind: "MissingParameter".to_string(),
        }),
    )
        .into_response()
}

fn json_result<T: serde::Serialize>(result: Result<T, ControlError>) -> Response {
    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Runs `work` on its own task and waits for the response it builds.
///
/// Dropping the returned future only stops the waiting; the task carries on
/// until the operation completes or times out.
async fn run_detached<F>(work: F) -> Response
where
    F: Future<Output = Response> + Send + 'static,
{
    match tokio::spawn(work).await {
        Ok(response) => response,
        Err(e) => {
            error!("request task failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "request task failed".to_string(),
                    kind: "Internal".to_string(),
                }),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn list_vms(State(orch): State<Arc<VmOrchestrator>>) -> Response {
    run_detached(async move { json_result(orch.list_vms().await) }).await
}

async fn control_vm(
    State(orch): State<Arc<VmOrchestrator>>,
    Query(q): Query<VmQuery>,
) -> Response {
    let Some(vm) = q.vm else {
        return missing_parameter("vm");
    };
    let Some(action) = q.action else {
        return missing_parameter("action");
    };
    run_detached(async move { json_result(orch.control(&vm, &action).await) }).await
}

async fn send_keystrokes(
    State(orch): State<Arc<VmOrchestrator>>,
    Query(q): Query<VmQuery>,
) -> Response {
    let Some(vm) = q.vm else {
        return missing_parameter("vm");
    };
    let Some(keys) = q.keys else {
        return missing_parameter("keys");
    };
    run_detached(async move { json_result(orch.send_keys(&vm, &keys).await) }).await
}

async fn vm_status(
    State(orch): State<Arc<VmOrchestrator>>,
    Query(q): Query<VmQuery>,
) -> Response {
    let Some(vm) = q.vm else {
        return missing_parameter("vm");
    };
    run_detached(async move { json_result(orch.status(&vm).await) }).await
}

async fn vm_info(State(orch): State<Arc<VmOrchestrator>>, Query(q): Query<VmQuery>) -> Response {
    let Some(vm) = q.vm else {
        return missing_parameter("vm");
    };
    run_detached(async move { json_result(orch.info(&vm).await) }).await
}

async fn screenshot(
    State(orch): State<Arc<VmOrchestrator>>,
    query: Result<Query<VmQuery>, QueryRejection>,
) -> Response {
    let q = match query {
        Ok(Query(q)) => q,
        Err(rejection) => {
            debug!(%rejection, "unreadable screenshot query, serving placeholder");
            return image_response(ScreenshotService::placeholder(), false);
        }
    };
    let download = q.download.as_deref() == Some("1");

    // A missing name is just another VM we cannot capture.
    let vm = q.vm.unwrap_or_default();
    let shot = match tokio::spawn(async move { orch.screenshot(&vm).await }).await {
        Ok(shot) => shot,
        Err(e) => {
            error!("screenshot task failed: {e}");
            ScreenshotService::placeholder()
        }
    };

    image_response(shot, download)
}

fn image_response(shot: Screenshot, download: bool) -> Response {
    let content_type = shot.format.content_type();

    if download {
        let disposition = format!("attachment; filename=\"{}\"", shot.format.file_name());
        (
            [
                (header::CONTENT_TYPE, content_type.to_string()),
                (header::CONTENT_DISPOSITION, disposition),
                (header::CACHE_CONTROL, "no-store".to_string()),
            ],
            shot.bytes,
        )
            .into_response()
    } else {
        (
            [
                (header::CONTENT_TYPE, content_type),
                (header::CACHE_CONTROL, "no-store"),
            ],
            shot.bytes,
        )
            .into_response()
    }
}

// ============================================================================
// Router and server
// ============================================================================

/// Builds the router with every route of the control panel.
pub fn router(orchestrator: Arc<VmOrchestrator>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/list-vms", get(list_vms))
        .route("/control-vm", get(control_vm))
        .route("/send-keystrokes", get(send_keystrokes))
        .route("/vm-status", get(vm_status))
        .route("/vm-info", get(vm_info))
        .route("/screenshot.png", get(screenshot))
        .with_state(orchestrator)
}

/// Binds `addr`, moving on to the next port while the port is taken.
///
/// Tries at most `attempts` consecutive ports (at least one).
///
/// # Errors
///
/// Fails on any bind error other than "address in use", or when every port
/// in the range is taken.
pub async fn bind_with_fallback(addr: SocketAddr, attempts: u16) -> anyhow::Result<TcpListener> {
    for offset in 0..attempts.max(1) {
        let Some(port) = addr.port().checked_add(offset) else {
            break;
        };
        let candidate = SocketAddr::new(addr.ip(), port);
        match TcpListener::bind(candidate).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                warn!(port, "port in use, trying the next one");
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to bind {candidate}"));
            }
        }
    }
    anyhow::bail!(
        "no free port in {} consecutive ports starting at {addr}",
        attempts.max(1)
    )
}

/// Serves the control panel until `shutdown` resolves.
pub async fn run_server<F>(
    orchestrator: Arc<VmOrchestrator>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let config = orchestrator.config();
    let listener = bind_with_fallback(config.bind_addr, config.port_attempts).await?;
    let local = listener.local_addr().context("listener has no local address")?;
    info!("control panel listening on http://{local}");

    axum::serve(listener, router(orchestrator))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    info!("HTTP server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
