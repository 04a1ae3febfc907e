use axum::Json;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{debug, info};

use crate::orchestrator::{Orchestrator, StatusSnapshot};

use super::HTTP_TARGET;

/// Response body with the `ok` flag alongside the report fields.
#[derive(Debug, Serialize)]
struct Envelope<T> {
    ok: bool,
    #[serde(flatten)]
    body: T,
}

fn reply<T: Serialize>(status: StatusCode, ok: bool, body: T) -> Response {
    (status, Json(Envelope { ok, body })).into_response()
}

pub(super) async fn start(State(orchestrator): State<Orchestrator>) -> Response {
    info!(target: HTTP_TARGET, route = "/api/start", "request");
    reply(StatusCode::OK, true, orchestrator.start().await)
}

pub(super) async fn stop(State(orchestrator): State<Orchestrator>) -> Response {
    info!(target: HTTP_TARGET, route = "/api/stop", "request");
    reply(StatusCode::OK, true, orchestrator.stop().await)
}

pub(super) async fn native_on(State(orchestrator): State<Orchestrator>) -> Response {
    info!(target: HTTP_TARGET, route = "/api/native/on", "request");
    reply(StatusCode::OK, true, orchestrator.switch_to_native().await)
}

pub(super) async fn native_off(State(orchestrator): State<Orchestrator>) -> Response {
    info!(target: HTTP_TARGET, route = "/api/native/off", "request");
    match orchestrator.switch_to_web().await {
        Ok(report) => reply(StatusCode::OK, true, report),
        Err(failure) => reply(StatusCode::INTERNAL_SERVER_ERROR, false, failure),
    }
}

pub(super) async fn status(State(orchestrator): State<Orchestrator>) -> Json<StatusSnapshot> {
    Json(orchestrator.status())
}

#[derive(Debug, Serialize)]
struct NotFound {
    error: &'static str,
}

pub(super) async fn not_found(method: Method, uri: Uri) -> Response {
    debug!(target: HTTP_TARGET, %method, %uri, "no route");
    reply(StatusCode::NOT_FOUND, false, NotFound { error: "not_found" })
}
