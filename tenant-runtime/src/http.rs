//! HTTP surface: tenant webhooks and the JSON control plane.
//!
//! - `POST /{hook}`: webhook delivery for `bot_{tenant_id}`
//! - `GET /control/tenants`: live tenants
//! - `POST /control/tenants/{id}`, `DELETE /control/tenants/{id}`: add / remove a tenant
//! - `GET /control/metrics`: pipeline counters

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use wbot_core::TenantId;

use crate::control_plane::{self, ControlError, ControlPlane};
use crate::metrics::MetricsSnapshot;
use crate::registry::TenantHandle;
use crate::router::{DispatchOutcome, WebhookRouter, SECRET_HEADER};

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<WebhookRouter>,
    pub control: ControlPlane,
}

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        let status = match self.code {
            control_plane::StatusCode::AlreadyExists => StatusCode::CONFLICT,
            control_plane::StatusCode::NotFound => StatusCode::NOT_FOUND,
            control_plane::StatusCode::FailedPrecondition => StatusCode::PRECONDITION_FAILED,
            control_plane::StatusCode::InvalidArgument => StatusCode::BAD_REQUEST,
            control_plane::StatusCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

impl From<DispatchOutcome> for StatusCode {
    fn from(outcome: DispatchOutcome) -> Self {
        match outcome {
            DispatchOutcome::Accepted | DispatchOutcome::Malformed => StatusCode::OK,
            DispatchOutcome::UnknownTenant => StatusCode::NOT_FOUND,
            DispatchOutcome::Unauthorized => StatusCode::UNAUTHORIZED,
            DispatchOutcome::Busy => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/{hook}", post(webhook))
        .route("/control/tenants", get(list_tenants))
        .route(
            "/control/tenants/{id}",
            post(add_tenant).delete(remove_tenant),
        )
        .route("/control/metrics", get(metrics))
        .with_state(state)
}

async fn webhook(
    State(state): State<AppState>,
    Path(hook): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let secret = headers
        .get(SECRET_HEADER)
        .and_then(|value| value.to_str().ok());
    state.router.dispatch(&hook, secret, &body).into()
}

async fn list_tenants(State(state): State<AppState>) -> Json<Vec<TenantHandle>> {
    Json(state.control.registry().list_tenants())
}

async fn add_tenant(
    State(state): State<AppState>,
    Path(id): Path<TenantId>,
) -> Result<impl IntoResponse, ControlError> {
    let reply = state.control.add_tenant(id).await?;
    Ok((StatusCode::CREATED, Json(reply)))
}

async fn remove_tenant(
    State(state): State<AppState>,
    Path(id): Path<TenantId>,
) -> Result<impl IntoResponse, ControlError> {
    let reply = state.control.remove_tenant(id).await?;
    Ok(Json(reply))
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.control.registry().metrics().snapshot())
}
