//! HTTP surface of the authority.
//!
//! Every endpoint answers with the `{code, message, data}` envelope and
//! mirrors the envelope code into the HTTP status. Admin routes sit
//! behind a bearer guard; OPTIONS preflights always pass it.

use crate::error::ServerError;
use crate::issuer::LicenseIssuer;
use crate::registry::NodeRegistry;
use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use licgrid_token::LicensePayload;
use licgrid_types::{ApiResponse, MachineInfo};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;

/// Shared handles for the HTTP layer.
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<LicenseIssuer>,
    pub registry: Arc<NodeRegistry>,
}

/// Admin bearer-token policy.
///
/// With no token configured the admin surface is closed; serving it open
/// requires the explicit `open_admin` opt-in (local development only).
#[derive(Clone, Debug)]
pub struct AdminAuth {
    token: Option<String>,
    open: bool,
}

impl AdminAuth {
    #[must_use]
    pub fn new(token: Option<String>, open: bool) -> Self {
        let token = token.and_then(|t| {
            let t = t.trim().to_string();
            if t.is_empty() {
                None
            } else {
                Some(t)
            }
        });
        Self { token, open }
    }

    fn is_authorized(&self, method: &Method, headers: &HeaderMap) -> bool {
        if *method == Method::OPTIONS {
            return true;
        }
        match self.token.as_deref() {
            Some(expected) => bearer_token(headers) == Some(expected),
            None => self.open,
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split_whitespace();
    let scheme = parts.next()?;
    let token = parts.next()?;
    if !scheme.eq_ignore_ascii_case("bearer") || parts.next().is_some() {
        return None;
    }
    Some(token)
}

async fn admin_guard(State(auth): State<AdminAuth>, request: Request, next: Next) -> Response {
    if auth.is_authorized(request.method(), request.headers()) {
        return next.run(request).await;
    }
    warn!(
        "admin auth rejected: {} {}",
        request.method(),
        request.uri().path()
    );
    envelope::<()>(ApiResponse::fail(401, "unauthorized: admin token required"))
}

fn envelope<T: Serialize>(resp: ApiResponse<T>) -> Response {
    let status =
        StatusCode::from_u16(resp.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(resp)).into_response()
}

fn error_envelope(err: ServerError) -> Response {
    envelope::<()>(ApiResponse::fail(err.code(), err.to_string()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    license_code: Option<String>,
    machine_info: Option<MachineInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeIdRequest {
    node_id: Option<String>,
}

impl NodeIdRequest {
    fn node_id(self) -> Option<String> {
        self.node_id.filter(|id| !id.trim().is_empty())
    }
}

async fn generate_license(
    State(state): State<AppState>,
    Json(payload): Json<LicensePayload>,
) -> Response {
    match state.issuer.mint(payload).await {
        Ok(record) => envelope(ApiResponse::ok_with("license code issued", record)),
        Err(e) => error_envelope(e),
    }
}

async fn list_licenses(State(state): State<AppState>) -> Response {
    envelope(ApiResponse::ok(state.issuer.list().await))
}

async fn delete_license(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if state.issuer.delete(&id).await {
        envelope(ApiResponse::ok_with("deleted", id))
    } else {
        envelope::<()>(ApiResponse::fail(404, "license record not found"))
    }
}

async fn public_key(State(state): State<AppState>) -> Response {
    match state.issuer.public_key_pem() {
        Some(pem) => envelope(ApiResponse::ok(pem.to_string())),
        None => envelope::<()>(ApiResponse::fail(500, "public key not configured")),
    }
}

async fn online_nodes(State(state): State<AppState>) -> Response {
    envelope(ApiResponse::ok(state.registry.online_nodes().await))
}

async fn node_stats(State(state): State<AppState>) -> Response {
    envelope(ApiResponse::ok(state.registry.stats().await))
}

async fn register_node(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Response {
    let Some(code) = request
        .license_code
        .filter(|c| !c.trim().is_empty())
    else {
        return envelope::<()>(ApiResponse::fail(400, "licenseCode must not be empty"));
    };
    let machine = request.machine_info.unwrap_or_default();

    match state.registry.register(code.trim(), machine).await {
        Ok(node_id) => envelope(ApiResponse::ok_with("registered", node_id)),
        Err(e) => {
            warn!("node registration rejected: {e}");
            error_envelope(e)
        }
    }
}

async fn heartbeat_node(
    State(state): State<AppState>,
    Json(request): Json<NodeIdRequest>,
) -> Response {
    let Some(node_id) = request.node_id() else {
        return envelope::<()>(ApiResponse::fail(400, "nodeId must not be empty"));
    };

    if state.registry.heartbeat(&node_id).await {
        envelope(ApiResponse::ok(true))
    } else {
        envelope::<()>(ApiResponse::fail(404, "node not found, please re-register"))
    }
}

async fn unregister_node(
    State(state): State<AppState>,
    Json(request): Json<NodeIdRequest>,
) -> Response {
    let Some(node_id) = request.node_id() else {
        return envelope::<()>(ApiResponse::fail(400, "nodeId must not be empty"));
    };

    state.registry.unregister(&node_id).await;
    envelope(ApiResponse::ok_with("unregistered", node_id))
}

/// Builds the authority router.
pub fn build_router(state: AppState, auth: AdminAuth) -> Router {
    let admin = Router::new()
        .route("/api/license/generate", post(generate_license))
        .route("/api/license/list", get(list_licenses))
        .route("/api/license/:id", delete(delete_license))
        .route("/api/license/nodes", get(online_nodes))
        .route("/api/node/online", get(online_nodes))
        .route("/api/node/stats", get(node_stats))
        .route_layer(middleware::from_fn_with_state(auth, admin_guard));

    let public = Router::new()
        .route("/api/license/publicKey", get(public_key))
        .route("/api/node/register", post(register_node))
        .route("/api/node/heartbeat", post(heartbeat_node))
        .route("/api/node/unregister", post(unregister_node));

    admin
        .merge(public)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
