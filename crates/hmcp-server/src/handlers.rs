use axum::{Json, body::Bytes, extract::State, http::StatusCode, response::IntoResponse};
use hmcp_auth::BearerAuth;
use serde::Serialize;
use serde_json::Value;

use crate::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId};
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
    service: &'a str,
    version: &'a str,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let info = state.agent.info();
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            service: &info.name,
            version: &info.version,
        }),
    )
        .into_response()
}

/// JSON-RPC endpoint. Only reachable by authorized callers.
pub async fn messages(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    body: Bytes,
) -> Json<JsonRpcResponse> {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                None,
                JsonRpcError::parse_error(e.to_string()),
            ));
        }
    };

    let id = value
        .get("id")
        .cloned()
        .and_then(|id| serde_json::from_value::<RequestId>(id).ok());

    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request(e.to_string()),
            ));
        }
    };

    tracing::debug!(
        client_id = %auth.client_id,
        method = %request.method,
        id = %request.id,
        "Dispatching message"
    );
    Json(state.agent.handle(request, auth).await)
}
