//! Database proxy: a single endpoint taking `{operation, data}`.

use crate::rest::{api_error, error_response, ApiError, ApiResult, AppState};
use crate::store::NewUser;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct DatabaseRequest {
    pub operation: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Deserialize)]
struct EmailQuery {
    email: String,
}

fn bad_request(message: impl Into<String>) -> ApiError {
    error_response(StatusCode::BAD_REQUEST, "invalid_request", message)
}

/// POST /api/database — `initializeDatabase | saveUser | getUserByEmail`.
pub async fn handle_database(
    State(state): State<AppState>,
    Json(req): Json<DatabaseRequest>,
) -> ApiResult<Json<Value>> {
    metrics::counter!("api.database", "operation" => req.operation.clone()).increment(1);

    match req.operation.as_str() {
        "initializeDatabase" => {
            state.users.initialize().await.map_err(api_error)?;
            Ok(Json(json!({ "success": true })))
        }
        "saveUser" => {
            let user: NewUser = serde_json::from_value(req.data)
                .map_err(|e| bad_request(format!("invalid user payload: {e}")))?;
            let saved = state.users.save_user(user).await.map_err(api_error)?;
            Ok(Json(json!({ "success": true, "data": saved })))
        }
        "getUserByEmail" => {
            let query: EmailQuery = serde_json::from_value(req.data)
                .map_err(|e| bad_request(format!("invalid lookup payload: {e}")))?;
            let user = state
                .users
                .get_user_by_email(&query.email)
                .await
                .map_err(api_error)?;
            Ok(Json(json!({ "success": true, "data": user })))
        }
        other => Err(bad_request(format!("unknown operation: {other}"))),
    }
}
