//! Auth endpoints
//!
//! `/auth/login` accepts any non-empty credential pair and answers with a
//! bearer token; swapping in a genuine identity check is a deployment
//! concern. `/auth/verify` echoes the claims of a presented token.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use docforge_auth::{AuthError, Claims};
use docforge_core::ServiceResponse;

use crate::gate::bearer_token;
use crate::{AppError, AppState};

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginResponse {
    access_token: String,
    token_type: &'static str,
    expires_in: u64,
    generated_at: String,
}

pub(crate) async fn login(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<ServiceResponse<LoginResponse>>, AppError> {
    let request: LoginRequest = serde_json::from_value(body)
        .map_err(|error| AppError::validation(error.to_string()))?;

    if request.username.is_empty() || request.password.is_empty() {
        return Err(AppError::validation(
            "Username and password are required",
        ));
    }

    // Timestamp-derived nominal subject, as login predates any user store.
    let subject = Utc::now().timestamp_millis().to_string();
    let token = state.tokens.issue(&subject, &request.username)?;

    tracing::info!(username = %request.username, "login successful");

    Ok(Json(ServiceResponse::success(
        "Login successful",
        LoginResponse {
            access_token: token,
            token_type: "Bearer",
            expires_in: state.tokens.ttl().as_secs(),
            generated_at: Utc::now().to_rfc3339(),
        },
        200,
    )))
}

pub(crate) async fn verify_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ServiceResponse<Claims>>, AppError> {
    let token = bearer_token(&headers).ok_or(AuthError::Missing)?;
    let claims = state.tokens.verify(&token).map_err(AppError::from)?;

    Ok(Json(ServiceResponse::success("Token is valid", claims, 200)))
}
