use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::state::SharedState;

/// Shared-secret bearer auth for the caller API.
#[derive(Debug, Clone, Copy)]
pub struct ApiKey;

impl FromRequestParts<SharedState> for ApiKey {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("authorization")
            .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

        let auth_str = header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid authorization header".to_string()))?;

        if token == state.config.api_key {
            Ok(ApiKey)
        } else {
            Err(AppError::Unauthorized("Invalid API key".to_string()))
        }
    }
}
