use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use std::sync::Arc;
use tracing::info;

use crate::mirror::{MIRRORED_ENDPOINTS, WEBHOOK_METHODS};

use super::{ApiError, ApiResponse, AppState};

/// Upstream change-event ingress. Authenticity rides on the shared secret
/// the upstream echoes in `X-Secret`.
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    Path((entity, method)): Path<(String, String)>,
    headers: HeaderMap,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let secret = { state.config().read().await.webhooks.secret.clone() };
    if secret.is_empty() {
        return Err(ApiError::Unauthorized(
            "Webhook secret is not configured".to_string(),
        ));
    }

    let provided = headers.get("X-Secret").and_then(|value| value.to_str().ok());
    if provided != Some(secret.as_str()) {
        return Err(ApiError::Unauthorized("Invalid webhook secret".to_string()));
    }

    if !MIRRORED_ENDPOINTS.contains(&entity.as_str()) {
        return Err(ApiError::BadRequest(format!(
            "Unknown webhook entity: {entity}"
        )));
    }
    if !WEBHOOK_METHODS.contains(&method.as_str()) {
        return Err(ApiError::BadRequest(format!(
            "Unknown webhook method: {method}"
        )));
    }

    state.mirrors().apply_webhook(&entity, &method, payload).await?;

    info!(entity, method, "Webhook applied");
    Ok(Json(ApiResponse::success(())))
}
