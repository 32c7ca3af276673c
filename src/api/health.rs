use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub gateway_configured: bool,
    pub mail_relay_configured: bool,
}

pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let version = env!("CARGO_PKG_VERSION").to_string();

    let gateway_configured = !state.config.flutterwave.public_key.is_empty()
        && !state.config.flutterwave.secret_key.is_empty()
        && !state.config.flutterwave.webhook_secret.is_empty();

    let mail_relay_configured = !state.config.mailer.relay_url.is_empty();

    let response = HealthResponse {
        status: "healthy".to_string(),
        version,
        environment: state.config.server.environment.clone(),
        gateway_configured,
        mail_relay_configured,
    };

    Ok(Json(response))
}
