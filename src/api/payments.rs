//! Payment HTTP handlers
//!
//! Thin layer mapping reconciliation outcomes onto the HTTP surface. The
//! status-code policy lives in the response mapping functions below so it
//! can be asserted on without a running server.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use crate::payments::errors::InitiationError;
use crate::payments::reconcile::{VerifyOutcome, WebhookAck};
use crate::payments::types::{InitiatePaymentRequest, PaymentRequest, WebhookEnvelope};
use crate::AppState;

/// Header Flutterwave delivers its webhook signature in.
const SIGNATURE_HEADER: &str = "verif-hash";

pub async fn payments_root() -> impl IntoResponse {
    "Kindly use the other endpoint to verify the payment details."
}

pub async fn initiate_payment(
    State(state): State<AppState>,
    Json(order): Json<InitiatePaymentRequest>,
) -> impl IntoResponse {
    let request = PaymentRequest::for_shirt_order(&order);

    match state.provider.initiate_payment(request).await {
        Ok(payment) => (
            StatusCode::OK,
            Json(json!({ "data": { "status": payment.status, "link": payment.link } })),
        ),
        Err(e) => {
            error!("Payment initiation failed: {}", e);
            let message = match e {
                InitiationError::GatewayUnreachable { .. } => {
                    "Payment gateway unreachable, please try later."
                }
                InitiationError::GatewayError { .. } => "Payment initiation failed.",
            };
            (StatusCode::BAD_GATEWAY, Json(json!({ "message": message })))
        }
    }
}

pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(envelope): Json<WebhookEnvelope>,
) -> impl IntoResponse {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let ack = state.engine.on_webhook(&envelope, signature).await;
    webhook_response(ack)
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub data: Option<VerifyRequestData>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequestData {
    #[serde(default)]
    pub id: Option<u64>,
}

pub async fn verify_payment(
    State(state): State<AppState>,
    Json(body): Json<VerifyRequest>,
) -> impl IntoResponse {
    let id = body.data.and_then(|data| data.id);
    let outcome = state.engine.on_verify_request(id).await;
    verify_response(outcome)
}

/// Webhook status policy: only signature failures and transport-internal
/// faults are non-200, so the provider keeps retrying exactly those.
fn webhook_response(ack: WebhookAck) -> (StatusCode, Json<Value>) {
    match ack {
        WebhookAck::Rejected => (
            StatusCode::FORBIDDEN,
            Json(json!({ "message": "Invalid signature" })),
        ),
        WebhookAck::Verified { .. } => (
            StatusCode::OK,
            Json(json!({ "success": true, "message": "Payment verified" })),
        ),
        WebhookAck::Unsuccessful { .. } => (
            StatusCode::OK,
            Json(json!({ "success": false, "message": "Payment not successful" })),
        ),
        WebhookAck::Error { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "message": "Server error" })),
        ),
    }
}

fn verify_response(outcome: VerifyOutcome) -> (StatusCode, Json<Value>) {
    match outcome {
        VerifyOutcome::Verified {
            transaction_id,
            amount,
            currency,
            customer_email,
        } => (
            StatusCode::OK,
            Json(json!({
                "message": "Payment Successful.",
                "transactionId": transaction_id,
                "amount": amount,
                "currency": currency,
                "customer": customer_email,
            })),
        ),
        VerifyOutcome::Conflict {
            transaction_id,
            status,
        } => (
            StatusCode::CONFLICT,
            Json(json!({
                "message": format!("Payment {}", status.as_str()),
                "transactionId": transaction_id,
            })),
        ),
        VerifyOutcome::InvalidRequest { message } => {
            (StatusCode::BAD_REQUEST, Json(json!({ "message": message })))
        }
        VerifyOutcome::InternalError => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "Internal Server Error, please try later." })),
        ),
    }
}
