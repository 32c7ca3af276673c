//! Flutterwave payment provider implementation
//!
//! Integration with Flutterwave's v3 API for payment creation and transaction
//! lookup. All provider failures are classified here, at the boundary, into
//! the closed error kinds the rest of the system branches on.

use crate::payments::errors::{InitiationError, VerificationError};
use crate::payments::signature::SignatureMode;
use crate::payments::traits::PaymentProvider;
use crate::payments::types::{
    CustomerInfo, InitiatedPayment, PaymentRequest, TransactionStatus, VerifiedTransaction,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};

/// Flutterwave provider configuration
#[derive(Debug, Clone)]
pub struct FlutterwaveConfig {
    /// Flutterwave public key
    pub public_key: String,
    /// Flutterwave API secret key
    pub secret_key: String,
    /// Shared webhook secret presented in the `verif-hash` header
    pub webhook_secret: String,
    /// URL the customer is redirected to after checkout
    pub redirect_url: String,
    /// API base URL (defaults to https://api.flutterwave.com)
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Webhook signature comparison mode
    pub signature_mode: SignatureMode,
}

impl Default for FlutterwaveConfig {
    fn default() -> Self {
        Self {
            public_key: String::new(),
            secret_key: String::new(),
            webhook_secret: String::new(),
            redirect_url: String::new(),
            base_url: "https://api.flutterwave.com".to_string(),
            timeout_secs: 30,
            signature_mode: SignatureMode::Direct,
        }
    }
}

impl FlutterwaveConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        let public_key = std::env::var("FLW_PUBLIC_KEY").context("FLW_PUBLIC_KEY not set")?;
        let secret_key = std::env::var("FLW_SECRET_KEY").context("FLW_SECRET_KEY not set")?;
        let webhook_secret =
            std::env::var("FLW_WEBHOOK_SECRET").context("FLW_WEBHOOK_SECRET not set")?;
        let redirect_url =
            std::env::var("FLW_REDIRECT_URL").context("FLW_REDIRECT_URL not set")?;

        let base_url = std::env::var("FLW_BASE_URL")
            .unwrap_or_else(|_| "https://api.flutterwave.com".to_string());

        let timeout_secs = std::env::var("FLW_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let signature_mode = match std::env::var("FLW_SIGNATURE_MODE") {
            Ok(raw) => SignatureMode::parse(&raw)
                .ok_or_else(|| anyhow!("FLW_SIGNATURE_MODE must be 'direct' or 'digest', got {raw}"))?,
            Err(_) => SignatureMode::Direct,
        };

        Ok(Self {
            public_key,
            secret_key,
            webhook_secret,
            redirect_url,
            base_url,
            timeout_secs,
            signature_mode,
        })
    }
}

/// Flutterwave payment provider
pub struct FlutterwaveProvider {
    config: FlutterwaveConfig,
    client: Client,
}

impl FlutterwaveProvider {
    /// Create a new Flutterwave provider instance
    pub fn new(config: FlutterwaveConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }
}

#[async_trait]
impl PaymentProvider for FlutterwaveProvider {
    async fn initiate_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<InitiatedPayment, InitiationError> {
        info!(
            "Initiating Flutterwave payment: {} {} {}",
            request.amount, request.currency, request.tx_ref
        );

        let payload = serde_json::json!({
            "tx_ref": request.tx_ref,
            "amount": request.amount,
            "currency": request.currency,
            "redirect_url": self.config.redirect_url,
            "customer": {
                "email": request.email,
                "name": request.full_name,
                "address": request.address,
                "phone": request.phone,
                "size": request.size,
                "clothType": request.cloth_type,
                "productQuantity": request.product_quantity,
            },
            "customizations": {
                "title": "Women Safe House Initiative",
            },
        });

        let response = self
            .client
            .post(format!("{}/v3/payments", self.config.base_url))
            .bearer_auth(&self.config.secret_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!("Flutterwave payment creation failed: {}", e);
                InitiationError::from(e)
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            error!("Flutterwave payment creation rejected: HTTP {}", status);
            return Err(InitiationError::GatewayError {
                message: format!("HTTP {}: {}", status, envelope_message(&body)),
            });
        }

        let envelope: FlutterwaveEnvelope = serde_json::from_str(&body).map_err(|e| {
            InitiationError::GatewayError {
                message: format!("Invalid response format: {}", e),
            }
        })?;

        if envelope.status != "success" {
            return Err(InitiationError::GatewayError {
                message: envelope.message.unwrap_or_else(|| "unknown".to_string()),
            });
        }

        let link = envelope
            .data
            .as_ref()
            .and_then(|data| data.get("link"))
            .and_then(|link| link.as_str())
            .ok_or_else(|| InitiationError::GatewayError {
                message: "Response is missing the checkout link".to_string(),
            })?
            .to_string();

        info!(
            "Flutterwave payment initiated successfully: tx_ref={}",
            request.tx_ref
        );

        Ok(InitiatedPayment {
            status: envelope.status,
            link,
        })
    }

    async fn verify_transaction(
        &self,
        id: u64,
    ) -> Result<VerifiedTransaction, VerificationError> {
        info!("Verifying Flutterwave transaction: id={}", id);

        let response = self
            .client
            .get(format!(
                "{}/v3/transactions/{}/verify",
                self.config.base_url, id
            ))
            .bearer_auth(&self.config.secret_key)
            .send()
            .await
            .map_err(VerificationError::from)?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(classify_lookup_failure(status.as_u16(), &body));
        }

        let envelope: FlutterwaveEnvelope = serde_json::from_str(&body).map_err(|e| {
            VerificationError::GatewayError {
                message: format!("Invalid response format: {}", e),
            }
        })?;

        if envelope.status != "success" {
            let message = envelope.message.unwrap_or_default();
            if message.contains("does not exist") || message.contains("No transaction was found") {
                return Err(VerificationError::NotFound);
            }
            return Err(VerificationError::GatewayError { message });
        }

        let data = envelope
            .data
            .ok_or_else(|| VerificationError::GatewayError {
                message: "Response is missing transaction data".to_string(),
            })?;

        let transaction = parse_transaction(data)?;

        info!(
            "Flutterwave transaction verified: tx_ref={}, status={}",
            transaction.tx_ref,
            transaction.status.as_str()
        );

        Ok(transaction)
    }
}

/// Classify a non-2xx lookup response.
///
/// A 400-class status or a "does not exist" marker in the payload means the
/// transaction is unknown to the provider; everything else is a gateway fault.
fn classify_lookup_failure(status: u16, body: &str) -> VerificationError {
    let message = envelope_message(body);

    if (400..500).contains(&status) || message.contains("does not exist") {
        return VerificationError::NotFound;
    }

    VerificationError::GatewayError {
        message: format!("HTTP {}: {}", status, message),
    }
}

fn envelope_message(body: &str) -> String {
    serde_json::from_str::<FlutterwaveEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.message)
        .unwrap_or_default()
}

/// Flatten the provider's response envelope into a `VerifiedTransaction`.
///
/// Some provider responses wrap the transaction object in an extra `data`
/// field; unwrap it if present.
fn parse_transaction(data: serde_json::Value) -> Result<VerifiedTransaction, VerificationError> {
    let object = match data.get("data") {
        Some(inner) if inner.is_object() => inner.clone(),
        _ => data,
    };

    let raw: FlutterwaveTransaction =
        serde_json::from_value(object).map_err(|e| VerificationError::GatewayError {
            message: format!("Invalid transaction format: {}", e),
        })?;

    let status = TransactionStatus::from_provider(&raw.status).ok_or_else(|| {
        VerificationError::GatewayError {
            message: format!("Unrecognized transaction status '{}'", raw.status),
        }
    })?;

    Ok(VerifiedTransaction {
        id: raw.id,
        tx_ref: raw.tx_ref,
        status,
        amount: raw.amount,
        currency: raw.currency,
        customer: CustomerInfo {
            email: raw.customer.email,
            name: raw.customer.name,
            size: raw.customer.size,
            cloth_type: raw.customer.cloth_type,
            product_quantity: raw.customer.product_quantity,
        },
    })
}

// Flutterwave API response wrapper
#[derive(Debug, Deserialize)]
struct FlutterwaveEnvelope {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

// Transaction object inside a verify response
#[derive(Debug, Deserialize)]
struct FlutterwaveTransaction {
    id: u64,
    tx_ref: String,
    status: String,
    #[serde(default)]
    amount: f64,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    customer: FlutterwaveCustomer,
}

#[derive(Debug, Default, Deserialize)]
struct FlutterwaveCustomer {
    #[serde(default)]
    email: String,
    #[serde(default, alias = "fullName")]
    name: Option<String>,
    #[serde(default)]
    size: Option<String>,
    #[serde(default, alias = "clothType")]
    cloth_type: Option<String>,
    #[serde(default, alias = "productQuantity")]
    product_quantity: Option<u32>,
}
