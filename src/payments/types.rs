//! Payment types and data structures
//!
//! Shared types for payment initiation and transaction verification.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Canonical transaction status, normalized at the provider boundary.
///
/// The provider's raw status vocabulary never travels past the verifier;
/// an unrecognized raw value is a classified gateway error, not a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Success,
    Failed,
    Pending,
}

impl TransactionStatus {
    /// Map the provider's status vocabulary onto the canonical one.
    pub fn from_provider(raw: &str) -> Option<Self> {
        match raw {
            "successful" => Some(TransactionStatus::Success),
            "failed" => Some(TransactionStatus::Failed),
            "pending" => Some(TransactionStatus::Pending),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Success => "successful",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Pending => "pending",
        }
    }
}

/// Customer details attached to a transaction.
///
/// The initiator embeds the merchandising fields in the customer object, so
/// they come back on verification and feed the sales notification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub email: String,
    pub name: Option<String>,
    pub size: Option<String>,
    pub cloth_type: Option<String>,
    pub product_quantity: Option<u32>,
}

/// Normalized projection of a provider transaction.
///
/// Only constructed from a successful provider lookup, never from a webhook
/// body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedTransaction {
    pub id: u64,
    pub tx_ref: String,
    pub status: TransactionStatus,
    pub amount: f64,
    pub currency: String,
    pub customer: CustomerInfo,
}

/// Client-facing payment initiation body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
    pub email: String,
    pub amount: f64,
    pub size: String,
    pub cloth_type: String,
    pub product_quantity: u32,
    pub full_name: String,
    pub address: String,
    pub phone: String,
}

/// Provider-facing payment creation request.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRequest {
    pub tx_ref: String,
    pub amount: f64,
    pub currency: String,
    pub email: String,
    pub full_name: String,
    pub address: String,
    pub phone: String,
    pub size: String,
    pub cloth_type: String,
    pub product_quantity: u32,
}

impl PaymentRequest {
    /// Build a provider request for a shirt order.
    ///
    /// The reference must be unique per attempt: stable prefix, the ordered
    /// item, and a microsecond timestamp.
    pub fn for_shirt_order(order: &InitiatePaymentRequest) -> Self {
        let tx_ref = format!(
            "Tshirt_{}-{}",
            order.cloth_type,
            Utc::now().timestamp_micros()
        );

        Self {
            tx_ref,
            amount: order.amount,
            currency: "NGN".to_string(),
            email: order.email.clone(),
            full_name: order.full_name.clone(),
            address: order.address.clone(),
            phone: order.phone.clone(),
            size: order.size.clone(),
            cloth_type: order.cloth_type.clone(),
            product_quantity: order.product_quantity,
        }
    }
}

/// Payment creation response handed back to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatedPayment {
    /// Provider acknowledgment status ("success" on the happy path)
    pub status: String,
    /// Hosted checkout link the customer is redirected to
    pub link: String,
}

/// Inbound webhook envelope. Transient: consumed synchronously, never stored.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    #[serde(default)]
    pub data: Option<WebhookTransaction>,
}

/// Raw transaction payload embedded in a webhook delivery.
///
/// Attacker-controllable if the signature check is ever bypassed; only the
/// id is trusted, and only as a lookup key.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookTransaction {
    pub id: u64,
    pub tx_ref: String,
    pub status: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_normalization() {
        assert_eq!(
            TransactionStatus::from_provider("successful"),
            Some(TransactionStatus::Success)
        );
        assert_eq!(
            TransactionStatus::from_provider("failed"),
            Some(TransactionStatus::Failed)
        );
        assert_eq!(
            TransactionStatus::from_provider("pending"),
            Some(TransactionStatus::Pending)
        );
        assert_eq!(TransactionStatus::from_provider("reversed"), None);
        assert_eq!(TransactionStatus::from_provider(""), None);
    }

    #[test]
    fn test_shirt_order_reference_carries_item_context() {
        let order = InitiatePaymentRequest {
            email: "buyer@example.com".to_string(),
            amount: 7500.0,
            size: "M".to_string(),
            cloth_type: "Polo".to_string(),
            product_quantity: 2,
            full_name: "Ada Obi".to_string(),
            address: "12 Marina Rd, Lagos".to_string(),
            phone: "+2348012345678".to_string(),
        };

        let request = PaymentRequest::for_shirt_order(&order);
        assert!(request.tx_ref.starts_with("Tshirt_Polo-"));
        assert_eq!(request.currency, "NGN");
        assert_eq!(request.amount, 7500.0);
    }

    #[test]
    fn test_webhook_envelope_tolerates_missing_data() {
        let envelope: WebhookEnvelope =
            serde_json::from_str(r#"{"event": "transfer.completed"}"#).unwrap();
        assert_eq!(envelope.event, "transfer.completed");
        assert!(envelope.data.is_none());
    }

    #[test]
    fn test_webhook_envelope_parses_charge_payload() {
        let envelope: WebhookEnvelope = serde_json::from_str(
            r#"{"event": "charge.completed", "data": {"id": 912834, "tx_ref": "Tshirt_Polo-1", "status": "successful", "amount": 7500, "currency": "NGN"}}"#,
        )
        .unwrap();

        let data = envelope.data.unwrap();
        assert_eq!(data.id, 912834);
        assert_eq!(data.tx_ref, "Tshirt_Polo-1");
        assert_eq!(data.status, "successful");
        assert_eq!(data.amount, Some(7500.0));
    }
}
