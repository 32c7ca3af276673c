//! Payment reconciliation engine
//!
//! Confirms a claimed payment outcome against the provider's authoritative
//! record and guards the notification side effect. Two independent entry
//! points race for the same transaction reference: the provider's webhook
//! (at-least-once delivery) and the client's manual verification call. The
//! dedup ledger's atomic insert-if-absent is what keeps the notification
//! at-most-once under any interleaving.

use crate::payments::errors::VerificationError;
use crate::payments::signature::{verify_webhook_signature, SignatureMode};
use crate::payments::traits::{DedupLedger, NotificationSender, PaymentProvider};
use crate::payments::types::{TransactionStatus, VerifiedTransaction, WebhookEnvelope};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Event type the provider emits when a charge settles.
const CHARGE_COMPLETED: &str = "charge.completed";

const SALES_SUBJECT: &str = "Women Safe House Shirt Sales";

/// Reconciliation settings, fixed at startup.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    pub webhook_secret: String,
    pub signature_mode: SignatureMode,
    /// Address the sales notification is sent to
    pub sales_address: String,
}

/// Webhook acknowledgment.
///
/// Anything that is not an authentication or transport-internal fault is
/// acked with a 200-equivalent so the provider stops redelivering.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookAck {
    /// Signature check failed (403, never retried)
    Rejected,
    /// Event ignored or re-verification disagreed with the payload (200)
    Unsuccessful { reason: String },
    /// Transaction re-verified successfully (200)
    Verified {
        tx_ref: String,
        /// True when a previous delivery already triggered the notification
        already_processed: bool,
    },
    /// Ledger write failed (500); the provider may redeliver
    Error { message: String },
}

/// Manual verification outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyOutcome {
    /// Transaction settled successfully (200)
    Verified {
        transaction_id: u64,
        amount: f64,
        currency: String,
        customer_email: String,
    },
    /// Transaction exists but has not settled (409); expected business
    /// outcome, the client may poll again
    Conflict {
        transaction_id: u64,
        status: TransactionStatus,
    },
    /// Missing id or transaction unknown to the provider (400)
    InvalidRequest { message: String },
    /// Unexpected verifier failure (500); no provider internals exposed
    InternalError,
}

pub struct ReconciliationEngine {
    provider: Arc<dyn PaymentProvider>,
    notifier: Arc<dyn NotificationSender>,
    ledger: Arc<dyn DedupLedger>,
    config: ReconcileConfig,
}

impl ReconciliationEngine {
    pub fn new(
        provider: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn NotificationSender>,
        ledger: Arc<dyn DedupLedger>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            provider,
            notifier,
            ledger,
            config,
        }
    }

    /// Handle an inbound webhook delivery.
    pub async fn on_webhook(
        &self,
        envelope: &WebhookEnvelope,
        presented_signature: Option<&str>,
    ) -> WebhookAck {
        if !verify_webhook_signature(
            presented_signature,
            &self.config.webhook_secret,
            self.config.signature_mode,
        ) {
            warn!("Unauthorized webhook access detected");
            return WebhookAck::Rejected;
        }

        let claimed = match &envelope.data {
            Some(data) => data,
            None => {
                return WebhookAck::Unsuccessful {
                    reason: format!("event '{}' carries no transaction", envelope.event),
                }
            }
        };

        if envelope.event != CHARGE_COMPLETED || claimed.status != "successful" {
            info!(
                "Ignoring webhook event '{}' with status '{}'",
                envelope.event, claimed.status
            );
            return WebhookAck::Unsuccessful {
                reason: format!("event '{}' not a settled charge", envelope.event),
            };
        }

        // The webhook body is not trusted: re-verify against the provider
        // using the embedded id, and reconcile on the lookup result only.
        let verified = match self.provider.verify_transaction(claimed.id).await {
            Ok(verified) => verified,
            Err(e) => {
                warn!(
                    "Webhook re-verification failed for tx_ref {}: {}",
                    claimed.tx_ref, e
                );
                return WebhookAck::Unsuccessful {
                    reason: "re-verification failed".to_string(),
                };
            }
        };

        if verified.status != TransactionStatus::Success {
            warn!(
                "Webhook claimed success but provider reports '{}' for tx_ref {}",
                verified.status.as_str(),
                verified.tx_ref
            );
            return WebhookAck::Unsuccessful {
                reason: format!("provider reports {}", verified.status.as_str()),
            };
        }

        match self.ledger.mark_if_absent(&verified.tx_ref).await {
            Ok(true) => {
                // Marked before sending: a failed dispatch is logged and not
                // retried, keeping the notification at-most-once.
                if let Err(e) = self
                    .notifier
                    .send(
                        &self.config.sales_address,
                        SALES_SUBJECT,
                        &sales_notification_body(&verified),
                    )
                    .await
                {
                    error!(
                        "Sales notification failed for tx_ref {}: {}",
                        verified.tx_ref, e
                    );
                }

                info!("Payment verified: {}", verified.tx_ref);
                WebhookAck::Verified {
                    tx_ref: verified.tx_ref,
                    already_processed: false,
                }
            }
            Ok(false) => {
                info!(
                    "Duplicate delivery for tx_ref {}, notification suppressed",
                    verified.tx_ref
                );
                WebhookAck::Verified {
                    tx_ref: verified.tx_ref,
                    already_processed: true,
                }
            }
            Err(e) => {
                error!("Ledger write failed for tx_ref {}: {}", verified.tx_ref, e);
                WebhookAck::Error {
                    message: "ledger write failed".to_string(),
                }
            }
        }
    }

    /// Handle a client-triggered manual verification request.
    pub async fn on_verify_request(&self, transaction_id: Option<u64>) -> VerifyOutcome {
        let id = match transaction_id {
            Some(id) => id,
            None => {
                return VerifyOutcome::InvalidRequest {
                    message: "Invalid request! Transaction ID is required.".to_string(),
                }
            }
        };

        match self.provider.verify_transaction(id).await {
            Ok(transaction) if transaction.status == TransactionStatus::Success => {
                info!("Manual verification succeeded: {}", transaction.tx_ref);
                VerifyOutcome::Verified {
                    transaction_id: transaction.id,
                    amount: transaction.amount,
                    currency: transaction.currency,
                    customer_email: transaction.customer.email,
                }
            }
            Ok(transaction) => VerifyOutcome::Conflict {
                transaction_id: transaction.id,
                status: transaction.status,
            },
            Err(VerificationError::NotFound) => VerifyOutcome::InvalidRequest {
                message: "Invalid Transaction ID".to_string(),
            },
            Err(e) => {
                error!("Manual verification failed for id {}: {}", id, e);
                VerifyOutcome::InternalError
            }
        }
    }
}

/// Build the sales notification body for a settled shirt order.
fn sales_notification_body(transaction: &VerifiedTransaction) -> String {
    let customer = &transaction.customer;
    format!(
        "<div>\
         <h2>A New Safe House Transaction</h2>\
         <p>Transaction Reference: {}</p>\
         <p>Amount: {}</p>\
         <p>Buyer: {}</p>\
         <p>Size: {}</p>\
         <p>Type: {}</p>\
         <p>Quantity: {}</p>\
         </div>",
        transaction.tx_ref,
        transaction.amount,
        customer.name.as_deref().unwrap_or("Unknown"),
        customer.size.as_deref().unwrap_or("N/A"),
        customer.cloth_type.as_deref().unwrap_or("N/A"),
        customer.product_quantity.unwrap_or(1),
    )
}
