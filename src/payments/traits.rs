//! Collaborator trait definitions
//!
//! The seams the reconciliation engine is built against. Production wires in
//! the Flutterwave provider, the mail relay, and the Postgres ledger; tests
//! substitute fakes.

use crate::database::error::DatabaseError;
use crate::payments::errors::{InitiationError, NotificationError, VerificationError};
use crate::payments::types::{InitiatedPayment, PaymentRequest, VerifiedTransaction};
use async_trait::async_trait;

/// Payment gateway operations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a payment with the provider and return the hosted checkout link.
    ///
    /// Transport failure maps to `InitiationError::GatewayUnreachable`; there
    /// is no automatic retry here.
    async fn initiate_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<InitiatedPayment, InitiationError>;

    /// Look up a transaction by its provider-assigned id.
    ///
    /// This is the source of truth for reconciliation: the returned status is
    /// always canonical, and failures arrive pre-classified.
    async fn verify_transaction(&self, id: u64)
        -> Result<VerifiedTransaction, VerificationError>;
}

/// Outbound notification dispatch. Delivery itself is an external concern.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), NotificationError>;
}

/// Durable idempotence ledger keyed by transaction reference.
#[async_trait]
pub trait DedupLedger: Send + Sync {
    /// Atomically mark a reference as processed.
    ///
    /// Returns `true` iff this call newly marked it. The check-and-mark must
    /// be a single conditional write so concurrent redeliveries cannot both
    /// observe "not yet processed".
    async fn mark_if_absent(&self, tx_ref: &str) -> Result<bool, DatabaseError>;
}
