//! Reconciliation engine integration tests
//!
//! Exercises the webhook and manual-verification entry points against fake
//! collaborators, including the duplicate- and concurrent-delivery cases the
//! dedup ledger exists for.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use safehouse_backend::database::error::DatabaseError;
use safehouse_backend::payments::errors::{
    InitiationError, NotificationError, VerificationError,
};
use safehouse_backend::payments::reconcile::{
    ReconcileConfig, ReconciliationEngine, VerifyOutcome, WebhookAck,
};
use safehouse_backend::payments::signature::SignatureMode;
use safehouse_backend::payments::traits::{DedupLedger, NotificationSender, PaymentProvider};
use safehouse_backend::payments::types::{
    CustomerInfo, InitiatedPayment, PaymentRequest, TransactionStatus, VerifiedTransaction,
    WebhookEnvelope, WebhookTransaction,
};

const SECRET: &str = "whsec_test_secret";
const TX_REF: &str = "Tshirt_Polo-1718000000000000";

struct FakeProvider {
    result: Result<VerifiedTransaction, VerificationError>,
    lookups: AtomicUsize,
}

impl FakeProvider {
    fn returning(result: Result<VerifiedTransaction, VerificationError>) -> Arc<Self> {
        Arc::new(Self {
            result,
            lookups: AtomicUsize::new(0),
        })
    }

    fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProvider for FakeProvider {
    async fn initiate_payment(
        &self,
        _request: PaymentRequest,
    ) -> Result<InitiatedPayment, InitiationError> {
        Err(InitiationError::GatewayUnreachable {
            message: "not under test".to_string(),
        })
    }

    async fn verify_transaction(
        &self,
        _id: u64,
    ) -> Result<VerifiedTransaction, VerificationError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

#[derive(Default)]
struct FakeNotifier {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl FakeNotifier {
    fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationSender for FakeNotifier {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push((
            to.to_string(),
            subject.to_string(),
            html_body.to_string(),
        ));
        Ok(())
    }
}

#[derive(Default)]
struct FakeLedger {
    marked: Mutex<HashSet<String>>,
    fail: bool,
}

impl FakeLedger {
    fn failing() -> Arc<Self> {
        Arc::new(Self {
            marked: Mutex::new(HashSet::new()),
            fail: true,
        })
    }
}

#[async_trait]
impl DedupLedger for FakeLedger {
    async fn mark_if_absent(&self, tx_ref: &str) -> Result<bool, DatabaseError> {
        if self.fail {
            return Err(DatabaseError::ConnectionError {
                message: "connection reset".to_string(),
            });
        }
        Ok(self.marked.lock().unwrap().insert(tx_ref.to_string()))
    }
}

fn transaction_with_status(status: TransactionStatus) -> VerifiedTransaction {
    VerifiedTransaction {
        id: 912834,
        tx_ref: TX_REF.to_string(),
        status,
        amount: 7500.0,
        currency: "NGN".to_string(),
        customer: CustomerInfo {
            email: "buyer@example.com".to_string(),
            name: Some("Ada Obi".to_string()),
            size: Some("M".to_string()),
            cloth_type: Some("Polo".to_string()),
            product_quantity: Some(2),
        },
    }
}

fn charge_completed_envelope() -> WebhookEnvelope {
    WebhookEnvelope {
        event: "charge.completed".to_string(),
        data: Some(WebhookTransaction {
            id: 912834,
            tx_ref: TX_REF.to_string(),
            status: "successful".to_string(),
            amount: Some(7500.0),
            currency: Some("NGN".to_string()),
        }),
    }
}

fn engine_config(mode: SignatureMode) -> ReconcileConfig {
    ReconcileConfig {
        webhook_secret: SECRET.to_string(),
        signature_mode: mode,
        sales_address: "info@womensafehouse.org".to_string(),
    }
}

fn build_engine(
    provider: Arc<FakeProvider>,
    notifier: Arc<FakeNotifier>,
    ledger: Arc<FakeLedger>,
    mode: SignatureMode,
) -> ReconciliationEngine {
    ReconciliationEngine::new(provider, notifier, ledger, engine_config(mode))
}

#[tokio::test]
async fn invalid_signature_is_rejected_without_provider_lookup() {
    let provider = FakeProvider::returning(Ok(transaction_with_status(TransactionStatus::Success)));
    let notifier = Arc::new(FakeNotifier::default());
    let ledger = Arc::new(FakeLedger::default());
    let engine = build_engine(
        provider.clone(),
        notifier.clone(),
        ledger,
        SignatureMode::Direct,
    );

    let ack = engine
        .on_webhook(&charge_completed_envelope(), Some("wrong_secret"))
        .await;

    assert_eq!(ack, WebhookAck::Rejected);
    assert_eq!(provider.lookup_count(), 0);
    assert_eq!(notifier.sent_count(), 0);
}

#[tokio::test]
async fn missing_signature_header_is_rejected() {
    let provider = FakeProvider::returning(Ok(transaction_with_status(TransactionStatus::Success)));
    let notifier = Arc::new(FakeNotifier::default());
    let ledger = Arc::new(FakeLedger::default());
    let engine = build_engine(
        provider.clone(),
        notifier.clone(),
        ledger,
        SignatureMode::Direct,
    );

    let ack = engine.on_webhook(&charge_completed_envelope(), None).await;

    assert_eq!(ack, WebhookAck::Rejected);
    assert_eq!(provider.lookup_count(), 0);
}

#[tokio::test]
async fn digest_mode_accepts_hashed_secret_and_rejects_raw() {
    let provider = FakeProvider::returning(Ok(transaction_with_status(TransactionStatus::Success)));
    let notifier = Arc::new(FakeNotifier::default());
    let ledger = Arc::new(FakeLedger::default());
    let engine = build_engine(
        provider.clone(),
        notifier.clone(),
        ledger,
        SignatureMode::Digest,
    );

    let raw = engine
        .on_webhook(&charge_completed_envelope(), Some(SECRET))
        .await;
    assert_eq!(raw, WebhookAck::Rejected);

    let digest = hex::encode(Sha256::digest(SECRET.as_bytes()));
    let hashed = engine
        .on_webhook(&charge_completed_envelope(), Some(&digest))
        .await;
    assert!(matches!(hashed, WebhookAck::Verified { .. }));
}

#[tokio::test]
async fn unrelated_event_is_acked_without_lookup_or_notification() {
    let provider = FakeProvider::returning(Ok(transaction_with_status(TransactionStatus::Success)));
    let notifier = Arc::new(FakeNotifier::default());
    let ledger = Arc::new(FakeLedger::default());
    let engine = build_engine(
        provider.clone(),
        notifier.clone(),
        ledger,
        SignatureMode::Direct,
    );

    let mut envelope = charge_completed_envelope();
    envelope.event = "charge.refunded".to_string();

    let ack = engine.on_webhook(&envelope, Some(SECRET)).await;

    assert!(matches!(ack, WebhookAck::Unsuccessful { .. }));
    assert_eq!(provider.lookup_count(), 0);
    assert_eq!(notifier.sent_count(), 0);
}

#[tokio::test]
async fn failed_claimed_status_is_acked_without_lookup() {
    let provider = FakeProvider::returning(Ok(transaction_with_status(TransactionStatus::Success)));
    let notifier = Arc::new(FakeNotifier::default());
    let ledger = Arc::new(FakeLedger::default());
    let engine = build_engine(
        provider.clone(),
        notifier.clone(),
        ledger,
        SignatureMode::Direct,
    );

    let mut envelope = charge_completed_envelope();
    envelope.data.as_mut().unwrap().status = "failed".to_string();

    let ack = engine.on_webhook(&envelope, Some(SECRET)).await;

    assert!(matches!(ack, WebhookAck::Unsuccessful { .. }));
    assert_eq!(provider.lookup_count(), 0);
}

#[tokio::test]
async fn reverification_disagreement_is_unsuccessful_without_notification() {
    // Webhook claims success; the provider's authoritative record says pending
    let provider = FakeProvider::returning(Ok(transaction_with_status(TransactionStatus::Pending)));
    let notifier = Arc::new(FakeNotifier::default());
    let ledger = Arc::new(FakeLedger::default());
    let engine = build_engine(
        provider.clone(),
        notifier.clone(),
        ledger,
        SignatureMode::Direct,
    );

    let ack = engine
        .on_webhook(&charge_completed_envelope(), Some(SECRET))
        .await;

    assert!(matches!(ack, WebhookAck::Unsuccessful { .. }));
    assert_eq!(provider.lookup_count(), 1);
    assert_eq!(notifier.sent_count(), 0);
}

#[tokio::test]
async fn reverification_error_is_unsuccessful_not_server_error() {
    let provider = FakeProvider::returning(Err(VerificationError::GatewayUnreachable {
        message: "timed out".to_string(),
    }));
    let notifier = Arc::new(FakeNotifier::default());
    let ledger = Arc::new(FakeLedger::default());
    let engine = build_engine(
        provider.clone(),
        notifier.clone(),
        ledger,
        SignatureMode::Direct,
    );

    let ack = engine
        .on_webhook(&charge_completed_envelope(), Some(SECRET))
        .await;

    assert!(matches!(ack, WebhookAck::Unsuccessful { .. }));
    assert_eq!(notifier.sent_count(), 0);
}

#[tokio::test]
async fn settled_webhook_sends_exactly_one_notification() {
    let provider = FakeProvider::returning(Ok(transaction_with_status(TransactionStatus::Success)));
    let notifier = Arc::new(FakeNotifier::default());
    let ledger = Arc::new(FakeLedger::default());
    let engine = build_engine(
        provider.clone(),
        notifier.clone(),
        ledger,
        SignatureMode::Direct,
    );

    let ack = engine
        .on_webhook(&charge_completed_envelope(), Some(SECRET))
        .await;

    assert_eq!(
        ack,
        WebhookAck::Verified {
            tx_ref: TX_REF.to_string(),
            already_processed: false,
        }
    );
    assert_eq!(notifier.sent_count(), 1);

    let sent = notifier.sent.lock().unwrap();
    let (to, subject, body) = &sent[0];
    assert_eq!(to, "info@womensafehouse.org");
    assert_eq!(subject, "Women Safe House Shirt Sales");
    assert!(body.contains(TX_REF));
}

#[tokio::test]
async fn redelivery_suppresses_second_notification() {
    let provider = FakeProvider::returning(Ok(transaction_with_status(TransactionStatus::Success)));
    let notifier = Arc::new(FakeNotifier::default());
    let ledger = Arc::new(FakeLedger::default());
    let engine = build_engine(
        provider.clone(),
        notifier.clone(),
        ledger,
        SignatureMode::Direct,
    );

    let envelope = charge_completed_envelope();
    let first = engine.on_webhook(&envelope, Some(SECRET)).await;
    let second = engine.on_webhook(&envelope, Some(SECRET)).await;

    assert_eq!(
        first,
        WebhookAck::Verified {
            tx_ref: TX_REF.to_string(),
            already_processed: false,
        }
    );
    assert_eq!(
        second,
        WebhookAck::Verified {
            tx_ref: TX_REF.to_string(),
            already_processed: true,
        }
    );
    assert_eq!(notifier.sent_count(), 1);
}

#[tokio::test]
async fn concurrent_deliveries_send_exactly_one_notification() {
    let provider = FakeProvider::returning(Ok(transaction_with_status(TransactionStatus::Success)));
    let notifier = Arc::new(FakeNotifier::default());
    let ledger = Arc::new(FakeLedger::default());
    let engine = build_engine(
        provider.clone(),
        notifier.clone(),
        ledger,
        SignatureMode::Direct,
    );

    let envelope = charge_completed_envelope();
    let (first, second) = tokio::join!(
        engine.on_webhook(&envelope, Some(SECRET)),
        engine.on_webhook(&envelope, Some(SECRET)),
    );

    assert!(matches!(first, WebhookAck::Verified { .. }));
    assert!(matches!(second, WebhookAck::Verified { .. }));
    assert_eq!(notifier.sent_count(), 1);
}

#[tokio::test]
async fn ledger_fault_is_a_server_error() {
    let provider = FakeProvider::returning(Ok(transaction_with_status(TransactionStatus::Success)));
    let notifier = Arc::new(FakeNotifier::default());
    let ledger = FakeLedger::failing();
    let engine = build_engine(
        provider.clone(),
        notifier.clone(),
        ledger,
        SignatureMode::Direct,
    );

    let ack = engine
        .on_webhook(&charge_completed_envelope(), Some(SECRET))
        .await;

    assert!(matches!(ack, WebhookAck::Error { .. }));
    assert_eq!(notifier.sent_count(), 0);
}

#[tokio::test]
async fn verify_without_id_is_invalid_request() {
    let provider = FakeProvider::returning(Ok(transaction_with_status(TransactionStatus::Success)));
    let notifier = Arc::new(FakeNotifier::default());
    let ledger = Arc::new(FakeLedger::default());
    let engine = build_engine(
        provider.clone(),
        notifier.clone(),
        ledger,
        SignatureMode::Direct,
    );

    let outcome = engine.on_verify_request(None).await;

    assert!(matches!(outcome, VerifyOutcome::InvalidRequest { .. }));
    assert_eq!(provider.lookup_count(), 0);
}

#[tokio::test]
async fn verify_settled_transaction_returns_its_fields() {
    let provider = FakeProvider::returning(Ok(transaction_with_status(TransactionStatus::Success)));
    let notifier = Arc::new(FakeNotifier::default());
    let ledger = Arc::new(FakeLedger::default());
    let engine = build_engine(
        provider.clone(),
        notifier.clone(),
        ledger,
        SignatureMode::Direct,
    );

    let outcome = engine.on_verify_request(Some(912834)).await;

    assert_eq!(
        outcome,
        VerifyOutcome::Verified {
            transaction_id: 912834,
            amount: 7500.0,
            currency: "NGN".to_string(),
            customer_email: "buyer@example.com".to_string(),
        }
    );
}

#[tokio::test]
async fn verify_pending_transaction_is_a_conflict() {
    let provider = FakeProvider::returning(Ok(transaction_with_status(TransactionStatus::Pending)));
    let notifier = Arc::new(FakeNotifier::default());
    let ledger = Arc::new(FakeLedger::default());
    let engine = build_engine(
        provider.clone(),
        notifier.clone(),
        ledger,
        SignatureMode::Direct,
    );

    let outcome = engine.on_verify_request(Some(912834)).await;

    assert_eq!(
        outcome,
        VerifyOutcome::Conflict {
            transaction_id: 912834,
            status: TransactionStatus::Pending,
        }
    );
}

#[tokio::test]
async fn verify_unknown_transaction_is_invalid_request() {
    let provider = FakeProvider::returning(Err(VerificationError::NotFound));
    let notifier = Arc::new(FakeNotifier::default());
    let ledger = Arc::new(FakeLedger::default());
    let engine = build_engine(
        provider.clone(),
        notifier.clone(),
        ledger,
        SignatureMode::Direct,
    );

    let outcome = engine.on_verify_request(Some(404404)).await;

    assert_eq!(
        outcome,
        VerifyOutcome::InvalidRequest {
            message: "Invalid Transaction ID".to_string(),
        }
    );
}

#[tokio::test]
async fn verify_gateway_fault_is_internal_error() {
    let provider = FakeProvider::returning(Err(VerificationError::GatewayError {
        message: "HTTP 502: upstream".to_string(),
    }));
    let notifier = Arc::new(FakeNotifier::default());
    let ledger = Arc::new(FakeLedger::default());
    let engine = build_engine(
        provider.clone(),
        notifier.clone(),
        ledger,
        SignatureMode::Direct,
    );

    let outcome = engine.on_verify_request(Some(912834)).await;

    assert_eq!(outcome, VerifyOutcome::InternalError);
}
