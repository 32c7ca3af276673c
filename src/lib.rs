pub mod api;
pub mod config;
pub mod database;
pub mod notifications;
pub mod payments;

use std::sync::Arc;

use crate::payments::reconcile::ReconciliationEngine;
use crate::payments::traits::PaymentProvider;

#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub provider: Arc<dyn PaymentProvider>,
    pub engine: Arc<ReconciliationEngine>,
}
