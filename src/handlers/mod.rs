pub mod common;
pub mod purchases;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    payment_confirmation::PaymentConfirmationService, purchases::PurchaseService,
};
use std::sync::Arc;
use std::time::Duration;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub purchases: Arc<PurchaseService>,
    pub payments: Arc<PaymentConfirmationService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        lock_timeout: Option<Duration>,
    ) -> Self {
        Self {
            purchases: Arc::new(PurchaseService::new(
                db_pool.clone(),
                Some(event_sender.clone()),
                lock_timeout,
            )),
            payments: Arc::new(PaymentConfirmationService::new(
                db_pool,
                Some(event_sender),
                lock_timeout,
            )),
        }
    }
}
