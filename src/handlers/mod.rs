pub mod checkout;
pub mod orders;

use std::sync::Arc;

use crate::checkout::PaymentClient;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{CheckoutService, OrderService};

/// Aggregated services used by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: EventSender,
        payment_client: Arc<dyn PaymentClient>,
        config: &AppConfig,
    ) -> Self {
        Self {
            checkout: Arc::new(CheckoutService::new(
                db.clone(),
                event_sender.clone(),
                payment_client,
                config.local_hub_city.clone(),
            )),
            orders: Arc::new(OrderService::new(db, event_sender)),
        }
    }
}
