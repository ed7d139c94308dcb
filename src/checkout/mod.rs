//! The pure checkout core: pricing, cart partitioning, delivery
//! estimates, and payment gating. Everything here is synchronous
//! computation over in-memory data; persistence and orchestration live
//! in `crate::services::checkout`.

pub mod delivery;
pub mod partition;
pub mod payment;
pub mod pricing;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

pub use delivery::DeliveryEstimate;
pub use partition::CartSplit;
pub use payment::{PaymentClient, PaymentSession, SandboxPaymentClient};
pub use pricing::PricingBreakdown;

/// Destination for an order. Validated before any external call is
/// made; `postal_code` is the only optional field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct ShippingAddress {
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Street address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "Province is required"))]
    pub province: String,
    pub postal_code: Option<String>,
}
