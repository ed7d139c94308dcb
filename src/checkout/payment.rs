//! Payment gating and the external capture collaborator.
//!
//! Online methods (GCash, PayPal) carry a platform minimum; orders
//! below it must either grow or fall back to cash-on-delivery. The
//! gateway itself is out of scope and sits behind [`PaymentClient`].

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::checkout::ShippingAddress;
use crate::entities::order::PaymentMethod;
use crate::errors::ServiceError;

/// Minimum order total for online payment capture.
pub const ONLINE_MINIMUM_AMOUNT: Decimal = dec!(100);

/// Rejects online methods under the platform minimum. COD has no
/// minimum and always proceeds.
pub fn enforce_minimum(total: Decimal, method: &PaymentMethod) -> Result<(), ServiceError> {
    if method.is_online() && total < ONLINE_MINIMUM_AMOUNT {
        return Err(ServiceError::MinimumAmount {
            method: method.clone(),
            total,
            minimum: ONLINE_MINIMUM_AMOUNT,
        });
    }
    Ok(())
}

/// Open payment session at the external gateway. The buyer completes
/// the redirect; the gateway's success callback carries the intent id
/// back into order creation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentSession {
    pub payment_intent_id: String,
    pub checkout_url: String,
}

/// Result of confirming a capture with the gateway.
#[derive(Debug, Clone)]
pub struct PaymentCapture {
    pub capture_id: String,
    pub status: CaptureStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStatus {
    Succeeded,
    Failed,
}

/// External payment-capture collaborator. Failures surface unchanged;
/// no order state is advanced on a failed call.
#[async_trait]
pub trait PaymentClient: Send + Sync {
    /// Opens a capture session for an online payment.
    async fn create_payment(
        &self,
        amount: Decimal,
        method: &PaymentMethod,
        billing: &ShippingAddress,
    ) -> Result<PaymentSession, ServiceError>;

    /// Confirms that a previously opened session was captured.
    async fn confirm(&self, payment_intent_id: &str) -> Result<PaymentCapture, ServiceError>;
}

/// Stand-in gateway for development and tests: every session it opens
/// confirms successfully, and unknown intents fail.
#[derive(Debug, Default, Clone)]
pub struct SandboxPaymentClient;

#[async_trait]
impl PaymentClient for SandboxPaymentClient {
    async fn create_payment(
        &self,
        amount: Decimal,
        method: &PaymentMethod,
        billing: &ShippingAddress,
    ) -> Result<PaymentSession, ServiceError> {
        let intent = format!("pi_sandbox_{}", Uuid::new_v4().simple());
        info!(%amount, %method, email = %billing.email, intent = %intent, "Opened sandbox payment session");
        Ok(PaymentSession {
            checkout_url: format!("https://pay.sandbox.invalid/checkout/{intent}"),
            payment_intent_id: intent,
        })
    }

    async fn confirm(&self, payment_intent_id: &str) -> Result<PaymentCapture, ServiceError> {
        if !payment_intent_id.starts_with("pi_sandbox_") {
            return Err(ServiceError::PaymentFailed(format!(
                "Unknown payment intent {payment_intent_id}"
            )));
        }
        Ok(PaymentCapture {
            capture_id: format!("cap_{payment_intent_id}"),
            status: CaptureStatus::Succeeded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn online_methods_reject_below_minimum() {
        for method in [PaymentMethod::Gcash, PaymentMethod::Paypal] {
            let err = enforce_minimum(dec!(99.99), &method).unwrap_err();
            assert_matches!(err, ServiceError::MinimumAmount { .. });
        }
    }

    #[test]
    fn exactly_the_minimum_passes() {
        assert!(enforce_minimum(dec!(100), &PaymentMethod::Gcash).is_ok());
        assert!(enforce_minimum(dec!(100.00), &PaymentMethod::Paypal).is_ok());
    }

    #[test]
    fn cod_has_no_minimum() {
        assert!(enforce_minimum(dec!(0.01), &PaymentMethod::Cod).is_ok());
        assert!(enforce_minimum(dec!(80), &PaymentMethod::Cod).is_ok());
    }

    #[tokio::test]
    async fn sandbox_sessions_confirm() {
        let client = SandboxPaymentClient;
        let billing = crate::checkout::ShippingAddress {
            full_name: "Test Buyer".into(),
            email: "buyer@example.com".into(),
            phone: "09170000000".into(),
            address: "1 Test St".into(),
            city: "Quezon City".into(),
            province: "Metro Manila".into(),
            postal_code: None,
        };
        let session = client
            .create_payment(dec!(600), &PaymentMethod::Gcash, &billing)
            .await
            .unwrap();
        let capture = client.confirm(&session.payment_intent_id).await.unwrap();
        assert_eq!(capture.status, CaptureStatus::Succeeded);

        assert_matches!(
            client.confirm("pi_other_abc").await,
            Err(ServiceError::PaymentFailed(_))
        );
    }
}
