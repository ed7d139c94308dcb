use utoipa::OpenApi;

use crate::checkout::{DeliveryEstimate, PaymentSession, PricingBreakdown, ShippingAddress};
use crate::entities::order::{OrderStatus, PaymentMethod, PaymentStatus, ShippingFeeBasis};
use crate::errors::ErrorResponse;
use crate::services::checkout::{
    BeginPaymentRequest, CheckoutQuote, PlaceOrderRequest, QuoteRequest, QuotedLine,
};
use crate::services::orders::{
    OrderItemResponse, OrderListResponse, OrderResponse, SetTrackingRequest,
    UpdateOrderStatusRequest,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront Order-Fulfillment API",
        description = "Seller-scoped checkout, tiered shipping pricing, payment gating, and role-constrained order lifecycles"
    ),
    paths(
        crate::handlers::checkout::quote,
        crate::handlers::checkout::begin_payment,
        crate::handlers::checkout::place_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order_status,
        crate::handlers::orders::mark_cod_paid,
        crate::handlers::orders::set_tracking,
    ),
    components(schemas(
        ErrorResponse,
        OrderStatus,
        PaymentStatus,
        PaymentMethod,
        ShippingFeeBasis,
        ShippingAddress,
        PricingBreakdown,
        DeliveryEstimate,
        PaymentSession,
        QuoteRequest,
        QuotedLine,
        CheckoutQuote,
        BeginPaymentRequest,
        PlaceOrderRequest,
        UpdateOrderStatusRequest,
        SetTrackingRequest,
        OrderItemResponse,
        OrderResponse,
        OrderListResponse,
    )),
    tags(
        (name = "checkout", description = "Cart pricing and order creation"),
        (name = "orders", description = "Order reads and lifecycle transitions")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_builds() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/checkout/orders"));
        assert!(doc.paths.paths.contains_key("/api/v1/orders/{id}/status"));
    }
}
