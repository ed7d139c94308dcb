use axum::{extract::State, http::StatusCode, Json};

use crate::auth::ActorContext;
use crate::checkout::PaymentSession;
use crate::errors::ServiceError;
use crate::services::checkout::{
    BeginPaymentRequest, CheckoutQuote, PlaceOrderRequest, QuoteRequest,
};
use crate::services::orders::OrderResponse;
use crate::{ApiResponse, ApiResult, AppState};

/// Price a seller-scoped cart selection for display.
#[utoipa::path(
    post,
    path = "/api/v1/checkout/quote",
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Priced checkout preview", body = ApiResponse<CheckoutQuote>),
        (status = 400, description = "Empty or multi-seller selection", body = crate::errors::ErrorResponse)
    ),
    tag = "checkout"
)]
pub async fn quote(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(request): Json<QuoteRequest>,
) -> ApiResult<CheckoutQuote> {
    let quote = state.services.checkout.quote(&actor, request).await?;
    Ok(Json(ApiResponse::success(quote)))
}

/// Open an online payment session after the minimum-amount gate.
#[utoipa::path(
    post,
    path = "/api/v1/checkout/payment",
    request_body = BeginPaymentRequest,
    responses(
        (status = 200, description = "Payment session opened", body = ApiResponse<PaymentSession>),
        (status = 422, description = "Total below the online minimum", body = crate::errors::ErrorResponse)
    ),
    tag = "checkout"
)]
pub async fn begin_payment(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(request): Json<BeginPaymentRequest>,
) -> ApiResult<PaymentSession> {
    let session = state.services.checkout.begin_payment(&actor, request).await?;
    Ok(Json(ApiResponse::success(session)))
}

/// Create the order: COD directly, online after a confirmed capture.
#[utoipa::path(
    post,
    path = "/api/v1/checkout/orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order created (or replayed for a known idempotency key)", body = ApiResponse<OrderResponse>),
        (status = 402, description = "Payment capture failed", body = crate::errors::ErrorResponse),
        (status = 422, description = "Below online minimum or out of stock", body = crate::errors::ErrorResponse)
    ),
    tag = "checkout"
)]
pub async fn place_order(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ServiceError> {
    let order = state.services.checkout.place_order(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}
