use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::ActorContext;
use crate::entities::order::OrderStatus;
use crate::services::orders::{
    OrderListFilter, OrderListResponse, OrderResponse, SetTrackingRequest,
    UpdateOrderStatusRequest,
};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct OrderListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub status: Option<OrderStatus>,
    /// Admin-only filter; ignored for buyers and sellers.
    pub seller_id: Option<Uuid>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

/// List orders visible to the actor, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(OrderListQuery),
    responses((status = 200, description = "Paginated orders", body = ApiResponse<OrderListResponse>)),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    actor: ActorContext,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<OrderListResponse> {
    let filter = OrderListFilter {
        status: query.status,
        seller_id: query.seller_id,
    };
    let orders = state
        .services
        .orders
        .list_orders(&actor, filter, query.page, query.limit)
        .await?;
    Ok(Json(ApiResponse::success(orders)))
}

/// Fetch one order (buyer, owning seller, or admin).
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Unknown order", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderResponse> {
    let order = state.services.orders.get_order(&actor, id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Request a fulfillment-status transition.
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order after the transition", body = ApiResponse<OrderResponse>),
        (status = 403, description = "Transition refused; details list the allowed targets", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> ApiResult<OrderResponse> {
    let order = state
        .services
        .orders
        .update_status(&actor, id, request.status)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Record settlement of a cash-on-delivery order.
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/payment/paid",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with payment recorded", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Not a COD order or already settled", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn mark_cod_paid(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderResponse> {
    let order = state.services.orders.mark_cod_paid(&actor, id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Set or overwrite the tracking number.
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/tracking",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = SetTrackingRequest,
    responses(
        (status = 200, description = "Order with tracking set", body = ApiResponse<OrderResponse>),
        (status = 403, description = "Not the owning seller", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn set_tracking(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
    Json(request): Json<SetTrackingRequest>,
) -> ApiResult<OrderResponse> {
    let order = state
        .services
        .orders
        .set_tracking(&actor, id, request.tracking_number)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}
