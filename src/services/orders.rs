//! Order reads and lifecycle mutations.
//!
//! Every mutation re-validates against the row as persisted at
//! transition time, inside a transaction, and applies the change as a
//! compare-and-set on the row version, so a stale client copy (a
//! seller's second tab, a status-sync job) loses cleanly instead of
//! silently overwriting.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{ActorContext, Role};
use crate::checkout::{PricingBreakdown, ShippingAddress};
use crate::db::DbPool;
use crate::entities::order::{self, OrderStatus, PaymentMethod, PaymentStatus};
use crate::entities::order_item;
use crate::entities::{Order, OrderItem};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::lifecycle;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub category: String,
    pub brand: String,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub pricing: PricingBreakdown,
    pub shipping_address: ShippingAddress,
    pub tracking_number: Option<String>,
    pub items: Vec<OrderItemResponse>,
    pub order_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// List filters. `seller_id` is honored for admins only; buyers and
/// sellers are always scoped to their own orders.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OrderListFilter {
    pub status: Option<OrderStatus>,
    pub seller_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetTrackingRequest {
    pub tracking_number: String,
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Retrieves an order visible to the actor: its buyer, its seller,
    /// or any admin.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(
        &self,
        actor: &ActorContext,
        order_id: Uuid,
    ) -> Result<OrderResponse, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        check_read_access(actor, &order)?;
        self.to_response(order).await
    }

    /// Lists orders, paginated, newest first. Buyers see their own
    /// purchases, sellers their own sales; admins see everything and
    /// may filter by seller.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        actor: &ActorContext,
        filter: OrderListFilter,
        page: u64,
        per_page: u64,
    ) -> Result<OrderListResponse, ServiceError> {
        let mut query = Order::find().order_by_desc(order::Column::CreatedAt);

        query = match actor.role {
            Role::Buyer => query.filter(order::Column::BuyerId.eq(actor.user_id)),
            Role::Seller => query.filter(order::Column::SellerId.eq(actor.user_id)),
            Role::Admin => match filter.seller_id {
                Some(seller_id) => query.filter(order::Column::SellerId.eq(seller_id)),
                None => query,
            },
        };
        if let Some(status) = &filter.status {
            query = query.filter(order::Column::Status.eq(status.clone()));
        }

        let per_page = per_page.clamp(1, 100);
        let page = page.max(1);
        let paginator = query.paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page - 1).await?;

        let mut responses = Vec::with_capacity(orders.len());
        for model in orders {
            responses.push(self.to_response(model).await?);
        }

        Ok(OrderListResponse {
            orders: responses,
            total,
            page,
            per_page,
        })
    }

    /// Applies one fulfillment-status transition after lifecycle and
    /// authority checks against the persisted row.
    #[instrument(skip(self), fields(order_id = %order_id, target = %target))]
    pub async fn update_status(
        &self,
        actor: &ActorContext,
        order_id: Uuid,
        target: OrderStatus,
    ) -> Result<OrderResponse, ServiceError> {
        let txn = self.db.begin().await?;

        let current = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        lifecycle::check_transition(actor, &current, &target)?;

        let old_status = current.status.clone();
        let rows = Order::update_many()
            .col_expr(order::Column::Status, Expr::value(target.clone()))
            .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
            .col_expr(
                order::Column::Version,
                Expr::col(order::Column::Version).add(1),
            )
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Version.eq(current.version))
            .exec(&txn)
            .await?
            .rows_affected;

        if rows == 0 {
            // Someone else won the race since our read; nothing changed.
            return Err(ServiceError::Conflict(format!(
                "Order {} was modified concurrently; retry the transition",
                order_id
            )));
        }

        txn.commit().await?;

        info!(%order_id, %old_status, %target, "Order status updated");
        self.event_sender
            .emit(Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status: target.clone(),
            })
            .await;
        if target == OrderStatus::Cancelled {
            self.event_sender.emit(Event::OrderCancelled(order_id)).await;
        }

        let updated = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        self.to_response(updated).await
    }

    /// Records settlement of a cash-on-delivery order.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn mark_cod_paid(
        &self,
        actor: &ActorContext,
        order_id: Uuid,
    ) -> Result<OrderResponse, ServiceError> {
        let txn = self.db.begin().await?;

        let current = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        lifecycle::check_cod_payment_transition(actor, &current)?;

        let rows = Order::update_many()
            .col_expr(
                order::Column::PaymentStatus,
                Expr::value(PaymentStatus::Paid),
            )
            .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
            .col_expr(
                order::Column::Version,
                Expr::col(order::Column::Version).add(1),
            )
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Version.eq(current.version))
            .exec(&txn)
            .await?
            .rows_affected;

        if rows == 0 {
            return Err(ServiceError::Conflict(format!(
                "Order {} was modified concurrently; retry",
                order_id
            )));
        }

        txn.commit().await?;

        info!(%order_id, "COD payment recorded");
        self.event_sender
            .emit(Event::PaymentStatusChanged {
                order_id,
                status: PaymentStatus::Paid,
            })
            .await;

        let updated = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        self.to_response(updated).await
    }

    /// Sets (or overwrites) the tracking number. No history is kept.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn set_tracking(
        &self,
        actor: &ActorContext,
        order_id: Uuid,
        tracking_number: String,
    ) -> Result<OrderResponse, ServiceError> {
        if tracking_number.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Tracking number must not be empty".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let current = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        lifecycle::check_tracking_update(actor, &current)?;

        let rows = Order::update_many()
            .col_expr(
                order::Column::TrackingNumber,
                Expr::value(tracking_number.clone()),
            )
            .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
            .col_expr(
                order::Column::Version,
                Expr::col(order::Column::Version).add(1),
            )
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Version.eq(current.version))
            .exec(&txn)
            .await?
            .rows_affected;

        if rows == 0 {
            return Err(ServiceError::Conflict(format!(
                "Order {} was modified concurrently; retry",
                order_id
            )));
        }

        txn.commit().await?;

        info!(%order_id, "Tracking number assigned");
        self.event_sender
            .emit(Event::TrackingAssigned { order_id })
            .await;

        let updated = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        self.to_response(updated).await
    }

    pub(crate) async fn to_response(
        &self,
        model: order::Model,
    ) -> Result<OrderResponse, ServiceError> {
        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(model.id))
            .all(&*self.db)
            .await?;
        build_response(model, items)
    }
}

fn check_read_access(actor: &ActorContext, order: &order::Model) -> Result<(), ServiceError> {
    let visible = match actor.role {
        Role::Admin => true,
        Role::Buyer => actor.user_id == order.buyer_id,
        Role::Seller => actor.user_id == order.seller_id,
    };
    if !visible {
        warn!(order_id = %order.id, actor = %actor.user_id, "Order read refused");
        return Err(ServiceError::Forbidden(
            "You do not have access to this order".to_string(),
        ));
    }
    Ok(())
}

/// Converts persisted order + item rows into the response shape.
pub(crate) fn build_response(
    model: order::Model,
    items: Vec<order_item::Model>,
) -> Result<OrderResponse, ServiceError> {
    let shipping_address: ShippingAddress = serde_json::from_value(model.shipping_address.clone())
        .map_err(|e| {
            ServiceError::InternalError(format!(
                "Stored shipping address for order {} is unreadable: {}",
                model.id, e
            ))
        })?;

    Ok(OrderResponse {
        id: model.id,
        order_number: model.order_number,
        buyer_id: model.buyer_id,
        seller_id: model.seller_id,
        status: model.status,
        payment_status: model.payment_status,
        payment_method: model.payment_method,
        pricing: PricingBreakdown {
            subtotal: model.subtotal,
            platform_fee: model.platform_fee,
            shipping_fee: model.shipping_fee,
            shipping_fee_basis: model.shipping_fee_basis,
            shipping_savings: model.shipping_savings,
            total: model.total_amount,
        },
        shipping_address,
        tracking_number: model.tracking_number,
        items: items
            .into_iter()
            .map(|item| OrderItemResponse {
                id: item.id,
                product_id: item.product_id,
                name: item.name,
                category: item.category,
                brand: item.brand,
                unit_price: item.unit_price,
                discount_percent: item.discount_percent,
                quantity: item.quantity,
                line_total: item.line_total,
            })
            .collect(),
        order_date: model.order_date,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}
