//! Checkout orchestration: partition the cart, price it, gate the
//! payment method, and assemble the immutable order snapshot.
//!
//! Order creation, stock decrement, and cart-line removal happen in
//! one transaction; they succeed or fail together. Creation is keyed
//! by the payment intent id (online) or a client idempotency key
//! (COD), so a retried request after a lost response returns the
//! already-created order instead of a duplicate.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{ActorContext, Role};
use crate::checkout::payment::{enforce_minimum, CaptureStatus, PaymentClient, PaymentSession};
use crate::checkout::{delivery, partition, pricing};
use crate::checkout::{DeliveryEstimate, PricingBreakdown, ShippingAddress};
use crate::db::DbPool;
use crate::entities::order::{OrderStatus, PaymentMethod, PaymentStatus};
use crate::entities::{cart_item, order, order_item, product};
use crate::entities::{CartItem, Order, Product};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::orders::{build_response, OrderResponse};

#[derive(Debug, Deserialize, ToSchema)]
pub struct QuoteRequest {
    /// Explicit seller-scoped selection; omitted means the whole cart.
    pub item_ids: Option<Vec<Uuid>>,
    /// Destination city for the delivery estimate, if known yet.
    pub city: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuotedLine {
    pub cart_item_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub effective_unit_price: Decimal,
    pub shipping_fee_per_unit: Decimal,
    pub line_subtotal: Decimal,
}

/// Priced preview of one seller-scoped checkout, before commitment.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutQuote {
    pub seller_id: Uuid,
    pub lines: Vec<QuotedLine>,
    pub pricing: PricingBreakdown,
    pub delivery: Option<DeliveryEstimate>,
    /// Cart lines (other sellers') left for a later checkout.
    pub remaining_item_count: usize,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BeginPaymentRequest {
    pub item_ids: Option<Vec<Uuid>>,
    pub payment_method: PaymentMethod,
    #[validate]
    pub billing_address: ShippingAddress,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PlaceOrderRequest {
    pub item_ids: Option<Vec<Uuid>>,
    #[validate]
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    /// Required for online methods: the capture reference returned by
    /// the gateway's success callback.
    pub payment_intent_id: Option<String>,
    /// Optional client-supplied dedupe key for COD retries.
    pub idempotency_key: Option<String>,
}

#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    payment_client: Arc<dyn PaymentClient>,
    local_hub_city: String,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: EventSender,
        payment_client: Arc<dyn PaymentClient>,
        local_hub_city: String,
    ) -> Self {
        Self {
            db,
            event_sender,
            payment_client,
            local_hub_city,
        }
    }

    /// Prices a seller-scoped selection of the buyer's cart for
    /// display: breakdown, per-line figures, and an advisory delivery
    /// window. Nothing is persisted.
    #[instrument(skip(self, request), fields(buyer_id = %actor.user_id))]
    pub async fn quote(
        &self,
        actor: &ActorContext,
        request: QuoteRequest,
    ) -> Result<CheckoutQuote, ServiceError> {
        require_buyer(actor)?;

        let cart = self.load_cart(actor.user_id).await?;
        let split = partition::partition(cart, request.item_ids.as_deref())?;
        let breakdown = pricing::price_lines(&split.checkout);

        let delivery = request
            .city
            .as_deref()
            .map(|city| delivery::estimate(city, &self.local_hub_city, Utc::now()));

        Ok(CheckoutQuote {
            seller_id: split.checkout[0].seller_id,
            lines: split.checkout.iter().map(quoted_line).collect(),
            pricing: breakdown,
            delivery,
            remaining_item_count: split.remaining.len(),
        })
    }

    /// Opens a payment session at the external gateway for an online
    /// method, after the minimum-amount gate. COD needs no session.
    #[instrument(skip(self, request), fields(buyer_id = %actor.user_id, method = %request.payment_method))]
    pub async fn begin_payment(
        &self,
        actor: &ActorContext,
        request: BeginPaymentRequest,
    ) -> Result<PaymentSession, ServiceError> {
        require_buyer(actor)?;
        request.validate()?;

        if request.payment_method == PaymentMethod::Cod {
            return Err(ServiceError::InvalidOperation(
                "Cash on delivery is captured on delivery; place the order directly".to_string(),
            ));
        }

        let cart = self.load_cart(actor.user_id).await?;
        let split = partition::partition(cart, request.item_ids.as_deref())?;
        let breakdown = pricing::price_lines(&split.checkout);
        enforce_minimum(breakdown.total, &request.payment_method)?;

        let session = self
            .payment_client
            .create_payment(
                breakdown.total,
                &request.payment_method,
                &request.billing_address,
            )
            .await?;

        self.event_sender
            .emit(Event::PaymentSessionOpened {
                buyer_id: actor.user_id,
                method: request.payment_method,
                amount: breakdown.total,
            })
            .await;

        Ok(session)
    }

    /// Turns the priced, partitioned selection into an order.
    ///
    /// Online methods must arrive with a confirmed capture; COD is
    /// accepted directly with payment pending. Stock decrement, order
    /// insert, and cart-line removal share one transaction.
    #[instrument(skip(self, request), fields(buyer_id = %actor.user_id, method = %request.payment_method))]
    pub async fn place_order(
        &self,
        actor: &ActorContext,
        request: PlaceOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        require_buyer(actor)?;
        request.validate()?;

        // Replay before anything else: a retry after a lost response
        // arrives with the same key but an already-consumed cart.
        if let Some(key) = request
            .payment_intent_id
            .as_deref()
            .or(request.idempotency_key.as_deref())
        {
            if let Some(existing) = self.find_by_idempotency_key(key).await? {
                // Replay only for the buyer who created the order;
                // anyone else presenting the key learns nothing.
                if existing.buyer_id != actor.user_id {
                    warn!(key = %key, actor = %actor.user_id, "Idempotency key replay refused");
                    return Err(ServiceError::Conflict(
                        "Idempotency key is already in use".to_string(),
                    ));
                }
                info!(order_id = %existing.id, key = %key, "Replaying existing order for idempotency key");
                return self.response_for(existing).await;
            }
        }

        let cart = self.load_cart(actor.user_id).await?;
        let split = partition::partition(cart, request.item_ids.as_deref())?;
        let breakdown = pricing::price_lines(&split.checkout);
        enforce_minimum(breakdown.total, &request.payment_method)?;

        // Settle payment preconditions before touching any state.
        let (payment_intent_id, payment_status) = if request.payment_method.is_online() {
            let intent = request.payment_intent_id.clone().ok_or_else(|| {
                ServiceError::InvalidInput(
                    "payment_intent_id is required for online payment methods".to_string(),
                )
            })?;
            let capture = self.payment_client.confirm(&intent).await?;
            if capture.status != CaptureStatus::Succeeded {
                return Err(ServiceError::PaymentFailed(format!(
                    "Capture {} did not succeed",
                    capture.capture_id
                )));
            }
            (Some(intent), PaymentStatus::Paid)
        } else {
            (None, PaymentStatus::Pending)
        };

        let idempotency_key = payment_intent_id
            .clone()
            .or_else(|| request.idempotency_key.clone());

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let seller_id = split.checkout[0].seller_id;

        let txn = self.db.begin().await?;

        // Guarded decrement: the WHERE clause is the single consistent
        // ordering point against concurrent checkouts of the same
        // product.
        for line in &split.checkout {
            let rows = Product::update_many()
                .col_expr(
                    product::Column::StockQuantity,
                    Expr::col(product::Column::StockQuantity).sub(line.quantity),
                )
                .col_expr(product::Column::UpdatedAt, Expr::value(now))
                .filter(product::Column::Id.eq(line.product_id))
                .filter(product::Column::StockQuantity.gte(line.quantity))
                .exec(&txn)
                .await?
                .rows_affected;

            if rows == 0 {
                return Err(ServiceError::InsufficientStock(format!(
                    "Product {} no longer has {} unit(s) available",
                    line.product_id, line.quantity
                )));
            }
        }

        let order_active = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(generate_order_number(&order_id)),
            buyer_id: Set(actor.user_id),
            seller_id: Set(seller_id),
            status: Set(OrderStatus::Pending),
            payment_status: Set(payment_status),
            payment_method: Set(request.payment_method.clone()),
            subtotal: Set(breakdown.subtotal),
            platform_fee: Set(breakdown.platform_fee),
            shipping_fee: Set(breakdown.shipping_fee),
            shipping_fee_basis: Set(breakdown.shipping_fee_basis.clone()),
            shipping_savings: Set(breakdown.shipping_savings),
            total_amount: Set(breakdown.total),
            shipping_address: Set(serde_json::to_value(&request.shipping_address).map_err(
                |e| ServiceError::InternalError(format!("Address serialization failed: {}", e)),
            )?),
            payment_intent_id: Set(payment_intent_id),
            idempotency_key: Set(idempotency_key.clone()),
            tracking_number: Set(None),
            order_date: Set(now),
            created_at: Set(now),
            updated_at: Set(None),
            version: Set(1),
        };

        let order_model = match order_active.insert(&txn).await {
            Ok(model) => model,
            Err(e) => {
                // A concurrent retry with the same key may have won the
                // unique-index race; the dropped transaction rolls the
                // decrement back.
                drop(txn);
                if let Some(key) = &idempotency_key {
                    if let Some(existing) = self.find_by_idempotency_key(key).await? {
                        if existing.buyer_id != actor.user_id {
                            warn!(key = %key, actor = %actor.user_id, "Idempotency key replay refused");
                            return Err(ServiceError::Conflict(
                                "Idempotency key is already in use".to_string(),
                            ));
                        }
                        warn!(key = %key, "Lost idempotency race; returning existing order");
                        return self.response_for(existing).await;
                    }
                }
                return Err(e.into());
            }
        };

        let mut item_models = Vec::with_capacity(split.checkout.len());
        for line in &split.checkout {
            let snapshot = self.snapshot_line(&txn, order_id, line, now).await?;
            item_models.push(snapshot);
        }

        let purchased_ids: Vec<Uuid> = split.checkout.iter().map(|line| line.id).collect();
        CartItem::delete_many()
            .filter(cart_item::Column::Id.is_in(purchased_ids))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        info!(
            %order_id,
            order_number = %order_model.order_number,
            %seller_id,
            total = %order_model.total_amount,
            "Order created"
        );
        self.event_sender.emit(Event::OrderCreated(order_id)).await;

        build_response(order_model, item_models)
    }

    /// Snapshots one cart line into an immutable order item, carrying
    /// the product's display identity at order time.
    async fn snapshot_line(
        &self,
        txn: &sea_orm::DatabaseTransaction,
        order_id: Uuid,
        line: &cart_item::Model,
        now: chrono::DateTime<Utc>,
    ) -> Result<order_item::Model, ServiceError> {
        let product = Product::find_by_id(line.product_id)
            .one(txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", line.product_id))
            })?;

        let item = order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(line.product_id),
            name: Set(product.name),
            category: Set(product.category),
            brand: Set(product.brand),
            unit_price: Set(pricing::discounted_unit_price(line)),
            discount_percent: Set(line.discount_percent),
            quantity: Set(line.quantity),
            line_total: Set(pricing::line_subtotal(line)),
            created_at: Set(now),
        };
        Ok(item.insert(txn).await?)
    }

    async fn load_cart(&self, buyer_id: Uuid) -> Result<Vec<cart_item::Model>, ServiceError> {
        Ok(CartItem::find()
            .filter(cart_item::Column::BuyerId.eq(buyer_id))
            .all(&*self.db)
            .await?)
    }

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<order::Model>, ServiceError> {
        Ok(Order::find()
            .filter(order::Column::IdempotencyKey.eq(key))
            .one(&*self.db)
            .await?)
    }

    async fn response_for(&self, model: order::Model) -> Result<OrderResponse, ServiceError> {
        let items = crate::entities::OrderItem::find()
            .filter(order_item::Column::OrderId.eq(model.id))
            .all(&*self.db)
            .await?;
        build_response(model, items)
    }
}

fn require_buyer(actor: &ActorContext) -> Result<(), ServiceError> {
    if actor.role != Role::Buyer {
        return Err(ServiceError::Forbidden(
            "Checkout is a buyer operation".to_string(),
        ));
    }
    Ok(())
}

fn quoted_line(line: &cart_item::Model) -> QuotedLine {
    QuotedLine {
        cart_item_id: line.id,
        product_id: line.product_id,
        quantity: line.quantity,
        unit_price: line.unit_price,
        discount_percent: line.discount_percent,
        effective_unit_price: pricing::discounted_unit_price(line),
        shipping_fee_per_unit: line.shipping_fee_per_unit,
        line_subtotal: pricing::line_subtotal(line),
    }
}

/// Externally visible order number, distinct from the row id.
fn generate_order_number(order_id: &Uuid) -> String {
    format!("ORD-{}", &order_id.simple().to_string()[..12].to_uppercase())
}
