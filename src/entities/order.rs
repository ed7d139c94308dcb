use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Fulfillment status of an order. `Delivered` and `Cancelled` are
/// terminal; the legal moves between the others live in `crate::lifecycle`.
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "shipped")]
    Shipped,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Settlement status. Online captures are `Paid` from creation; COD
/// orders start `Pending` and are marked `Paid` by the owning seller.
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// Payment method chosen at checkout. Immutable once the order exists.
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "gcash")]
    Gcash,
    #[sea_orm(string_value = "paypal")]
    Paypal,
    #[sea_orm(string_value = "cod")]
    Cod,
}

impl PaymentMethod {
    /// Online methods go through the external capture collaborator;
    /// COD is accepted directly.
    pub fn is_online(&self) -> bool {
        matches!(self, PaymentMethod::Gcash | PaymentMethod::Paypal)
    }
}

/// Which shipping tier produced the fee (see `checkout::pricing`).
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ShippingFeeBasis {
    #[sea_orm(string_value = "per-item")]
    PerItem,
    #[sea_orm(string_value = "summed")]
    Summed,
    #[sea_orm(string_value = "flat")]
    Flat,
}

/// The `orders` table. One order is always bound to exactly one seller;
/// the pricing columns are a snapshot of the breakdown at checkout time.
/// Only `status`, `payment_status` and `tracking_number` are mutated
/// after creation, and only through the lifecycle-checked service paths.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Externally visible identifier, distinct from `id`.
    #[sea_orm(unique)]
    pub order_number: String,

    pub buyer_id: Uuid,
    pub seller_id: Uuid,

    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,

    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub subtotal: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub platform_fee: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub shipping_fee: Decimal,
    pub shipping_fee_basis: ShippingFeeBasis,
    /// Flat-tier savings against summed per-line fees, display-only.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub shipping_savings: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub total_amount: Decimal,

    /// Serialized `ShippingAddress`.
    #[sea_orm(column_type = "Json")]
    pub shipping_address: Json,

    /// Capture reference from the payment collaborator (online methods).
    pub payment_intent_id: Option<String>,

    /// Dedupe key for order creation; payment_intent_id for online
    /// methods, client-supplied for COD.
    #[sea_orm(unique)]
    pub idempotency_key: Option<String>,

    pub tracking_number: Option<String>,

    pub order_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,

    /// Optimistic concurrency guard for status mutations.
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// True once no further lifecycle transition is permitted.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Delivered | OrderStatus::Cancelled
        )
    }
}
