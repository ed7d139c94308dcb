use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog product. Catalog management is owned elsewhere; this entity
/// exists so checkout can decrement stock in the same transaction that
/// creates the order.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub seller_id: Uuid,
    pub name: String,
    pub category: String,
    pub brand: String,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub discount_percent: Decimal,
    /// Shipping fee charged per unit of this product.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub shipping_fee: Decimal,
    pub stock_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
