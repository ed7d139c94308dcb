//! Shared harness for service-level integration tests.
//!
//! Runs against an in-memory SQLite database with the schema created
//! from the entity definitions, so the suite needs no external
//! services.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectOptions, Database, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use storefront_api::checkout::payment::SandboxPaymentClient;
use storefront_api::checkout::ShippingAddress;
use storefront_api::config::AppConfig;
use storefront_api::db::{bootstrap_schema, DbPool};
use storefront_api::entities::{cart_item, product, CartItem, Product};
use storefront_api::events::{process_events, EventSender};
use storefront_api::handlers::AppServices;
use storefront_api::services::{CheckoutService, OrderService};

pub struct TestApp {
    pub db: Arc<DbPool>,
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
}

impl TestApp {
    pub async fn new() -> Self {
        // A single connection keeps every query on the same in-memory
        // database.
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1).sqlx_logging(false);
        let db = Arc::new(
            Database::connect(options)
                .await
                .expect("in-memory database should open"),
        );
        bootstrap_schema(&db)
            .await
            .expect("schema bootstrap should succeed");

        let (event_sender, receiver) = EventSender::channel(64);
        tokio::spawn(process_events(receiver));

        let config = AppConfig::default();
        let services = AppServices::new(
            db.clone(),
            event_sender,
            Arc::new(SandboxPaymentClient),
            &config,
        );

        Self {
            db,
            checkout: services.checkout,
            orders: services.orders,
        }
    }

    pub async fn seed_product(
        &self,
        seller_id: Uuid,
        price: Decimal,
        discount_percent: Decimal,
        shipping_fee: Decimal,
        stock_quantity: i32,
    ) -> product::Model {
        let now = Utc::now();
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            seller_id: Set(seller_id),
            name: Set("Wireless Mouse".to_string()),
            category: Set("Electronics".to_string()),
            brand: Set("Acme".to_string()),
            price: Set(price),
            discount_percent: Set(discount_percent),
            shipping_fee: Set(shipping_fee),
            stock_quantity: Set(stock_quantity),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(&*self.db)
        .await
        .expect("product insert should succeed")
    }

    pub async fn add_to_cart(
        &self,
        buyer_id: Uuid,
        product: &product::Model,
        quantity: i32,
    ) -> cart_item::Model {
        cart_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            buyer_id: Set(buyer_id),
            product_id: Set(product.id),
            seller_id: Set(product.seller_id),
            unit_price: Set(product.price),
            discount_percent: Set(product.discount_percent),
            shipping_fee_per_unit: Set(product.shipping_fee),
            quantity: Set(quantity),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .expect("cart insert should succeed")
    }

    pub async fn stock_of(&self, product_id: Uuid) -> i32 {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await
            .expect("product query should succeed")
            .expect("product should exist")
            .stock_quantity
    }

    pub async fn cart_line_count(&self, buyer_id: Uuid) -> usize {
        CartItem::find()
            .filter(cart_item::Column::BuyerId.eq(buyer_id))
            .all(&*self.db)
            .await
            .expect("cart query should succeed")
            .len()
    }
}

pub fn shipping_address(city: &str) -> ShippingAddress {
    ShippingAddress {
        full_name: "Maria Santos".to_string(),
        phone: "+639171234567".to_string(),
        email: "maria.santos@example.com".to_string(),
        address: "12 Mabini Street".to_string(),
        city: city.to_string(),
        province: "Metro Manila".to_string(),
        postal_code: Some("1100".to_string()),
    }
}
