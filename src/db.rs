use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};
use tracing::info;

use crate::config::AppConfig;
use crate::entities;

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Establishes the connection pool from application config.
pub async fn establish_connection(cfg: &AppConfig) -> Result<DbPool, DbErr> {
    let mut options = ConnectOptions::new(cfg.database_url.clone());
    options
        .max_connections(10)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(true)
        .sqlx_logging_level(tracing::log::LevelFilter::Debug);

    let db = Database::connect(options).await?;
    info!("Database connection established");
    Ok(db)
}

/// Creates any missing tables from the entity definitions. Intended
/// for development and test databases; production schemas are managed
/// by migrations.
pub async fn bootstrap_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut statements = vec![
        schema.create_table_from_entity(entities::Product),
        schema.create_table_from_entity(entities::CartItem),
        schema.create_table_from_entity(entities::Order),
        schema.create_table_from_entity(entities::OrderItem),
    ];
    for statement in &mut statements {
        statement.if_not_exists();
        db.execute(backend.build(&*statement)).await?;
    }

    info!("Schema bootstrap complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Decimal column precision must stay within what the SQLite
    // backend can build a CREATE TABLE for.
    #[tokio::test]
    async fn bootstrap_creates_all_tables_on_sqlite() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        bootstrap_schema(&db).await.unwrap();
        // Repeat run is a no-op thanks to if_not_exists.
        bootstrap_schema(&db).await.unwrap();

        for table in ["products", "cart_items", "orders", "order_items"] {
            let stmt = sea_orm::Statement::from_string(
                db.get_database_backend(),
                format!("SELECT COUNT(*) FROM {}", table),
            );
            db.query_one(stmt).await.unwrap();
        }
    }
}
