use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use tracing::debug;

use crate::core::error::Result;
use crate::features::orders::models::Order;

/// Access to orders and their metadata slots
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Resolve an order by id
    async fn find_order(&self, order_id: i64) -> Result<Option<Order>>;

    /// Read one metadata value
    async fn get_meta(&self, order: &Order, key: &str) -> Result<Option<Value>>;

    /// Set one metadata value and persist it
    async fn update_meta(&self, order: &Order, key: &str, value: Value) -> Result<()>;
}

/// Postgres-backed order repository
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn find_order(&self, order_id: i64) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, customer_id FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn get_meta(&self, order: &Order, key: &str) -> Result<Option<Value>> {
        let value = sqlx::query_scalar::<_, Value>(
            r#"
            SELECT meta_value FROM order_meta
            WHERE order_id = $1 AND meta_key = $2
            "#,
        )
        .bind(order.id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }

    async fn update_meta(&self, order: &Order, key: &str, value: Value) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_meta (order_id, meta_key, meta_value)
            VALUES ($1, $2, $3)
            ON CONFLICT (order_id, meta_key)
            DO UPDATE SET meta_value = EXCLUDED.meta_value, updated_at = NOW()
            "#,
        )
        .bind(order.id)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        debug!("Order meta persisted: order_id={}, key={}", order.id, key);

        Ok(())
    }
}
