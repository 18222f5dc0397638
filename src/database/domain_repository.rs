use crate::database::error::DatabaseError;
use crate::payments::error::PaymentResult;
use crate::payments::store::DomainReader;
use crate::payments::types::{OrderSummary, SubscriptionPlan};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use tracing::debug;

#[derive(Debug, FromRow)]
struct OrderRow {
    id: i64,
    user_id: Option<i64>,
    total_price: Decimal,
    currency: String,
    details: JsonValue,
}

impl From<OrderRow> for OrderSummary {
    fn from(row: OrderRow) -> Self {
        OrderSummary {
            id: row.id,
            user_id: row.user_id,
            total_price: row.total_price,
            currency: row.currency,
            details: row.details,
        }
    }
}

#[derive(Debug, FromRow)]
struct SubscriptionRow {
    id: i64,
    price: Decimal,
    currency: String,
}

/// Read side of the order and subscription domain, as the payment layer
/// sees it.
pub struct DomainRepository {
    pool: PgPool,
}

impl DomainRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DomainReader for DomainRepository {
    async fn find_order(&self, id: i64) -> PaymentResult<Option<OrderSummary>> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT id, user_id, total_price, currency, details FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(row.map(OrderSummary::from))
    }

    async fn find_order_for_cart(&self, cart_id: i64) -> PaymentResult<Option<OrderSummary>> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT id, user_id, total_price, currency, details FROM orders WHERE cart_id = $1",
        )
        .bind(cart_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(row.map(OrderSummary::from))
    }

    async fn find_subscription(&self, id: i64) -> PaymentResult<Option<SubscriptionPlan>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            "SELECT id, price, currency FROM subscriptions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(row.map(|r| SubscriptionPlan {
            id: r.id,
            price: r.price,
            currency: r.currency,
        }))
    }

    /// Materializes order-detail rows from the order's line-item blob.
    /// Idempotent: rows already present are left alone.
    async fn prepare_order_details(&self, order_id: i64) -> PaymentResult<()> {
        let result = sqlx::query(
            "INSERT INTO order_details (order_id, stock_id, quantity, price)
             SELECT o.id,
                    (item->>'stock_id')::bigint,
                    (item->>'quantity')::bigint,
                    (item->>'price')::numeric
             FROM orders o, jsonb_array_elements(o.details) AS item
             WHERE o.id = $1
             ON CONFLICT (order_id, stock_id) DO NOTHING",
        )
        .bind(order_id)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        debug!(order_id, rows = result.rows_affected(), "order details prepared");
        Ok(())
    }
}
