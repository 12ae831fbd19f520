//! Postgres-backed order and payment store

use crate::error::AgentError;
use crate::models::{OrderLookup, OrderRecord, PaymentRecord, RevenueSummary};
use crate::providers::{OrderStore, RevenueStore};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use tracing::debug;

/// Shared store over the `orders` and `payments` tables. The pool is built
/// lazily at startup and cloned freely; sqlx pools are internally shared.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn connect_lazy(database_url: &str) -> crate::Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(database_url)
            .map_err(|e| {
                AgentError::DatabaseError(format!("Failed to configure Postgres pool: {}", e))
            })?;

        Ok(Self::new(pool))
    }
}

fn order_from_row(row: &sqlx::postgres::PgRow) -> crate::Result<OrderRecord> {
    Ok(OrderRecord {
        order_id: row.try_get("id")?,
        status: row.try_get("status")?,
        total_amount: row.try_get("total_amount")?,
        currency: row.try_get("currency")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl OrderStore for PgStore {
    async fn get_order(&self, order_id: i64) -> crate::Result<OrderLookup> {
        debug!(order_id, "Fetching order");

        let row = sqlx::query(
            r#"
            SELECT id, status, total_amount, currency, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AgentError::DatabaseError(format!("Failed to fetch order: {}", e)))?;

        match row {
            Some(row) => Ok(OrderLookup::Found(order_from_row(&row)?)),
            None => Ok(OrderLookup::NotFound),
        }
    }

    async fn list_orders(&self) -> crate::Result<Vec<OrderRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, status, total_amount, currency, created_at
            FROM orders
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AgentError::DatabaseError(format!("Failed to list orders: {}", e)))?;

        rows.iter().map(order_from_row).collect()
    }
}

#[async_trait]
impl RevenueStore for PgStore {
    async fn revenue_summary(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> crate::Result<Vec<RevenueSummary>> {
        debug!(%start_date, %end_date, "Computing revenue summary");

        let rows = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_payments,
                COALESCE(SUM(amount), 0) AS total_revenue,
                currency
            FROM payments
            WHERE payment_status = 'paid'
              AND created_at::date BETWEEN $1 AND $2
            GROUP BY currency
            ORDER BY currency
            "#,
        )
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AgentError::DatabaseError(format!("Failed to summarize revenue: {}", e)))?;

        rows.iter()
            .map(|row| {
                Ok(RevenueSummary {
                    total_payments: row.try_get("total_payments")?,
                    total_revenue: row.try_get("total_revenue")?,
                    currency: row.try_get("currency")?,
                })
            })
            .collect()
    }

    async fn list_payments(&self) -> crate::Result<Vec<PaymentRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, provider, payment_method, payment_status,
                   amount, currency, paid_at, created_at
            FROM payments
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AgentError::DatabaseError(format!("Failed to list payments: {}", e)))?;

        rows.iter()
            .map(|row| {
                Ok(PaymentRecord {
                    id: row.try_get("id")?,
                    order_id: row.try_get("order_id")?,
                    provider: row.try_get("provider")?,
                    payment_method: row.try_get("payment_method")?,
                    payment_status: row.try_get("payment_status")?,
                    amount: row.try_get("amount")?,
                    currency: row.try_get("currency")?,
                    paid_at: row.try_get("paid_at")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}
