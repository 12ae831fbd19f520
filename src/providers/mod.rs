//! Data providers
//!
//! Every backend the handlers talk to sits behind a narrow trait so the
//! routing core can be exercised against in-process fakes. Implementations:
//! Postgres for orders/payments, frankfurter.app for live rates, a seeded
//! in-process table for fallback rates, and embeddings + a vector index for
//! document QA.

pub mod docs;
pub mod rates;
pub mod store;

pub use docs::{DocsClient, PineconeIndex, VectorIndex};
pub use rates::{FrankfurterClient, MockRates};
pub use store::PgStore;

use crate::models::{
    CurrencyConversion, ExchangeRate, OrderLookup, OrderRecord, PaymentRecord, RevenueSummary,
};
use async_trait::async_trait;
use chrono::NaiveDate;

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get_order(&self, order_id: i64) -> crate::Result<OrderLookup>;

    /// All orders, newest first.
    async fn list_orders(&self) -> crate::Result<Vec<OrderRecord>>;
}

#[async_trait]
pub trait RevenueStore: Send + Sync {
    /// Paid-payment totals grouped by currency for the inclusive date range.
    async fn revenue_summary(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> crate::Result<Vec<RevenueSummary>>;

    /// All payments, newest first.
    async fn list_payments(&self) -> crate::Result<Vec<PaymentRecord>>;
}

/// Live exchange-rate service. An `Err` from either operation is the
/// provider's error indicator; the currency handler reacts to it by
/// escalating to the internal fallback table.
#[async_trait]
pub trait LiveRateProvider: Send + Sync {
    async fn convert(
        &self,
        amount: f64,
        from_currency: &str,
        to_currency: &str,
    ) -> crate::Result<CurrencyConversion>;

    async fn rate(&self, from_currency: &str, to_currency: &str) -> crate::Result<ExchangeRate>;
}

#[async_trait]
pub trait DocsProvider: Send + Sync {
    /// Answer a question from the ingested knowledge base.
    async fn ask(&self, question: &str) -> crate::Result<String>;
}
