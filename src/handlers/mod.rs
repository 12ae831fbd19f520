//! Intent handlers and registry
//!
//! One handler per intent kind, each composing a parameter extractor (where
//! the intent needs one) with its data providers. Handlers return an explicit
//! `Result`: `Ok` text is an answer (including provider-reported conditions
//! the caller should see verbatim), `Err` marks the intent slot as failed.

use crate::extract::{first_digit_run, Clock, ParamExtractor};
use crate::llm::LanguageModel;
use crate::models::{CurrencyConversion, IntentTag, OrderLookup, RevenueSummary};
use crate::providers::{DocsProvider, LiveRateProvider, MockRates, OrderStore, RevenueStore};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

pub const FALLBACK_SOURCE: &str = "internal (fallback)";

/// A single intent capability.
#[async_trait::async_trait]
pub trait IntentHandler: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute(&self, sub_question: &str) -> crate::Result<String>;
}

/// Fixed enum-keyed handler map. Unknown raw tags resolve to the DOCS
/// capability at lookup time; the DOCS handler doubles as the guaranteed
/// fallback so resolution is total.
pub struct HandlerRegistry {
    handlers: HashMap<IntentTag, Arc<dyn IntentHandler>>,
    docs: Arc<dyn IntentHandler>,
}

impl HandlerRegistry {
    pub fn new(
        order: Arc<dyn IntentHandler>,
        revenue: Arc<dyn IntentHandler>,
        currency: Arc<dyn IntentHandler>,
        exchange: Arc<dyn IntentHandler>,
        docs: Arc<dyn IntentHandler>,
    ) -> Self {
        let mut handlers: HashMap<IntentTag, Arc<dyn IntentHandler>> = HashMap::new();
        handlers.insert(IntentTag::Order, order);
        handlers.insert(IntentTag::Revenue, revenue);
        handlers.insert(IntentTag::Currency, currency);
        handlers.insert(IntentTag::Exchange, exchange);
        handlers.insert(IntentTag::Docs, docs.clone());

        Self { handlers, docs }
    }

    /// Resolve a raw classifier tag to (resolved tag, handler).
    pub fn resolve(&self, raw_tag: &str) -> (IntentTag, Arc<dyn IntentHandler>) {
        let tag = IntentTag::resolve(raw_tag);
        match self.handlers.get(&tag) {
            Some(handler) => (tag, handler.clone()),
            None => (IntentTag::Docs, self.docs.clone()),
        }
    }
}

//
// ================= Order =================
//

pub struct OrderHandler {
    orders: Arc<dyn OrderStore>,
}

impl OrderHandler {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }
}

#[async_trait::async_trait]
impl IntentHandler for OrderHandler {
    fn name(&self) -> &'static str {
        "order_status"
    }

    async fn execute(&self, sub_question: &str) -> crate::Result<String> {
        let Some(order_id) = first_digit_run(sub_question) else {
            return Ok(
                "I couldn't find an order id in your question. Please include the order \
                 number, e.g. \"What is the status of order 42?\""
                    .to_string(),
            );
        };

        let lookup = self.orders.get_order(order_id as i64).await?;
        Ok(format!(
            "Order #{} details: {}",
            order_id,
            describe_lookup(&lookup)
        ))
    }
}

fn describe_lookup(lookup: &OrderLookup) -> String {
    match lookup {
        OrderLookup::Found(order) => format!(
            "status {}, total {:.2} {}, created {}",
            order.status,
            order.total_amount,
            order.currency,
            order.created_at.format("%Y-%m-%d")
        ),
        OrderLookup::NotFound => "Order not found".to_string(),
    }
}

//
// ================= Revenue =================
//

pub struct RevenueHandler {
    extractor: ParamExtractor,
    revenue: Arc<dyn RevenueStore>,
    clock: Arc<dyn Clock>,
}

impl RevenueHandler {
    pub fn new(
        extractor: ParamExtractor,
        revenue: Arc<dyn RevenueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            extractor,
            revenue,
            clock,
        }
    }
}

#[async_trait::async_trait]
impl IntentHandler for RevenueHandler {
    fn name(&self) -> &'static str {
        "revenue_summary"
    }

    async fn execute(&self, sub_question: &str) -> crate::Result<String> {
        let params = self
            .extractor
            .revenue(sub_question, self.clock.today())
            .await?;

        let rows = self
            .revenue
            .revenue_summary(params.start_date, params.end_date)
            .await?;

        Ok(render_revenue(params.start_date, params.end_date, &rows))
    }
}

fn render_revenue(
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
    rows: &[RevenueSummary],
) -> String {
    if rows.is_empty() {
        return format!("Revenue from {} to {}: no paid payments in this range.", start, end);
    }

    let totals: Vec<String> = rows
        .iter()
        .map(|r| {
            format!(
                "{} payments totaling {:.2} {}",
                r.total_payments, r.total_revenue, r.currency
            )
        })
        .collect();

    format!("Revenue from {} to {}: {}.", start, end, totals.join("; "))
}

//
// ================= Currency =================
//

pub struct CurrencyHandler {
    extractor: ParamExtractor,
    live: Arc<dyn LiveRateProvider>,
    fallback: Arc<MockRates>,
}

impl CurrencyHandler {
    pub fn new(
        extractor: ParamExtractor,
        live: Arc<dyn LiveRateProvider>,
        fallback: Arc<MockRates>,
    ) -> Self {
        Self {
            extractor,
            live,
            fallback,
        }
    }
}

#[async_trait::async_trait]
impl IntentHandler for CurrencyHandler {
    fn name(&self) -> &'static str {
        "currency_conversion"
    }

    async fn execute(&self, sub_question: &str) -> crate::Result<String> {
        let params = self.extractor.currency(sub_question).await?;

        // Strictly sequential: the internal table is consulted only after
        // the live tier is observed to fail, and the rendered source label
        // records that observation. Never probed in parallel.
        let conversion = match self
            .live
            .convert(params.amount, &params.from_currency, &params.to_currency)
            .await
        {
            Ok(conversion) => conversion,
            Err(live_error) => {
                warn!("Live conversion failed, trying internal rates: {}", live_error);
                let mut conversion = self.fallback.convert(
                    params.amount,
                    &params.from_currency,
                    &params.to_currency,
                )?;
                conversion.source = FALLBACK_SOURCE.to_string();
                conversion
            }
        };

        Ok(render_conversion(&conversion))
    }
}

fn render_conversion(conversion: &CurrencyConversion) -> String {
    let mut text = format!(
        "{} {} = {:.2} {}",
        conversion.amount,
        conversion.from_currency,
        conversion.converted_amount,
        conversion.to_currency
    );

    if let Some(rate) = conversion.rate {
        text.push_str(&format!(" at rate {}", rate));
    }

    match &conversion.date {
        Some(date) => text.push_str(&format!(" (source: {}, as of {})", conversion.source, date)),
        None => text.push_str(&format!(" (source: {})", conversion.source)),
    }

    text
}

//
// ================= Exchange =================
//

pub struct ExchangeHandler {
    extractor: ParamExtractor,
    rates: Arc<dyn LiveRateProvider>,
}

impl ExchangeHandler {
    pub fn new(extractor: ParamExtractor, rates: Arc<dyn LiveRateProvider>) -> Self {
        Self { extractor, rates }
    }
}

#[async_trait::async_trait]
impl IntentHandler for ExchangeHandler {
    fn name(&self) -> &'static str {
        "exchange_rate"
    }

    async fn execute(&self, sub_question: &str) -> crate::Result<String> {
        let params = self.extractor.exchange(sub_question).await?;

        match self
            .rates
            .rate(&params.from_currency, &params.to_currency)
            .await
        {
            Ok(rate) => Ok(format!(
                "Current exchange rate: 1 {} = {} {} (as of {})",
                rate.from_currency, rate.rate, rate.to_currency, rate.date
            )),
            Err(e) => Ok(format!("Exchange rate lookup failed: {}", e)),
        }
    }
}

//
// ================= Docs =================
//

pub struct DocsHandler {
    docs: Arc<dyn DocsProvider>,
}

impl DocsHandler {
    pub fn new(docs: Arc<dyn DocsProvider>) -> Self {
        Self { docs }
    }
}

#[async_trait::async_trait]
impl IntentHandler for DocsHandler {
    fn name(&self) -> &'static str {
        "knowledge_base"
    }

    async fn execute(&self, sub_question: &str) -> crate::Result<String> {
        // Pass-through: no extraction stage, answer returned unchanged.
        self.docs.ask(sub_question).await
    }
}

//
// ================= Wiring =================
//

/// Build the registry with the five production handlers.
pub fn create_registry(
    llm: Arc<dyn LanguageModel>,
    orders: Arc<dyn OrderStore>,
    revenue: Arc<dyn RevenueStore>,
    live_rates: Arc<dyn LiveRateProvider>,
    mock_rates: Arc<MockRates>,
    docs: Arc<dyn DocsProvider>,
    clock: Arc<dyn Clock>,
) -> HandlerRegistry {
    HandlerRegistry::new(
        Arc::new(OrderHandler::new(orders)),
        Arc::new(RevenueHandler::new(
            ParamExtractor::new(llm.clone()),
            revenue,
            clock,
        )),
        Arc::new(CurrencyHandler::new(
            ParamExtractor::new(llm.clone()),
            live_rates.clone(),
            mock_rates,
        )),
        Arc::new(ExchangeHandler::new(ParamExtractor::new(llm), live_rates)),
        Arc::new(DocsHandler::new(docs)),
    )
}
