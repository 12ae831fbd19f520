//! Core data models for the knowledge agent

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Intents =================
//

/// The five intent kinds the classifier can produce.
///
/// The raw tag string on an [`IntentDescriptor`] is preserved for display;
/// this enum is only resolved at dispatch time, where anything unrecognized
/// maps to `Docs`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum IntentTag {
    Order,
    Revenue,
    Currency,
    Exchange,
    Docs,
}

impl IntentTag {
    pub const ALL: [IntentTag; 5] = [
        IntentTag::Order,
        IntentTag::Revenue,
        IntentTag::Currency,
        IntentTag::Exchange,
        IntentTag::Docs,
    ];

    /// Resolve a raw classifier tag. Unknown tags fall back to `Docs`.
    pub fn resolve(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "ORDER" => IntentTag::Order,
            "REVENUE" => IntentTag::Revenue,
            "CURRENCY" => IntentTag::Currency,
            "EXCHANGE" => IntentTag::Exchange,
            _ => IntentTag::Docs,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentTag::Order => "ORDER",
            IntentTag::Revenue => "REVENUE",
            IntentTag::Currency => "CURRENCY",
            IntentTag::Exchange => "EXCHANGE",
            IntentTag::Docs => "DOCS",
        }
    }

    /// Human-readable description of the backend that answers this intent.
    pub fn source_label(&self) -> &'static str {
        match self {
            IntentTag::Order => "Orders Database (PostgreSQL)",
            IntentTag::Revenue => "Payments Database (PostgreSQL)",
            IntentTag::Currency => "Currency Converter (live + internal fallback)",
            IntentTag::Exchange => "Live Exchange Rates (frankfurter.app)",
            IntentTag::Docs => "Knowledge Base (vector search)",
        }
    }
}

impl fmt::Display for IntentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified sub-intent. `tag` keeps the raw string exactly as the
/// classifier produced it; resolution to a handler happens later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntentDescriptor {
    pub tag: String,
    pub sub_question: String,
}

impl IntentDescriptor {
    pub fn new(tag: impl Into<String>, sub_question: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            sub_question: sub_question.into(),
        }
    }

    /// The whole-question DOCS descriptor used when classification yields
    /// nothing usable.
    pub fn docs_fallback(question: &str) -> Self {
        Self::new(IntentTag::Docs.as_str(), question)
    }
}

//
// ================= Outcomes =================
//

/// Result of running one handler for one intent slot.
///
/// `failed` distinguishes a handler-reported error from a successful answer;
/// both are rendered as text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandlerOutcome {
    /// 1-based position in the classified intent list
    pub index: usize,
    /// Raw tag as classified (may be unrecognized)
    pub tag: String,
    pub source_label: String,
    pub text: String,
    pub failed: bool,
}

//
// ================= Parameter Sets =================
//

/// Date range for a revenue query, already validated as ISO-8601.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RevenueParams {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Validated conversion request: non-negative amount, upper-cased codes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrencyParams {
    pub amount: f64,
    pub from_currency: String,
    pub to_currency: String,
}

/// Validated rate lookup: upper-cased 3-letter codes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExchangeParams {
    pub from_currency: String,
    pub to_currency: String,
}

//
// ================= Provider Records =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderRecord {
    pub order_id: i64,
    pub status: String,
    pub total_amount: f64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Lookup result for a single order. `NotFound` is ordinary data, not an
/// error: handlers embed it verbatim in their answer text.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderLookup {
    Found(OrderRecord),
    NotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentRecord {
    pub id: i64,
    pub order_id: i64,
    pub provider: String,
    pub payment_method: Option<String>,
    pub payment_status: String,
    pub amount: f64,
    pub currency: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Paid-payment totals for one currency within a date range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RevenueSummary {
    pub total_payments: i64,
    pub total_revenue: f64,
    pub currency: String,
}

/// A completed currency conversion. Live conversions carry `date` and a
/// provider-assigned `source`; the internal table carries `rate` instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrencyConversion {
    pub amount: f64,
    pub from_currency: String,
    pub to_currency: String,
    pub converted_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExchangeRate {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: f64,
    pub date: String,
}
