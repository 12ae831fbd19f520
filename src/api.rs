//! REST API server for the knowledge agent
//!
//! Public surface: `POST /ask` + `GET /sources`. The `/internal/*` routes
//! expose the raw data providers (orders, payments, revenue, mock currency
//! conversion) for inspection and for other internal services.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::dispatch::Dispatcher;
use crate::models::IntentTag;
use crate::providers::{MockRates, OrderStore, RevenueStore};

/// =============================
/// Request / Response Models
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub question: String,
    pub answer: String,
    pub available_sources: BTreeMap<&'static str, &'static str>,
}

#[derive(Debug, Deserialize)]
pub struct RevenueQuery {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Deserialize)]
pub struct ConvertQuery {
    pub amount: f64,
    pub from_currency: String,
    pub to_currency: String,
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub dispatcher: Arc<Dispatcher>,
    pub orders: Arc<dyn OrderStore>,
    pub revenue: Arc<dyn RevenueStore>,
    pub converter: Arc<MockRates>,
}

fn source_registry() -> BTreeMap<&'static str, &'static str> {
    IntentTag::ALL
        .iter()
        .map(|tag| (tag.as_str(), tag.source_label()))
        .collect()
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Agent Endpoints
/// =============================

async fn ask_agent(
    State(state): State<ApiState>,
    Json(req): Json<AskRequest>,
) -> Json<AskResponse> {
    info!("Received question: {}", req.question);

    let answer = state.dispatcher.answer(&req.question).await;

    Json(AskResponse {
        question: req.question,
        answer,
        available_sources: source_registry(),
    })
}

async fn list_sources() -> Json<serde_json::Value> {
    let sources = source_registry();
    let total = sources.len();
    Json(serde_json::json!({
        "sources": sources,
        "total": total,
    }))
}

/// =============================
/// Internal Data Endpoints
/// =============================

async fn get_order(
    State(state): State<ApiState>,
    Path(order_id): Path<i64>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.orders.get_order(order_id).await {
        Ok(crate::models::OrderLookup::Found(order)) => {
            (StatusCode::OK, Json(serde_json::json!(order)))
        }
        Ok(crate::models::OrderLookup::NotFound) => (
            StatusCode::OK,
            Json(serde_json::json!({ "error": "Order not found" })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}

async fn list_orders(State(state): State<ApiState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.orders.list_orders().await {
        Ok(orders) => {
            let total = orders.len();
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "orders": orders,
                    "total": total,
                })),
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}

async fn list_payments(State(state): State<ApiState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.revenue.list_payments().await {
        Ok(payments) => {
            let total = payments.len();
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "payments": payments,
                    "total": total,
                })),
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}

async fn revenue_summary(
    State(state): State<ApiState>,
    Query(query): Query<RevenueQuery>,
) -> (StatusCode, Json<serde_json::Value>) {
    let parse = |field: &str| NaiveDate::parse_from_str(field, "%Y-%m-%d");

    let (Ok(start_date), Ok(end_date)) = (parse(&query.start_date), parse(&query.end_date)) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Dates must be YYYY-MM-DD" })),
        );
    };

    match state.revenue.revenue_summary(start_date, end_date).await {
        Ok(rows) => (StatusCode::OK, Json(serde_json::json!(rows))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}

async fn convert_currency(
    State(state): State<ApiState>,
    Query(query): Query<ConvertQuery>,
) -> Json<serde_json::Value> {
    match state
        .converter
        .convert(query.amount, &query.from_currency, &query.to_currency)
    {
        Ok(conversion) => Json(serde_json::json!(conversion)),
        // Missing rates are reported in-band, not as an HTTP failure.
        Err(e) => Json(serde_json::json!({ "error": e.to_string() })),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ask", post(ask_agent))
        .route("/sources", get(list_sources))
        .route("/internal/orders", get(list_orders))
        .route("/internal/orders/:order_id", get(get_order))
        .route("/internal/payments", get(list_payments))
        .route("/internal/revenue/summary", get(revenue_summary))
        .route("/internal/utils/convert-currency", get(convert_currency))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::IntentClassifier;
    use crate::handlers::{HandlerRegistry, IntentHandler};
    use crate::llm::testing::ScriptedLlm;
    use crate::models::{OrderLookup, OrderRecord, PaymentRecord, RevenueSummary};

    struct StaticHandler(&'static str);

    #[async_trait::async_trait]
    impl IntentHandler for StaticHandler {
        fn name(&self) -> &'static str {
            "static"
        }

        async fn execute(&self, _sub_question: &str) -> crate::Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct EmptyStore;

    #[async_trait::async_trait]
    impl OrderStore for EmptyStore {
        async fn get_order(&self, _order_id: i64) -> crate::Result<OrderLookup> {
            Ok(OrderLookup::NotFound)
        }

        async fn list_orders(&self) -> crate::Result<Vec<OrderRecord>> {
            Ok(vec![])
        }
    }

    #[async_trait::async_trait]
    impl RevenueStore for EmptyStore {
        async fn revenue_summary(
            &self,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> crate::Result<Vec<RevenueSummary>> {
            Ok(vec![])
        }

        async fn list_payments(&self) -> crate::Result<Vec<PaymentRecord>> {
            Ok(vec![])
        }
    }

    fn test_state(classifier_reply: &str) -> ApiState {
        let handler = || -> Arc<dyn IntentHandler> { Arc::new(StaticHandler("answered")) };
        let registry = HandlerRegistry::new(handler(), handler(), handler(), handler(), handler());
        let classifier = IntentClassifier::new(Arc::new(ScriptedLlm::single(classifier_reply)));

        ApiState {
            dispatcher: Arc::new(Dispatcher::new(classifier, registry)),
            orders: Arc::new(EmptyStore),
            revenue: Arc::new(EmptyStore),
            converter: Arc::new(MockRates::new()),
        }
    }

    #[tokio::test]
    async fn test_ask_returns_answer_and_sources() {
        let state =
            test_state(r#"[{"intent": "DOCS", "sub_question": "What is the refund policy?"}]"#);

        let Json(response) = ask_agent(
            State(state),
            Json(AskRequest {
                question: "What is the refund policy?".to_string(),
            }),
        )
        .await;

        assert_eq!(response.question, "What is the refund policy?");
        assert!(response.answer.contains("answered"));
        assert_eq!(response.available_sources.len(), 5);
        assert_eq!(
            response.available_sources.get("DOCS"),
            Some(&"Knowledge Base (vector search)")
        );
    }

    #[tokio::test]
    async fn test_sources_endpoint_counts_registry() {
        let Json(body) = list_sources().await;
        assert_eq!(body["total"], 5);
        assert_eq!(body["sources"]["EXCHANGE"], "Live Exchange Rates (frankfurter.app)");
    }

    #[tokio::test]
    async fn test_convert_endpoint_reports_missing_rate_in_band() {
        let state = test_state("[]");

        let Json(body) = convert_currency(
            State(state),
            Query(ConvertQuery {
                amount: 10.0,
                from_currency: "EUR".to_string(),
                to_currency: "JPY".to_string(),
            }),
        )
        .await;

        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("Rate not available for EUR to JPY"));
    }

    #[tokio::test]
    async fn test_revenue_endpoint_rejects_bad_dates() {
        let state = test_state("[]");

        let (status, Json(body)) = revenue_summary(
            State(state),
            Query(RevenueQuery {
                start_date: "January 1".to_string(),
                end_date: "2025-01-31".to_string(),
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("YYYY-MM-DD"));
    }
}
