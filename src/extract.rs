//! Parameter extraction
//!
//! Each intent that needs structured parameters gets them through a
//! delimiter-format LLM contract: the prompt pins the exact reply shape
//! (`START_DATE,END_DATE`, `AMOUNT,FROM,TO`, ...), and a strict pure parser
//! validates the reply before anything reaches a provider. The order id is
//! the exception: it is scanned straight out of the sub-question.

use crate::error::AgentError;
use crate::llm::LanguageModel;
use crate::models::{CurrencyParams, ExchangeParams, RevenueParams};
use chrono::{Days, NaiveDate, Utc};
use std::sync::Arc;
use tracing::debug;

/// Source of "today" for the revenue default window. Injected so the
/// reference date is never a literal baked into a prompt.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Fixed clock for tests and replays.
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// LLM-backed extractor for one intent kind's parameters.
pub struct ParamExtractor {
    llm: Arc<dyn LanguageModel>,
}

impl ParamExtractor {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    pub async fn revenue(&self, sub_question: &str, today: NaiveDate) -> crate::Result<RevenueParams> {
        let default_start = today - Days::new(30);
        let prompt = format!(
            r#"Extract the date range from the question below.

Respond with EXACTLY two dates in the form START_DATE,END_DATE using
YYYY-MM-DD. No other text.

If the question names no explicit dates, default to the last 30 days:
{default_start},{today}

Question:
{sub_question}"#,
        );

        let reply = self.llm.complete(&prompt).await?;
        debug!(reply = %reply, "Revenue extraction reply");
        parse_revenue_reply(&reply)
    }

    pub async fn currency(&self, sub_question: &str) -> crate::Result<CurrencyParams> {
        let prompt = format!(
            r#"Extract the conversion request from the question below.

Respond with EXACTLY: AMOUNT,FROM,TO
- AMOUNT: a plain number
- FROM, TO: 3-letter currency codes
No other text. Example: 100,USD,EUR

Question:
{sub_question}"#,
        );

        let reply = self.llm.complete(&prompt).await?;
        debug!(reply = %reply, "Currency extraction reply");
        parse_currency_reply(&reply)
    }

    pub async fn exchange(&self, sub_question: &str) -> crate::Result<ExchangeParams> {
        let prompt = format!(
            r#"Extract the two currencies from the question below.

Respond with EXACTLY: FROM,TO
- FROM, TO: 3-letter currency codes
No other text. Example: USD,JPY

Question:
{sub_question}"#,
        );

        let reply = self.llm.complete(&prompt).await?;
        debug!(reply = %reply, "Exchange extraction reply");
        parse_exchange_reply(&reply)
    }
}

/// First maximal run of decimal digits anywhere in the text. First match
/// wins when several numbers are present.
pub fn first_digit_run(text: &str) -> Option<u64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let run: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    run.parse().ok()
}

pub fn parse_revenue_reply(reply: &str) -> crate::Result<RevenueParams> {
    let fields = split_fields(reply, 2)?;

    let start_date = parse_iso_date(&fields[0])?;
    let end_date = parse_iso_date(&fields[1])?;

    Ok(RevenueParams {
        start_date,
        end_date,
    })
}

pub fn parse_currency_reply(reply: &str) -> crate::Result<CurrencyParams> {
    let fields = split_fields(reply, 3)?;

    let amount: f64 = fields[0].parse().map_err(|_| {
        AgentError::ExtractionError(format!("invalid amount: {:?}", fields[0]))
    })?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(AgentError::ExtractionError(format!(
            "amount must be non-negative, got {}",
            amount
        )));
    }

    Ok(CurrencyParams {
        amount,
        from_currency: parse_currency_code(&fields[1])?,
        to_currency: parse_currency_code(&fields[2])?,
    })
}

pub fn parse_exchange_reply(reply: &str) -> crate::Result<ExchangeParams> {
    let fields = split_fields(reply, 2)?;

    Ok(ExchangeParams {
        from_currency: parse_currency_code(&fields[0])?,
        to_currency: parse_currency_code(&fields[1])?,
    })
}

fn split_fields(reply: &str, expected: usize) -> crate::Result<Vec<String>> {
    let fields: Vec<String> = reply
        .trim()
        .split(',')
        .map(|f| f.trim().to_string())
        .collect();

    if fields.len() != expected {
        return Err(AgentError::ExtractionError(format!(
            "expected {} comma-separated fields, got {} in {:?}",
            expected,
            fields.len(),
            reply.trim()
        )));
    }

    Ok(fields)
}

fn parse_iso_date(field: &str) -> crate::Result<NaiveDate> {
    NaiveDate::parse_from_str(field, "%Y-%m-%d")
        .map_err(|_| AgentError::ExtractionError(format!("invalid date: {:?}", field)))
}

fn parse_currency_code(field: &str) -> crate::Result<String> {
    if field.len() == 3 && field.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(field.to_uppercase())
    } else {
        Err(AgentError::ExtractionError(format!(
            "invalid currency code: {:?}",
            field
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedLlm;

    #[test]
    fn test_first_digit_run() {
        assert_eq!(first_digit_run("order 42 status"), Some(42));
        assert_eq!(first_digit_run("What is the status of order 1?"), Some(1));
        assert_eq!(first_digit_run("42"), Some(42));
        assert_eq!(first_digit_run("What is my order status?"), None);
        assert_eq!(first_digit_run(""), None);
    }

    #[test]
    fn test_first_digit_run_first_match_wins() {
        // "order 3 or order 7" is ambiguous; the scanner is pinned to the
        // first maximal run.
        assert_eq!(first_digit_run("order 3 or order 7"), Some(3));
        assert_eq!(first_digit_run("ids 1234 and 99"), Some(1234));
    }

    #[test]
    fn test_parse_revenue_reply() {
        let params = parse_revenue_reply("2025-01-01,2025-01-31").unwrap();
        assert_eq!(params.start_date.to_string(), "2025-01-01");
        assert_eq!(params.end_date.to_string(), "2025-01-31");

        // Whitespace around fields is tolerated
        assert!(parse_revenue_reply(" 2025-01-01 , 2025-01-31 ").is_ok());
    }

    #[test]
    fn test_parse_revenue_reply_rejects_bad_input() {
        assert!(parse_revenue_reply("2025-01-01").is_err());
        assert!(parse_revenue_reply("2025-01-01,2025-01-31,extra").is_err());
        assert!(parse_revenue_reply("January 1,January 31").is_err());
        assert!(parse_revenue_reply("2025-13-01,2025-01-31").is_err());
    }

    #[test]
    fn test_parse_currency_reply() {
        let params = parse_currency_reply("100,USD,EUR").unwrap();
        assert_eq!(params.amount, 100.0);
        assert_eq!(params.from_currency, "USD");
        assert_eq!(params.to_currency, "EUR");
    }

    #[test]
    fn test_parse_currency_reply_uppercases_codes() {
        let params = parse_currency_reply("12.5,usd,bdt").unwrap();
        assert_eq!(params.from_currency, "USD");
        assert_eq!(params.to_currency, "BDT");
    }

    #[test]
    fn test_parse_currency_reply_rejects_bad_input() {
        assert!(parse_currency_reply("100,USD").is_err());
        assert!(parse_currency_reply("lots,USD,EUR").is_err());
        assert!(parse_currency_reply("-5,USD,EUR").is_err());
        assert!(parse_currency_reply("NaN,USD,EUR").is_err());
        assert!(parse_currency_reply("100,DOLLARS,EUR").is_err());
        assert!(parse_currency_reply("100,US,EUR").is_err());
    }

    #[test]
    fn test_parse_exchange_reply() {
        let params = parse_exchange_reply("usd,jpy").unwrap();
        assert_eq!(params.from_currency, "USD");
        assert_eq!(params.to_currency, "JPY");

        assert!(parse_exchange_reply("USD").is_err());
        assert!(parse_exchange_reply("USD,JPY,EUR").is_err());
    }

    #[test]
    fn test_revenue_prompt_carries_injected_window() {
        let llm = Arc::new(ScriptedLlm::single("2025-05-02,2025-06-01"));
        let extractor = ParamExtractor::new(llm);
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        let params =
            tokio_test::block_on(extractor.revenue("revenue for the last month", today)).unwrap();
        assert_eq!(params.end_date, today);
        assert_eq!(params.start_date, today - Days::new(30));
    }

    #[tokio::test]
    async fn test_currency_extraction_end_to_end() {
        let llm = Arc::new(ScriptedLlm::single("100,USD,EUR"));
        let extractor = ParamExtractor::new(llm);

        let params = extractor.currency("Convert 100 USD to EUR").await.unwrap();
        assert_eq!(params.amount, 100.0);
        assert_eq!(params.from_currency, "USD");
        assert_eq!(params.to_currency, "EUR");
    }

    #[tokio::test]
    async fn test_extraction_failure_is_an_error_value() {
        let llm = Arc::new(ScriptedLlm::single("I cannot find any dates here"));
        let extractor = ParamExtractor::new(llm);
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        let result = extractor.revenue("revenue please", today).await;
        assert!(matches!(result, Err(AgentError::ExtractionError(_))));
    }

    #[test]
    fn test_fixed_clock() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        assert_eq!(FixedClock(date).today(), date);
    }
}
