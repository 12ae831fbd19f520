//! Intent classifier
//!
//! Splits a raw question into an ordered list of (intent tag, sub-question)
//! pairs with a single LLM call. Classification fails soft: any unusable
//! reply degrades to one DOCS intent wrapping the entire question, so the
//! caller always receives a non-empty list and never an error.

use crate::llm::LanguageModel;
use crate::models::IntentDescriptor;
use crate::normalize;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct IntentClassifier {
    llm: Arc<dyn LanguageModel>,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Classify a question into one or more sub-intents, in question order.
    ///
    /// Never returns an empty list.
    pub async fn classify(&self, question: &str) -> Vec<IntentDescriptor> {
        let prompt = build_classification_prompt(question);

        let reply = match self.llm.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Classification call failed, degrading to DOCS: {}", e);
                return vec![IntentDescriptor::docs_fallback(question)];
            }
        };

        match normalize::parse_intent_array(&reply) {
            Some(descriptors) => {
                debug!(count = descriptors.len(), "Classified intents");
                descriptors
            }
            None => {
                warn!("Unusable classifier reply, degrading to DOCS: {}", reply);
                vec![IntentDescriptor::docs_fallback(question)]
            }
        }
    }
}

fn build_classification_prompt(question: &str) -> String {
    format!(
        r#"You are a router for a multi-source knowledge agent.

Split the user's question into one or more sub-questions and classify each
into exactly ONE category:
- ORDER: status, amount, or payment of a specific order
- REVENUE: revenue totals or payment summaries over a date range
- CURRENCY: converting an amount from one currency to another
- EXCHANGE: the exchange rate between two currencies
- DOCS: policies, shipping, returns, FAQ, anything else

Keep the sub-questions in the order they appear in the user's question.

Respond with ONLY a JSON array, no explanation:
[{{"intent": "ORDER", "sub_question": "..."}}]

Question:
{}"#,
        question
    )
}
