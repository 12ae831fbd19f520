//! Dispatch and aggregation
//!
//! Fans a classified intent list out to its handlers, one tokio task per
//! intent, and renders the collected outcomes in the original descriptor
//! order. A failing or panicking handler costs its own slot only; the
//! aggregated response is always produced.

use crate::classifier::IntentClassifier;
use crate::handlers::HandlerRegistry;
use crate::models::{HandlerOutcome, IntentDescriptor, IntentTag};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

pub struct Dispatcher {
    classifier: IntentClassifier,
    registry: Arc<HandlerRegistry>,
}

impl Dispatcher {
    pub fn new(classifier: IntentClassifier, registry: HandlerRegistry) -> Self {
        Self {
            classifier,
            registry: Arc::new(registry),
        }
    }

    /// Answer a raw question: classify, dispatch, aggregate.
    pub async fn answer(&self, question: &str) -> String {
        let mut intents = self.classifier.classify(question).await;
        info!(count = intents.len(), "Dispatching classified intents");

        if intents.len() == 1 {
            let outcome = run_handler(&self.registry, 1, intents.remove(0)).await;
            return render_single(&outcome);
        }

        let mut tasks = Vec::with_capacity(intents.len());
        for (i, descriptor) in intents.into_iter().enumerate() {
            let index = i + 1;
            let raw_tag = descriptor.tag.clone();
            let source_label = IntentTag::resolve(&descriptor.tag)
                .source_label()
                .to_string();
            let registry = Arc::clone(&self.registry);

            let handle =
                tokio::spawn(async move { run_handler(&registry, index, descriptor).await });
            tasks.push((index, raw_tag, source_label, handle));
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        for (index, tag, source_label, handle) in tasks {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                // Last-resort safety net: a panicked handler task still
                // yields an outcome for its slot.
                Err(join_error) => {
                    error!(index, "Handler task aborted: {}", join_error);
                    HandlerOutcome {
                        index,
                        tag,
                        source_label,
                        text: format!("Error: {}", join_error),
                        failed: true,
                    }
                }
            };
            outcomes.push(outcome);
        }

        // Render strictly in descriptor order, never completion order.
        outcomes.sort_by_key(|o| o.index);
        render_blocks(&outcomes)
    }
}

async fn run_handler(
    registry: &HandlerRegistry,
    index: usize,
    descriptor: IntentDescriptor,
) -> HandlerOutcome {
    let (resolved, handler) = registry.resolve(&descriptor.tag);
    let source_label = resolved.source_label().to_string();

    info!(index, tag = %descriptor.tag, handler = handler.name(), "Running intent handler");

    match handler.execute(&descriptor.sub_question).await {
        Ok(text) => HandlerOutcome {
            index,
            tag: descriptor.tag,
            source_label,
            text,
            failed: false,
        },
        Err(e) => {
            warn!(index, tag = %descriptor.tag, "Handler failed: {}", e);
            HandlerOutcome {
                index,
                tag: descriptor.tag,
                source_label,
                text: format!("Error: {}", e),
                failed: true,
            }
        }
    }
}

/// Render a single-intent response: source line, no index markers.
pub fn render_single(outcome: &HandlerOutcome) -> String {
    format!("[Source: {}]\n\n{}", outcome.source_label, outcome.text)
}

/// Render a multi-intent response: one labeled block per outcome, joined in
/// index order. Pure function of the outcome list.
pub fn render_blocks(outcomes: &[HandlerOutcome]) -> String {
    outcomes
        .iter()
        .map(|o| {
            format!(
                "**[{}] {}**\n[Source: {}]\n{}",
                o.index, o.tag, o.source_label, o.text
            )
        })
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::handlers::IntentHandler;
    use crate::llm::testing::ScriptedLlm;
    use std::time::Duration;

    struct EchoHandler {
        reply: &'static str,
        delay_ms: u64,
    }

    #[async_trait::async_trait]
    impl IntentHandler for EchoHandler {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn execute(&self, sub_question: &str) -> crate::Result<String> {
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            Ok(format!("{}: {}", self.reply, sub_question))
        }
    }

    struct FailingHandler;

    #[async_trait::async_trait]
    impl IntentHandler for FailingHandler {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn execute(&self, _sub_question: &str) -> crate::Result<String> {
            Err(AgentError::ProviderError("backend unavailable".to_string()))
        }
    }

    fn registry(
        order: Arc<dyn IntentHandler>,
        revenue: Arc<dyn IntentHandler>,
        docs: Arc<dyn IntentHandler>,
    ) -> HandlerRegistry {
        HandlerRegistry::new(
            order,
            revenue,
            Arc::new(EchoHandler {
                reply: "currency",
                delay_ms: 0,
            }),
            Arc::new(EchoHandler {
                reply: "exchange",
                delay_ms: 0,
            }),
            docs,
        )
    }

    fn dispatcher_with(classifier_reply: &str, registry: HandlerRegistry) -> Dispatcher {
        let classifier = IntentClassifier::new(Arc::new(ScriptedLlm::single(classifier_reply)));
        Dispatcher::new(classifier, registry)
    }

    fn outcome(index: usize, tag: &str, text: &str) -> HandlerOutcome {
        HandlerOutcome {
            index,
            tag: tag.to_string(),
            source_label: IntentTag::resolve(tag).source_label().to_string(),
            text: text.to_string(),
            failed: false,
        }
    }

    #[test]
    fn test_render_single_has_no_index_markers() {
        let rendered = render_single(&outcome(1, "ORDER", "Order #1 details: status paid"));

        assert_eq!(rendered.matches("[Source:").count(), 1);
        assert!(!rendered.contains("**["));
        assert!(rendered.starts_with("[Source: Orders Database (PostgreSQL)]\n\n"));
    }

    #[test]
    fn test_render_blocks_numbered_in_order() {
        let outcomes = vec![
            outcome(1, "ORDER", "a"),
            outcome(2, "REVENUE", "b"),
            outcome(3, "DOCS", "c"),
        ];
        let rendered = render_blocks(&outcomes);

        assert_eq!(rendered.matches("**[").count(), 3);
        assert_eq!(rendered.matches(BLOCK_SEPARATOR).count(), 2);
        let first = rendered.find("**[1] ORDER**").unwrap();
        let second = rendered.find("**[2] REVENUE**").unwrap();
        let third = rendered.find("**[3] DOCS**").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let outcomes = vec![outcome(1, "ORDER", "a"), outcome(2, "DOCS", "b")];

        assert_eq!(render_blocks(&outcomes), render_blocks(&outcomes));
        assert_eq!(
            render_single(&outcomes[0]),
            render_single(&outcomes[0])
        );
    }

    #[tokio::test]
    async fn test_single_intent_response_shape() {
        let registry = registry(
            Arc::new(EchoHandler {
                reply: "order",
                delay_ms: 0,
            }),
            Arc::new(EchoHandler {
                reply: "revenue",
                delay_ms: 0,
            }),
            Arc::new(EchoHandler {
                reply: "docs",
                delay_ms: 0,
            }),
        );
        let dispatcher = dispatcher_with(
            r#"[{"intent": "ORDER", "sub_question": "What is the status of order 1?"}]"#,
            registry,
        );

        let answer = dispatcher.answer("What is the status of order 1?").await;
        assert_eq!(answer.matches("[Source:").count(), 1);
        assert!(!answer.contains("**["));
        assert!(answer.contains("order: What is the status of order 1?"));
    }

    #[tokio::test]
    async fn test_multi_intent_order_survives_slow_first_handler() {
        // The first intent sleeps; the block order must still follow the
        // descriptor order, not completion order.
        let registry = registry(
            Arc::new(EchoHandler {
                reply: "order",
                delay_ms: 50,
            }),
            Arc::new(EchoHandler {
                reply: "revenue",
                delay_ms: 0,
            }),
            Arc::new(EchoHandler {
                reply: "docs",
                delay_ms: 0,
            }),
        );
        let dispatcher = dispatcher_with(
            r#"[{"intent": "ORDER", "sub_question": "order 3 status"},
                {"intent": "REVENUE", "sub_question": "revenue for January"},
                {"intent": "DOCS", "sub_question": "shipping policy"}]"#,
            registry,
        );

        let answer = dispatcher
            .answer("Show me order 3 status, revenue for January, and shipping policy")
            .await;

        let blocks: Vec<&str> = answer.split(BLOCK_SEPARATOR).collect();
        assert_eq!(blocks.len(), 3);
        assert!(blocks[0].starts_with("**[1] ORDER**"));
        assert!(blocks[1].starts_with("**[2] REVENUE**"));
        assert!(blocks[2].starts_with("**[3] DOCS**"));
        assert!(blocks[0].contains("order: order 3 status"));
    }

    #[tokio::test]
    async fn test_failed_intent_is_isolated() {
        let registry = registry(
            Arc::new(FailingHandler),
            Arc::new(EchoHandler {
                reply: "revenue",
                delay_ms: 0,
            }),
            Arc::new(EchoHandler {
                reply: "docs",
                delay_ms: 0,
            }),
        );
        let dispatcher = dispatcher_with(
            r#"[{"intent": "ORDER", "sub_question": "order 1"},
                {"intent": "DOCS", "sub_question": "return policy"}]"#,
            registry,
        );

        let answer = dispatcher.answer("order 1 and return policy").await;

        let blocks: Vec<&str> = answer.split(BLOCK_SEPARATOR).collect();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].contains("Error: Provider error: backend unavailable"));
        assert!(blocks[1].contains("docs: return policy"));
    }

    #[tokio::test]
    async fn test_unknown_tag_rendered_raw_but_dispatched_to_docs() {
        let registry = registry(
            Arc::new(EchoHandler {
                reply: "order",
                delay_ms: 0,
            }),
            Arc::new(EchoHandler {
                reply: "revenue",
                delay_ms: 0,
            }),
            Arc::new(EchoHandler {
                reply: "docs",
                delay_ms: 0,
            }),
        );
        let dispatcher = dispatcher_with(
            r#"[{"intent": "PAYMENTS", "sub_question": "refund status"},
                {"intent": "ORDER", "sub_question": "order 5"}]"#,
            registry,
        );

        let answer = dispatcher.answer("refund status and order 5").await;

        // Raw tag kept for display, DOCS handler + label used underneath.
        assert!(answer.contains("**[1] PAYMENTS**"));
        assert!(answer.contains("[Source: Knowledge Base (vector search)]"));
        assert!(answer.contains("docs: refund status"));
    }

    #[tokio::test]
    async fn test_malformed_classification_end_to_end() {
        let registry = registry(
            Arc::new(EchoHandler {
                reply: "order",
                delay_ms: 0,
            }),
            Arc::new(EchoHandler {
                reply: "revenue",
                delay_ms: 0,
            }),
            Arc::new(EchoHandler {
                reply: "docs",
                delay_ms: 0,
            }),
        );
        let dispatcher = dispatcher_with("definitely not JSON", registry);

        let answer = dispatcher.answer("Tell me about shipping").await;

        // Whole question degraded to a single DOCS intent.
        assert_eq!(answer.matches("[Source:").count(), 1);
        assert!(!answer.contains("**["));
        assert!(answer.contains("docs: Tell me about shipping"));
    }
}
