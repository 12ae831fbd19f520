//! LLM reply normalization
//!
//! Models frequently wrap structured replies in a markdown code fence,
//! optionally tagged (```json). This stage strips one outer fence and then
//! attempts a lenient JSON-array parse, returning `None` instead of an error
//! when the reply is unusable.

use crate::models::IntentDescriptor;
use serde_json::Value;

/// Strip one leading/trailing triple-backtick fence, with an optional
/// language tag after the opening backticks. Anything else passes through
/// untouched.
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(rest) = rest.strip_suffix("```") else {
        return trimmed;
    };

    // Drop the language tag: everything on the opening line after ```
    let rest = match rest.find('\n') {
        Some(newline) => {
            let first_line = &rest[..newline];
            if first_line.chars().all(|c| c.is_ascii_alphanumeric()) {
                &rest[newline + 1..]
            } else {
                rest
            }
        }
        None => rest,
    };

    rest.trim()
}

/// Parse a normalized reply as an array of `{intent, sub_question}` objects.
///
/// Elements missing either string field are skipped. Returns `None` when the
/// reply is not a JSON array or yields no usable elements; the caller decides
/// how to degrade.
pub fn parse_intent_array(reply: &str) -> Option<Vec<IntentDescriptor>> {
    let cleaned = strip_code_fence(reply);

    let value: Value = serde_json::from_str(cleaned).ok()?;
    let items = value.as_array()?;

    let descriptors: Vec<IntentDescriptor> = items
        .iter()
        .filter_map(|item| {
            let intent = item.get("intent")?.as_str()?.trim();
            let sub_question = item.get("sub_question")?.as_str()?.trim();
            if intent.is_empty() || sub_question.is_empty() {
                return None;
            }
            Some(IntentDescriptor::new(intent, sub_question))
        })
        .collect();

    if descriptors.is_empty() {
        None
    } else {
        Some(descriptors)
    }
}
