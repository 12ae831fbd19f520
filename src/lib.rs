//! Multi-Source Knowledge Agent
//!
//! An HTTP agent that:
//! - Classifies a free-form question into one or more typed sub-intents
//! - Extracts structured parameters per intent via an LLM
//! - Dispatches each intent to an independent backend capability
//! - Aggregates the results into one ordered, labeled answer
//!
//! PIPELINE:
//! QUESTION → CLASSIFY → (per intent) EXTRACT → PROVIDER → AGGREGATE → ANSWER

pub mod api;
pub mod classifier;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod llm;
pub mod models;
pub mod normalize;
pub mod providers;

pub use error::Result;

// Re-export common types
pub use classifier::IntentClassifier;
pub use dispatch::Dispatcher;
pub use models::*;
