pub mod action_executor;
pub mod behavior_analyzer;
pub mod cache;
pub mod context_compactor;
pub mod context_loader;
pub mod engine;
pub mod entity_extractor;
pub mod history;
pub mod message_analyzer;
pub mod predictive_engine;
pub mod profile_builder;

pub use engine::ContextEngine;
