//! Context engine for a personal CRM assistant.
//!
//! A message goes through analysis, cached multi-source context loading,
//! compaction, profile and behaviour aggregation, rule-based predictions and
//! finally automatic creation of the contacts, tasks and projects it names.
//! [`ContextEngine::handle`] runs the whole pipeline.

pub mod database;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use services::ContextEngine;
