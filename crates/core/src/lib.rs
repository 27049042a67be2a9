//! Core business logic for Outlay.
//!
//! This crate contains the approval workflow engine with ZERO web or database
//! dependencies. Persistence is supplied by callers; the only outbound I/O is
//! the exchange rate lookup behind the [`currency::RateSource`] trait.
//!
//! # Modules
//!
//! - `currency` - Exchange rate sources and fail-open conversion
//! - `workflow` - Expense/approval entities, policies, initializer and evaluator
//! - `dashboard` - Expense statistics for dashboards

pub mod currency;
pub mod dashboard;
pub mod workflow;
