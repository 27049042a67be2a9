//! Storage layer for the approval workflow.
//!
//! This crate provides:
//! - The [`ExpenseStore`] persistence contract
//! - An in-memory store backed by `DashMap`
//! - The [`WorkflowRepository`], which serializes operations per expense

pub mod repositories;

pub use repositories::{ExpenseStore, InMemoryStore, StoreError, WorkflowRepository};
