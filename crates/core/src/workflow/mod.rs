//! Expense approval workflow.
//!
//! This module implements the expense lifecycle state machine, approval
//! rule selection and the per-decision evaluator.
//!
//! # Modules
//!
//! - `types` - Workflow domain types (ExpenseStatus, Decision, Transition)
//! - `error` - Workflow-specific error types
//! - `expense` - Expense and approval record entities
//! - `approver` - Approver eligibility and ordering
//! - `rule` - Approval rules and rule selection
//! - `policy` - Policy resolution from rules and company settings
//! - `initializer` - Approval record layout on submission
//! - `evaluator` - Decision evaluation

pub mod approver;
pub mod error;
pub mod evaluator;
pub mod expense;
pub mod initializer;
pub mod policy;
pub mod rule;
pub mod types;

#[cfg(test)]
mod evaluator_props;

pub use approver::{Approver, Role, eligible_approvers};
pub use error::WorkflowError;
pub use evaluator::{DecisionEvaluator, Evaluation, WorkflowSnapshot};
pub use expense::{ApprovalRecord, Expense, NewExpense};
pub use initializer::{InitPlan, StepLayout, WorkflowInitializer};
pub use policy::{Policy, PolicyOptions, RuleMisconfiguration};
pub use rule::{ApprovalRule, ApproverStep, CompanyPolicy, RuleSelector, RuleType};
pub use types::{ApprovalStatus, Decision, ExpenseStatus, Transition};
