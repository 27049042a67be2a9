//! Workflow domain types for expense approval.
//!
//! This module defines the status enums driven by the engine and the
//! [`Transition`] value the evaluator emits after each decision.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Expense status in the approval workflow.
///
/// The valid transitions are:
/// - Pending → InProgress (workflow initialized)
/// - Pending → Approved (no approvers configured)
/// - InProgress → Approved | Rejected (decision evaluated)
///
/// Approved and Rejected are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseStatus {
    /// Created by the submitter, no approval records yet.
    Pending,
    /// Approval records attached, waiting for decisions.
    InProgress,
    /// Fully approved.
    Approved,
    /// Rejected.
    Rejected,
}

impl ExpenseStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "IN_PROGRESS" => Some(Self::InProgress),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true once no further transition is allowed.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a single approver's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    /// Awaiting the approver.
    Pending,
    /// Approver said yes.
    Approved,
    /// Approver said no.
    Rejected,
}

impl ApprovalStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Action an approver takes on an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Approve the expense at the current step.
    #[serde(alias = "APPROVE")]
    Approved,
    /// Reject the expense.
    #[serde(alias = "REJECT")]
    Rejected,
}

impl Decision {
    /// Record status produced by this decision.
    #[must_use]
    pub fn record_status(self) -> ApprovalStatus {
        match self {
            Self::Approved => ApprovalStatus::Approved,
            Self::Rejected => ApprovalStatus::Rejected,
        }
    }
}

/// The single state change computed for an expense after one decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transition {
    /// Move to the next approval step.
    Advance {
        /// Step being left.
        from: u32,
        /// Step being entered.
        to: u32,
    },
    /// Expense becomes approved.
    Approve,
    /// Expense becomes rejected.
    Reject,
    /// No change; more decisions are needed.
    Await,
}

impl Transition {
    /// Returns the expense status after applying the transition to an in-progress expense.
    #[must_use]
    pub fn resulting_status(&self) -> ExpenseStatus {
        match self {
            Self::Advance { .. } | Self::Await => ExpenseStatus::InProgress,
            Self::Approve => ExpenseStatus::Approved,
            Self::Reject => ExpenseStatus::Rejected,
        }
    }
}
