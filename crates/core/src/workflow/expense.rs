//! Expense and approval record entities.
//!
//! Both are plain data holders; the only behaviour here is guarding the
//! invariants the engine relies on:
//! - an expense in a terminal status never changes again
//! - `current_step` only moves forward and stays within `total_steps`
//! - an approval record is decided at most once

use chrono::{DateTime, Utc};
use outlay_shared::types::{
    ApprovalRecordId, CategoryId, CompanyId, CurrencyCode, ExpenseId, UserId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::workflow::error::WorkflowError;
use crate::workflow::types::{ApprovalStatus, Decision, ExpenseStatus, Transition};

/// Input for creating an expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpense {
    /// Owning company.
    pub company_id: CompanyId,
    /// Submitting employee.
    pub user_id: UserId,
    /// Optional category, used for rule selection.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// Free-text description.
    pub description: String,
    /// Amount in company currency.
    pub amount: Decimal,
    /// Amount as spent, when paid in a foreign currency.
    #[serde(default)]
    pub original_amount: Option<Decimal>,
    /// Currency the expense was paid in.
    #[serde(default)]
    pub original_currency: Option<CurrencyCode>,
}

impl NewExpense {
    /// Validates amounts and description.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.description.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "description must not be empty".to_string(),
            ));
        }
        if self.amount <= Decimal::ZERO {
            return Err(WorkflowError::Validation(
                "amount must be positive".to_string(),
            ));
        }
        if let Some(original) = self.original_amount
            && original <= Decimal::ZERO
        {
            return Err(WorkflowError::Validation(
                "original amount must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// An expense moving through the approval workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    /// Unique identifier.
    pub id: ExpenseId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Submitting employee.
    pub user_id: UserId,
    /// Optional category.
    pub category_id: Option<CategoryId>,
    /// Free-text description.
    pub description: String,
    /// Amount in company currency.
    pub amount: Decimal,
    /// Amount as spent in the original currency.
    pub original_amount: Option<Decimal>,
    /// Currency the expense was paid in.
    pub original_currency: Option<CurrencyCode>,
    /// Effective rate `amount / original_amount`, when converted.
    pub exchange_rate: Option<Decimal>,
    /// Workflow status.
    pub status: ExpenseStatus,
    /// 1-based step currently awaiting decisions.
    pub current_step: u32,
    /// Number of steps in the workflow.
    pub total_steps: u32,
    /// When the workflow was initialized.
    pub submitted_at: Option<DateTime<Utc>>,
    /// Set once approval records exist; the submitter can no longer edit.
    pub is_readonly: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Expense {
    /// Creates a pending expense with a placeholder single-step workflow.
    #[must_use]
    pub fn new(input: NewExpense, now: DateTime<Utc>) -> Self {
        Self {
            id: ExpenseId::new(),
            company_id: input.company_id,
            user_id: input.user_id,
            category_id: input.category_id,
            description: input.description,
            amount: input.amount,
            original_amount: input.original_amount,
            original_currency: input.original_currency,
            exchange_rate: None,
            status: ExpenseStatus::Pending,
            current_step: 1,
            total_steps: 1,
            submitted_at: None,
            is_readonly: false,
            created_at: now,
        }
    }

    /// Fails if the expense has reached a terminal status.
    pub fn ensure_open(&self) -> Result<(), WorkflowError> {
        if self.status.is_terminal() {
            return Err(WorkflowError::ExpenseAlreadyFinalized {
                expense_id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }

    /// Applies an evaluator transition to an in-progress expense.
    pub fn apply(&mut self, transition: Transition) -> Result<(), WorkflowError> {
        self.ensure_open()?;
        if self.status != ExpenseStatus::InProgress {
            return Err(WorkflowError::InvalidTransition {
                from: self.status,
                to: transition.resulting_status(),
            });
        }

        match transition {
            Transition::Advance { from, to } => {
                if from != self.current_step || to <= from || to > self.total_steps {
                    return Err(WorkflowError::InvalidTransition {
                        from: self.status,
                        to: ExpenseStatus::InProgress,
                    });
                }
                self.current_step = to;
            }
            Transition::Approve => self.status = ExpenseStatus::Approved,
            Transition::Reject => self.status = ExpenseStatus::Rejected,
            Transition::Await => {}
        }
        Ok(())
    }
}

/// One approver's assignment on one expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    /// Unique identifier.
    pub id: ApprovalRecordId,
    /// Expense being approved.
    pub expense_id: ExpenseId,
    /// Assigned approver.
    pub approver_id: UserId,
    /// 1-based step the approver acts at.
    pub step: u32,
    /// Decision status.
    pub status: ApprovalStatus,
    /// Approver's comments.
    pub comments: Option<String>,
    /// When the decision was made.
    pub decided_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl ApprovalRecord {
    /// Creates a pending record.
    #[must_use]
    pub fn pending(
        expense_id: ExpenseId,
        approver_id: UserId,
        step: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ApprovalRecordId::new(),
            expense_id,
            approver_id,
            step,
            status: ApprovalStatus::Pending,
            comments: None,
            decided_at: None,
            created_at: now,
        }
    }

    /// Returns true while the approver has not decided.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == ApprovalStatus::Pending
    }

    /// Records the approver's decision. A record can only be decided once.
    pub fn decide(
        &mut self,
        decision: Decision,
        comments: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        if !self.is_pending() {
            return Err(WorkflowError::ApprovalAlreadyDecided(self.id));
        }
        self.status = decision.record_status();
        self.comments = comments;
        self.decided_at = Some(now);
        Ok(())
    }
}
