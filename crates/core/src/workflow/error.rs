//! Workflow error types for expense approval.
//!
//! Every variant is raised before any write, so a failed operation leaves
//! the expense and its records untouched.

use outlay_shared::AppError;
use outlay_shared::types::{ApprovalRecordId, CompanyId, ExpenseId, UserId};
use thiserror::Error;

use crate::workflow::types::ExpenseStatus;

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Expense does not exist.
    #[error("Expense {0} not found")]
    ExpenseNotFound(ExpenseId),

    /// Company does not exist.
    #[error("Company {0} not found")]
    CompanyNotFound(CompanyId),

    /// User does not exist.
    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// The user holds no approval record for this expense.
    #[error("User {user_id} is not an approver of expense {expense_id}")]
    Unauthorized {
        /// The acting user.
        user_id: UserId,
        /// The expense being decided.
        expense_id: ExpenseId,
    },

    /// The user's pending record belongs to a different step.
    #[error("User {user_id} approves at step {step}, expense is at step {current_step}")]
    NotCurrentStep {
        /// The acting user.
        user_id: UserId,
        /// The step the user's pending record is assigned to.
        step: u32,
        /// The expense's current step.
        current_step: u32,
    },

    /// Expense already reached a terminal status.
    #[error("Expense {expense_id} is already {status}")]
    ExpenseAlreadyFinalized {
        /// The expense.
        expense_id: ExpenseId,
        /// Its terminal status.
        status: ExpenseStatus,
    },

    /// The approval record was already decided.
    #[error("Approval {0} has already been decided")]
    ApprovalAlreadyDecided(ApprovalRecordId),

    /// The workflow was already initialized for this expense.
    #[error("Approval workflow already initialized for expense {0}")]
    DoubleInitialization(ExpenseId),

    /// Attempted an invalid status transition.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: ExpenseStatus,
        /// The attempted target status.
        to: ExpenseStatus,
    },

    /// Input failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage backend error.
    #[error("Storage error: {0}")]
    Store(String),
}

impl WorkflowError {
    /// Returns true for the "already processed" family of errors.
    #[must_use]
    pub fn is_already_processed(&self) -> bool {
        matches!(
            self,
            Self::ExpenseAlreadyFinalized { .. } | Self::ApprovalAlreadyDecided(_)
        )
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidTransition { .. } | Self::Validation(_) => 400,

            Self::Unauthorized { .. } | Self::NotCurrentStep { .. } => 403,

            Self::ExpenseNotFound(_) | Self::CompanyNotFound(_) | Self::UserNotFound(_) => 404,

            Self::ExpenseAlreadyFinalized { .. }
            | Self::ApprovalAlreadyDecided(_)
            | Self::DoubleInitialization(_) => 409,

            Self::Store(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ExpenseNotFound(_) => "EXPENSE_NOT_FOUND",
            Self::CompanyNotFound(_) => "COMPANY_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::Unauthorized { .. } => "UNAUTHORIZED_APPROVER",
            Self::NotCurrentStep { .. } => "NOT_CURRENT_STEP",
            Self::ExpenseAlreadyFinalized { .. } | Self::ApprovalAlreadyDecided(_) => {
                "ALREADY_PROCESSED"
            }
            Self::DoubleInitialization(_) => "DOUBLE_INITIALIZATION",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Store(_) => "STORAGE_ERROR",
        }
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        let message = err.to_string();
        match err {
            WorkflowError::ExpenseNotFound(_)
            | WorkflowError::CompanyNotFound(_)
            | WorkflowError::UserNotFound(_) => Self::NotFound(message),
            WorkflowError::Unauthorized { .. } | WorkflowError::NotCurrentStep { .. } => {
                Self::Forbidden(message)
            }
            WorkflowError::ExpenseAlreadyFinalized { .. }
            | WorkflowError::ApprovalAlreadyDecided(_)
            | WorkflowError::DoubleInitialization(_) => Self::Conflict(message),
            WorkflowError::InvalidTransition { .. } | WorkflowError::Validation(_) => {
                Self::Validation(message)
            }
            WorkflowError::Store(_) => Self::Storage(message),
        }
    }
}
