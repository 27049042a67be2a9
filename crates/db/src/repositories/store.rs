//! Persistence contract for the workflow.

use async_trait::async_trait;
use thiserror::Error;

use outlay_core::workflow::{
    ApprovalRecord, ApprovalRule, Approver, CompanyPolicy, Expense, WorkflowError,
};
use outlay_shared::types::{CompanyId, ExpenseId, UserId};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write referenced a row that does not exist.
    #[error("Missing row: {0}")]
    Missing(String),

    /// A write would overwrite existing state.
    #[error("Conflicting write: {0}")]
    Conflict(String),

    /// Backend failure.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}

/// Storage operations the workflow needs.
///
/// Each save method writes all of its arguments as one atomic unit.
#[async_trait]
pub trait ExpenseStore: Send + Sync {
    /// Loads an expense.
    async fn get_expense(&self, id: ExpenseId) -> StoreResult<Option<Expense>>;

    /// Inserts a new expense.
    async fn insert_expense(&self, expense: Expense) -> StoreResult<()>;

    /// All expenses of a company, in no particular order.
    async fn list_expenses(&self, company_id: CompanyId) -> StoreResult<Vec<Expense>>;

    /// All approval records of an expense.
    async fn list_approval_records(&self, expense_id: ExpenseId) -> StoreResult<Vec<ApprovalRecord>>;

    /// All approval records assigned to a user.
    async fn list_records_for_approver(&self, approver_id: UserId)
    -> StoreResult<Vec<ApprovalRecord>>;

    /// All approval records on a company's expenses.
    async fn list_company_records(&self, company_id: CompanyId)
    -> StoreResult<Vec<ApprovalRecord>>;

    /// Loads company approval settings.
    async fn get_company(&self, id: CompanyId) -> StoreResult<Option<CompanyPolicy>>;

    /// Company rules in configured order.
    async fn list_approval_rules(&self, company_id: CompanyId) -> StoreResult<Vec<ApprovalRule>>;

    /// Eligible approvers ordered by ascending level.
    async fn list_eligible_approvers(&self, company_id: CompanyId) -> StoreResult<Vec<Approver>>;

    /// Loads a user.
    async fn get_user(&self, id: UserId) -> StoreResult<Option<Approver>>;

    /// Writes an initialized expense together with its new records.
    async fn save_initialization(
        &self,
        expense: Expense,
        records: Vec<ApprovalRecord>,
    ) -> StoreResult<()>;

    /// Writes an evaluated expense together with the decided record.
    async fn save_decision(&self, expense: Expense, record: ApprovalRecord) -> StoreResult<()>;
}
