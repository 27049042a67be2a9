//! Dashboard data types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Expense statistics for one viewer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseStats {
    /// Number of expenses visible to the viewer.
    pub total_expenses: usize,
    /// Expenses not yet submitted into a workflow.
    pub pending_expenses: usize,
    /// Expenses waiting for approvals.
    pub in_progress_expenses: usize,
    /// Approved expenses.
    pub approved_expenses: usize,
    /// Rejected expenses.
    pub rejected_expenses: usize,
    /// Sum of amounts in company currency.
    pub total_amount: Decimal,
    /// Approval records waiting on the viewer.
    pub pending_approvals: usize,
}
