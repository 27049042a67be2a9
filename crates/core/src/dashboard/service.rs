//! Dashboard aggregation.

use chrono::{DateTime, Utc};

use crate::dashboard::types::ExpenseStats;
use crate::workflow::approver::{Approver, Role};
use crate::workflow::expense::Expense;
use crate::workflow::types::ExpenseStatus;

/// Stateless dashboard service.
pub struct DashboardService;

impl DashboardService {
    /// Summarizes the expenses a viewer may see.
    ///
    /// Employees only count their own expenses; managers and admins see the
    /// whole company. Expenses created before `since` are skipped. The
    /// pending approval count is only reported for approvers.
    #[must_use]
    pub fn summarize(
        expenses: &[Expense],
        viewer: &Approver,
        pending_approvals: usize,
        since: Option<DateTime<Utc>>,
    ) -> ExpenseStats {
        let visible = expenses
            .iter()
            .filter(|e| e.company_id == viewer.company_id)
            .filter(|e| viewer.role != Role::Employee || e.user_id == viewer.user_id)
            .filter(|e| since.is_none_or(|since| e.created_at >= since));

        let mut stats = visible.fold(ExpenseStats::default(), |mut stats, expense| {
            stats.total_expenses += 1;
            stats.total_amount += expense.amount;
            match expense.status {
                ExpenseStatus::Pending => stats.pending_expenses += 1,
                ExpenseStatus::InProgress => stats.in_progress_expenses += 1,
                ExpenseStatus::Approved => stats.approved_expenses += 1,
                ExpenseStatus::Rejected => stats.rejected_expenses += 1,
            }
            stats
        });

        if viewer.is_approver {
            stats.pending_approvals = pending_approvals;
        }
        stats
    }
}
