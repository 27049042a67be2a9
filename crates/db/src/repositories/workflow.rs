//! Workflow repository for expense approval.
//!
//! Loads snapshots from the store, runs the core initializer and evaluator,
//! and writes their output back. Operations on the same expense are
//! serialized with an async mutex held from the snapshot read to the write,
//! so no two transitions are ever computed from the same snapshot.
//! Exchange rate lookups happen before the lock is taken.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use outlay_core::currency::{Conversion, CurrencyConverter};
use outlay_core::dashboard::{DashboardService, ExpenseStats};
use outlay_core::workflow::{
    ApprovalRecord, CompanyPolicy, Decision, DecisionEvaluator, Evaluation, Expense,
    ExpenseStatus, InitPlan, NewExpense, Policy, PolicyOptions, RuleSelector, WorkflowError,
    WorkflowInitializer, WorkflowSnapshot,
};
use outlay_shared::config::WorkflowConfig;
use outlay_shared::types::{CompanyId, ExpenseId, PageRequest, PageResponse, UserId};

use super::store::ExpenseStore;

/// A pending approval record together with its expense.
#[derive(Debug, Clone, Serialize)]
pub struct PendingApproval {
    /// The approver's record.
    pub record: ApprovalRecord,
    /// The expense awaiting the decision.
    pub expense: Expense,
}

/// Workflow repository for expense state transitions.
#[derive(Clone)]
pub struct WorkflowRepository {
    store: Arc<dyn ExpenseStore>,
    converter: CurrencyConverter,
    config: WorkflowConfig,
    locks: Arc<DashMap<ExpenseId, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for WorkflowRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowRepository")
            .field("config", &self.config)
            .field("locked_expenses", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl WorkflowRepository {
    /// Creates a new workflow repository.
    #[must_use]
    pub fn new(
        store: Arc<dyn ExpenseStore>,
        converter: CurrencyConverter,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            store,
            converter,
            config,
            locks: Arc::new(DashMap::new()),
        }
    }

    fn lock_for(&self, expense_id: ExpenseId) -> Arc<Mutex<()>> {
        self.locks.entry(expense_id).or_default().clone()
    }

    /// Drops the expense's lock entry once no operation holds or awaits it.
    ///
    /// The caller must have dropped its own handle first.
    fn release_lock(&self, expense_id: ExpenseId) {
        self.locks
            .remove_if(&expense_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Number of expenses with a live lock entry.
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }

    async fn company(&self, company_id: CompanyId) -> Result<CompanyPolicy, WorkflowError> {
        self.store
            .get_company(company_id)
            .await?
            .ok_or(WorkflowError::CompanyNotFound(company_id))
    }

    async fn expense(&self, expense_id: ExpenseId) -> Result<Expense, WorkflowError> {
        self.store
            .get_expense(expense_id)
            .await?
            .ok_or(WorkflowError::ExpenseNotFound(expense_id))
    }

    /// Creates a pending expense.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input fails validation
    /// - The company does not exist
    /// - The store write fails
    pub async fn create_expense(&self, input: NewExpense) -> Result<Expense, WorkflowError> {
        input.validate()?;
        self.company(input.company_id).await?;

        let expense = Expense::new(input, Utc::now());
        self.store.insert_expense(expense.clone()).await?;

        info!(
            expense_id = %expense.id,
            company_id = %expense.company_id,
            amount = %expense.amount,
            "expense created"
        );
        Ok(expense)
    }

    /// Submits a pending expense into its approval workflow.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The expense or its company is not found
    /// - The workflow was already initialized
    /// - The store write fails
    pub async fn submit_expense(&self, expense_id: ExpenseId) -> Result<InitPlan, WorkflowError> {
        let draft = self.expense(expense_id).await?;
        let company = self.company(draft.company_id).await?;

        let conversion = self.convert(&draft, &company).await;

        let lock = self.lock_for(expense_id);
        let result = {
            let _guard = lock.lock().await;
            self.initialize_locked(expense_id, &company, conversion).await
        };
        drop(lock);
        self.release_lock(expense_id);
        result
    }

    async fn initialize_locked(
        &self,
        expense_id: ExpenseId,
        company: &CompanyPolicy,
        conversion: Option<Conversion>,
    ) -> Result<InitPlan, WorkflowError> {
        let expense = self.expense(expense_id).await?;
        let amount = conversion.map_or(expense.amount, |c| c.amount);
        let rules = self.store.list_approval_rules(company.id).await?;
        let rule = RuleSelector::select(
            &rules,
            amount,
            expense.category_id,
            self.config.scoped_rule_selection,
        );
        let approvers = self.store.list_eligible_approvers(company.id).await?;

        let plan = WorkflowInitializer::plan(
            &expense,
            company,
            rule,
            &approvers,
            conversion,
            Utc::now(),
        )?;

        self.store
            .save_initialization(plan.expense.clone(), plan.records.clone())
            .await?;

        Ok(plan)
    }

    async fn convert(&self, expense: &Expense, company: &CompanyPolicy) -> Option<Conversion> {
        let (amount, from) = WorkflowInitializer::conversion_request(expense, company)?;
        let conversion = self.converter.convert(amount, from, &company.currency).await;
        debug!(
            expense_id = %expense.id,
            from = %from,
            to = %company.currency,
            degraded = conversion.degraded,
            "converted expense amount"
        );
        Some(conversion)
    }

    /// Records an approver's decision and applies the resulting transition.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The expense or its company is not found
    /// - The expense is already approved or rejected
    /// - The approver has no pending record at the current step
    /// - The store write fails
    pub async fn decide_expense(
        &self,
        expense_id: ExpenseId,
        approver_id: UserId,
        decision: Decision,
        comments: Option<String>,
    ) -> Result<Evaluation, WorkflowError> {
        let lock = self.lock_for(expense_id);
        let result = {
            let _guard = lock.lock().await;
            self.decide_locked(expense_id, approver_id, decision, comments)
                .await
        };
        drop(lock);
        self.release_lock(expense_id);
        result
    }

    async fn decide_locked(
        &self,
        expense_id: ExpenseId,
        approver_id: UserId,
        decision: Decision,
        comments: Option<String>,
    ) -> Result<Evaluation, WorkflowError> {
        let expense = self.expense(expense_id).await?;
        let records = self.store.list_approval_records(expense_id).await?;
        let company = self.company(expense.company_id).await?;
        let rules = self.store.list_approval_rules(company.id).await?;

        let rule = RuleSelector::select(
            &rules,
            expense.amount,
            expense.category_id,
            self.config.scoped_rule_selection,
        );
        let policy = Policy::resolve(rule, &company, PolicyOptions::from(&self.config));

        let snapshot = WorkflowSnapshot { expense, records };
        let evaluation = DecisionEvaluator::evaluate(
            &snapshot,
            &policy,
            approver_id,
            decision,
            comments,
            Utc::now(),
        )?;

        self.store
            .save_decision(evaluation.expense.clone(), evaluation.record.clone())
            .await?;

        Ok(evaluation)
    }

    /// Loads an expense with all of its records.
    pub async fn snapshot(&self, expense_id: ExpenseId) -> Result<WorkflowSnapshot, WorkflowError> {
        let expense = self.expense(expense_id).await?;
        let records = self.store.list_approval_records(expense_id).await?;
        Ok(WorkflowSnapshot { expense, records })
    }

    /// Records waiting on an approver at their expense's current step,
    /// oldest expense first.
    pub async fn pending_approvals(
        &self,
        approver_id: UserId,
        page: PageRequest,
    ) -> Result<PageResponse<PendingApproval>, WorkflowError> {
        let records = self.store.list_records_for_approver(approver_id).await?;

        let mut pending = Vec::new();
        for record in records.into_iter().filter(ApprovalRecord::is_pending) {
            let Some(expense) = self.store.get_expense(record.expense_id).await? else {
                continue;
            };
            if expense.status == ExpenseStatus::InProgress && expense.current_step == record.step {
                pending.push(PendingApproval { record, expense });
            }
        }
        pending.sort_by_key(|p| (p.expense.created_at, p.expense.id));

        Ok(page.paginate(pending))
    }

    /// Decided records of a company, most recent decision first.
    pub async fn approval_history(
        &self,
        company_id: CompanyId,
        page: PageRequest,
    ) -> Result<PageResponse<ApprovalRecord>, WorkflowError> {
        let mut decided: Vec<_> = self
            .store
            .list_company_records(company_id)
            .await?
            .into_iter()
            .filter(|r| !r.is_pending())
            .collect();
        decided.sort_by(|a, b| b.decided_at.cmp(&a.decided_at).then_with(|| b.id.cmp(&a.id)));

        Ok(page.paginate(decided))
    }

    /// Expenses of a company, newest first, optionally filtered by status.
    pub async fn list_expenses(
        &self,
        company_id: CompanyId,
        status: Option<ExpenseStatus>,
        page: PageRequest,
    ) -> Result<PageResponse<Expense>, WorkflowError> {
        let mut expenses: Vec<_> = self
            .store
            .list_expenses(company_id)
            .await?
            .into_iter()
            .filter(|e| status.is_none_or(|s| e.status == s))
            .collect();
        expenses.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

        Ok(page.paginate(expenses))
    }

    /// Dashboard statistics for a viewer.
    pub async fn dashboard_stats(
        &self,
        viewer_id: UserId,
        since: Option<DateTime<Utc>>,
    ) -> Result<ExpenseStats, WorkflowError> {
        let viewer = self
            .store
            .get_user(viewer_id)
            .await?
            .ok_or(WorkflowError::UserNotFound(viewer_id))?;

        let expenses = self.store.list_expenses(viewer.company_id).await?;
        let pending = self
            .pending_approvals(viewer_id, PageRequest::default())
            .await?
            .meta
            .total;

        Ok(DashboardService::summarize(
            &expenses,
            &viewer,
            usize::try_from(pending).unwrap_or(usize::MAX),
            since,
        ))
    }
}
