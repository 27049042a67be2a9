//! In-memory store backed by `DashMap`.
//!
//! An expense and its approval records live in one map entry, so both save
//! operations update them under a single shard lock.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use outlay_core::workflow::{
    ApprovalRecord, ApprovalRule, Approver, CompanyPolicy, Expense, eligible_approvers,
};
use outlay_shared::types::{CompanyId, ExpenseId, UserId};

use super::store::{ExpenseStore, StoreError, StoreResult};

#[derive(Debug, Clone)]
struct ExpenseRow {
    expense: Expense,
    records: Vec<ApprovalRecord>,
}

/// Store holding everything in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    expenses: DashMap<ExpenseId, ExpenseRow>,
    companies: DashMap<CompanyId, CompanyPolicy>,
    rules: DashMap<CompanyId, Vec<ApprovalRule>>,
    users: DashMap<CompanyId, Vec<Approver>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a company.
    pub fn insert_company(&self, company: CompanyPolicy) {
        self.companies.insert(company.id, company);
    }

    /// Appends a rule to its company's list.
    pub fn insert_rule(&self, rule: ApprovalRule) {
        self.rules.entry(rule.company_id).or_default().push(rule);
    }

    /// Appends a user to its company's list.
    pub fn insert_user(&self, user: Approver) {
        self.users.entry(user.company_id).or_default().push(user);
    }
}

#[async_trait]
impl ExpenseStore for InMemoryStore {
    async fn get_expense(&self, id: ExpenseId) -> StoreResult<Option<Expense>> {
        Ok(self.expenses.get(&id).map(|row| row.expense.clone()))
    }

    async fn insert_expense(&self, expense: Expense) -> StoreResult<()> {
        match self.expenses.entry(expense.id) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "expense {} already exists",
                expense.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(ExpenseRow {
                    expense,
                    records: Vec::new(),
                });
                Ok(())
            }
        }
    }

    async fn list_expenses(&self, company_id: CompanyId) -> StoreResult<Vec<Expense>> {
        Ok(self
            .expenses
            .iter()
            .filter(|row| row.expense.company_id == company_id)
            .map(|row| row.expense.clone())
            .collect())
    }

    async fn list_approval_records(&self, expense_id: ExpenseId) -> StoreResult<Vec<ApprovalRecord>> {
        Ok(self
            .expenses
            .get(&expense_id)
            .map(|row| row.records.clone())
            .unwrap_or_default())
    }

    async fn list_records_for_approver(
        &self,
        approver_id: UserId,
    ) -> StoreResult<Vec<ApprovalRecord>> {
        Ok(self
            .expenses
            .iter()
            .flat_map(|row| {
                row.records
                    .iter()
                    .filter(|r| r.approver_id == approver_id)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect())
    }

    async fn list_company_records(
        &self,
        company_id: CompanyId,
    ) -> StoreResult<Vec<ApprovalRecord>> {
        Ok(self
            .expenses
            .iter()
            .filter(|row| row.expense.company_id == company_id)
            .flat_map(|row| row.records.clone())
            .collect())
    }

    async fn get_company(&self, id: CompanyId) -> StoreResult<Option<CompanyPolicy>> {
        Ok(self.companies.get(&id).map(|c| c.clone()))
    }

    async fn list_approval_rules(&self, company_id: CompanyId) -> StoreResult<Vec<ApprovalRule>> {
        Ok(self
            .rules
            .get(&company_id)
            .map(|r| r.clone())
            .unwrap_or_default())
    }

    async fn list_eligible_approvers(&self, company_id: CompanyId) -> StoreResult<Vec<Approver>> {
        Ok(self
            .users
            .get(&company_id)
            .map(|users| eligible_approvers(&users))
            .unwrap_or_default())
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<Approver>> {
        Ok(self
            .users
            .iter()
            .find_map(|users| users.iter().find(|u| u.user_id == id).cloned()))
    }

    async fn save_initialization(
        &self,
        expense: Expense,
        records: Vec<ApprovalRecord>,
    ) -> StoreResult<()> {
        let mut row = self
            .expenses
            .get_mut(&expense.id)
            .ok_or_else(|| StoreError::Missing(format!("expense {}", expense.id)))?;
        if !row.records.is_empty() {
            return Err(StoreError::Conflict(format!(
                "expense {} already has approval records",
                expense.id
            )));
        }
        row.expense = expense;
        row.records = records;
        Ok(())
    }

    async fn save_decision(&self, expense: Expense, record: ApprovalRecord) -> StoreResult<()> {
        let mut row = self
            .expenses
            .get_mut(&expense.id)
            .ok_or_else(|| StoreError::Missing(format!("expense {}", expense.id)))?;
        let slot = row
            .records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or_else(|| StoreError::Missing(format!("approval record {}", record.id)))?;
        *slot = record;
        row.expense = expense;
        Ok(())
    }
}
