//! Workflow initialization.
//!
//! Turns a freshly submitted expense into an in-progress workflow: converts
//! the amount to company currency, lays out approval records over steps and
//! locks the expense against edits. The result is an [`InitPlan`] that the
//! caller persists in one write.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use outlay_shared::types::{CurrencyCode, UserId};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::currency::{Conversion, effective_rate};
use crate::workflow::approver::{Approver, eligible_approvers};
use crate::workflow::error::WorkflowError;
use crate::workflow::expense::{ApprovalRecord, Expense};
use crate::workflow::policy::{Policy, PolicyOptions};
use crate::workflow::rule::{ApprovalRule, CompanyPolicy, RuleType};
use crate::workflow::types::ExpenseStatus;

/// How approval records are spread over steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepLayout {
    /// One approver per step, ordered by approver level.
    Sequential,
    /// Every approver at step 1.
    Parallel,
    /// Steps taken from the rule's approver assignments.
    Explicit,
    /// Nobody to ask; the expense is approved on submission.
    AutoApproved,
}

/// Everything the initializer decided for one expense.
#[derive(Debug, Clone)]
pub struct InitPlan {
    /// The expense after initialization.
    pub expense: Expense,
    /// New approval records, all pending.
    pub records: Vec<ApprovalRecord>,
    /// Chosen layout.
    pub layout: StepLayout,
}

/// Stateless workflow initializer.
pub struct WorkflowInitializer;

impl WorkflowInitializer {
    /// Returns the amount and currency to convert from, if the expense was
    /// paid in something other than the company currency.
    #[must_use]
    pub fn conversion_request<'a>(
        expense: &'a Expense,
        company: &CompanyPolicy,
    ) -> Option<(Decimal, &'a CurrencyCode)> {
        match (expense.original_amount, expense.original_currency.as_ref()) {
            (Some(amount), Some(currency)) if *currency != company.currency => {
                Some((amount, currency))
            }
            _ => None,
        }
    }

    /// Plans the workflow for a pending expense.
    ///
    /// `users` is the company's user list; eligibility and ordering are
    /// applied here. `conversion` is the result of converting the amount
    /// returned by [`Self::conversion_request`], if one was needed.
    ///
    /// # Errors
    ///
    /// [`WorkflowError::DoubleInitialization`] if the expense is locked or no
    /// longer pending.
    pub fn plan(
        expense: &Expense,
        company: &CompanyPolicy,
        rule: Option<&ApprovalRule>,
        users: &[Approver],
        conversion: Option<Conversion>,
        now: DateTime<Utc>,
    ) -> Result<InitPlan, WorkflowError> {
        if expense.is_readonly || expense.status != ExpenseStatus::Pending {
            return Err(WorkflowError::DoubleInitialization(expense.id));
        }

        let mut next = expense.clone();
        next.submitted_at = Some(now);
        next.is_readonly = true;

        // Decisions on a misconfigured rule resolve to the company default
        // policy, so the layout must come from the company default as well.
        let rule = rule.filter(|r| match Policy::from_rule(r, PolicyOptions::default()) {
            Ok(_) => true,
            Err(err) => {
                warn!(
                    expense_id = %expense.id,
                    rule_id = %r.id,
                    error = %err,
                    "approval rule misconfigured, laying out company default steps"
                );
                false
            }
        });
        let (layout, assignments) = Self::assignments(company, rule, users);

        if assignments.is_empty() {
            next.status = ExpenseStatus::Approved;
            next.current_step = 1;
            next.total_steps = 1;
            info!(expense_id = %expense.id, "no eligible approvers, expense auto-approved");
            return Ok(InitPlan {
                expense: next,
                records: Vec::new(),
                layout: StepLayout::AutoApproved,
            });
        }

        if let (Some(conversion), Some(original)) = (conversion, expense.original_amount) {
            next.amount = conversion.amount;
            next.exchange_rate = effective_rate(conversion.amount, original);
            debug!(
                expense_id = %expense.id,
                original = %original,
                converted = %conversion.amount,
                degraded = conversion.degraded,
                "applied currency conversion"
            );
        }

        let records: Vec<_> = assignments
            .iter()
            .map(|(user_id, step)| ApprovalRecord::pending(expense.id, *user_id, *step, now))
            .collect();

        next.status = ExpenseStatus::InProgress;
        next.current_step = 1;
        next.total_steps = assignments.iter().map(|(_, step)| *step).max().unwrap_or(1);

        info!(
            expense_id = %expense.id,
            layout = ?layout,
            approvers = records.len(),
            total_steps = next.total_steps,
            "approval workflow initialized"
        );

        Ok(InitPlan {
            expense: next,
            records,
            layout,
        })
    }

    fn assignments(
        company: &CompanyPolicy,
        rule: Option<&ApprovalRule>,
        users: &[Approver],
    ) -> (StepLayout, Vec<(UserId, u32)>) {
        if let Some(rule) = rule.filter(|r| !r.approver_steps.is_empty()) {
            return (StepLayout::Explicit, explicit_assignments(rule));
        }

        let approvers = eligible_approvers(users);
        let sequential = company.sequential_approval
            || rule.is_some_and(|r| r.rule_type == RuleType::Sequential);

        let assignments = approvers
            .iter()
            .zip(1u32..)
            .map(|(approver, position)| {
                let step = if sequential { position } else { 1 };
                (approver.user_id, step)
            })
            .collect();

        let layout = if sequential {
            StepLayout::Sequential
        } else {
            StepLayout::Parallel
        };
        (layout, assignments)
    }
}

/// Rule assignments with duplicates removed and steps renumbered densely,
/// so configured steps 1, 3, 7 become 1, 2, 3.
fn explicit_assignments(rule: &ApprovalRule) -> Vec<(UserId, u32)> {
    let steps: BTreeSet<u32> = rule.approver_steps.iter().map(|s| s.step).collect();
    let dense = |step: u32| {
        steps
            .iter()
            .position(|s| *s == step)
            .and_then(|i| u32::try_from(i + 1).ok())
            .unwrap_or(1)
    };

    let mut seen = BTreeSet::new();
    let mut assignments: Vec<_> = rule
        .approver_steps
        .iter()
        .filter(|s| seen.insert((s.user_id, s.step)))
        .map(|s| (s.user_id, dense(s.step)))
        .collect();
    assignments.sort_by_key(|(_, step)| *step);
    assignments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::approver::Role;
    use crate::workflow::expense::NewExpense;
    use crate::workflow::rule::ApproverStep;
    use outlay_shared::types::{ApprovalRuleId, CompanyId};
    use rust_decimal_macros::dec;

    fn company(sequential: bool) -> CompanyPolicy {
        CompanyPolicy {
            id: CompanyId::new(),
            name: "Acme".to_string(),
            currency: "USD".parse().unwrap(),
            sequential_approval: sequential,
            minimum_approval_percent: Some(50),
        }
    }

    fn expense(company: &CompanyPolicy) -> Expense {
        Expense::new(
            NewExpense {
                company_id: company.id,
                user_id: UserId::new(),
                category_id: None,
                description: "Taxi".to_string(),
                amount: dec!(40),
                original_amount: None,
                original_currency: None,
            },
            Utc::now(),
        )
    }

    fn approver(level: u32) -> Approver {
        Approver {
            user_id: UserId::new(),
            company_id: CompanyId::new(),
            name: String::new(),
            role: Role::Manager,
            is_approver: true,
            approver_level: level,
        }
    }

    fn rule(rule_type: RuleType) -> ApprovalRule {
        ApprovalRule {
            id: ApprovalRuleId::new(),
            company_id: CompanyId::new(),
            name: "rule".to_string(),
            rule_type,
            required_percentage: Some(50),
            specific_approver_ids: vec![],
            approver_steps: vec![],
            min_amount: None,
            max_amount: None,
            category_ids: vec![],
            priority: 0,
            is_active: true,
        }
    }

    #[test]
    fn test_no_approvers_auto_approves() {
        let company = company(true);
        let expense = expense(&company);

        let plan =
            WorkflowInitializer::plan(&expense, &company, None, &[], None, Utc::now()).unwrap();

        assert_eq!(plan.expense.status, ExpenseStatus::Approved);
        assert!(plan.records.is_empty());
        assert_eq!(plan.layout, StepLayout::AutoApproved);
        assert!(plan.expense.is_readonly);
    }

    #[test]
    fn test_sequential_layout_one_step_per_level() {
        let company = company(true);
        let expense = expense(&company);
        let users = vec![approver(3), approver(1), approver(2)];

        let plan =
            WorkflowInitializer::plan(&expense, &company, None, &users, None, Utc::now()).unwrap();

        assert_eq!(plan.layout, StepLayout::Sequential);
        assert_eq!(plan.expense.status, ExpenseStatus::InProgress);
        assert_eq!(plan.expense.total_steps, 3);
        assert_eq!(plan.expense.current_step, 1);
        assert!(plan.expense.is_readonly);
        assert!(plan.expense.submitted_at.is_some());

        let order: Vec<_> = plan.records.iter().map(|r| (r.approver_id, r.step)).collect();
        assert_eq!(
            order,
            vec![
                (users[1].user_id, 1),
                (users[2].user_id, 2),
                (users[0].user_id, 3)
            ]
        );
        assert!(plan.records.iter().all(ApprovalRecord::is_pending));
    }

    #[test]
    fn test_parallel_layout_all_at_step_one() {
        let company = company(false);
        let expense = expense(&company);
        let users = vec![approver(1), approver(2)];

        let plan =
            WorkflowInitializer::plan(&expense, &company, None, &users, None, Utc::now()).unwrap();

        assert_eq!(plan.layout, StepLayout::Parallel);
        assert_eq!(plan.expense.total_steps, 1);
        assert!(plan.records.iter().all(|r| r.step == 1));
    }

    #[test]
    fn test_sequential_rule_forces_sequential_layout() {
        let company = company(false);
        let expense = expense(&company);
        let users = vec![approver(1), approver(2)];
        let rule = rule(RuleType::Sequential);

        let plan =
            WorkflowInitializer::plan(&expense, &company, Some(&rule), &users, None, Utc::now())
                .unwrap();

        assert_eq!(plan.layout, StepLayout::Sequential);
        assert_eq!(plan.expense.total_steps, 2);
    }

    #[test]
    fn test_explicit_steps_are_renumbered() {
        let company = company(false);
        let expense = expense(&company);
        let a = UserId::new();
        let b = UserId::new();
        let c = UserId::new();
        let mut rule = rule(RuleType::Percentage);
        rule.approver_steps = vec![
            ApproverStep { user_id: c, step: 7 },
            ApproverStep { user_id: a, step: 1 },
            ApproverStep { user_id: b, step: 3 },
            ApproverStep { user_id: a, step: 1 },
        ];

        let plan =
            WorkflowInitializer::plan(&expense, &company, Some(&rule), &[], None, Utc::now())
                .unwrap();

        assert_eq!(plan.layout, StepLayout::Explicit);
        assert_eq!(plan.expense.total_steps, 3);
        let steps: Vec<_> = plan.records.iter().map(|r| (r.approver_id, r.step)).collect();
        assert_eq!(steps, vec![(a, 1), (b, 2), (c, 3)]);
    }

    #[test]
    fn test_misconfigured_rule_uses_company_layout() {
        let company = company(false);
        let expense = expense(&company);
        let users = vec![approver(1), approver(2)];
        let mut rule = rule(RuleType::Percentage);
        rule.required_percentage = None;
        rule.approver_steps = vec![
            ApproverStep {
                user_id: users[0].user_id,
                step: 1,
            },
            ApproverStep {
                user_id: users[1].user_id,
                step: 2,
            },
        ];

        let plan =
            WorkflowInitializer::plan(&expense, &company, Some(&rule), &users, None, Utc::now())
                .unwrap();

        assert_eq!(plan.layout, StepLayout::Parallel);
        assert_eq!(plan.expense.total_steps, 1);
        assert!(plan.records.iter().all(|r| r.step == 1));
    }

    #[test]
    fn test_conversion_updates_amount_and_rate() {
        let company = company(false);
        let mut expense = expense(&company);
        expense.original_amount = Some(dec!(50));
        expense.original_currency = Some("EUR".parse().unwrap());

        let (amount, currency) =
            WorkflowInitializer::conversion_request(&expense, &company).unwrap();
        assert_eq!(amount, dec!(50));
        assert_eq!(currency.as_str(), "EUR");

        let conversion = Conversion {
            amount: dec!(54.00),
            rate: dec!(1.08),
            degraded: false,
        };
        let plan = WorkflowInitializer::plan(
            &expense,
            &company,
            None,
            &[approver(1)],
            Some(conversion),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(plan.expense.amount, dec!(54.00));
        assert_eq!(plan.expense.exchange_rate, Some(dec!(1.08)));
    }

    #[test]
    fn test_same_currency_needs_no_conversion() {
        let company = company(false);
        let mut expense = expense(&company);
        expense.original_amount = Some(dec!(40));
        expense.original_currency = Some("USD".parse().unwrap());

        assert!(WorkflowInitializer::conversion_request(&expense, &company).is_none());
    }

    #[test]
    fn test_double_initialization_rejected() {
        let company = company(false);
        let expense = expense(&company);
        let users = vec![approver(1)];

        let plan =
            WorkflowInitializer::plan(&expense, &company, None, &users, None, Utc::now()).unwrap();
        let err = WorkflowInitializer::plan(&plan.expense, &company, None, &users, None, Utc::now())
            .unwrap_err();

        assert!(matches!(err, WorkflowError::DoubleInitialization(id) if id == expense.id));
    }
}
