//! Property-based tests for the decision evaluator and initializer.
//!
//! - Terminal statuses never change
//! - `current_step` never decreases
//! - A single rejection rejects the expense
//! - Percentage steps advance exactly at the threshold
//! - Sequential workflows visit every step in order

use chrono::Utc;
use outlay_shared::types::{CompanyId, UserId};
use proptest::prelude::*;
use rust_decimal_macros::dec;

use crate::workflow::approver::{Approver, Role};
use crate::workflow::evaluator::{DecisionEvaluator, WorkflowSnapshot};
use crate::workflow::expense::{ApprovalRecord, Expense, NewExpense};
use crate::workflow::initializer::WorkflowInitializer;
use crate::workflow::policy::Policy;
use crate::workflow::rule::CompanyPolicy;
use crate::workflow::types::{ApprovalStatus, Decision, ExpenseStatus, Transition};

/// In-progress snapshot with `per_step[i]` approvers at step `i + 1`.
fn build_snapshot(per_step: &[usize]) -> WorkflowSnapshot {
    let now = Utc::now();
    let mut expense = Expense::new(
        NewExpense {
            company_id: CompanyId::new(),
            user_id: UserId::new(),
            category_id: None,
            description: "Hotel".to_string(),
            amount: dec!(250),
            original_amount: None,
            original_currency: None,
        },
        now,
    );
    expense.status = ExpenseStatus::InProgress;
    expense.is_readonly = true;
    expense.total_steps = u32::try_from(per_step.len()).unwrap();

    let mut records = Vec::new();
    for (i, count) in per_step.iter().enumerate() {
        let step = u32::try_from(i + 1).unwrap();
        for _ in 0..*count {
            records.push(ApprovalRecord::pending(expense.id, UserId::new(), step, now));
        }
    }
    WorkflowSnapshot { expense, records }
}

fn arb_per_step() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..5, 1..5)
}

fn arb_policy() -> impl Strategy<Value = Policy> {
    prop_oneof![
        any::<bool>().prop_map(|unanimous| Policy::Sequential {
            step_requires_unanimous: unanimous
        }),
        (1u8..=100).prop_map(|p| Policy::Percentage {
            required_percent: p
        }),
        (0u8..=100).prop_map(|p| Policy::Fallback { minimum_percent: p }),
    ]
}

fn arb_decision() -> impl Strategy<Value = Decision> {
    prop_oneof![
        4 => Just(Decision::Approved),
        1 => Just(Decision::Rejected),
    ]
}

/// Lets actors at the current step decide in order until the expense is
/// terminal or the decisions run out, returning the visited steps.
fn run(
    snapshot: &mut WorkflowSnapshot,
    policy: &Policy,
    decisions: &[Decision],
) -> Vec<u32> {
    let mut steps = vec![snapshot.expense.current_step];
    for decision in decisions {
        if snapshot.expense.status.is_terminal() {
            break;
        }
        let Some(actor) = snapshot
            .records
            .iter()
            .find(|r| r.step == snapshot.expense.current_step && r.is_pending())
            .map(|r| r.approver_id)
        else {
            break;
        };

        let eval =
            DecisionEvaluator::evaluate(snapshot, policy, actor, *decision, None, Utc::now())
                .unwrap();
        snapshot.expense = eval.expense;
        if let Some(slot) = snapshot.records.iter_mut().find(|r| r.id == eval.record.id) {
            *slot = eval.record;
        }
        steps.push(snapshot.expense.current_step);
    }
    steps
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// `current_step` is non-decreasing and stays within `total_steps`.
    #[test]
    fn prop_current_step_monotonic(
        per_step in arb_per_step(),
        policy in arb_policy(),
        decisions in prop::collection::vec(arb_decision(), 1..20),
    ) {
        let mut snapshot = build_snapshot(&per_step);
        let steps = run(&mut snapshot, &policy, &decisions);

        prop_assert!(steps.windows(2).all(|w| w[0] <= w[1]));
        prop_assert!(steps.iter().all(|s| *s >= 1 && *s <= snapshot.expense.total_steps));
    }

    /// Once terminal, every further decision fails and nothing changes.
    #[test]
    fn prop_terminal_is_idempotent(
        per_step in arb_per_step(),
        policy in arb_policy(),
        decisions in prop::collection::vec(arb_decision(), 1..20),
        late in arb_decision(),
    ) {
        let mut snapshot = build_snapshot(&per_step);
        run(&mut snapshot, &policy, &decisions);
        prop_assume!(snapshot.expense.status.is_terminal());

        let before = snapshot.expense.clone();
        for record in snapshot.records.clone() {
            let result = DecisionEvaluator::evaluate(
                &snapshot, &policy, record.approver_id, late, None, Utc::now(),
            );
            prop_assert!(result.is_err());
            prop_assert!(result.unwrap_err().is_already_processed());
        }
        prop_assert_eq!(snapshot.expense, before);
    }

    /// Any rejection on an open expense rejects it, whatever the policy.
    #[test]
    fn prop_reject_dominates(
        per_step in arb_per_step(),
        policy in arb_policy(),
    ) {
        let snapshot = build_snapshot(&per_step);
        let actor = snapshot.records[0].approver_id;

        let eval = DecisionEvaluator::evaluate(
            &snapshot, &policy, actor, Decision::Rejected, None, Utc::now(),
        ).unwrap();

        prop_assert_eq!(eval.transition, Transition::Reject);
        prop_assert_eq!(eval.expense.status, ExpenseStatus::Rejected);
    }

    /// With k of n approvals in place, the next approval moves the step
    /// exactly when (k + 1) * 100 >= p * n.
    #[test]
    fn prop_percentage_threshold(
        n in 1usize..8,
        k_seed in 0usize..8,
        required in 1u8..=100,
    ) {
        let k = k_seed % n;
        let policy = Policy::Percentage { required_percent: required };
        let mut snapshot = build_snapshot(&[n, 1]);
        for record in snapshot.records.iter_mut().filter(|r| r.step == 1).take(k) {
            record.status = ApprovalStatus::Approved;
        }
        let actor = snapshot.records.iter()
            .find(|r| r.step == 1 && r.is_pending())
            .map(|r| r.approver_id)
            .unwrap();

        let eval = DecisionEvaluator::evaluate(
            &snapshot, &policy, actor, Decision::Approved, None, Utc::now(),
        ).unwrap();

        let expected = if (k + 1) * 100 >= usize::from(required) * n {
            Transition::Advance { from: 1, to: 2 }
        } else {
            Transition::Await
        };
        prop_assert_eq!(eval.transition, expected);
    }

    /// One approval per step walks a sequential workflow to approval.
    #[test]
    fn prop_sequential_visits_every_step(steps in 1usize..6) {
        let policy = Policy::Sequential { step_requires_unanimous: false };
        let mut snapshot = build_snapshot(&vec![1; steps]);
        let decisions = vec![Decision::Approved; steps];

        let visited = run(&mut snapshot, &policy, &decisions);

        let expected: Vec<u32> = (1..=u32::try_from(steps).unwrap())
            .chain(std::iter::once(u32::try_from(steps).unwrap()))
            .collect();
        prop_assert_eq!(visited, expected);
        prop_assert_eq!(snapshot.expense.status, ExpenseStatus::Approved);
    }

    /// Sequential initialization creates one step per eligible approver.
    #[test]
    fn prop_initializer_step_count(
        levels in prop::collection::vec((0u32..5, any::<bool>()), 0..8),
        sequential in any::<bool>(),
    ) {
        let company = CompanyPolicy {
            id: CompanyId::new(),
            name: String::new(),
            currency: "USD".parse().unwrap(),
            sequential_approval: sequential,
            minimum_approval_percent: None,
        };
        let users: Vec<_> = levels
            .iter()
            .map(|(level, flag)| Approver {
                user_id: UserId::new(),
                company_id: company.id,
                name: String::new(),
                role: Role::Manager,
                is_approver: *flag,
                approver_level: *level,
            })
            .collect();
        let eligible = users.iter().filter(|u| u.is_approver).count();
        let mut pending = build_snapshot(&[1]).expense;
        pending.status = ExpenseStatus::Pending;
        pending.is_readonly = false;

        let plan = WorkflowInitializer::plan(&pending, &company, None, &users, None, Utc::now())
            .unwrap();

        prop_assert_eq!(plan.records.len(), eligible);
        if eligible == 0 {
            prop_assert_eq!(plan.expense.status, ExpenseStatus::Approved);
        } else {
            let expected_steps = if sequential { u32::try_from(eligible).unwrap() } else { 1 };
            prop_assert_eq!(plan.expense.total_steps, expected_steps);
            prop_assert_eq!(plan.expense.status, ExpenseStatus::InProgress);
            let max_step = plan.records.iter().map(|r| r.step).max();
            prop_assert_eq!(max_step, Some(expected_steps));
        }
    }
}
