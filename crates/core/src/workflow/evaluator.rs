//! Decision evaluation.
//!
//! The evaluator is the workflow state machine. Given a snapshot of an
//! expense with its records, the resolved [`Policy`] and one approver's
//! decision, it produces the updated record, the single [`Transition`]
//! that follows and the expense with that transition applied. It performs
//! no I/O; the caller persists the [`Evaluation`] in one write.
//!
//! Percent thresholds are compared by cross-multiplication on integers:
//! `approved / total >= required / 100` becomes
//! `approved * 100 >= required * total`.

use chrono::{DateTime, Utc};
use outlay_shared::types::UserId;
use serde::Serialize;
use tracing::{debug, info};

use crate::workflow::error::WorkflowError;
use crate::workflow::expense::{ApprovalRecord, Expense};
use crate::workflow::policy::Policy;
use crate::workflow::types::{ApprovalStatus, Decision, ExpenseStatus, Transition};

/// An expense together with all of its approval records.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSnapshot {
    /// The expense.
    pub expense: Expense,
    /// Every approval record of the expense.
    pub records: Vec<ApprovalRecord>,
}

/// The outcome of one decision.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    /// The expense after the transition.
    pub expense: Expense,
    /// The decided record.
    pub record: ApprovalRecord,
    /// What happened to the expense.
    pub transition: Transition,
}

/// Approval counts over a set of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tally {
    approved: usize,
    pending: usize,
    total: usize,
}

impl Tally {
    fn of<'a>(records: impl IntoIterator<Item = &'a ApprovalRecord>) -> Self {
        records.into_iter().fold(
            Self {
                approved: 0,
                pending: 0,
                total: 0,
            },
            |mut tally, record| {
                tally.total += 1;
                match record.status {
                    ApprovalStatus::Approved => tally.approved += 1,
                    ApprovalStatus::Pending => tally.pending += 1,
                    ApprovalStatus::Rejected => {}
                }
                tally
            },
        )
    }

    fn approved_share_at_least(&self, percent: u8) -> bool {
        self.approved.saturating_mul(100) >= usize::from(percent).saturating_mul(self.total)
    }

    /// Whether the threshold can still be met if every pending record approves.
    fn reachable(&self, percent: u8) -> bool {
        (self.approved + self.pending).saturating_mul(100)
            >= usize::from(percent).saturating_mul(self.total)
    }
}

/// Stateless decision evaluator.
pub struct DecisionEvaluator;

impl DecisionEvaluator {
    /// Evaluates one approver's decision.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::ExpenseAlreadyFinalized`] if the expense is terminal
    /// - [`WorkflowError::ApprovalAlreadyDecided`] if the actor already decided
    /// - [`WorkflowError::NotCurrentStep`] if the actor's pending record is at another step
    /// - [`WorkflowError::Unauthorized`] if the actor holds no record
    pub fn evaluate(
        snapshot: &WorkflowSnapshot,
        policy: &Policy,
        actor: UserId,
        decision: Decision,
        comments: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Evaluation, WorkflowError> {
        let expense = &snapshot.expense;
        expense.ensure_open()?;

        let index = Self::actor_record(snapshot, actor)?;
        if expense.status != ExpenseStatus::InProgress {
            return Err(WorkflowError::InvalidTransition {
                from: expense.status,
                to: ExpenseStatus::InProgress,
            });
        }

        let mut records = snapshot.records.clone();
        records[index].decide(decision, comments, now)?;

        let transition = match decision {
            Decision::Rejected => Transition::Reject,
            Decision::Approved => Self::approve_path(expense, &records, policy, actor),
        };

        let mut next = expense.clone();
        next.apply(transition)?;

        info!(
            expense_id = %expense.id,
            approver_id = %actor,
            step = expense.current_step,
            policy = policy.name(),
            decision = ?decision,
            transition = ?transition,
            status = %next.status,
            "approval decision recorded"
        );

        Ok(Evaluation {
            expense: next,
            record: records.swap_remove(index),
            transition,
        })
    }

    /// Finds the actor's pending record at the current step.
    fn actor_record(snapshot: &WorkflowSnapshot, actor: UserId) -> Result<usize, WorkflowError> {
        let expense = &snapshot.expense;
        let mine: Vec<_> = snapshot
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.approver_id == actor)
            .collect();

        if let Some((index, _)) = mine
            .iter()
            .find(|(_, r)| r.step == expense.current_step && r.is_pending())
        {
            return Ok(*index);
        }

        if let Some((_, record)) = mine
            .iter()
            .find(|(_, r)| r.step == expense.current_step)
        {
            return Err(WorkflowError::ApprovalAlreadyDecided(record.id));
        }

        if let Some((_, record)) = mine.iter().find(|(_, r)| r.is_pending()) {
            return Err(WorkflowError::NotCurrentStep {
                user_id: actor,
                step: record.step,
                current_step: expense.current_step,
            });
        }

        match mine.last() {
            Some((_, record)) => Err(WorkflowError::ApprovalAlreadyDecided(record.id)),
            None => Err(WorkflowError::Unauthorized {
                user_id: actor,
                expense_id: expense.id,
            }),
        }
    }

    fn approve_path(
        expense: &Expense,
        records: &[ApprovalRecord],
        policy: &Policy,
        actor: UserId,
    ) -> Transition {
        let step = Tally::of(records.iter().filter(|r| r.step == expense.current_step));
        debug!(
            expense_id = %expense.id,
            step = expense.current_step,
            total_steps = expense.total_steps,
            approved = step.approved,
            pending = step.pending,
            records = step.total,
            "evaluating approval"
        );

        match policy {
            Policy::Sequential {
                step_requires_unanimous,
            } => {
                let satisfied = if *step_requires_unanimous {
                    step.approved == step.total
                } else {
                    step.approved > 0
                };
                if satisfied {
                    advance_or_approve(expense)
                } else {
                    Transition::Await
                }
            }
            Policy::Percentage { required_percent } => {
                percentage_step(expense, step, *required_percent)
            }
            Policy::SpecificApprover { approver_ids } => {
                if approver_ids.contains(&actor) {
                    Transition::Approve
                } else if step.pending == 0 {
                    // A fully approved step hands over to the next one, where a
                    // listed approver may be waiting.
                    advance_or_approve(expense)
                } else {
                    Transition::Await
                }
            }
            Policy::Hybrid {
                approver_ids,
                required_percent,
            } => {
                if approver_ids.contains(&actor) {
                    advance_or_approve(expense)
                } else {
                    percentage_step(expense, step, *required_percent)
                }
            }
            Policy::Fallback { minimum_percent } => {
                let all = Tally::of(records);
                if all.approved_share_at_least(*minimum_percent) {
                    Transition::Approve
                } else if !all.reachable(*minimum_percent) {
                    Transition::Reject
                } else {
                    Transition::Await
                }
            }
        }
    }
}

fn percentage_step(expense: &Expense, step: Tally, required_percent: u8) -> Transition {
    if step.approved_share_at_least(required_percent) {
        advance_or_approve(expense)
    } else {
        Transition::Await
    }
}

fn advance_or_approve(expense: &Expense) -> Transition {
    if expense.current_step < expense.total_steps {
        Transition::Advance {
            from: expense.current_step,
            to: expense.current_step + 1,
        }
    } else {
        Transition::Approve
    }
}
