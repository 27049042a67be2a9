//! Scenario files and their execution.
//!
//! A scenario seeds one company with users, rules and exchange rates, then
//! runs a list of steps against the workflow repository. Expenses are
//! referred to by a scenario-local key because their ids are generated.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use outlay_core::currency::StaticRateSource;
use outlay_core::workflow::{
    ApprovalRule, Approver, CompanyPolicy, Decision, NewExpense, WorkflowError,
};
use outlay_db::{InMemoryStore, WorkflowRepository};
use outlay_shared::AppError;
use outlay_shared::types::{CategoryId, CurrencyCode, ExpenseId, PageRequest, UserId};

/// A published exchange rate.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioRate {
    /// Base currency.
    pub base: String,
    /// Target currency.
    pub target: String,
    /// Units of target per unit of base.
    pub rate: Decimal,
}

/// Expense fields supplied by a create step.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioExpense {
    /// Submitting employee.
    pub user_id: UserId,
    /// Optional category.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// Description.
    pub description: String,
    /// Amount in company currency.
    pub amount: Decimal,
    /// Amount as spent.
    #[serde(default)]
    pub original_amount: Option<Decimal>,
    /// Currency as spent.
    #[serde(default)]
    pub original_currency: Option<CurrencyCode>,
}

/// One scenario step.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Create an expense and remember it under `key`.
    Create {
        /// Scenario-local name.
        key: String,
        /// Expense fields.
        expense: ScenarioExpense,
    },
    /// Submit an expense into its workflow.
    Submit {
        /// Expense key.
        expense: String,
    },
    /// Record an approver decision.
    Decide {
        /// Expense key.
        expense: String,
        /// Acting approver.
        approver: UserId,
        /// Approve or reject.
        decision: Decision,
        /// Optional comments.
        #[serde(default)]
        comments: Option<String>,
    },
    /// Print an approver's work queue.
    Pending {
        /// The approver.
        approver: UserId,
    },
    /// Print dashboard statistics for a user.
    Stats {
        /// The viewer.
        viewer: UserId,
    },
}

impl Step {
    fn action(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Submit { .. } => "submit",
            Self::Decide { .. } => "decide",
            Self::Pending { .. } => "pending",
            Self::Stats { .. } => "stats",
        }
    }
}

/// A full scenario file.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// The company under test.
    pub company: CompanyPolicy,
    /// Company users.
    #[serde(default)]
    pub users: Vec<Approver>,
    /// Approval rules in configured order.
    #[serde(default)]
    pub rules: Vec<ApprovalRule>,
    /// Exchange rates for the static rate source.
    #[serde(default)]
    pub rates: Vec<ScenarioRate>,
    /// Steps to run in order.
    pub steps: Vec<Step>,
}

/// Outcome of one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    /// 1-based step number.
    pub step: usize,
    /// Step action.
    pub action: &'static str,
    /// Whether the step succeeded.
    pub ok: bool,
    /// Result or error details.
    pub output: Value,
}

impl Scenario {
    /// Parses a scenario from JSON.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Builds a static rate source from the scenario rates.
    #[must_use]
    pub fn rate_source(&self) -> StaticRateSource {
        self.rates.iter().fold(StaticRateSource::new(), |source, r| {
            source.with_rate(&r.base, &r.target, r.rate)
        })
    }

    /// Seeds a fresh in-memory store.
    #[must_use]
    pub fn seed(&self) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.insert_company(self.company.clone());
        for user in &self.users {
            store.insert_user(user.clone());
        }
        for rule in &self.rules {
            store.insert_rule(rule.clone());
        }
        info!(
            company_id = %self.company.id,
            users = self.users.len(),
            rules = self.rules.len(),
            "scenario seeded"
        );
        store
    }
}

/// Runs every step, continuing past failures.
pub async fn run(scenario: &Scenario, repo: &WorkflowRepository) -> Vec<StepReport> {
    let mut keys: HashMap<String, ExpenseId> = HashMap::new();
    let mut reports = Vec::with_capacity(scenario.steps.len());

    for (index, step) in scenario.steps.iter().enumerate() {
        let outcome = run_step(scenario, repo, step, &mut keys).await;
        let report = match outcome {
            Ok(output) => StepReport {
                step: index + 1,
                action: step.action(),
                ok: true,
                output,
            },
            Err(err) => {
                warn!(step = index + 1, action = step.action(), error = %err, "scenario step failed");
                StepReport {
                    step: index + 1,
                    action: step.action(),
                    ok: false,
                    output: error_json(err),
                }
            }
        };
        reports.push(report);
    }
    reports
}

async fn run_step(
    scenario: &Scenario,
    repo: &WorkflowRepository,
    step: &Step,
    keys: &mut HashMap<String, ExpenseId>,
) -> Result<Value, WorkflowError> {
    match step {
        Step::Create { key, expense } => {
            let created = repo
                .create_expense(NewExpense {
                    company_id: scenario.company.id,
                    user_id: expense.user_id,
                    category_id: expense.category_id,
                    description: expense.description.clone(),
                    amount: expense.amount,
                    original_amount: expense.original_amount,
                    original_currency: expense.original_currency.clone(),
                })
                .await?;
            keys.insert(key.clone(), created.id);
            Ok(to_json(&created))
        }
        Step::Submit { expense } => {
            let plan = repo.submit_expense(lookup(keys, expense)?).await?;
            Ok(json!({
                "layout": plan.layout,
                "expense": plan.expense,
                "records": plan.records,
            }))
        }
        Step::Decide {
            expense,
            approver,
            decision,
            comments,
        } => {
            let evaluation = repo
                .decide_expense(lookup(keys, expense)?, *approver, *decision, comments.clone())
                .await?;
            Ok(to_json(&evaluation))
        }
        Step::Pending { approver } => {
            let page = repo
                .pending_approvals(*approver, PageRequest::default())
                .await?;
            Ok(to_json(&page))
        }
        Step::Stats { viewer } => {
            let stats = repo.dashboard_stats(*viewer, None).await?;
            Ok(to_json(&stats))
        }
    }
}

fn lookup(keys: &HashMap<String, ExpenseId>, key: &str) -> Result<ExpenseId, WorkflowError> {
    keys.get(key)
        .copied()
        .ok_or_else(|| WorkflowError::Validation(format!("unknown expense key {key}")))
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|err| json!({ "serialization_error": err.to_string() }))
}

fn error_json(err: WorkflowError) -> Value {
    let code = err.error_code();
    let app: AppError = err.into();
    json!({
        "status": app.status_code(),
        "code": code,
        "message": app.to_string(),
    })
}
