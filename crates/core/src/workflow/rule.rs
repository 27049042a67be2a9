//! Approval rules and company policy settings.
//!
//! Rules are matched by amount range and expense category. When several
//! rules match, the one with the lowest priority value wins; rules on the
//! same priority resolve to the first one configured.

use outlay_shared::types::{ApprovalRuleId, CategoryId, CompanyId, CurrencyCode, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a rule decides that an expense is approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleType {
    /// Steps are processed in order; each step needs its approvals.
    Sequential,
    /// A share of the current step's approvers must approve.
    Percentage,
    /// Any listed approver approves the whole expense.
    SpecificApprover,
    /// Either a listed approver or the percentage threshold.
    Hybrid,
}

impl RuleType {
    /// Returns the string representation of the rule type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "SEQUENTIAL",
            Self::Percentage => "PERCENTAGE",
            Self::SpecificApprover => "SPECIFIC_APPROVER",
            Self::Hybrid => "HYBRID",
        }
    }

    /// Parses a rule type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SEQUENTIAL" => Some(Self::Sequential),
            "PERCENTAGE" => Some(Self::Percentage),
            "SPECIFIC_APPROVER" => Some(Self::SpecificApprover),
            "HYBRID" => Some(Self::Hybrid),
            _ => None,
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An explicit approver assignment carried by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproverStep {
    /// The approver.
    pub user_id: UserId,
    /// Step the approver acts at (1-based).
    pub step: u32,
}

/// A company-configured approval rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRule {
    /// Unique identifier for the rule.
    pub id: ApprovalRuleId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Human-readable name for the rule.
    pub name: String,
    /// Policy model.
    pub rule_type: RuleType,
    /// Required approval share in percent, for percentage and hybrid rules.
    #[serde(default)]
    pub required_percentage: Option<u8>,
    /// Approvers whose approval alone is sufficient.
    #[serde(default)]
    pub specific_approver_ids: Vec<UserId>,
    /// Explicit step assignments. Empty means approvers come from the company.
    #[serde(default)]
    pub approver_steps: Vec<ApproverStep>,
    /// Minimum amount for this rule to apply (inclusive, None = no minimum).
    #[serde(default)]
    pub min_amount: Option<Decimal>,
    /// Maximum amount for this rule to apply (inclusive, None = no maximum).
    #[serde(default)]
    pub max_amount: Option<Decimal>,
    /// Categories this rule applies to. Empty matches every category.
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
    /// Priority for rule selection (lower = higher priority).
    #[serde(default)]
    pub priority: i16,
    /// Inactive rules are never selected.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl ApprovalRule {
    /// Returns true if the rule covers an expense of this amount and category.
    #[must_use]
    pub fn matches(&self, amount: Decimal, category: Option<CategoryId>) -> bool {
        let above_min = self.min_amount.is_none_or(|min| amount >= min);
        let below_max = self.max_amount.is_none_or(|max| amount <= max);
        let category_ok = self.category_ids.is_empty()
            || category.is_some_and(|c| self.category_ids.contains(&c));
        above_min && below_max && category_ok
    }
}

/// Company-level approval settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyPolicy {
    /// Company identifier.
    pub id: CompanyId,
    /// Company name.
    #[serde(default)]
    pub name: String,
    /// Currency all expense amounts are normalised to.
    pub currency: CurrencyCode,
    /// Whether approvers act one level at a time.
    #[serde(default)]
    pub sequential_approval: bool,
    /// Fallback approval threshold in percent. None uses the configured default.
    #[serde(default)]
    pub minimum_approval_percent: Option<u8>,
}

/// Stateless rule selection.
pub struct RuleSelector;

impl RuleSelector {
    /// Picks the rule that governs an expense.
    ///
    /// With `scoped` set, only active rules matching the amount and category
    /// are considered and the lowest priority wins. Without it, the first
    /// active rule governs every expense of the company.
    #[must_use]
    pub fn select(
        rules: &[ApprovalRule],
        amount: Decimal,
        category: Option<CategoryId>,
        scoped: bool,
    ) -> Option<&ApprovalRule> {
        let mut active = rules.iter().filter(|r| r.is_active);
        if !scoped {
            return active.next();
        }

        // min_by_key keeps the first of equal keys
        active
            .filter(|r| r.matches(amount, category))
            .min_by_key(|r| r.priority)
    }
}
