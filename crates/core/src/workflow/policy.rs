//! Resolved approval policy.
//!
//! A [`Policy`] is what the evaluator actually runs. It is built once per
//! operation from the selected rule and the company settings, so the
//! evaluator itself never looks anything up.

use outlay_shared::config::WorkflowConfig;
use outlay_shared::types::{ApprovalRuleId, UserId};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::workflow::rule::{ApprovalRule, CompanyPolicy, RuleType};

/// The decision model applied on the approve path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Policy {
    /// Approvals advance the expense one step at a time.
    Sequential {
        /// Every approver of a step must approve before it advances.
        step_requires_unanimous: bool,
    },
    /// A share of the current step's approvers must approve.
    Percentage {
        /// Threshold in percent (1..=100).
        required_percent: u8,
    },
    /// Any listed approver approves the expense outright.
    SpecificApprover {
        /// The listed approvers.
        approver_ids: Vec<UserId>,
    },
    /// A listed approver or the percentage threshold.
    Hybrid {
        /// The listed approvers.
        approver_ids: Vec<UserId>,
        /// Threshold in percent (1..=100).
        required_percent: u8,
    },
    /// Company-wide parallel voting over all records.
    Fallback {
        /// Threshold in percent (0..=100).
        minimum_percent: u8,
    },
}

/// Engine-wide knobs that shape policy resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyOptions {
    /// See [`WorkflowConfig::step_requires_unanimous`].
    pub step_requires_unanimous: bool,
    /// Threshold for companies without their own minimum.
    pub default_minimum_percent: u8,
}

impl Default for PolicyOptions {
    fn default() -> Self {
        Self::from(&WorkflowConfig::default())
    }
}

impl From<&WorkflowConfig> for PolicyOptions {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            step_requires_unanimous: config.step_requires_unanimous,
            default_minimum_percent: config.default_minimum_approval_percent,
        }
    }
}

/// Why a rule could not be turned into a policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleMisconfiguration {
    /// Percentage or hybrid rule without a threshold.
    #[error("Rule {0} has no required percentage")]
    MissingPercentage(ApprovalRuleId),

    /// Threshold outside 1..=100.
    #[error("Rule {rule_id} has required percentage {value}, expected 1 to 100")]
    PercentageOutOfRange {
        /// The rule.
        rule_id: ApprovalRuleId,
        /// The configured value.
        value: u8,
    },

    /// Specific-approver or hybrid rule with nobody listed.
    #[error("Rule {0} lists no specific approvers")]
    NoSpecificApprovers(ApprovalRuleId),
}

impl Policy {
    /// Builds the policy a well-formed rule describes.
    pub fn from_rule(
        rule: &ApprovalRule,
        options: PolicyOptions,
    ) -> Result<Self, RuleMisconfiguration> {
        match rule.rule_type {
            RuleType::Sequential => Ok(Self::Sequential {
                step_requires_unanimous: options.step_requires_unanimous,
            }),
            RuleType::Percentage => Ok(Self::Percentage {
                required_percent: required_percent(rule)?,
            }),
            RuleType::SpecificApprover => Ok(Self::SpecificApprover {
                approver_ids: specific_approvers(rule)?,
            }),
            RuleType::Hybrid => Ok(Self::Hybrid {
                approver_ids: specific_approvers(rule)?,
                required_percent: required_percent(rule)?,
            }),
        }
    }

    /// Policy used when no rule applies.
    #[must_use]
    pub fn company_default(company: &CompanyPolicy, options: PolicyOptions) -> Self {
        if company.sequential_approval {
            Self::Sequential {
                step_requires_unanimous: options.step_requires_unanimous,
            }
        } else {
            Self::Fallback {
                minimum_percent: company
                    .minimum_approval_percent
                    .unwrap_or(options.default_minimum_percent)
                    .min(100),
            }
        }
    }

    /// Resolves the policy for an expense.
    ///
    /// A misconfigured rule is logged and replaced by the company default.
    #[must_use]
    pub fn resolve(
        rule: Option<&ApprovalRule>,
        company: &CompanyPolicy,
        options: PolicyOptions,
    ) -> Self {
        let Some(rule) = rule else {
            return Self::company_default(company, options);
        };

        match Self::from_rule(rule, options) {
            Ok(policy) => policy,
            Err(err) => {
                warn!(
                    rule_id = %rule.id,
                    company_id = %company.id,
                    error = %err,
                    "approval rule misconfigured, using company fallback"
                );
                Self::company_default(company, options)
            }
        }
    }

    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sequential { .. } => "sequential",
            Self::Percentage { .. } => "percentage",
            Self::SpecificApprover { .. } => "specific_approver",
            Self::Hybrid { .. } => "hybrid",
            Self::Fallback { .. } => "fallback",
        }
    }
}

fn required_percent(rule: &ApprovalRule) -> Result<u8, RuleMisconfiguration> {
    match rule.required_percentage {
        None => Err(RuleMisconfiguration::MissingPercentage(rule.id)),
        Some(value) if value == 0 || value > 100 => {
            Err(RuleMisconfiguration::PercentageOutOfRange {
                rule_id: rule.id,
                value,
            })
        }
        Some(value) => Ok(value),
    }
}

fn specific_approvers(rule: &ApprovalRule) -> Result<Vec<UserId>, RuleMisconfiguration> {
    if rule.specific_approver_ids.is_empty() {
        return Err(RuleMisconfiguration::NoSpecificApprovers(rule.id));
    }
    Ok(rule.specific_approver_ids.clone())
}
