//! Approver eligibility.
//!
//! Only managers and admins flagged as approvers take part in a workflow.
//! They are assigned in ascending `approver_level`; users on the same level
//! keep their configured order.

use outlay_shared::types::{CompanyId, UserId};
use serde::{Deserialize, Serialize};

/// User role in the company hierarchy.
///
/// Roles are ordered from lowest to highest privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Submits expenses.
    Employee = 0,
    /// Approves team expenses.
    Manager = 1,
    /// Configures the company and approves anything.
    Admin = 2,
}

impl Role {
    /// Parse a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "EMPLOYEE" => Some(Self::Employee),
            "MANAGER" => Some(Self::Manager),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "EMPLOYEE",
            Self::Manager => "MANAGER",
            Self::Admin => "ADMIN",
        }
    }

    /// Returns true for roles that may hold approval records.
    #[must_use]
    pub fn can_approve(&self) -> bool {
        *self >= Self::Manager
    }
}

/// A company user as seen by the workflow engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approver {
    /// User identifier.
    pub user_id: UserId,
    /// Company the user belongs to.
    pub company_id: CompanyId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Organisational role.
    pub role: Role,
    /// Whether the user has been enabled as an approver.
    #[serde(default)]
    pub is_approver: bool,
    /// Ordering key for sequential workflows (lower acts first).
    #[serde(default)]
    pub approver_level: u32,
}

impl Approver {
    /// Returns true if this user may be assigned approval records.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.is_approver && self.role.can_approve()
    }
}

/// Filters `users` down to eligible approvers ordered by level.
///
/// The sort is stable, so users on the same level keep their input order.
#[must_use]
pub fn eligible_approvers(users: &[Approver]) -> Vec<Approver> {
    let mut eligible: Vec<_> = users.iter().filter(|u| u.is_eligible()).cloned().collect();
    eligible.sort_by_key(|u| u.approver_level);
    eligible
}
