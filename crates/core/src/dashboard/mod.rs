//! Dashboard statistics.
//!
//! - `types` - Expense statistics returned to dashboards
//! - `service` - Aggregation over a company's expenses

pub mod service;
pub mod types;

pub use service::DashboardService;
pub use types::ExpenseStats;
