//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for storage operations, hiding
//! the backing store from the rest of the application.

pub mod memory;
pub mod store;
pub mod workflow;

pub use memory::InMemoryStore;
pub use store::{ExpenseStore, StoreError, StoreResult};
pub use workflow::{PendingApproval, WorkflowRepository};
