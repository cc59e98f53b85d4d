//! Scenario data model: accounts, transactions, goals, and the scenario
//! container the engines consume. All types are plain serde-derived data;
//! the engines never mutate a caller's scenario.

pub mod account;
pub mod goal;
pub mod scenario;
pub mod transaction;

pub use account::{Account, AccountKind, ScheduledChange};
pub use goal::{Goal, GoalKind, SolverConstraints, SolverSettings};
pub use scenario::{DateRange, Planning, ProjectionWindow, Scenario};
pub use transaction::{Transaction, TransactionKind, TransactionStatus};
