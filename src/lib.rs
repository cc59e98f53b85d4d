//! Forecast Engine - account balance forecasting with recurrence expansion
//! and a constrained multi-goal contribution solver
//!
//! This library provides:
//! - Calendar-aligned reporting periods and recurrence-rule expansion
//! - Per-account balance projection with checkpointed growth accrual
//! - Periodic-change (interest/escalation) math and time-value-of-money helpers
//! - A prioritized goal solver that suggests monthly contributions under
//!   funding, cap, lock, and balance-floor constraints

pub mod error;
pub mod growth;
pub mod model;
pub mod projection;
pub mod schedule;
pub mod solver;

// Re-export commonly used types
pub use error::{Error, Result};
pub use model::{Account, Goal, Scenario, SolverSettings, Transaction};
pub use projection::{ProjectionEngine, ProjectionOptions, ProjectionRecord, ProjectionTable};
pub use solver::{GoalSolver, SolveResult};
