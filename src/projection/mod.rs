//! Balance projection: transaction expansion and the per-account
//! checkpointed simulator.

pub mod engine;
pub mod expander;
pub mod record;

pub use engine::{ProjectionEngine, ProjectionOptions};
pub use expander::{expand_transactions, Occurrence};
pub use record::{round_cents, AccountSummary, ProjectionRecord, ProjectionTable};
