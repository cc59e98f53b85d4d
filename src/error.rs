//! Crate error taxonomy
//!
//! Only configuration-level problems surface as errors: a scenario without a
//! projection window, unreadable input files, structurally invalid data.
//! Simulation-level anomalies (a malformed periodic change on one account, an
//! unparseable custom date) are skipped with a warning inside the engines, and
//! the goal solver never returns an error at all - infeasibility and backend
//! failures are folded into its `SolveResult`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The scenario (and options) did not specify a projection start/end.
    #[error("scenario projection config missing start or end date")]
    MissingProjectionWindow,

    /// Scenario/settings content failed structural validation.
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("failed to read input file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse JSON input: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
