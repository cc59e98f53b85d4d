//! Calendar scheduling: recurrence-date generation and reporting-period
//! boundary construction.

pub mod periods;
pub mod recurrence;

pub use periods::{generate_periods, Period, Periodicity};
pub use recurrence::{generate_dates, Recurrence, RecurrenceRule};
