//! Sweep result loaders.
//!
//! A loader either returns a [`SweepResultSet`] covering every layer it was
//! asked about or found, or fails because the top-level source (the table
//! file, the run directory) cannot be reached. A broken individual run is
//! never a failure: it comes back as a `Missing` or `Malformed` reading.

mod run_log;
mod tabular;

pub use run_log::{parse_run_log, LogFields, RunLogSource};
pub use tabular::TabularSource;

use crate::{error::Result, record::SweepResultSet};

/// Anything that can produce the records of one sweep.
pub trait SweepSource {
    fn load(&self) -> Result<SweepResultSet>;

    /// Short human-readable description used in logs and reports.
    fn describe(&self) -> String;
}
