pub mod colormap;
pub mod config;
pub mod error;
pub mod experiment;
pub mod loader;
pub mod record;
pub mod reduce;
pub mod report;
pub mod summary;
pub mod visualization;

pub use config::{load_or_init, FigureConfig, RunLogSweepConfig, TabularSweepConfig};
pub use error::{Result, SweepError};
pub use experiment::{SweepArgs, SweepPaths};
pub use loader::{RunLogSource, SweepSource, TabularSource};
pub use record::{BestPoint, LayerId, LossReading, SweepRecord, SweepResultSet, ValidRecord};
pub use reduce::{reduce, ReducedSweep};
pub use report::{Notebook, ReportSection, SWEEP_REPORT_TEMPLATE};
pub use summary::SweepSummary;
pub use visualization::{CurveLabels, PanelLabels};
