use std::{io, path::PathBuf};

use thiserror::Error;

/// Failures that stop a sweep pipeline.
///
/// Problems with a single record never show up here; they are carried as a
/// [`LossReading`](crate::record::LossReading) on the record itself.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("sweep source {} is unavailable: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("column '{column}' not found in {}; available columns: {available:?}", .path.display())]
    MissingColumn {
        path: PathBuf,
        column: String,
        available: Vec<String>,
    },

    #[error("no valid loss values among {total} sweep records")]
    EmptySweep { total: usize },

    #[error("failed to render {}: {message}", .path.display())]
    Render { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, SweepError>;
