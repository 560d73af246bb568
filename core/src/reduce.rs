use serde::Serialize;

use crate::{
    error::{Result, SweepError},
    record::{BestPoint, SweepResultSet, ValidRecord},
};

/// Valid records of a sweep in ascending layer order, with the best point.
///
/// Construction goes through [`reduce`], so a `ReducedSweep` always holds at
/// least one record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReducedSweep {
    records: Vec<ValidRecord>,
    best: BestPoint,
    dropped: usize,
}

impl ReducedSweep {
    pub fn records(&self) -> &[ValidRecord] {
        &self.records
    }

    pub fn best(&self) -> BestPoint {
        self.best
    }

    /// Number of records filtered out for a missing or malformed loss.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Smallest and largest loss among the valid records.
    pub fn loss_range(&self) -> (f64, f64) {
        let max = self
            .records
            .iter()
            .map(|record| record.loss)
            .fold(f64::NEG_INFINITY, f64::max);
        (self.best.loss, max)
    }
}

/// Drop unusable readings, order by layer and pick the lowest loss.
pub fn reduce(set: &SweepResultSet) -> Result<ReducedSweep> {
    let mut records: Vec<ValidRecord> = set
        .records()
        .iter()
        .filter_map(|record| {
            record.loss.value().map(|loss| ValidRecord {
                layer_id: record.layer_id,
                loss,
            })
        })
        .collect();
    records.sort_by_key(|record| record.layer_id);

    let best = argmin(&records).ok_or(SweepError::EmptySweep { total: set.len() })?;
    let dropped = set.len() - records.len();

    tracing::debug!(
        valid = records.len(),
        dropped,
        best_layer = best.layer_id,
        best_loss = best.loss,
        "reduced sweep"
    );

    Ok(ReducedSweep {
        records,
        best,
        dropped,
    })
}

// First minimum wins, so ties go to the lower layer.
fn argmin(records: &[ValidRecord]) -> Option<BestPoint> {
    let mut best: Option<ValidRecord> = None;
    for record in records {
        match best {
            Some(current) if record.loss >= current.loss => {}
            _ => best = Some(*record),
        }
    }
    best.map(BestPoint::from)
}
