use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    record::{BestPoint, LayerId, SweepResultSet, ValidRecord},
    reduce::ReducedSweep,
};

/// Machine-readable outcome of one sweep, written as `summary.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub source: String,
    pub best: BestPoint,
    pub records: Vec<ValidRecord>,
    /// Layers that came back without a usable loss.
    pub placeholders: Vec<LayerId>,
}

impl SweepSummary {
    pub fn new(
        source: impl Into<String>,
        loaded: &SweepResultSet,
        reduced: &ReducedSweep,
    ) -> Self {
        let placeholders = loaded
            .sorted_by_layer()
            .into_iter()
            .filter(|record| !record.loss.is_valid())
            .map(|record| record.layer_id)
            .collect();

        Self {
            source: source.into(),
            best: reduced.best(),
            records: reduced.records().to_vec(),
            placeholders,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("failed to write summary to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        record::{LossReading, SweepRecord},
        reduce::reduce,
    };

    #[test]
    fn summary_lists_placeholders_in_layer_order() {
        let loaded: SweepResultSet = vec![
            SweepRecord::new(12, LossReading::Missing),
            SweepRecord::new(0, LossReading::Value(1.1)),
            SweepRecord::new(4, LossReading::Malformed("bad".into())),
            SweepRecord::new(8, LossReading::Value(0.7)),
        ]
        .into_iter()
        .collect();
        let reduced = reduce(&loaded).expect("reduce sweep");

        let summary = SweepSummary::new("scan.csv", &loaded, &reduced);

        assert_eq!(summary.placeholders, vec![4, 12]);
        assert_eq!(summary.best.layer_id, 8);
        assert_eq!(summary.records.len(), 2);
    }

    #[test]
    fn saved_summary_reads_back() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("out/summary.json");
        let loaded: SweepResultSet = vec![SweepRecord::new(3, LossReading::Value(0.42))]
            .into_iter()
            .collect();
        let reduced = reduce(&loaded).expect("reduce sweep");
        let summary = SweepSummary::new("runs", &loaded, &reduced);

        summary.save(&path).expect("save summary");

        let text = fs::read_to_string(&path).expect("read summary");
        let restored: SweepSummary = serde_json::from_str(&text).expect("parse summary");
        assert_eq!(restored, summary);
    }
}
