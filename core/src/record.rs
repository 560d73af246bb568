use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of the transformer layer a sweep run fine-tuned.
pub type LayerId = u32;

/// Outcome of reading the loss for one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum LossReading {
    Value(f64),
    /// The run produced nothing to read (absent log, empty cell, `null`).
    Missing,
    /// Something was there but could not be turned into a finite loss.
    Malformed(String),
}

impl LossReading {
    /// Coerce a raw table cell into a reading.
    pub fn from_cell(cell: &str) -> Self {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return Self::Missing;
        }

        match trimmed.parse::<f64>() {
            Ok(value) => Self::from_number(value),
            Err(_) => Self::Malformed(format!("'{trimmed}' is not a number")),
        }
    }

    pub fn from_number(value: f64) -> Self {
        if value.is_finite() {
            Self::Value(value)
        } else {
            Self::Malformed(format!("non-finite loss {value}"))
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value(value) => Some(*value),
            Self::Missing | Self::Malformed(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.value().is_some()
    }
}

impl fmt::Display for LossReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => write!(f, "{value:.4}"),
            Self::Missing => f.write_str("missing"),
            Self::Malformed(reason) => write!(f, "malformed ({reason})"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepRecord {
    pub layer_id: LayerId,
    pub loss: LossReading,
}

impl SweepRecord {
    pub fn new(layer_id: LayerId, loss: LossReading) -> Self {
        Self { layer_id, loss }
    }
}

/// Records of one sweep, in the order the source produced them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SweepResultSet {
    records: Vec<SweepRecord>,
}

impl SweepResultSet {
    pub fn new(records: Vec<SweepRecord>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, record: SweepRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[SweepRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn valid_count(&self) -> usize {
        self.records.iter().filter(|r| r.loss.is_valid()).count()
    }

    /// All records, placeholders included, stable-sorted by layer.
    pub fn sorted_by_layer(&self) -> Vec<SweepRecord> {
        let mut records = self.records.clone();
        records.sort_by_key(|record| record.layer_id);
        records
    }
}

impl FromIterator<SweepRecord> for SweepResultSet {
    fn from_iter<I: IntoIterator<Item = SweepRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A record whose loss was read successfully.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidRecord {
    pub layer_id: LayerId,
    pub loss: f64,
}

/// The valid record with the lowest loss.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BestPoint {
    pub layer_id: LayerId,
    pub loss: f64,
}

impl From<ValidRecord> for BestPoint {
    fn from(record: ValidRecord) -> Self {
        Self {
            layer_id: record.layer_id,
            loss: record.loss,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_are_coerced_without_failing() {
        assert_eq!(LossReading::from_cell(" 1.25 "), LossReading::Value(1.25));
        assert_eq!(LossReading::from_cell(""), LossReading::Missing);
        assert!(matches!(
            LossReading::from_cell("N/A"),
            LossReading::Malformed(_)
        ));
        assert!(matches!(
            LossReading::from_cell("NaN"),
            LossReading::Malformed(_)
        ));
        assert!(matches!(
            LossReading::from_cell("inf"),
            LossReading::Malformed(_)
        ));
    }

    #[test]
    fn sorting_keeps_placeholders() {
        let set: SweepResultSet = vec![
            SweepRecord::new(8, LossReading::Missing),
            SweepRecord::new(0, LossReading::Value(1.0)),
            SweepRecord::new(4, LossReading::Malformed("bad".into())),
        ]
        .into_iter()
        .collect();

        let layers: Vec<_> = set.sorted_by_layer().iter().map(|r| r.layer_id).collect();
        assert_eq!(layers, vec![0, 4, 8]);
        assert_eq!(set.valid_count(), 1);
    }

    #[test]
    fn readings_display_for_console() {
        assert_eq!(LossReading::Value(0.81234).to_string(), "0.8123");
        assert_eq!(LossReading::Missing.to_string(), "missing");
    }
}
