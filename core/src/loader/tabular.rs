use std::{fs::File, io::Read, path::PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};

use super::SweepSource;
use crate::{
    error::{Result, SweepError},
    record::{LayerId, LossReading, SweepRecord, SweepResultSet},
};

/// Loads a sweep from a CSV table with one row per layer.
#[derive(Clone, Debug)]
pub struct TabularSource {
    path: PathBuf,
    layer_column: String,
    loss_column: String,
}

impl TabularSource {
    pub fn new(
        path: impl Into<PathBuf>,
        layer_column: impl Into<String>,
        loss_column: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            layer_column: layer_column.into(),
            loss_column: loss_column.into(),
        }
    }

    /// Parse table text from any reader. `self.path` is only used in errors.
    pub fn load_from_reader<R: Read>(&self, reader: R) -> Result<SweepResultSet> {
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|err| self.unavailable(err))?
            .clone();
        let layer_idx = self.column_index(&headers, &self.layer_column)?;
        let loss_idx = self.column_index(&headers, &self.loss_column)?;

        let mut set = SweepResultSet::default();
        let mut skipped = 0usize;

        // Header is line 1.
        for (row, result) in reader.records().enumerate() {
            let line = row + 2;
            let record = match result {
                Ok(record) => record,
                Err(err) => {
                    tracing::warn!("skipping line {} of {}: {}", line, self.path.display(), err);
                    skipped += 1;
                    continue;
                }
            };

            let layer_cell = record.get(layer_idx).unwrap_or("");
            let layer_id = match layer_cell.parse::<LayerId>() {
                Ok(layer_id) => layer_id,
                Err(_) => {
                    tracing::warn!(
                        "skipping line {} of {}: layer '{}' is not an integer",
                        line,
                        self.path.display(),
                        layer_cell
                    );
                    skipped += 1;
                    continue;
                }
            };

            let loss = record
                .get(loss_idx)
                .map_or(LossReading::Missing, LossReading::from_cell);
            if !loss.is_valid() {
                tracing::debug!(layer_id, %loss, "unusable loss cell");
            }
            set.push(SweepRecord::new(layer_id, loss));
        }

        tracing::info!(
            "loaded {} rows from {} ({} valid, {} skipped)",
            set.len(),
            self.path.display(),
            set.valid_count(),
            skipped
        );
        Ok(set)
    }

    fn column_index(&self, headers: &StringRecord, column: &str) -> Result<usize> {
        headers
            .iter()
            .position(|header| header == column)
            .ok_or_else(|| SweepError::MissingColumn {
                path: self.path.clone(),
                column: column.to_string(),
                available: headers.iter().map(str::to_string).collect(),
            })
    }

    fn unavailable(&self, err: csv::Error) -> SweepError {
        let source = match err.into_kind() {
            csv::ErrorKind::Io(io) => io,
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, format!("{other:?}")),
        };
        SweepError::SourceUnavailable {
            path: self.path.clone(),
            source,
        }
    }
}

impl SweepSource for TabularSource {
    fn load(&self) -> Result<SweepResultSet> {
        let file = File::open(&self.path).map_err(|source| SweepError::SourceUnavailable {
            path: self.path.clone(),
            source,
        })?;
        self.load_from_reader(file)
    }

    fn describe(&self) -> String {
        format!(
            "{} (layer column '{}', loss column '{}')",
            self.path.display(),
            self.layer_column,
            self.loss_column
        )
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Write, path::Path};

    use tempfile::NamedTempFile;

    use super::*;

    fn source(path: &Path) -> TabularSource {
        TabularSource::new(path, "Layer_ID", "Eval_Loss")
    }

    #[test]
    fn loads_rows_and_coerces_losses() {
        let text = "Layer_ID,Eval_Loss,Notes\n0,1.2,ok\n4, 0.8 ,ok\n8,NaN,diverged\n12,,pending\n";

        let set = source(Path::new("scan.csv"))
            .load_from_reader(text.as_bytes())
            .expect("load table");

        let layers: Vec<_> = set.records().iter().map(|r| r.layer_id).collect();
        assert_eq!(layers, vec![0, 4, 8, 12]);
        assert_eq!(set.records()[1].loss, LossReading::Value(0.8));
        assert!(matches!(set.records()[2].loss, LossReading::Malformed(_)));
        assert_eq!(set.records()[3].loss, LossReading::Missing);
    }

    #[test]
    fn short_rows_and_bad_layers_do_not_abort() {
        let text = "Eval_Loss,Layer_ID\n1.0,0\n0.9\nfoo,4\n0.7,x\n0.5,8\n";

        let set = source(Path::new("scan.csv"))
            .load_from_reader(text.as_bytes())
            .expect("load table");

        let layers: Vec<_> = set.records().iter().map(|r| r.layer_id).collect();
        assert_eq!(layers, vec![0, 4, 8]);
        assert_eq!(set.valid_count(), 2);
    }

    #[test]
    fn missing_column_is_a_hard_error() {
        let text = "Layer_ID,Train_Loss\n0,1.0\n";

        match source(Path::new("scan.csv")).load_from_reader(text.as_bytes()) {
            Err(SweepError::MissingColumn {
                column, available, ..
            }) => {
                assert_eq!(column, "Eval_Loss");
                assert_eq!(available, vec!["Layer_ID", "Train_Loss"]);
            }
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn empty_file_reports_missing_column() {
        let set = source(Path::new("scan.csv")).load_from_reader("".as_bytes());
        assert!(matches!(set, Err(SweepError::MissingColumn { .. })));
    }

    #[test]
    fn absent_file_is_unavailable() {
        let dir = tempfile::tempdir().expect("temp dir");
        let result = source(&dir.path().join("nope.csv")).load();
        assert!(matches!(result, Err(SweepError::SourceUnavailable { .. })));
    }

    #[test]
    fn loads_from_disk() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "Layer_ID,Eval_Loss").expect("write header");
        writeln!(file, "16,0.91").expect("write row");
        writeln!(file, "2,0.95").expect("write row");

        let set = source(file.path()).load().expect("load table");

        assert_eq!(set.len(), 2);
        assert_eq!(set.records()[0].loss, LossReading::Value(0.91));
    }
}
