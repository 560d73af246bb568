use std::{fs, io, path::PathBuf};

use serde_json::Value;

use super::SweepSource;
use crate::{
    error::{Result, SweepError},
    record::{LayerId, LossReading, SweepRecord, SweepResultSet},
};

/// Where the final loss lives inside a trainer-state log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogFields {
    /// List of logged entries; the last one is read.
    pub history: String,
    pub loss: String,
}

impl Default for LogFields {
    fn default() -> Self {
        Self {
            history: "log_history".to_string(),
            loss: "train_loss".to_string(),
        }
    }
}

/// Loads one JSON log per layer from `<base_dir>/<prefix><layer>/<file_name>`.
#[derive(Clone, Debug)]
pub struct RunLogSource {
    base_dir: PathBuf,
    layers: Vec<LayerId>,
    run_dir_prefix: String,
    log_file_name: String,
    fields: LogFields,
}

impl RunLogSource {
    pub fn new(base_dir: impl Into<PathBuf>, layers: Vec<LayerId>) -> Self {
        Self {
            base_dir: base_dir.into(),
            layers,
            run_dir_prefix: "layer_".to_string(),
            log_file_name: "trainer_state.json".to_string(),
            fields: LogFields::default(),
        }
    }

    pub fn with_layout(
        mut self,
        run_dir_prefix: impl Into<String>,
        log_file_name: impl Into<String>,
    ) -> Self {
        self.run_dir_prefix = run_dir_prefix.into();
        self.log_file_name = log_file_name.into();
        self
    }

    pub fn with_fields(mut self, fields: LogFields) -> Self {
        self.fields = fields;
        self
    }

    pub fn log_path(&self, layer: LayerId) -> PathBuf {
        self.base_dir
            .join(format!("{}{}", self.run_dir_prefix, layer))
            .join(&self.log_file_name)
    }

    fn read_layer(&self, layer: LayerId) -> LossReading {
        let path = self.log_path(layer);
        match fs::read_to_string(&path) {
            Ok(text) => parse_run_log(&text, &self.fields),
            Err(err) if err.kind() == io::ErrorKind::NotFound => LossReading::Missing,
            Err(err) => LossReading::Malformed(format!("cannot read {}: {err}", path.display())),
        }
    }

    fn check_base_dir(&self) -> Result<()> {
        let metadata = fs::metadata(&self.base_dir).map_err(|source| {
            SweepError::SourceUnavailable {
                path: self.base_dir.clone(),
                source,
            }
        })?;
        if metadata.is_dir() {
            Ok(())
        } else {
            Err(SweepError::SourceUnavailable {
                path: self.base_dir.clone(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
            })
        }
    }
}

impl SweepSource for RunLogSource {
    fn load(&self) -> Result<SweepResultSet> {
        self.check_base_dir()?;

        let mut set = SweepResultSet::default();
        for &layer in &self.layers {
            let loss = self.read_layer(layer);
            match &loss {
                LossReading::Value(value) => {
                    tracing::debug!("layer {}: loss = {:.4}", layer, value)
                }
                LossReading::Missing => tracing::warn!(
                    "layer {}: no log at {}",
                    layer,
                    self.log_path(layer).display()
                ),
                LossReading::Malformed(reason) => {
                    tracing::warn!("layer {}: unusable log ({})", layer, reason)
                }
            }
            set.push(SweepRecord::new(layer, loss));
        }

        tracing::info!(
            "read {} run logs under {} ({} valid)",
            set.len(),
            self.base_dir.display(),
            set.valid_count()
        );
        Ok(set)
    }

    fn describe(&self) -> String {
        format!(
            "{}/{}<layer>/{} ({} layers)",
            self.base_dir.display(),
            self.run_dir_prefix,
            self.log_file_name,
            self.layers.len()
        )
    }
}

/// Pull the final loss out of a trainer-state document.
pub fn parse_run_log(text: &str, fields: &LogFields) -> LossReading {
    let document: Value = match serde_json::from_str(text) {
        Ok(document) => document,
        Err(err) => return LossReading::Malformed(format!("invalid JSON: {err}")),
    };

    let Some(history) = document.get(&fields.history).and_then(Value::as_array) else {
        return LossReading::Malformed(format!("no '{}' list", fields.history));
    };
    let Some(last) = history.last() else {
        return LossReading::Malformed(format!("'{}' is empty", fields.history));
    };

    match last.get(&fields.loss) {
        None => LossReading::Malformed(format!(
            "last '{}' entry has no '{}'",
            fields.history, fields.loss
        )),
        Some(Value::Null) => LossReading::Missing,
        Some(value) => match value.as_f64() {
            Some(loss) => LossReading::from_number(loss),
            None => LossReading::Malformed(format!("'{}' is not a number: {value}", fields.loss)),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn write_log(base: &Path, layer: LayerId, body: &str) {
        let dir = base.join(format!("layer_{layer}"));
        fs::create_dir_all(&dir).expect("create run dir");
        fs::write(dir.join("trainer_state.json"), body).expect("write log");
    }

    #[test]
    fn reads_last_history_entry() {
        let text = r#"{"log_history": [
            {"loss": 2.1, "step": 10},
            {"loss": 1.4, "step": 20},
            {"train_loss": 1.3721, "step": 20}
        ]}"#;

        assert_eq!(
            parse_run_log(text, &LogFields::default()),
            LossReading::Value(1.3721)
        );
    }

    #[test]
    fn broken_documents_are_malformed() {
        let fields = LogFields::default();
        for text in [
            "{not json",
            r#"{"global_step": 20}"#,
            r#"{"log_history": []}"#,
            r#"{"log_history": [{"train_loss": 1.0}, {"loss": 0.9}]}"#,
            r#"{"log_history": [{"train_loss": "low"}]}"#,
        ] {
            assert!(
                matches!(parse_run_log(text, &fields), LossReading::Malformed(_)),
                "expected malformed for {text}"
            );
        }
    }

    #[test]
    fn null_loss_is_missing() {
        let text = r#"{"log_history": [{"train_loss": null}]}"#;
        assert_eq!(
            parse_run_log(text, &LogFields::default()),
            LossReading::Missing
        );
    }

    #[test]
    fn custom_fields_are_honoured() {
        let fields = LogFields {
            history: "evals".into(),
            loss: "eval_loss".into(),
        };
        let text = r#"{"evals": [{"eval_loss": 0.5}]}"#;
        assert_eq!(parse_run_log(text, &fields), LossReading::Value(0.5));
    }

    #[test]
    fn missing_run_becomes_placeholder() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_log(dir.path(), 0, r#"{"log_history": [{"train_loss": 1.2}]}"#);
        write_log(dir.path(), 8, r#"{"log_history": [{"train_loss": 0.9}]}"#);

        let set = RunLogSource::new(dir.path(), vec![0, 4, 8])
            .load()
            .expect("load run logs");

        assert_eq!(
            set.records(),
            &[
                SweepRecord::new(0, LossReading::Value(1.2)),
                SweepRecord::new(4, LossReading::Missing),
                SweepRecord::new(8, LossReading::Value(0.9)),
            ]
        );
    }

    #[test]
    fn custom_layout_builds_paths() {
        let source = RunLogSource::new("runs", vec![3]).with_layout("ffn-", "state.json");
        assert_eq!(
            source.log_path(3),
            Path::new("runs").join("ffn-3").join("state.json")
        );
    }

    #[test]
    fn absent_base_dir_is_a_hard_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let result = RunLogSource::new(dir.path().join("gone"), vec![0]).load();
        assert!(matches!(result, Err(SweepError::SourceUnavailable { .. })));
    }

    #[test]
    fn base_path_that_is_a_file_is_a_hard_error() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        let result = RunLogSource::new(file.path(), vec![0]).load();
        assert!(matches!(result, Err(SweepError::SourceUnavailable { .. })));
    }
}
