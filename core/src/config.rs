use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    loader::{LogFields, RunLogSource, TabularSource},
    record::LayerId,
};

/// Load a JSON configuration from disk, writing `initializer()` there first if it is missing.
pub fn load_or_init<T, F>(path: &Path, initializer: F) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> T,
{
    if path.exists() {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        let value = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;
        tracing::debug!("loaded config from {}", path.display());
        return Ok(value);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let value = initializer();
    let serialized = serde_json::to_string_pretty(&value)?;
    fs::write(path, serialized)
        .with_context(|| format!("failed to write config to {}", path.display()))?;
    tracing::info!("wrote default config to {}", path.display());
    Ok(value)
}

/// Physical figure size; fonts are specified in points and scaled by `dpi`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FigureConfig {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
}

impl FigureConfig {
    pub fn pixels(&self) -> (u32, u32) {
        (
            (self.width_in * self.dpi as f64).round() as u32,
            (self.height_in * self.dpi as f64).round() as u32,
        )
    }

    pub fn font_px(&self, points: f64) -> f64 {
        points * self.dpi as f64 / 72.0
    }

    /// Pixel length for a size given in points.
    pub fn px(&self, points: f64) -> i32 {
        self.font_px(points).round() as i32
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabularSweepConfig {
    pub csv_path: PathBuf,
    pub layer_column: String,
    pub loss_column: String,
    pub output_image: PathBuf,
    pub title: String,
    pub figure: FigureConfig,
}

impl Default for TabularSweepConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("saves/llama3-8b/layer_scan_qlora/scan_results.csv"),
            layer_column: "Layer_ID".to_string(),
            loss_column: "Eval_Loss".to_string(),
            output_image: PathBuf::from("layer_sensitivity_heatmap.png"),
            title: "Layer Sensitivity Analysis (Llama-3-8B on Math): LOWER Loss = BETTER".to_string(),
            figure: FigureConfig {
                width_in: 10.0,
                height_in: 8.0,
                dpi: 300,
            },
        }
    }
}

impl TabularSweepConfig {
    pub fn source(&self) -> TabularSource {
        TabularSource::new(&self.csv_path, &self.layer_column, &self.loss_column)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunLogSweepConfig {
    pub base_dir: PathBuf,
    pub layers: Vec<LayerId>,
    pub run_dir_prefix: String,
    pub log_file_name: String,
    pub history_field: String,
    pub loss_field: String,
    pub output_png: PathBuf,
    pub output_svg: Option<PathBuf>,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series_label: String,
    pub figure: FigureConfig,
}

impl Default for RunLogSweepConfig {
    fn default() -> Self {
        let fields = LogFields::default();
        Self {
            base_dir: PathBuf::from("saves/llama3-8b/layer_scan"),
            layers: vec![0, 4, 8, 10, 12, 16, 20, 24, 28, 31],
            run_dir_prefix: "layer_".to_string(),
            log_file_name: "trainer_state.json".to_string(),
            history_field: fields.history,
            loss_field: fields.loss,
            output_png: PathBuf::from("layer_sensitivity_result.png"),
            output_svg: Some(PathBuf::from("layer_sensitivity_result.svg")),
            title: "Layer Sensitivity Analysis: GSM8K Fine-tuning".to_string(),
            x_label: "Transformer Layer Index".to_string(),
            y_label: "Final Training Loss (Lower is Better)".to_string(),
            series_label: "Llama-3-8B FFN Fine-tuning".to_string(),
            figure: FigureConfig {
                width_in: 10.0,
                height_in: 6.0,
                dpi: 300,
            },
        }
    }
}

impl RunLogSweepConfig {
    pub fn source(&self) -> RunLogSource {
        RunLogSource::new(&self.base_dir, self.layers.clone())
            .with_layout(&self.run_dir_prefix, &self.log_file_name)
            .with_fields(LogFields {
                history: self.history_field.clone(),
                loss: self.loss_field.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_default_then_reads_it_back() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested/config.json");

        let first: RunLogSweepConfig =
            load_or_init(&path, RunLogSweepConfig::default).expect("init config");
        assert!(path.exists());

        let second: RunLogSweepConfig =
            load_or_init(&path, || panic!("config should already exist")).expect("load config");
        assert_eq!(first, second);
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"csv_path": "runs/scan.csv", "loss_column": "Loss"}"#)
            .expect("write config");

        let config: TabularSweepConfig =
            load_or_init(&path, TabularSweepConfig::default).expect("load config");

        assert_eq!(config.csv_path, PathBuf::from("runs/scan.csv"));
        assert_eq!(config.loss_column, "Loss");
        assert_eq!(config.layer_column, "Layer_ID");
    }

    #[test]
    fn invalid_json_is_reported() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.json");
        fs::write(&path, "{").expect("write config");

        let result: Result<TabularSweepConfig> = load_or_init(&path, TabularSweepConfig::default);
        assert!(result.is_err());
    }

    #[test]
    fn figure_scales_points_by_dpi() {
        let figure = FigureConfig {
            width_in: 10.0,
            height_in: 8.0,
            dpi: 300,
        };
        assert_eq!(figure.pixels(), (3000, 2400));
        assert_eq!(figure.px(14.0), 58);
        assert!((figure.font_px(72.0) - 300.0).abs() < 1e-9);
    }

    #[test]
    fn run_log_config_builds_source_paths() {
        let config = RunLogSweepConfig {
            base_dir: PathBuf::from("scan"),
            ..RunLogSweepConfig::default()
        };
        assert_eq!(
            config.source().log_path(12),
            Path::new("scan").join("layer_12").join("trainer_state.json")
        );
    }
}
