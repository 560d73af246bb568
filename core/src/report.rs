//! Markdown notebook kept next to each sweep's outputs.
//!
//! Regions between `<!-- SECTION:<id> start -->` and `<!-- SECTION:<id> end -->`
//! are regenerated on every run; everything else is left for hand-written notes.

use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};

use crate::{
    record::{LossReading, SweepRecord},
    reduce::ReducedSweep,
};

pub const SWEEP_REPORT_TEMPLATE: &str = r"# Layer Sensitivity Sweep

<!-- Notes about the sweep (model, dataset, what was tuned) go here. -->

## Configuration

<!-- SECTION:configuration start -->
<!-- SECTION:configuration end -->

## Results

<!-- SECTION:results start -->
<!-- SECTION:results end -->

## Best Layer

<!-- SECTION:best start -->
<!-- SECTION:best end -->

## Figures

<!-- SECTION:figures start -->
<!-- SECTION:figures end -->
";

#[derive(Clone, Debug)]
pub struct ReportSection {
    id: String,
    content: String,
}

impl ReportSection {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }

    fn markers(&self) -> (String, String) {
        (
            format!("<!-- SECTION:{} start -->", self.id),
            format!("<!-- SECTION:{} end -->", self.id),
        )
    }

    /// Swap this section's body into `document`.
    fn apply(&self, document: &str) -> Result<String> {
        let (start, end) = self.markers();
        let (head, rest) = document
            .split_once(&start)
            .ok_or_else(|| anyhow!("report has no '{}' marker", start))?;
        let (_, tail) = rest
            .split_once(&end)
            .ok_or_else(|| anyhow!("report has no '{}' marker", end))?;

        let body = self.content.trim_matches('\n');
        let mut updated = String::with_capacity(document.len() + body.len());
        updated.push_str(head);
        updated.push_str(&start);
        updated.push('\n');
        if !body.is_empty() {
            updated.push_str(body);
            updated.push('\n');
        }
        updated.push_str(&end);
        updated.push_str(tail);
        Ok(updated)
    }
}

/// A notebook file on disk.
#[derive(Clone, Debug)]
pub struct Notebook {
    path: PathBuf,
}

impl Notebook {
    /// Open `path`, creating it from `template` when it does not exist yet.
    pub fn open_or_create(path: impl Into<PathBuf>, template: &str) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        if !path.exists() {
            fs::write(&path, template)
                .with_context(|| format!("failed to write report template to {}", path.display()))?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace every listed section; the file is untouched if any marker is missing.
    pub fn update(&self, sections: &[ReportSection]) -> Result<()> {
        let original = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read report at {}", self.path.display()))?;

        let updated = sections
            .iter()
            .try_fold(original, |document, section| section.apply(&document))
            .with_context(|| format!("failed to update report at {}", self.path.display()))?;

        fs::write(&self.path, updated)
            .with_context(|| format!("failed to write report to {}", self.path.display()))
    }
}

/// Bullet list of `(name, value)` settings.
pub fn configuration_section(settings: &[(&str, String)]) -> ReportSection {
    let mut output = String::new();
    for (name, value) in settings {
        let _ = writeln!(&mut output, "- {}: {}", name, value);
    }
    ReportSection::new("configuration", output)
}

/// Every record in layer order, placeholders included.
pub fn results_section(records: &[SweepRecord]) -> ReportSection {
    if records.is_empty() {
        return ReportSection::new("results", "No runs were found for this sweep.");
    }

    let mut output = String::new();
    let _ = writeln!(&mut output, "| Layer | Loss | Status |");
    let _ = writeln!(&mut output, "| --- | --- | --- |");
    for record in records {
        let (loss, status) = match &record.loss {
            LossReading::Value(value) => (format!("{value:.4}"), "ok".to_string()),
            LossReading::Missing => ("-".to_string(), "missing".to_string()),
            LossReading::Malformed(reason) => ("-".to_string(), format!("malformed: {reason}")),
        };
        let _ = writeln!(&mut output, "| {} | {} | {} |", record.layer_id, loss, status);
    }
    ReportSection::new("results", output)
}

pub fn best_section(sweep: &ReducedSweep) -> ReportSection {
    let best = sweep.best();
    let (_, worst) = sweep.loss_range();
    let content = format!(
        "- Best layer: {}\n- Best loss: {:.4}\n- Worst loss: {:.4}\n- Valid runs: {}\n- Dropped runs: {}\n",
        best.layer_id,
        best.loss,
        worst,
        sweep.records().len(),
        sweep.dropped()
    );
    ReportSection::new("best", content)
}

/// Image links, relative to the notebook when possible.
pub fn figures_section(notebook: &Notebook, figures: &[(&str, &Path)]) -> ReportSection {
    let base = notebook.path().parent().unwrap_or_else(|| Path::new(""));
    let mut output = String::new();
    for &(caption, path) in figures {
        let link = path.strip_prefix(base).unwrap_or(path);
        let _ = writeln!(&mut output, "![{}]({})\n", caption, link.display());
    }
    ReportSection::new("figures", output)
}
