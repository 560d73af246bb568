use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};

/// Command line shared by the sweep binaries.
#[derive(Clone, Debug, Default)]
pub struct SweepArgs {
    config: Option<PathBuf>,
    help_requested: bool,
}

impl SweepArgs {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args().skip(1))
    }

    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = Self::default();
        let mut iter = args.into_iter();

        while let Some(arg) = iter.next() {
            if arg == "--config" || arg == "-c" {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("expected a path after {}", arg))?;
                parsed.config = Some(PathBuf::from(value));
            } else if let Some(value) = arg.strip_prefix("--config=") {
                parsed.config = Some(PathBuf::from(value));
            } else if arg == "--help" || arg == "-h" {
                parsed.help_requested = true;
            } else {
                return Err(anyhow!("unexpected argument: {}", arg));
            }
        }

        Ok(parsed)
    }

    pub fn help_requested(&self) -> bool {
        self.help_requested
    }

    /// Explicit `--config` path, or `default` when none was given.
    pub fn config_path(&self, default: &Path) -> PathBuf {
        self.config.clone().unwrap_or_else(|| default.to_path_buf())
    }
}

/// Where a sweep binary keeps its config, notebook and summary.
#[derive(Clone, Debug)]
pub struct SweepPaths {
    pub dir: PathBuf,
    pub report: PathBuf,
    pub summary: PathBuf,
}

impl SweepPaths {
    /// Notebook and summary live next to the config file.
    pub fn beside(config: &Path) -> Self {
        let dir = config
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            report: dir.join("report.md"),
            summary: dir.join("summary.json"),
            dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<SweepArgs> {
        SweepArgs::parse(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults_without_flags() {
        let parsed = args(&[]).expect("parse");
        assert!(!parsed.help_requested());
        assert_eq!(
            parsed.config_path(Path::new("sweep/config.json")),
            PathBuf::from("sweep/config.json")
        );
    }

    #[test]
    fn config_flag_forms() {
        for list in [
            vec!["--config", "a.json"],
            vec!["-c", "a.json"],
            vec!["--config=a.json"],
        ] {
            let parsed = args(&list).expect("parse");
            assert_eq!(parsed.config_path(Path::new("x")), PathBuf::from("a.json"));
        }
    }

    #[test]
    fn rejects_unknown_and_dangling_flags() {
        assert!(args(&["--mode", "full"]).is_err());
        assert!(args(&["--config"]).is_err());
    }

    #[test]
    fn help_flag_is_recorded() {
        assert!(args(&["-h"]).expect("parse").help_requested());
    }

    #[test]
    fn outputs_sit_beside_config() {
        let paths = SweepPaths::beside(Path::new("runs/sweep/config.json"));
        assert_eq!(paths.report, PathBuf::from("runs/sweep/report.md"));
        assert_eq!(paths.summary, PathBuf::from("runs/sweep/summary.json"));
    }
}
