use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use layerscan_core::{
    load_or_init, reduce,
    report::{best_section, configuration_section, figures_section, results_section},
    visualization::render_sensitivity_panel,
    Notebook, PanelLabels, ReducedSweep, SweepArgs, SweepPaths, SweepRecord, SweepSource,
    SweepSummary, TabularSweepConfig, SWEEP_REPORT_TEMPLATE,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();

    let args = SweepArgs::parse_from_env()?;
    if args.help_requested() {
        print_usage();
        return Ok(());
    }

    let config_path = args.config_path(&default_config_path());
    let config: TabularSweepConfig = load_or_init(&config_path, TabularSweepConfig::default)?;
    let paths = SweepPaths::beside(&config_path);

    if let Err(err) = run(&config, &paths) {
        println!("failed to build the sensitivity heatmap: {err:#}");
        println!("check that {} exists and has data rows.", config.csv_path.display());
        return Err(err);
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_usage() {
    println!("Usage: cargo run -p layerscan-experiment-eval-heatmap -- [--config <path>]");
    println!("Reads a layer-scan CSV and draws a bar chart over a loss heatmap.");
}

fn default_config_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("sweep/config.json")
}

fn run(config: &TabularSweepConfig, paths: &SweepPaths) -> Result<()> {
    let source = config.source();
    println!("reading sweep results from {}", source.describe());

    let loaded = source.load()?;
    let sweep = reduce(&loaded)?;
    let best = sweep.best();
    println!(
        "{} of {} rows usable; best layer {} with eval loss {:.4}",
        sweep.records().len(),
        loaded.len(),
        best.layer_id,
        best.loss
    );

    let labels = PanelLabels {
        title: config.title.clone(),
        loss_label: "Eval Loss".to_string(),
    };
    render_sensitivity_panel(&config.output_image, &sweep, &labels, &config.figure)?;
    println!("saved figure to {}", config.output_image.display());

    SweepSummary::new(source.describe(), &loaded, &sweep).save(&paths.summary)?;
    write_report(paths, config, &loaded.sorted_by_layer(), &sweep)
        .context("failed to update the sweep notebook")?;
    println!("updated {}", paths.report.display());

    Ok(())
}

fn write_report(
    paths: &SweepPaths,
    config: &TabularSweepConfig,
    records: &[SweepRecord],
    sweep: &ReducedSweep,
) -> Result<()> {
    let notebook = Notebook::open_or_create(&paths.report, SWEEP_REPORT_TEMPLATE)?;
    let figure = absolute(&config.output_image);
    let (width, height) = config.figure.pixels();

    notebook.update(&[
        configuration_section(&[
            ("Results table", config.csv_path.display().to_string()),
            ("Layer column", config.layer_column.clone()),
            ("Loss column", config.loss_column.clone()),
            ("Figure", format!("{width}x{height} px at {} dpi", config.figure.dpi)),
        ]),
        results_section(records),
        best_section(sweep),
        figures_section(&notebook, &[("Layer sensitivity", figure.as_path())]),
    ])
}

fn absolute(path: &Path) -> PathBuf {
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
