use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use layerscan_core::{
    load_or_init, reduce,
    report::{best_section, configuration_section, figures_section, results_section},
    visualization::{render_loss_curve_png, render_loss_curve_svg},
    CurveLabels, LossReading, Notebook, ReducedSweep, RunLogSweepConfig, SweepArgs, SweepPaths,
    SweepRecord, SweepSource, SweepSummary, SWEEP_REPORT_TEMPLATE,
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
    let config: RunLogSweepConfig = load_or_init(&config_path, RunLogSweepConfig::default)?;
    let paths = SweepPaths::beside(&config_path);

    if let Err(err) = run(&config, &paths) {
        println!("failed to build the loss curve: {err:#}");
        return Err(err);
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_usage() {
    println!("Usage: cargo run -p layerscan-experiment-train-curve -- [--config <path>]");
    println!("Reads one trainer-state log per layer and plots final training loss by layer.");
}

fn default_config_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("sweep/config.json")
}

fn run(config: &RunLogSweepConfig, paths: &SweepPaths) -> Result<()> {
    let source = config.source();
    println!("extracting final losses from {}", source.describe());

    let loaded = source.load()?;
    let records = loaded.sorted_by_layer();
    for record in &records {
        match &record.loss {
            LossReading::Value(loss) => {
                println!("layer {:>3}: loss = {:.4}", record.layer_id, loss)
            }
            other => println!("layer {:>3}: no data ({})", record.layer_id, other),
        }
    }

    let sweep = reduce(&loaded)?;
    let best = sweep.best();
    println!(
        "best layer {} with final training loss {:.4}",
        best.layer_id, best.loss
    );

    let labels = CurveLabels {
        title: config.title.clone(),
        x_label: config.x_label.clone(),
        y_label: config.y_label.clone(),
        series_label: config.series_label.clone(),
    };
    render_loss_curve_png(&config.output_png, &records, &labels, &config.figure)?;
    println!("saved figure to {}", config.output_png.display());
    if let Some(svg) = &config.output_svg {
        render_loss_curve_svg(svg, &records, &labels, &config.figure)?;
        println!("saved vector figure to {}", svg.display());
    }

    SweepSummary::new(source.describe(), &loaded, &sweep).save(&paths.summary)?;
    write_report(paths, config, &records, &sweep).context("failed to update the sweep notebook")?;
    println!("updated {}", paths.report.display());

    Ok(())
}

fn write_report(
    paths: &SweepPaths,
    config: &RunLogSweepConfig,
    records: &[SweepRecord],
    sweep: &ReducedSweep,
) -> Result<()> {
    let notebook = Notebook::open_or_create(&paths.report, SWEEP_REPORT_TEMPLATE)?;
    let layers = config
        .layers
        .iter()
        .map(|layer| layer.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    let png = absolute(&config.output_png);
    let svg = config.output_svg.as_deref().map(absolute);
    let mut figures = vec![("Final training loss by layer", png.as_path())];
    if let Some(svg) = &svg {
        figures.push(("Final training loss by layer (vector)", svg.as_path()));
    }

    notebook.update(&[
        configuration_section(&[
            ("Run directory", config.base_dir.display().to_string()),
            ("Layers", layers),
            (
                "Log",
                format!(
                    "{}<layer>/{} -> {}[-1].{}",
                    config.run_dir_prefix,
                    config.log_file_name,
                    config.history_field,
                    config.loss_field
                ),
            ),
        ]),
        results_section(records),
        best_section(sweep),
        figures_section(&notebook, &figures),
    ])
}

fn absolute(path: &Path) -> PathBuf {
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
