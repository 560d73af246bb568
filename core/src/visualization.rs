//! Chart rendering for reduced sweeps.
//!
//! Every chart is drawn through a generic `DrawingArea`, so the same code
//! serves the PNG and SVG backends.

use std::{fs, ops::Range, path::Path};

use plotters::{
    coord::Shift,
    prelude::*,
    style::text_anchor::{HPos, Pos, VPos},
};

use crate::{
    colormap::ColorMap,
    config::FigureConfig,
    error::{Result, SweepError},
    record::{LayerId, SweepRecord},
    reduce::ReducedSweep,
};

const FONT: &str = "sans-serif";
const COLORBAR_STEPS: usize = 64;

type DrawResult<DB> =
    std::result::Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

/// Text for the sensitivity panel.
#[derive(Clone, Debug)]
pub struct PanelLabels {
    pub title: String,
    pub loss_label: String,
}

/// Text for the loss curve.
#[derive(Clone, Debug)]
pub struct CurveLabels {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series_label: String,
}

/// Bar chart over a one-row heatmap, written as a PNG.
pub fn render_sensitivity_panel(
    path: &Path,
    sweep: &ReducedSweep,
    labels: &PanelLabels,
    figure: &FigureConfig,
) -> Result<()> {
    prepare_output(path)?;
    let root = BitMapBackend::new(path, figure.pixels()).into_drawing_area();
    draw_sensitivity_panel(&root, sweep, labels, figure).map_err(|err| render_error(path, err))?;
    tracing::info!("wrote sensitivity panel to {}", path.display());
    Ok(())
}

/// Loss against layer index as a PNG.
pub fn render_loss_curve_png(
    path: &Path,
    records: &[SweepRecord],
    labels: &CurveLabels,
    figure: &FigureConfig,
) -> Result<()> {
    ensure_plottable(records)?;
    prepare_output(path)?;
    let root = BitMapBackend::new(path, figure.pixels()).into_drawing_area();
    draw_loss_curve(&root, records, labels, figure).map_err(|err| render_error(path, err))?;
    tracing::info!("wrote loss curve to {}", path.display());
    Ok(())
}

/// Loss against layer index as an SVG.
pub fn render_loss_curve_svg(
    path: &Path,
    records: &[SweepRecord],
    labels: &CurveLabels,
    figure: &FigureConfig,
) -> Result<()> {
    ensure_plottable(records)?;
    prepare_output(path)?;
    let root = SVGBackend::new(path, figure.pixels()).into_drawing_area();
    draw_loss_curve(&root, records, labels, figure).map_err(|err| render_error(path, err))?;
    tracing::info!("wrote loss curve to {}", path.display());
    Ok(())
}

fn prepare_output(path: &Path) -> Result<()> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => fs::create_dir_all(parent).map_err(|err| SweepError::Render {
            path: path.to_path_buf(),
            message: format!("cannot create {}: {err}", parent.display()),
        }),
        None => Ok(()),
    }
}

fn ensure_plottable(records: &[SweepRecord]) -> Result<()> {
    if records.iter().any(|record| record.loss.is_valid()) {
        Ok(())
    } else {
        Err(SweepError::EmptySweep {
            total: records.len(),
        })
    }
}

fn render_error(path: &Path, err: impl std::fmt::Display) -> SweepError {
    SweepError::Render {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// Y-axis range of the bar chart, padded around the loss range.
pub fn bar_axis_range(min: f64, max: f64) -> Range<f64> {
    let (lo, hi) = (min * 0.95, max * 1.05);
    if hi > lo {
        lo..hi
    } else {
        // Flat or non-positive sweeps still need a visible band.
        let pad = min.abs().max(1.0) * 0.05;
        (min - pad)..(max + pad)
    }
}

fn draw_sensitivity_panel<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    sweep: &ReducedSweep,
    labels: &PanelLabels,
    figure: &FigureConfig,
) -> DrawResult<DB> {
    root.fill(&WHITE)?;
    let (_, height) = root.dim_in_pixel();
    let (upper, lower) = root.split_vertically((height * 2 / 3) as i32);

    draw_bars(&upper, sweep, labels, figure)?;
    draw_heatmap_strip(&lower, sweep, labels, figure)?;
    root.present()
}

/// Categorical x axis: slot `i` is centred on `i` and spans one unit.
fn slot_range(count: usize) -> Range<f64> {
    -0.5..(count as f64 - 0.5)
}

fn draw_bars<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    sweep: &ReducedSweep,
    labels: &PanelLabels,
    figure: &FigureConfig,
) -> DrawResult<DB> {
    let records = sweep.records();
    let layers: Vec<LayerId> = records.iter().map(|r| r.layer_id).collect();
    let (min, max) = sweep.loss_range();
    let best = sweep.best();
    let y_range = bar_axis_range(min, max);
    let bar_colors = ColorMap::viridis().reversed();

    let mut chart = ChartBuilder::on(area)
        .caption(&labels.title, (FONT, figure.font_px(14.0)).into_font().style(FontStyle::Bold))
        .margin(figure.px(8.0))
        .x_label_area_size(figure.px(28.0))
        .y_label_area_size(figure.px(40.0))
        .build_cartesian_2d(slot_range(records.len()), y_range.clone())?;

    let layer_label = |x: &f64| slot_label(&layers, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .light_line_style(WHITE.mix(0.0))
        .bold_line_style(BLACK.mix(0.1))
        .x_labels(records.len())
        .x_label_formatter(&layer_label)
        .x_desc("Layer ID")
        .y_desc(&labels.loss_label)
        .label_style((FONT, figure.font_px(9.0)).into_font())
        .axis_desc_style((FONT, figure.font_px(10.0)).into_font())
        .draw()?;

    let bar_bounds =
        |i: usize, loss: f64| [(i as f64 - 0.4, y_range.start), (i as f64 + 0.4, loss)];
    chart.draw_series(records.iter().enumerate().map(|(i, record)| {
        let color = bar_colors.map(record.loss, min, max);
        Rectangle::new(bar_bounds(i, record.loss), color.mix(0.9).filled())
    }))?;
    chart.draw_series(records.iter().enumerate().map(|(i, record)| {
        Rectangle::new(bar_bounds(i, record.loss), BLACK.stroke_width(1))
    }))?;

    let x_span = slot_range(records.len());
    let reference = RED.mix(0.5).stroke_width(figure.px(1.0).max(1) as u32);
    chart.draw_series(LineSeries::new(
        vec![(x_span.start, best.loss), (x_span.end, best.loss)],
        reference,
    ))?;
    chart.draw_series(std::iter::once(Text::new(
        format!("Best Loss: {:.4} (Layer {})", best.loss, best.layer_id),
        (x_span.start, best.loss + (y_range.end - y_range.start) * 0.02),
        (FONT, figure.font_px(10.0))
            .into_font()
            .style(FontStyle::Bold)
            .color(&RED)
            .pos(Pos::new(HPos::Left, VPos::Bottom)),
    )))?;

    Ok(())
}

fn draw_heatmap_strip<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    sweep: &ReducedSweep,
    labels: &PanelLabels,
    figure: &FigureConfig,
) -> DrawResult<DB> {
    let records = sweep.records();
    let layers: Vec<LayerId> = records.iter().map(|r| r.layer_id).collect();
    let (min, max) = sweep.loss_range();
    let cell_colors = ColorMap::red_yellow_green().reversed();

    let (width, _) = area.dim_in_pixel();
    let colorbar_width = (figure.px(70.0) as u32).min(width / 3);
    let (strip_area, colorbar_area) = area.split_horizontally((width - colorbar_width) as i32);

    let mut chart = ChartBuilder::on(&strip_area)
        .caption(
            "Sensitivity Heatmap (Green is Better)",
            (FONT, figure.font_px(12.0)).into_font(),
        )
        .margin(figure.px(8.0))
        .x_label_area_size(figure.px(28.0))
        .y_label_area_size(figure.px(40.0))
        .build_cartesian_2d(slot_range(records.len()), 0.0f64..1.0)?;

    let layer_label = |x: &f64| slot_label(&layers, *x);
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(records.len())
        .x_label_formatter(&layer_label)
        .y_label_formatter(&|_| String::new())
        .x_desc("Layer ID")
        .y_desc(&labels.loss_label)
        .label_style((FONT, figure.font_px(9.0)).into_font())
        .axis_desc_style((FONT, figure.font_px(10.0)).into_font())
        .draw()?;

    chart.draw_series(records.iter().enumerate().map(|(i, record)| {
        Rectangle::new(
            [(i as f64 - 0.5, 0.0), (i as f64 + 0.5, 1.0)],
            cell_colors.map(record.loss, min, max).filled(),
        )
    }))?;
    chart.draw_series(records.iter().enumerate().map(|(i, record)| {
        Text::new(
            format!("{:.3}", record.loss),
            (i as f64, 0.5),
            (FONT, figure.font_px(8.0))
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(HPos::Center, VPos::Center)),
        )
    }))?;

    draw_colorbar(&colorbar_area, cell_colors, min, max, figure)
}

fn draw_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    colors: ColorMap,
    min: f64,
    max: f64,
    figure: &FigureConfig,
) -> DrawResult<DB> {
    let y_range = if max > min { min..max } else { (min - 0.5)..(max + 0.5) };
    let step = (y_range.end - y_range.start) / COLORBAR_STEPS as f64;

    let mut chart = ChartBuilder::on(area)
        .margin_top(figure.px(30.0))
        .margin_bottom(figure.px(36.0))
        .margin_right(figure.px(4.0))
        .right_y_label_area_size(figure.px(40.0))
        .build_cartesian_2d(0.0f64..1.0, y_range.clone())?;

    chart
        .configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_labels(5)
        .y_label_formatter(&|y| format!("{y:.3}"))
        .y_desc("Loss Value")
        .label_style((FONT, figure.font_px(8.0)).into_font())
        .axis_desc_style((FONT, figure.font_px(9.0)).into_font())
        .draw()?;

    chart.draw_series((0..COLORBAR_STEPS).map(|k| {
        let lo = y_range.start + step * k as f64;
        let hi = lo + step;
        let color = colors.map((lo + hi) / 2.0, y_range.start, y_range.end);
        Rectangle::new([(0.0, lo), (1.0, hi)], color.filled())
    }))?;

    Ok(())
}

/// Layer id for a tick on the categorical axis; off-slot ticks stay blank.
fn slot_label(layers: &[LayerId], x: f64) -> String {
    let slot = x.round();
    if (x - slot).abs() > 1e-6 || slot < 0.0 {
        return String::new();
    }
    layers
        .get(slot as usize)
        .map(|layer| layer.to_string())
        .unwrap_or_default()
}

/// Runs of consecutive valid points; a missing layer breaks the line.
pub fn curve_segments(records: &[SweepRecord]) -> Vec<Vec<(f64, f64)>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for record in records {
        match record.loss.value() {
            Some(loss) => current.push((record.layer_id as f64, loss)),
            None if !current.is_empty() => segments.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Number of integer positions inside `range`, so the mesh steps by one.
fn integer_ticks(range: &Range<f64>) -> usize {
    ((range.end.floor() - range.start.ceil()) as usize + 1).max(2)
}

fn draw_loss_curve<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    records: &[SweepRecord],
    labels: &CurveLabels,
    figure: &FigureConfig,
) -> DrawResult<DB> {
    root.fill(&WHITE)?;

    let segments = curve_segments(records);
    let points: Vec<(f64, f64)> = segments.iter().flatten().copied().collect();
    let (first_layer, last_layer) = records
        .iter()
        .map(|record| record.layer_id as f64)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)));
    let (min, max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));
    let x_pad = ((last_layer - first_layer) * 0.05).max(0.5);
    let x_range = (first_layer - x_pad)..(last_layer + x_pad);
    let y_pad = ((max - min) * 0.1).max(max.abs() * 0.02).max(1e-3);

    let mut chart = ChartBuilder::on(root)
        .caption(
            &labels.title,
            (FONT, figure.font_px(16.0)).into_font().style(FontStyle::Bold),
        )
        .margin(figure.px(10.0))
        .x_label_area_size(figure.px(36.0))
        .y_label_area_size(figure.px(48.0))
        .build_cartesian_2d(x_range.clone(), (min - y_pad)..(max + y_pad))?;

    let ticks: Vec<f64> = records.iter().map(|record| record.layer_id as f64).collect();
    let tick_label = |x: &f64| {
        ticks
            .iter()
            .find(|tick| (**tick - *x).abs() < 1e-6)
            .map(|tick| format!("{tick:.0}"))
            .unwrap_or_default()
    };
    chart
        .configure_mesh()
        .x_labels(integer_ticks(&x_range))
        .x_label_formatter(&tick_label)
        .light_line_style(WHITE.mix(0.0))
        .bold_line_style(BLACK.mix(0.15))
        .x_desc(&labels.x_label)
        .y_desc(&labels.y_label)
        .label_style((FONT, figure.font_px(10.0)).into_font())
        .axis_desc_style((FONT, figure.font_px(14.0)).into_font())
        .draw()?;

    let line_color = RGBColor(0x1f, 0x77, 0xb4);
    let line_style = line_color.stroke_width(figure.px(2.0).max(1) as u32);
    for (index, segment) in segments.iter().enumerate() {
        let series = chart.draw_series(LineSeries::new(segment.iter().copied(), line_style))?;
        if index == 0 {
            series
                .label(&labels.series_label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], line_style));
        }
    }
    let marker = figure.px(3.0).max(2);
    chart.draw_series(
        points
            .iter()
            .map(|&point| Circle::new(point, marker, line_color.filled())),
    )?;

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font((FONT, figure.font_px(10.0)).into_font())
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;

    root.present()
}
