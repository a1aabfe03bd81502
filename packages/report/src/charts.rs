//! PNG chart rendering with `plotters`.
//!
//! Each [`ChartSpec`] becomes one file in the chart directory, named after
//! its title (see [`chart_file_name`]). The PDF stage later picks the files
//! up in sorted order, so file names are the only link between the two.

use std::f64::consts::{FRAC_PI_2, TAU};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontStyle, FontTransform};
use traffic_map_analytics_models::{Blackspot, CategoryCount, Chart, ChartSpec, Rgb, StackedSeries};
use traffic_map_loader::progress::ProgressCallback;

use crate::ReportError;

/// File name of the blackspot priority chart.
pub const BLACKSPOT_CHART_FILE: &str = "blackspot_priority_analysis.png";

const CHART_SIZE: (u32, u32) = (1200, 1000);
const BLACKSPOT_CHART_SIZE: (u32, u32) = (1400, 1000);
const FONT: &str = "sans-serif";
const BLACKSPOT_BAR: RGBColor = RGBColor(0xf7, 0x02, 0x02);
const FALLBACK_PALETTE: [RGBColor; 4] = [
    RGBColor(0x34, 0x98, 0xdb),
    RGBColor(0x2e, 0xcc, 0x71),
    RGBColor(0x9b, 0x59, 0xb6),
    RGBColor(0x95, 0xa5, 0xa6),
];

type DrawResult = Result<(), Box<dyn std::error::Error>>;

/// Output file name for a chart title: spaces become underscores,
/// parentheses are dropped and `.png` is appended.
#[must_use]
pub fn chart_file_name(title: &str) -> String {
    let mut name: String = title
        .chars()
        .filter(|c| !matches!(c, '(' | ')'))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();
    name.push_str(".png");
    name
}

/// Renders `spec` into `dir` and returns the written file.
///
/// # Errors
///
/// * If the chart has nothing to draw
/// * If the output directory cannot be created
/// * If the backend fails to draw or encode the image
pub fn render_chart(spec: &ChartSpec, dir: &Path) -> Result<PathBuf, ReportError> {
    if spec.is_empty() {
        return Err(ReportError::Chart {
            title: spec.title.clone(),
            message: "nothing to draw".to_string(),
        });
    }

    std::fs::create_dir_all(dir)?;
    let path = dir.join(chart_file_name(&spec.title));

    draw_chart(spec, &path).map_err(|e| ReportError::Chart {
        title: spec.title.clone(),
        message: e.to_string(),
    })?;

    log::debug!("Chart saved: {}", path.display());
    Ok(path)
}

/// Renders every spec, logging and skipping the ones that fail. `progress`
/// advances once per spec; finishing it is left to the caller.
pub fn render_charts(
    specs: &[ChartSpec],
    dir: &Path,
    progress: &Arc<dyn ProgressCallback>,
) -> Vec<PathBuf> {
    progress.set_total(specs.len() as u64);
    specs
        .iter()
        .filter_map(|spec| {
            progress.set_message(spec.title.clone());
            let written = match render_chart(spec, dir) {
                Ok(path) => Some(path),
                Err(e) => {
                    log::warn!("Skipping chart: {e}");
                    None
                }
            };
            progress.inc(1);
            written
        })
        .collect()
}

/// Renders the horizontal blackspot priority chart, highest count on top.
///
/// Returns `Ok(None)` when there are no blackspots to chart.
///
/// # Errors
///
/// * If the output directory cannot be created
/// * If the backend fails to draw or encode the image
pub fn render_blackspot_chart(
    blackspots: &[Blackspot],
    region: &str,
    period: &str,
    dir: &Path,
) -> Result<Option<PathBuf>, ReportError> {
    if blackspots.is_empty() {
        log::info!("No blackspots provided for the priority chart");
        return Ok(None);
    }

    std::fs::create_dir_all(dir)?;
    let path = dir.join(BLACKSPOT_CHART_FILE);
    let title = format!("Priority Analysis: Top {} {region} Blackspots", blackspots.len());

    draw_blackspots(blackspots, &title, period, &path).map_err(|e| ReportError::Chart {
        title: title.clone(),
        message: e.to_string(),
    })?;

    log::debug!("Chart saved: {}", path.display());
    Ok(Some(path))
}

const fn rgb(color: Rgb) -> RGBColor {
    RGBColor(color.0, color.1, color.2)
}

fn px(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Upper bound of a count axis with some room above the tallest bar.
const fn headroom(max: u64) -> u64 {
    max + max / 10 + 1
}

fn segment_label<S: AsRef<str>>(labels: &[S], value: &SegmentValue<usize>) -> String {
    match value {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => labels
            .get(*i)
            .map(|l| l.as_ref().to_string())
            .unwrap_or_default(),
        SegmentValue::Last => String::new(),
    }
}

fn draw_chart(spec: &ChartSpec, path: &Path) -> DrawResult {
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    match &spec.chart {
        Chart::Bar { counts, color } => draw_bar(&root, spec, counts, rgb(*color))?,
        Chart::Pie { counts, colors } => draw_pie(&root, &spec.title, counts, colors)?,
        Chart::StackedBar {
            categories,
            series,
            legend_title,
        } => draw_stacked_bar(&root, spec, categories, series, legend_title)?,
    }

    root.present()?;
    Ok(())
}

fn draw_bar<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    counts: &[CategoryCount],
    color: RGBColor,
) -> DrawResult
where
    DB::ErrorType: 'static,
{
    let labels: Vec<&str> = counts.iter().map(|c| c.label.as_str()).collect();
    let max = counts.iter().map(|c| c.count).max().unwrap_or(0);

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, (FONT, 30))
        .margin(20)
        .x_label_area_size(180)
        .y_label_area_size(70)
        .build_cartesian_2d((0..counts.len()).into_segmented(), 0..headroom(max))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(counts.len())
        .x_label_formatter(&|v| segment_label(&labels, v))
        .x_label_style((FONT, 14).into_font().transform(FontTransform::Rotate90))
        .x_desc(&spec.x_label)
        .y_desc(&spec.y_label)
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(color.filled())
            .margin(6)
            .data(counts.iter().enumerate().map(|(i, c)| (i, c.count))),
    )?;

    Ok(())
}

fn draw_stacked_bar<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    categories: &[String],
    series: &[StackedSeries],
    legend_title: &str,
) -> DrawResult
where
    DB::ErrorType: 'static,
{
    let totals: Vec<u64> = (0..categories.len())
        .map(|i| series.iter().filter_map(|s| s.counts.get(i)).sum())
        .collect();
    let max = totals.iter().copied().max().unwrap_or(0);

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, (FONT, 30))
        .margin(20)
        .x_label_area_size(70)
        .y_label_area_size(70)
        .build_cartesian_2d((0..categories.len()).into_segmented(), 0..headroom(max))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(categories.len())
        .x_label_formatter(&|v| segment_label(categories, v))
        .x_desc(&spec.x_label)
        .y_desc(&spec.y_label)
        .draw()?;

    let mut base = vec![0_u64; categories.len()];
    for s in series {
        let color = rgb(s.color);
        let bars: Vec<_> = s
            .counts
            .iter()
            .take(categories.len())
            .enumerate()
            .map(|(i, &count)| {
                let bottom = base[i];
                base[i] += count;
                let mut bar = Rectangle::new(
                    [
                        (SegmentValue::Exact(i), bottom),
                        (SegmentValue::Exact(i + 1), bottom + count),
                    ],
                    color.filled(),
                );
                bar.set_margin(0, 0, 10, 10);
                bar
            })
            .collect();

        chart
            .draw_series(bars)?
            .label(&s.name)
            .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 12, y + 6)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    let (width, _) = root.dim_in_pixel();
    root.draw(&Text::new(
        legend_title.to_string(),
        (px(width) - 170, 50),
        (FONT, 16).into_font().style(FontStyle::Bold),
    ))?;

    Ok(())
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn draw_pie<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    counts: &[CategoryCount],
    colors: &[Rgb],
) -> DrawResult
where
    DB::ErrorType: 'static,
{
    let total: u64 = counts.iter().map(|c| c.count).sum();
    let area = root.titled(title, (FONT, 30))?;
    let (width, height) = area.dim_in_pixel();
    let (cx, cy) = (f64::from(width) / 2.0, f64::from(height) / 2.0);
    let radius = f64::from(width.min(height)) * 0.32;
    let label_style = TextStyle::from((FONT, 16).into_font()).pos(Pos::new(HPos::Center, VPos::Center));

    let point = |angle: f64, r: f64| -> (i32, i32) {
        (
            (cx + r * angle.cos()).round() as i32,
            (cy + r * angle.sin()).round() as i32,
        )
    };

    // Slices run clockwise from twelve o'clock.
    let mut start = -FRAC_PI_2;
    for (index, slice) in counts.iter().enumerate() {
        if slice.count == 0 {
            continue;
        }
        let fraction = slice.count as f64 / total as f64;
        let sweep = fraction * TAU;
        let color = if colors.is_empty() {
            FALLBACK_PALETTE[index % FALLBACK_PALETTE.len()]
        } else {
            rgb(colors[index % colors.len()])
        };

        let steps = ((sweep.to_degrees() / 2.0).ceil() as usize).max(2);
        let mut outline = vec![point(0.0, 0.0)];
        outline.extend((0..=steps).map(|step| {
            point(start + sweep * step as f64 / steps as f64, radius)
        }));
        area.draw(&Polygon::new(outline, color.filled()))?;

        let middle = start + sweep / 2.0;
        area.draw(&Text::new(
            format!("{} ({:.1}%)", slice.label, fraction * 100.0),
            point(middle, radius * 1.18),
            label_style.clone(),
        ))?;

        start += sweep;
    }

    Ok(())
}

fn draw_blackspots(blackspots: &[Blackspot], title: &str, period: &str, path: &Path) -> DrawResult {
    let root = BitMapBackend::new(path, BLACKSPOT_CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let (width, height) = root.dim_in_pixel();
    let (upper, footer) = root.split_vertically(px(height) - 50);

    // Highest count is drawn last so it sits at the top of the y axis.
    let ordered: Vec<&Blackspot> = blackspots.iter().rev().collect();
    let labels: Vec<String> = ordered
        .iter()
        .map(|spot| format!("{} ({})", spot.area, spot.road_type))
        .collect();
    let max = blackspots.iter().map(|s| s.count).max().unwrap_or(0);
    let x_max = max + max * 2 / 5 + 1;

    let mut chart = ChartBuilder::on(&upper)
        .caption(title, (FONT, 30).into_font().style(FontStyle::Bold))
        .margin(25)
        .x_label_area_size(50)
        .y_label_area_size(320)
        .build_cartesian_2d(0..x_max, (0..ordered.len()).into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(ordered.len())
        .y_label_formatter(&|v| segment_label(&labels, v))
        .y_label_style((FONT, 15))
        .x_desc("Total Incident Count")
        .draw()?;

    chart.draw_series(ordered.iter().enumerate().map(|(i, spot)| {
        let mut bar = Rectangle::new(
            [
                (0, SegmentValue::Exact(i)),
                (spot.count, SegmentValue::Exact(i + 1)),
            ],
            BLACKSPOT_BAR.filled(),
        );
        bar.set_margin(14, 14, 0, 0);
        bar
    }))?;

    chart.draw_series(ordered.iter().enumerate().map(|(i, spot)| {
        Text::new(
            format!(" {} Incidents", spot.count),
            (spot.count, SegmentValue::CenterOf(i)),
            (FONT, 16),
        )
    }))?;

    footer.draw(&Text::new(
        format!("Analysis Period: {period} | Coordinates listed in full report."),
        (px(width) / 2, 10),
        TextStyle::from((FONT, 16).into_font().style(FontStyle::Italic))
            .pos(Pos::new(HPos::Center, VPos::Top)),
    ))?;

    root.present()?;
    Ok(())
}
