#![cfg(feature = "charts")]
use crate::config::ChartConfig;
use crate::error::{Result, RunLogError};
use crate::summary::GroupSummary;
use plotters::prelude::*;
use std::path::Path;

/// Configuration options for chart generation
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Title displayed at the top of the chart
    pub title: String,

    /// Label for the X-axis
    pub x_label: String,

    /// Label for the Y-axis
    pub y_label: String,

    /// Width of the chart in pixels
    pub width: u32,

    /// Height of the chart in pixels
    pub height: u32,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            title: "Distância".to_string(),
            x_label: String::new(),
            y_label: "km".to_string(),
            width: 1024,
            height: 600,
        }
    }
}

impl GraphOptions {
    pub fn from_config(config: &ChartConfig, title: &str, x_label: &str) -> Self {
        Self {
            title: title.to_string(),
            x_label: x_label.to_string(),
            width: config.width,
            height: config.height,
            ..Self::default()
        }
    }
}

/// Draws a bar chart of distance per group and saves it as a PNG.
///
/// Bars follow the order of `groups`, which is chronological when they come
/// from [`crate::summary::by_month`] or [`crate::summary::by_week`]. An
/// empty slice still produces a chart with empty axes.
pub fn save_distance_chart(
    groups: &[GroupSummary],
    options: &GraphOptions,
    path: impl AsRef<Path>,
) -> Result<()> {
    draw_distance_chart(groups, options, path.as_ref())
        .map_err(|e| RunLogError::Chart(e.to_string()))?;
    log::info!(
        "wrote chart with {} bars to {}",
        groups.len(),
        path.as_ref().display()
    );
    Ok(())
}

fn draw_distance_chart(
    groups: &[GroupSummary],
    options: &GraphOptions,
    path: &Path,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let bars = groups.len().max(1) as u32;
    let max_y = groups
        .iter()
        .map(|g| g.distance_km)
        .fold(0.0_f64, f64::max);
    let y_range = 0.0..(max_y * 1.1).max(1.0);

    let mut chart = ChartBuilder::on(&root)
        .caption(&options.title, ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d((0u32..bars).into_segmented(), y_range)?;

    let label_of = |value: &SegmentValue<u32>| match value {
        SegmentValue::CenterOf(i) => groups
            .get(*i as usize)
            .map(|g| g.label.clone())
            .unwrap_or_default(),
        _ => String::new(),
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(&options.x_label)
        .y_desc(&options.y_label)
        .x_labels(groups.len().max(1))
        .x_label_formatter(&label_of)
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(BLUE.filled())
            .margin(5)
            .data(
                groups
                    .iter()
                    .enumerate()
                    .map(|(i, g)| (i as u32, g.distance_km)),
            ),
    )?;

    root.present()?;
    Ok(())
}
