//! Quick chart rendering: a column plotted to a PNG file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use polars::prelude::*;

use crate::error::{Error, Result};
use crate::statistics::is_numeric_type;

const CHART_SIZE: (u32, u32) = (640, 480);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartKind {
    #[default]
    Line,
    Bar,
    Pie,
}

impl ChartKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
            ChartKind::Pie => "pie",
        }
    }

    pub fn parse(input: &str) -> Option<ChartKind> {
        match input.trim().to_ascii_lowercase().as_str() {
            "line" | "l" => Some(ChartKind::Line),
            "bar" | "b" => Some(ChartKind::Bar),
            "pie" | "p" => Some(ChartKind::Pie),
            _ => None,
        }
    }
}

/// Render a chart of `y` (against optional numeric `x`, else the row
/// index) into a 640x480 PNG at `path`. Pie charts plot the value counts
/// of `y` and ignore `x`.
pub fn render(
    df: &DataFrame,
    kind: ChartKind,
    x: Option<&str>,
    y: &str,
    path: &Path,
) -> Result<PathBuf> {
    let path = ensure_png(path);
    match kind {
        ChartKind::Line | ChartKind::Bar => {
            let points = xy_points(df, x, y)?;
            if points.is_empty() {
                return Err(Error::Unsupported(format!("no data to chart in '{y}'")));
            }
            draw_xy(&path, kind, &points, x.unwrap_or("index"), y)?;
        }
        ChartKind::Pie => {
            let counts = value_counts(df, y)?;
            if counts.is_empty() {
                return Err(Error::Unsupported(format!("no data to chart in '{y}'")));
            }
            draw_pie(&path, &counts)?;
        }
    }
    Ok(path)
}

fn ensure_png(path: &Path) -> PathBuf {
    let has_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"));
    if has_ext {
        path.to_path_buf()
    } else {
        let mut s = path.as_os_str().to_os_string();
        s.push(".png");
        PathBuf::from(s)
    }
}

/// (x, y) pairs with both sides present; x falls back to the row index.
fn xy_points(df: &DataFrame, x: Option<&str>, y: &str) -> Result<Vec<(f64, f64)>> {
    let ys = numeric_column(df, y)?;
    let points = match x {
        Some(x) => {
            let xs = numeric_column(df, x)?;
            xs.into_iter()
                .zip(ys)
                .filter_map(|(x, y)| Some((x?, y?)))
                .collect()
        }
        None => ys
            .into_iter()
            .enumerate()
            .filter_map(|(i, y)| Some((i as f64, y?)))
            .collect(),
    };
    Ok(points)
}

fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df
        .column(name)
        .map_err(|_| Error::column_not_found(name))?
        .as_materialized_series();
    if !is_numeric_type(series.dtype()) {
        return Err(Error::Unsupported(format!("column '{name}' is not numeric")));
    }
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast.f64()?.iter().collect())
}

/// Occurrence counts of the column's string-rendered values, most common
/// first.
fn value_counts(df: &DataFrame, column: &str) -> Result<Vec<(String, usize)>> {
    let series = df
        .column(column)
        .map_err(|_| Error::column_not_found(column))?
        .as_materialized_series();
    let values = series.cast(&DataType::String)?;

    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in values.str()?.iter().flatten() {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(counts)
}

fn palette(idx: usize) -> plotters::style::RGBColor {
    use plotters::prelude::*;
    const COLORS: [RGBColor; 7] = [
        CYAN,
        MAGENTA,
        GREEN,
        YELLOW,
        BLUE,
        RED,
        RGBColor(128, 255, 255),
    ];
    COLORS[idx % COLORS.len()]
}

fn draw_xy(path: &Path, kind: ChartKind, points: &[(f64, f64)], x_label: &str, y_label: &str) -> Result<()> {
    use plotters::prelude::*;

    let draw = || -> std::result::Result<(), Box<dyn std::error::Error>> {
        let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let (mut x_min, mut x_max) = bounds(points.iter().map(|p| p.0));
        let (mut y_min, mut y_max) = bounds(points.iter().map(|p| p.1));
        if kind == ChartKind::Bar {
            // bars grow from zero and need room on both sides
            y_min = y_min.min(0.0);
            y_max = y_max.max(0.0);
            x_min -= 0.5;
            x_max += 0.5;
        }

        let mut chart = ChartBuilder::on(&root)
            .margin(30)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

        chart
            .configure_mesh()
            .x_desc(x_label)
            .y_desc(y_label)
            .draw()?;

        let color = palette(0);
        match kind {
            ChartKind::Line => {
                chart.draw_series(LineSeries::new(points.iter().copied(), color))?;
            }
            ChartKind::Bar => {
                chart.draw_series(points.iter().map(|&(x, y)| {
                    Rectangle::new([(x - 0.3, 0.0), (x + 0.3, y)], color.filled())
                }))?;
            }
            ChartKind::Pie => unreachable!("pie handled separately"),
        }

        root.present()?;
        Ok(())
    };
    draw().map_err(|e| Error::write(path, e))
}

fn draw_pie(path: &Path, counts: &[(String, usize)]) -> Result<()> {
    use plotters::prelude::*;

    let draw = || -> std::result::Result<(), Box<dyn std::error::Error>> {
        let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let sizes: Vec<f64> = counts.iter().map(|(_, n)| *n as f64).collect();
        let labels: Vec<String> = counts
            .iter()
            .map(|(value, n)| format!("{value} ({n})"))
            .collect();
        let colors: Vec<RGBColor> = (0..counts.len()).map(palette).collect();

        let center = (CHART_SIZE.0 as i32 / 2, CHART_SIZE.1 as i32 / 2);
        let radius = (CHART_SIZE.1 as f64 / 2.0) - 60.0;
        let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
        pie.label_style(("sans-serif", 16).into_font());
        root.draw(&pie)?;

        root.present()?;
        Ok(())
    };
    draw().map_err(|e| Error::write(path, e))
}

/// Min and max with a degenerate-range guard.
fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    }
}
