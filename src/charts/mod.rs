//! Chart materialization: suggestion validation and SVG rendering.
//!
//! A suggestion either becomes a rendered artifact under the job's output
//! directory or is skipped. Nothing here propagates an error to the caller;
//! a failed suggestion must never abort its siblings.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use thiserror::Error;
use tracing::{error, warn};

use crate::dataset::{ColumnKind, Dataset};
use crate::suggest::ChartSuggestion;

const CHART_SIZE: (u32, u32) = (1000, 600);
// Category count past which x labels are drawn vertically.
const ROTATE_THRESHOLD: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Line,
    Scatter,
    Heatmap,
}

impl ChartKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bar" => Some(Self::Bar),
            "line" => Some(Self::Line),
            "scatter" => Some(Self::Scatter),
            "heatmap" => Some(Self::Heatmap),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
enum Skip {
    #[error("missing x or y axis specification")]
    MissingAxis,
    #[error("columns '{x}' or '{y}' not found in dataset")]
    UnknownColumn { x: String, y: String },
    #[error("unsupported chart type: {0}")]
    UnsupportedKind(String),
}

struct Validated<'a> {
    dataset: &'a Dataset,
    kind: ChartKind,
    title: String,
    x_name: String,
    y_name: String,
    x: usize,
    y: usize,
    hue: Option<usize>,
}

fn validate<'a>(
    dataset: &'a Dataset,
    suggestion: &ChartSuggestion,
    index: usize,
) -> Result<Validated<'a>, Skip> {
    let (Some(x_name), Some(y_name)) = (suggestion.x.as_deref(), suggestion.y.as_deref()) else {
        return Err(Skip::MissingAxis);
    };
    let (Some(x), Some(y)) = (dataset.column_index(x_name), dataset.column_index(y_name)) else {
        return Err(Skip::UnknownColumn { x: x_name.to_string(), y: y_name.to_string() });
    };

    let hue = match suggestion.hue.as_deref() {
        Some(h) => match dataset.column_index(h) {
            Some(i) => Some(i),
            None => {
                warn!("hue column '{}' not found, ignoring hue parameter", h);
                None
            }
        },
        None => None,
    };

    let kind = suggestion
        .kind
        .as_deref()
        .and_then(ChartKind::parse)
        .ok_or_else(|| Skip::UnsupportedKind(suggestion.kind.clone().unwrap_or_default()))?;

    let title = suggestion
        .title
        .clone()
        .unwrap_or_else(|| format!("Graph {}", index + 1));

    Ok(Validated { dataset, kind, title, x_name: x_name.to_string(), y_name: y_name.to_string(), x, y, hue })
}

/// Render one suggestion to `graph_{index+1}.svg` under `out_dir`, or skip.
pub fn materialize(
    dataset: &Dataset,
    suggestion: &ChartSuggestion,
    index: usize,
    out_dir: &Path,
) -> Option<PathBuf> {
    let validated = match validate(dataset, suggestion, index) {
        Ok(v) => v,
        Err(skip) => {
            warn!(
                "skipping graph {} '{}': {}",
                index + 1,
                suggestion.title.as_deref().unwrap_or(""),
                skip
            );
            return None;
        }
    };

    let path = out_dir.join(format!("graph_{}.svg", index + 1));
    match render(&validated, &path) {
        Ok(()) => Some(path),
        Err(e) => {
            error!("error generating graph '{}': {}", validated.title, e);
            let _ = std::fs::remove_file(&path);
            None
        }
    }
}

fn render(v: &Validated<'_>, path: &Path) -> anyhow::Result<()> {
    match v.kind {
        ChartKind::Bar => render_bar(v, path),
        ChartKind::Line | ChartKind::Scatter => render_xy(v, path),
        ChartKind::Heatmap => render_heatmap(v, path),
    }
}

fn series_color(i: usize) -> RGBAColor {
    Palette99::pick(i).to_rgba()
}

/// Distinct values of a column in first-appearance order.
fn categories(dataset: &Dataset, index: usize) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for v in dataset.values(index) {
        if seen.insert(v.to_string()) {
            out.push(v.to_string());
        }
    }
    out
}

/// Hue groups in first-appearance order; a single unlabeled group when no
/// hue column applies.
fn hue_groups(dataset: &Dataset, hue: Option<usize>) -> Vec<Option<String>> {
    match hue {
        Some(h) => categories(dataset, h).into_iter().map(Some).collect(),
        None => vec![None],
    }
}

fn row_in_group(dataset: &Dataset, row: usize, hue: Option<usize>, group: &Option<String>) -> bool {
    match (hue, group) {
        (Some(h), Some(g)) => dataset.values(h).nth(row) == Some(g.as_str()),
        _ => true,
    }
}

fn label_style(rotate: bool) -> TextStyle<'static> {
    let style: TextStyle<'static> = ("sans-serif", 14).into_font().into();
    if rotate {
        style.transform(FontTransform::Rotate90)
    } else {
        style
    }
}

fn render_bar(v: &Validated<'_>, path: &Path) -> anyhow::Result<()> {
    let cats = categories(v.dataset, v.x);
    let groups = hue_groups(v.dataset, v.hue);
    anyhow::ensure!(!cats.is_empty(), "no data to plot");

    // Mean of y per (x category, hue group).
    let cat_index: HashMap<&str, usize> =
        cats.iter().enumerate().map(|(i, c)| (c.as_str(), i)).collect();
    let xs: Vec<&str> = v.dataset.values(v.x).collect();
    let ys: Vec<&str> = v.dataset.values(v.y).collect();
    let mut bars: Vec<Vec<Option<f64>>> = vec![vec![None; cats.len()]; groups.len()];
    for (gi, group) in groups.iter().enumerate() {
        let mut sums = vec![(0.0f64, 0usize); cats.len()];
        for row in 0..v.dataset.row_count() {
            if !row_in_group(v.dataset, row, v.hue, group) {
                continue;
            }
            let Ok(val) = ys[row].parse::<f64>() else { continue };
            let ci = cat_index[xs[row]];
            sums[ci].0 += val;
            sums[ci].1 += 1;
        }
        for (ci, (sum, n)) in sums.into_iter().enumerate() {
            if n > 0 {
                bars[gi][ci] = Some(sum / n as f64);
            }
        }
    }

    let values: Vec<f64> = bars.iter().flatten().filter_map(|b| *b).collect();
    anyhow::ensure!(!values.is_empty(), "no numeric values for y axis");
    let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max).max(0.0);
    let lo = values.iter().cloned().fold(f64::INFINITY, f64::min).min(0.0);

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&v.title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(if cats.len() > ROTATE_THRESHOLD { 90 } else { 40 })
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..cats.len() as f64 - 0.5, pad_range(lo, hi))?;

    let cats_for_labels = cats.clone();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(&v.x_name)
        .y_desc(&v.y_name)
        .x_labels(cats.len())
        .x_label_style(label_style(cats.len() > ROTATE_THRESHOLD))
        .x_label_formatter(&move |pos| {
            let i = pos.round();
            if i < 0.0 || (pos - i).abs() > 1e-6 {
                return String::new();
            }
            cats_for_labels.get(i as usize).cloned().unwrap_or_default()
        })
        .draw()?;

    let slot = 0.8 / groups.len() as f64;
    for (gi, group) in groups.iter().enumerate() {
        let color = series_color(gi);
        let series = chart.draw_series(bars[gi].iter().enumerate().filter_map(|(ci, val)| {
            let val = (*val)?;
            let x0 = ci as f64 - 0.4 + gi as f64 * slot;
            Some(Rectangle::new([(x0, 0.0), (x0 + slot, val)], color.filled()))
        }))?;
        if let Some(label) = group {
            series
                .label(label.clone())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }
    }
    if v.hue.is_some() {
        chart
            .configure_series_labels()
            .border_style(&BLACK)
            .background_style(&WHITE.mix(0.8))
            .draw()?;
    }
    root.present()?;
    Ok(())
}

fn render_xy(v: &Validated<'_>, path: &Path) -> anyhow::Result<()> {
    let x_is_numeric = v.dataset.columns()[v.x].kind == ColumnKind::Numeric;
    let cats = if x_is_numeric { Vec::new() } else { categories(v.dataset, v.x) };
    let groups = hue_groups(v.dataset, v.hue);

    let xs: Vec<&str> = v.dataset.values(v.x).collect();
    let ys: Vec<&str> = v.dataset.values(v.y).collect();
    let mut series: Vec<(Option<String>, Vec<(f64, f64)>)> = Vec::new();
    for group in &groups {
        let mut points = Vec::new();
        for row in 0..v.dataset.row_count() {
            if !row_in_group(v.dataset, row, v.hue, group) {
                continue;
            }
            let Ok(y_val) = ys[row].parse::<f64>() else { continue };
            let x_val = if x_is_numeric {
                match xs[row].parse::<f64>() {
                    Ok(val) => val,
                    Err(_) => continue,
                }
            } else {
                i_of(&cats, xs[row]) as f64
            };
            points.push((x_val, y_val));
        }
        if v.kind == ChartKind::Line {
            points.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        }
        if !points.is_empty() {
            series.push((group.clone(), points));
        }
    }
    anyhow::ensure!(!series.is_empty(), "no numeric values to plot");

    let all: Vec<(f64, f64)> = series.iter().flat_map(|(_, p)| p.iter().cloned()).collect();
    let x_lo = all.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let x_hi = all.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let y_lo = all.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let y_hi = all.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

    let rotate = !x_is_numeric && cats.len() > ROTATE_THRESHOLD;
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&v.title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(if rotate { 90 } else { 40 })
        .y_label_area_size(60)
        .build_cartesian_2d(pad_range(x_lo, x_hi), pad_range(y_lo, y_hi))?;

    let cats_for_labels = cats.clone();
    let category_formatter = move |pos: &f64| {
        let i = pos.round();
        if i < 0.0 || (pos - i).abs() > 1e-6 {
            return String::new();
        }
        cats_for_labels.get(i as usize).cloned().unwrap_or_default()
    };
    let mut mesh = chart.configure_mesh();
    mesh.x_desc(&v.x_name).y_desc(&v.y_name).x_label_style(label_style(rotate));
    if !x_is_numeric {
        mesh.x_labels(cats.len()).x_label_formatter(&category_formatter);
    }
    mesh.draw()?;

    for (gi, (label, points)) in series.iter().enumerate() {
        let color = series_color(gi);
        let drawn = match v.kind {
            ChartKind::Line => chart.draw_series(LineSeries::new(points.clone(), &color))?,
            _ => chart.draw_series(
                points.iter().map(|p| Circle::new(*p, 4, color.filled())),
            )?,
        };
        if let Some(label) = label {
            drawn
                .label(label.clone())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }
    }
    if v.hue.is_some() {
        chart
            .configure_series_labels()
            .border_style(&BLACK)
            .background_style(&WHITE.mix(0.8))
            .draw()?;
    }
    root.present()?;
    Ok(())
}

/// Occurrence counts of `(x, y)` pairs: rows are y categories, columns are
/// x categories, both sorted; absent combinations stay zero.
pub(crate) fn count_pivot(
    dataset: &Dataset,
    x: usize,
    y: usize,
) -> (Vec<String>, Vec<String>, Vec<Vec<u64>>) {
    let xs: BTreeSet<String> = dataset.values(x).map(|v| v.to_string()).collect();
    let ys: BTreeSet<String> = dataset.values(y).map(|v| v.to_string()).collect();
    let xs: Vec<String> = xs.into_iter().collect();
    let ys: Vec<String> = ys.into_iter().collect();

    let mut cells = vec![vec![0u64; xs.len()]; ys.len()];
    let x_vals: Vec<&str> = dataset.values(x).collect();
    let y_vals: Vec<&str> = dataset.values(y).collect();
    for row in 0..dataset.row_count() {
        let xi = i_of(&xs, x_vals[row]);
        let yi = i_of(&ys, y_vals[row]);
        cells[yi][xi] += 1;
    }
    (xs, ys, cells)
}

fn render_heatmap(v: &Validated<'_>, path: &Path) -> anyhow::Result<()> {
    let (xs, ys, cells) = count_pivot(v.dataset, v.x, v.y);
    anyhow::ensure!(!xs.is_empty() && !ys.is_empty(), "no data to pivot");
    let max = cells.iter().flatten().copied().max().unwrap_or(0).max(1);

    let rotate = xs.len() > ROTATE_THRESHOLD;
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&v.title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(if rotate { 90 } else { 40 })
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..xs.len() as f64, 0f64..ys.len() as f64)?;

    let xs_for_labels = xs.clone();
    let ys_for_labels = ys.clone();
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(&v.x_name)
        .y_desc(&v.y_name)
        .x_labels(xs.len())
        .y_labels(ys.len())
        .x_label_style(label_style(rotate))
        .x_label_formatter(&move |pos| {
            xs_for_labels.get(pos.floor() as usize).cloned().unwrap_or_default()
        })
        .y_label_formatter(&move |pos| {
            ys_for_labels.get(pos.floor() as usize).cloned().unwrap_or_default()
        })
        .draw()?;

    chart.draw_series(cells.iter().enumerate().flat_map(|(yi, row)| {
        row.iter().enumerate().map(move |(xi, &count)| {
            let intensity = count as f64 / max as f64;
            let color = RGBColor(
                (255.0 * (1.0 - intensity)) as u8,
                (255.0 * (1.0 - intensity * 0.6)) as u8,
                255,
            );
            Rectangle::new(
                [(xi as f64, yi as f64), (xi as f64 + 1.0, yi as f64 + 1.0)],
                color.filled(),
            )
        })
    }))?;

    // Annotate each cell with its count.
    chart.draw_series(cells.iter().enumerate().flat_map(|(yi, row)| {
        row.iter().enumerate().map(move |(xi, &count)| {
            Text::new(
                count.to_string(),
                (xi as f64 + 0.45, yi as f64 + 0.55),
                ("sans-serif", 16),
            )
        })
    }))?;
    root.present()?;
    Ok(())
}

fn pad_range(lo: f64, hi: f64) -> std::ops::Range<f64> {
    if lo == hi {
        return (lo - 1.0)..(hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad)..(hi + pad)
}

fn i_of(items: &[String], value: &str) -> usize {
    items.iter().position(|v| v == value).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::suggest::ChartSuggestion;

    const CSV: &str = "region,product,sales\neast,widget,10\nwest,widget,12\neast,gadget,7\neast,widget,4\n";

    fn dataset() -> Dataset {
        Dataset::from_reader(CSV.as_bytes(), 100).unwrap()
    }

    fn suggestion(kind: &str, x: &str, y: &str) -> ChartSuggestion {
        ChartSuggestion {
            title: Some("T".into()),
            kind: Some(kind.into()),
            x: Some(x.into()),
            y: Some(y.into()),
            hue: None,
            description: None,
        }
    }

    #[test]
    fn unknown_column_is_skipped_without_writing() {
        let ds = dataset();
        let dir = tempfile::tempdir().unwrap();
        let result = materialize(&ds, &suggestion("bar", "missing", "sales"), 0, dir.path());
        assert!(result.is_none());
        assert!(!dir.path().join("graph_1.svg").exists());
    }

    #[test]
    fn missing_axis_is_skipped() {
        let ds = dataset();
        let dir = tempfile::tempdir().unwrap();
        let mut s = suggestion("bar", "region", "sales");
        s.y = None;
        assert!(materialize(&ds, &s, 0, dir.path()).is_none());
    }

    #[test]
    fn unknown_kind_is_skipped() {
        let ds = dataset();
        let dir = tempfile::tempdir().unwrap();
        assert!(materialize(&ds, &suggestion("pie", "region", "sales"), 0, dir.path()).is_none());
    }

    #[test]
    fn invalid_hue_is_dropped_but_chart_renders() {
        let ds = dataset();
        let dir = tempfile::tempdir().unwrap();
        let mut s = suggestion("bar", "region", "sales");
        s.hue = Some("nope".into());
        let path = materialize(&ds, &s, 0, dir.path()).expect("chart should render");
        assert!(path.exists());
    }

    #[test]
    fn artifact_name_derives_from_index() {
        let ds = dataset();
        let dir = tempfile::tempdir().unwrap();
        let path = materialize(&ds, &suggestion("scatter", "sales", "sales"), 2, dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "graph_3.svg");
    }

    #[test]
    fn renders_each_supported_kind() {
        let ds = dataset();
        let dir = tempfile::tempdir().unwrap();
        for (i, kind) in ["bar", "line", "scatter", "heatmap"].iter().enumerate() {
            let path = materialize(&ds, &suggestion(kind, "region", "sales"), i, dir.path());
            assert!(path.is_some(), "kind {} should render", kind);
        }
    }

    #[test]
    fn pivot_counts_cooccurrences_and_zero_fills() {
        let ds = dataset();
        let x = ds.column_index("region").unwrap();
        let y = ds.column_index("product").unwrap();
        let (xs, ys, cells) = count_pivot(&ds, x, y);
        assert_eq!(xs, vec!["east", "west"]);
        assert_eq!(ys, vec!["gadget", "widget"]);
        // (east, gadget)=1, (west, gadget)=0, (east, widget)=2, (west, widget)=1
        assert_eq!(cells, vec![vec![1, 0], vec![2, 1]]);
    }

    #[test]
    fn kind_parse_is_case_insensitive() {
        assert_eq!(ChartKind::parse("Bar"), Some(ChartKind::Bar));
        assert_eq!(ChartKind::parse("HEATMAP"), Some(ChartKind::Heatmap));
        assert_eq!(ChartKind::parse("pie"), None);
    }
}
