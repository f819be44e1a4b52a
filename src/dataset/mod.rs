//! In-memory tabular dataset: CSV ingestion, row trimming, column kinds.

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Temporal,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Temporal => "temporal",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

/// Ordered set of named columns plus insertion-ordered rows. Immutable for
/// the lifetime of a job once loaded.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
    missing_counts: Vec<usize>,
}

impl Dataset {
    pub fn from_csv_path(path: &Path, row_limit: usize) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open '{}'", path.display()))?;
        Self::from_reader(file, row_limit)
    }

    /// Parse CSV, drop rows with any missing field, keep the first
    /// `row_limit` surviving rows, then infer column kinds.
    pub fn from_reader<R: Read>(reader: R, row_limit: usize) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .context("failed to read CSV header")?
            .iter()
            .map(|h| h.to_string())
            .collect();
        if headers.is_empty() {
            bail!("CSV has no columns");
        }

        let mut missing_counts = vec![0usize; headers.len()];
        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in rdr.records() {
            let record = record.context("failed to read CSV record")?;
            let fields: Vec<String> = record.iter().map(|f| f.to_string()).collect();
            if fields.len() != headers.len() {
                continue;
            }
            let mut complete = true;
            for (i, f) in fields.iter().enumerate() {
                if f.is_empty() {
                    missing_counts[i] += 1;
                    complete = false;
                }
            }
            if !complete {
                continue;
            }
            if rows.len() < row_limit {
                rows.push(fields);
            }
        }

        let columns = headers
            .into_iter()
            .enumerate()
            .map(|(i, name)| Column {
                kind: infer_kind(rows.iter().map(|r| r[i].as_str())),
                name,
            })
            .collect();

        Ok(Self { columns, rows, missing_counts })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Raw values of one column, in row order.
    pub fn values(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows.iter().map(move |r| r[index].as_str())
    }

    /// Values of a column that parse as numbers, in row order.
    pub fn numeric_values(&self, index: usize) -> Vec<f64> {
        self.values(index)
            .filter_map(|v| v.parse::<f64>().ok())
            .collect()
    }

    /// Count of rows dropped at load time because this column was empty.
    pub fn missing_count(&self, index: usize) -> usize {
        self.missing_counts[index]
    }

    /// First `n` rows re-serialized as CSV, headers included. Used to give
    /// the oracle a compact look at the data.
    pub fn sample_csv(&self, n: usize) -> String {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        let _ = wtr.write_record(self.columns.iter().map(|c| c.name.as_str()));
        for row in self.rows.iter().take(n) {
            let _ = wtr.write_record(row.iter());
        }
        let bytes = wtr.into_inner().unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Per-column summary in the shape of a dataframe `describe` dump:
    /// count/mean/std/min/quartiles/max for numeric columns, count/unique/
    /// top/freq for the rest.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for (i, col) in self.columns.iter().enumerate() {
            match col.kind {
                ColumnKind::Numeric => {
                    let vals = self.numeric_values(i);
                    out.push_str(&format!(
                        "{} ({}): count={} mean={:.2} std={:.2} min={:.2} 25%={:.2} 50%={:.2} 75%={:.2} max={:.2}\n",
                        col.name,
                        col.kind.as_str(),
                        vals.len(),
                        mean(&vals),
                        std_dev(&vals),
                        vals.iter().cloned().fold(f64::INFINITY, f64::min),
                        quantile(&vals, 0.25),
                        quantile(&vals, 0.5),
                        quantile(&vals, 0.75),
                        vals.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
                    ));
                }
                _ => {
                    let mut counts: std::collections::HashMap<&str, usize> =
                        std::collections::HashMap::new();
                    for v in self.values(i) {
                        *counts.entry(v).or_default() += 1;
                    }
                    let (top, freq) = counts
                        .iter()
                        .max_by_key(|(_, n)| **n)
                        .map(|(v, n)| (v.to_string(), *n))
                        .unwrap_or_default();
                    out.push_str(&format!(
                        "{} ({}): count={} unique={} top={} freq={}\n",
                        col.name,
                        col.kind.as_str(),
                        self.rows.len(),
                        counts.len(),
                        top,
                        freq,
                    ));
                }
            }
        }
        out
    }
}

/// Free-text description plus the ordered feature list, built once per job
/// and passed by reference to every stage.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub data_description: String,
    pub features: Vec<String>,
}

impl AnalysisContext {
    pub fn new(data_description: impl Into<String>, dataset: &Dataset) -> Self {
        Self {
            data_description: data_description.into(),
            features: dataset.columns().iter().map(|c| c.name.clone()).collect(),
        }
    }
}

fn infer_kind<'a>(values: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut any = false;
    let mut all_numeric = true;
    let mut all_temporal = true;
    for v in values {
        any = true;
        if v.parse::<f64>().is_err() {
            all_numeric = false;
        }
        if !parses_as_date(v) {
            all_temporal = false;
        }
        if !all_numeric && !all_temporal {
            break;
        }
    }
    if any && all_numeric {
        ColumnKind::Numeric
    } else if any && all_temporal {
        ColumnKind::Temporal
    } else {
        ColumnKind::Categorical
    }
}

fn parses_as_date(v: &str) -> bool {
    const FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y"];
    FORMATS
        .iter()
        .any(|f| NaiveDate::parse_from_str(v, f).is_ok())
}

pub(crate) fn mean(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return 0.0;
    }
    vals.iter().sum::<f64>() / vals.len() as f64
}

pub(crate) fn std_dev(vals: &[f64]) -> f64 {
    if vals.len() < 2 {
        return 0.0;
    }
    let m = mean(vals);
    let var = vals.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (vals.len() - 1) as f64;
    var.sqrt()
}

/// Linear-interpolated quantile over a sorted copy, `q` in [0, 1].
pub(crate) fn quantile(vals: &[f64], q: f64) -> f64 {
    if vals.is_empty() {
        return 0.0;
    }
    let mut sorted = vals.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "name,score,joined\nalice,10,2021-01-05\nbob,12,2021-02-11\ncarol,,2021-03-02\ndan,9,2021-04-20\n";

    #[test]
    fn loads_and_drops_incomplete_rows() {
        let ds = Dataset::from_reader(CSV.as_bytes(), 100).unwrap();
        assert_eq!(ds.row_count(), 3);
        assert_eq!(ds.missing_count(1), 1);
        assert_eq!(ds.column_names(), vec!["name", "score", "joined"]);
    }

    #[test]
    fn infers_column_kinds() {
        let ds = Dataset::from_reader(CSV.as_bytes(), 100).unwrap();
        assert_eq!(ds.columns()[0].kind, ColumnKind::Categorical);
        assert_eq!(ds.columns()[1].kind, ColumnKind::Numeric);
        assert_eq!(ds.columns()[2].kind, ColumnKind::Temporal);
    }

    #[test]
    fn honors_row_limit() {
        let ds = Dataset::from_reader(CSV.as_bytes(), 2).unwrap();
        assert_eq!(ds.row_count(), 2);
    }

    #[test]
    fn sample_csv_round_trips_header_and_rows() {
        let ds = Dataset::from_reader(CSV.as_bytes(), 100).unwrap();
        let sample = ds.sample_csv(2);
        let mut lines = sample.lines();
        assert_eq!(lines.next(), Some("name,score,joined"));
        assert_eq!(lines.next(), Some("alice,10,2021-01-05"));
        assert_eq!(lines.next(), Some("bob,12,2021-02-11"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn describe_covers_every_column() {
        let ds = Dataset::from_reader(CSV.as_bytes(), 100).unwrap();
        let summary = ds.describe();
        assert!(summary.contains("score (numeric)"));
        assert!(summary.contains("name (categorical)"));
        assert!(summary.contains("joined (temporal)"));
    }

    #[test]
    fn quantile_interpolates() {
        let vals = [1.0, 2.0, 3.0, 4.0];
        assert!((quantile(&vals, 0.5) - 2.5).abs() < 1e-9);
        assert!((quantile(&vals, 0.0) - 1.0).abs() < 1e-9);
        assert!((quantile(&vals, 1.0) - 4.0).abs() < 1e-9);
    }
}
