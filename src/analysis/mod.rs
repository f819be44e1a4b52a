//! Descriptive analysis: overview, numeric stats, correlations, outliers.

use crate::dataset::{mean, quantile, std_dev, ColumnKind, Dataset};

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub description: String,
}

fn format_number(n: f64) -> String {
    // Thousands separators on the integer part, two decimals.
    let negative = n < 0.0;
    let s = format!("{:.2}", n.abs());
    let (int_part, frac_part) = s.split_once('.').unwrap_or((&s, "00"));
    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let int_grouped: String = grouped.chars().rev().collect();
    format!("{}{}.{}", if negative { "-" } else { "" }, int_grouped, frac_part)
}

/// Build the human-readable statistics section of the report.
pub fn analyze(dataset: &Dataset) -> AnalysisReport {
    let numeric: Vec<usize> = dataset
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.kind == ColumnKind::Numeric)
        .map(|(i, _)| i)
        .collect();

    let mut insights = Vec::new();

    insights.push("Dataset Overview:".to_string());
    insights.push(format!("- Total records: {}", dataset.row_count()));
    insights.push(format!("- Number of features: {}", dataset.columns().len()));

    if !numeric.is_empty() {
        insights.push("\nNumeric Features Analysis:".to_string());
        for &i in &numeric {
            let vals = dataset.numeric_values(i);
            insights.push(format!("{}:", dataset.columns()[i].name));
            insights.push(format!("- Mean: {}", format_number(mean(&vals))));
            insights.push(format!("- Median: {}", format_number(quantile(&vals, 0.5))));
            insights.push(format!("- Standard deviation: {}", format_number(std_dev(&vals))));
        }
    }

    if numeric.len() > 1 {
        insights.push("\nCorrelation Analysis:".to_string());
        for (a, &i) in numeric.iter().enumerate() {
            for &j in numeric.iter().skip(a + 1) {
                let r = correlation(&dataset.numeric_values(i), &dataset.numeric_values(j));
                insights.push(format!(
                    "- {} vs {}: {:.3}",
                    dataset.columns()[i].name,
                    dataset.columns()[j].name,
                    r
                ));
            }
        }
    }

    let missing: Vec<(usize, usize)> = (0..dataset.columns().len())
        .map(|i| (i, dataset.missing_count(i)))
        .filter(|(_, n)| *n > 0)
        .collect();
    if !missing.is_empty() {
        insights.push("\nMissing Values:".to_string());
        for (i, n) in missing {
            insights.push(format!("- {}: {} missing values", dataset.columns()[i].name, n));
        }
    }

    let mut outlier_lines = Vec::new();
    for &i in &numeric {
        let vals = dataset.numeric_values(i);
        let q1 = quantile(&vals, 0.25);
        let q3 = quantile(&vals, 0.75);
        let iqr = q3 - q1;
        let outliers = vals
            .iter()
            .filter(|&&v| v < q1 - 1.5 * iqr || v > q3 + 1.5 * iqr)
            .count();
        if outliers > 0 {
            outlier_lines.push(format!(
                "- {}: {} potential outliers detected",
                dataset.columns()[i].name,
                outliers
            ));
        }
    }
    if !outlier_lines.is_empty() {
        insights.push("\nOutlier Detection:".to_string());
        insights.extend(outlier_lines);
    }

    AnalysisReport { description: insights.join("\n") }
}

/// Pearson correlation; 0.0 when either side is degenerate.
fn correlation(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let (mx, my) = (mean(xs), mean(ys));
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for i in 0..n {
        let dx = xs[i] - mx;
        let dy = ys[i] - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }
    if vx == 0.0 || vy == 0.0 {
        return 0.0;
    }
    cov / (vx.sqrt() * vy.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;

    #[test]
    fn correlation_of_linear_data_is_one() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [2.0, 4.0, 6.0, 8.0];
        assert!((correlation(&xs, &ys) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn correlation_degenerate_is_zero() {
        let xs = [1.0, 1.0, 1.0];
        let ys = [2.0, 4.0, 6.0];
        assert_eq!(correlation(&xs, &ys), 0.0);
    }

    #[test]
    fn format_number_groups_thousands() {
        assert_eq!(format_number(1234567.891), "1,234,567.89");
        assert_eq!(format_number(-42.5), "-42.50");
        assert_eq!(format_number(999.0), "999.00");
    }

    #[test]
    fn report_covers_overview_and_numeric_sections() {
        let csv = "a,b\n1,2\n2,4\n3,6\n4,100\n";
        let ds = Dataset::from_reader(csv.as_bytes(), 100).unwrap();
        let report = analyze(&ds);
        assert!(report.description.contains("Dataset Overview:"));
        assert!(report.description.contains("- Total records: 4"));
        assert!(report.description.contains("Numeric Features Analysis:"));
        assert!(report.description.contains("Correlation Analysis:"));
    }
}
