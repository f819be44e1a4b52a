//! Full report: preprocess → analyze → graphs → insights → critique.

use std::path::PathBuf;

use anyhow::Result;

use crate::analysis;
use crate::config::Config;
use crate::dataset::{AnalysisContext, Dataset};
use crate::llm::OracleClient;
use crate::printer::{section, MarkdownPrinter};

use super::{critique, graphs, insights};

pub struct ReportOptions {
    pub csv: PathBuf,
    pub description: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub row_limit: usize,
    pub out_dir: Option<PathBuf>,
    pub markdown: bool,
    pub caching: bool,
    pub skip_critique: bool,
}

/// Print descriptive statistics only; never touches the oracle.
pub fn run_analysis_only(csv: &std::path::Path, row_limit: usize) -> Result<()> {
    let dataset = Dataset::from_csv_path(csv, row_limit)?;
    let report = analysis::analyze(&dataset);
    section("Detailed Analysis");
    println!("{}", report.description);
    Ok(())
}

pub async fn run(cfg: &Config, opts: ReportOptions) -> Result<()> {
    let dataset = Dataset::from_csv_path(&opts.csv, opts.row_limit)?;
    let context = AnalysisContext::new(opts.description.clone(), &dataset);
    let client = OracleClient::from_config(cfg)?;

    let report = analysis::analyze(&dataset);

    let out_dir = opts.out_dir.clone().unwrap_or_else(|| cfg.graph_output_path());
    let graph_paths = graphs::suggest_and_render(
        &client,
        cfg,
        &dataset,
        &context,
        &opts.model,
        &out_dir,
    )
    .await;

    let inferences = insights::make_inferences(
        &client,
        cfg,
        &dataset,
        &context,
        &graph_paths,
        &opts.model,
        opts.temperature,
        opts.top_p,
        opts.caching,
    )
    .await?;

    let printer = MarkdownPrinter::default();

    section("Key Insights");
    if opts.markdown {
        printer.print(&inferences);
    } else {
        println!("{}", inferences);
    }

    section("Visualizations");
    if graph_paths.is_empty() {
        println!("(no charts rendered)");
    } else {
        for path in &graph_paths {
            println!("{}", path.display());
        }
    }

    section("Detailed Analysis");
    println!("{}", report.description);

    if !opts.skip_critique {
        let feedback = critique::critique_outputs(
            &client,
            cfg,
            &context,
            &graph_paths,
            &inferences,
            &opts.model,
            opts.temperature,
            opts.top_p,
            opts.caching,
        )
        .await?;
        section("Critique");
        if opts.markdown {
            printer.print(&feedback);
        } else {
            println!("{}", feedback);
        }
    }

    Ok(())
}
