use std::path::PathBuf;

use clap::{ArgGroup, Parser};

#[derive(Parser, Debug, Clone)]
#[command(name = "datalyst", about = "AI data analyst CLI", version)]
#[command(group(ArgGroup::new("mode").args(["analysis_only", "synth"]).multiple(false)))]
#[command(group(ArgGroup::new("md_switch").args(["md", "no_md"]).multiple(false)))]
#[command(group(ArgGroup::new("cache_switch").args(["cache", "no_cache"]).multiple(false)))]
pub struct Cli {
    /// Path to the CSV dataset to analyze.
    #[arg(value_name = "CSV")]
    pub csv: PathBuf,

    /// Free-text description of the dataset. May also be piped on stdin.
    #[arg(value_name = "DESCRIPTION")]
    pub description: Option<String>,

    /// Large language model to use.
    #[arg(long)]
    pub model: Option<String>,

    /// Randomness of generated output.
    #[arg(long, default_value_t = 0.0, value_parser = clap::value_parser!(f32))]
    pub temperature: f32,

    /// Limits highest probable tokens (words).
    #[arg(long = "top-p", default_value_t = 1.0, value_parser = clap::value_parser!(f32))]
    pub top_p: f32,

    /// Prettify Markdown output.
    #[arg(long)]
    pub md: bool,
    /// Disable Markdown prettifying.
    #[arg(long = "no-md")]
    pub no_md: bool,

    /// Cache insight/critique completions.
    #[arg(long)]
    pub cache: bool,
    /// Disable caching.
    #[arg(long = "no-cache")]
    pub no_cache: bool,

    /// Print descriptive statistics only; no oracle calls.
    #[arg(short = 'a', long = "analysis-only")]
    pub analysis_only: bool,

    /// Skip the critique pass of the report.
    #[arg(long = "no-critique")]
    pub no_critique: bool,

    /// Synthesize and run ML analysis code with a self-repair loop.
    #[arg(short = 's', long)]
    pub synth: bool,

    /// Execution budget for the synthesis loop.
    #[arg(long = "max-attempts")]
    pub max_attempts: Option<usize>,

    /// Write accepted synthesis code to this file instead of stdout.
    #[arg(long = "save-code")]
    pub save_code: Option<PathBuf>,

    /// Output directory for rendered charts.
    #[arg(short = 'o', long = "out-dir")]
    pub out_dir: Option<PathBuf>,

    /// Trim the dataset to this many rows.
    #[arg(long)]
    pub rows: Option<usize>,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
