//! Synthesis handler: drive the repair loop and surface its outcome.

use std::path::Path;

use anyhow::{bail, Result};

use crate::config::Config;
use crate::dataset::Dataset;
use crate::execution::PythonExecutor;
use crate::llm::{ChatOptions, OracleClient};
use crate::printer::section;
use crate::repair::{synthesize_and_run, OracleCodegen, Synthesis};

const MAX_TOKENS: u32 = 1500;

pub async fn run(
    csv: &Path,
    cfg: &Config,
    model: &str,
    temperature: f32,
    top_p: f32,
    row_limit: usize,
    max_attempts: usize,
    save_code: Option<&Path>,
) -> Result<()> {
    let dataset = Dataset::from_csv_path(csv, row_limit)?;
    let summary = dataset.describe();

    let client = OracleClient::from_config(cfg)?;
    let opts = ChatOptions {
        model: model.to_string(),
        temperature,
        top_p,
        max_tokens: MAX_TOKENS,
    };
    let oracle = OracleCodegen::new(&client, opts);
    let executor = PythonExecutor::new(cfg.python_bin());

    match synthesize_and_run(&oracle, &executor, &summary, max_attempts).await? {
        Synthesis::Accepted(candidate) => {
            section(&format!("Analysis code (accepted on attempt {})", candidate.attempt));
            match save_code {
                Some(path) => {
                    std::fs::write(path, &candidate.source)?;
                    println!("saved to {}", path.display());
                }
                None => println!("{}", candidate.source),
            }
            Ok(())
        }
        Synthesis::Exhausted(last) => {
            section("Synthesis failed");
            println!("{}", last.output);
            bail!("budget exhausted after {} attempts", max_attempts)
        }
    }
}
