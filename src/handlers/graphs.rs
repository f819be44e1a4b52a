//! Suggestion pipeline: oracle session → extraction → materialization.
//!
//! Every failure mode here degrades: oracle-side trouble yields an empty
//! artifact list, and a bad suggestion skips only itself. The caller never
//! has to handle an error from this pipeline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::{debug, error, info, warn};

use crate::charts;
use crate::config::Config;
use crate::dataset::{AnalysisContext, Dataset};
use crate::llm::session::{RunState, SessionHandle};
use crate::llm::OracleClient;
use crate::role::{role_text, OracleRole};
use crate::suggest;

// Upper bound on pending polls so a run stuck in a non-terminal state
// cannot spin forever.
const MAX_PENDING_POLLS: usize = 60;

fn suggestion_prompt(dataset: &Dataset, context: &AnalysisContext, sample_rows: usize) -> String {
    let description = if context.data_description.is_empty() {
        "No description provided"
    } else {
        &context.data_description
    };
    format!(
        "Please analyze the following dataset and suggest multiple insightful graphs \
         across features that reveal key trends and patterns in the data.\n\
         Data description:\n{}\n\
         Data sample (CSV format):\n{}\n\
         Available features:\n{}\n\
         Requirements:\n\
         - Suggest final graphs such as bar charts, line charts, scatter plots, heatmaps, etc.\n\
         - For each graph, provide all required JSON fields\n\
         - Do not include any code in your response.\n",
        description,
        dataset.sample_csv(sample_rows),
        context.features.join(", "),
    )
}

/// Ask the oracle for chart suggestions and materialize each one in order.
/// Returns the artifact paths that actually rendered, possibly empty.
pub async fn suggest_and_render(
    client: &OracleClient,
    cfg: &Config,
    dataset: &Dataset,
    context: &AnalysisContext,
    model: &str,
    out_dir: &Path,
) -> Vec<PathBuf> {
    if let Err(e) = std::fs::create_dir_all(out_dir) {
        error!("cannot create graph output dir '{}': {}", out_dir.display(), e);
        return Vec::new();
    }

    let mut session = match client
        .create_session("Data Visualization Expert", &role_text(OracleRole::Visualization), model)
        .await
    {
        Ok(s) => s,
        Err(e) => {
            error!("error in graph generation process: {}", e);
            return Vec::new();
        }
    };

    // The session is released on every path out of here.
    let response = run_suggestion_session(client, cfg, &mut session, dataset, context).await;
    client.delete_session(&session).await;

    let raw = match response {
        Ok(text) => text,
        Err(e) => {
            error!("error in graph generation process: {}", e);
            return Vec::new();
        }
    };

    let suggestions = suggest::extract(&raw);
    info!("oracle suggested {} charts", suggestions.len());
    for s in &suggestions {
        debug!(
            "suggestion: kind={:?} x={:?} y={:?} title={:?} description={:?}",
            s.kind, s.x, s.y, s.title, s.description
        );
    }

    let mut artifacts = Vec::new();
    for (idx, suggestion) in suggestions.iter().enumerate() {
        if let Some(path) = charts::materialize(dataset, suggestion, idx, out_dir) {
            artifacts.push(path);
        }
    }
    artifacts
}

/// Post the prompt, poll the run to a terminal state, fetch the text.
/// A `failed` run state is retryable up to `ORACLE_POLL_RETRIES`; that
/// budget is local to this pipeline and independent of any repair-loop
/// attempt counting.
async fn run_suggestion_session(
    client: &OracleClient,
    cfg: &Config,
    session: &mut SessionHandle,
    dataset: &Dataset,
    context: &AnalysisContext,
) -> Result<String> {
    let sample_rows = cfg.get_usize("SAMPLE_ROWS").unwrap_or(5);
    client
        .start_run(session, &suggestion_prompt(dataset, context, sample_rows))
        .await?;

    let max_retries = cfg.get_usize("ORACLE_POLL_RETRIES").unwrap_or(3);
    let interval = Duration::from_millis(cfg.get_u64("ORACLE_POLL_INTERVAL_MS").unwrap_or(2000));

    let mut failures = 0;
    let mut polls = 0;
    loop {
        match client.poll(session).await? {
            RunState::Done => break,
            RunState::Failed => {
                failures += 1;
                if failures >= max_retries {
                    return Err(anyhow!("oracle run failed after {} retries", max_retries));
                }
                warn!("oracle run failed, attempt {} of {}", failures, max_retries);
            }
            RunState::Pending => {
                polls += 1;
                if polls >= MAX_PENDING_POLLS {
                    return Err(anyhow!("oracle run did not finish in time"));
                }
            }
        }
        tokio::time::sleep(interval).await;
    }

    client.fetch_result(session).await
}
