//! Insight generation: one cached completion over summary and charts.

use std::path::PathBuf;

use anyhow::Result;

use crate::cache::RequestCache;
use crate::config::Config;
use crate::dataset::{AnalysisContext, Dataset};
use crate::llm::{ChatMessage, ChatOptions, OracleClient, Role};
use crate::role::{role_text, OracleRole};

const MAX_TOKENS: u32 = 1000;

fn insights_prompt(dataset: &Dataset, context: &AnalysisContext, graph_paths: &[PathBuf]) -> String {
    let graphs = if graph_paths.is_empty() {
        "(no charts were rendered)".to_string()
    } else {
        graph_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "Based on the following data summary and visualizations, provide key insights.\n\n\
         Data description:\n{}\n\n\
         Data Summary:\n{}\n\n\
         Rendered charts:\n{}\n\n\
         Please provide:\n\
         1. A clear, executive-level summary of the main findings.\n\
         2. Key trends and patterns identified.\n\
         3. Business-relevant recommendations.\n\n\
         Format the response in clear, non-technical language with bullet points where appropriate.",
        context.data_description,
        dataset.describe(),
        graphs,
    )
}

pub async fn make_inferences(
    client: &OracleClient,
    cfg: &Config,
    dataset: &Dataset,
    context: &AnalysisContext,
    graph_paths: &[PathBuf],
    model: &str,
    temperature: f32,
    top_p: f32,
    caching: bool,
) -> Result<String> {
    let messages = vec![
        ChatMessage::new(Role::System, role_text(OracleRole::Insights)),
        ChatMessage::new(Role::User, insights_prompt(dataset, context, graph_paths)),
    ];
    let opts = ChatOptions {
        model: model.to_string(),
        temperature,
        top_p,
        max_tokens: MAX_TOKENS,
    };

    let req_cache = RequestCache::from_config(cfg);
    let key = req_cache.key_for(client.base_url(), model, temperature, top_p, &messages);
    if caching {
        if let Some(text) = req_cache.get(&key) {
            return Ok(text);
        }
    }

    let text = client.complete(messages, opts).await?;
    if caching && !text.is_empty() {
        let _ = req_cache.set(&key, &text);
    }
    Ok(text)
}
