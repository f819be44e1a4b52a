//! Critique pass: a second completion reviewing the generated report.

use std::path::PathBuf;

use anyhow::Result;

use crate::cache::RequestCache;
use crate::config::Config;
use crate::dataset::AnalysisContext;
use crate::llm::{ChatMessage, ChatOptions, OracleClient, Role};
use crate::role::{role_text, OracleRole};

const MAX_TOKENS: u32 = 500;

fn critique_prompt(context: &AnalysisContext, graph_paths: &[PathBuf], inferences: &str) -> String {
    let graphs = graph_paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Review the following analysis and visualizations.\n\n\
         Data description:\n{}\n\n\
         Inferences:\n{}\n\n\
         Graphs generated:\n{}\n\n\
         Please provide a critique that includes:\n\
         - Assessment of the accuracy and relevance of the inferences.\n\
         - Suggestions for additional analyses or visualizations.\n\
         - Recommendations for improving the presentation of findings.",
        context.data_description,
        inferences,
        graphs,
    )
}

pub async fn critique_outputs(
    client: &OracleClient,
    cfg: &Config,
    context: &AnalysisContext,
    graph_paths: &[PathBuf],
    inferences: &str,
    model: &str,
    temperature: f32,
    top_p: f32,
    caching: bool,
) -> Result<String> {
    let messages = vec![
        ChatMessage::new(Role::System, role_text(OracleRole::Critique)),
        ChatMessage::new(Role::User, critique_prompt(context, graph_paths, inferences)),
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
