mod analysis;
mod cache;
mod charts;
mod cli;
mod config;
mod dataset;
mod execution;
mod handlers;
mod llm;
mod printer;
mod repair;
mod role;
mod suggest;
mod utils;

use std::io::{self, Read};

use anyhow::Result;
use config::Config;
use is_terminal::IsTerminal;

use handlers::report::ReportOptions;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("datalyst=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = cli::Cli::parse();

    // Load config
    let cfg = Config::load();

    // Resolve model: CLI overrides config; fall back to DEFAULT_MODEL
    let effective_model = args
        .model
        .clone()
        .or_else(|| cfg.get("DEFAULT_MODEL"))
        .unwrap_or_else(|| "gpt-4o".to_string());

    // stdin handling: the dataset description may be piped in
    let mut description = args.description.clone().unwrap_or_default();
    if description.is_empty() && !io::stdin().is_terminal() {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        description = buf.trim().to_string();
    }

    // Effective boolean switches with config defaults
    let markdown = if args.no_md {
        false
    } else if args.md {
        true
    } else {
        cfg.get_bool("PRETTIFY_MARKDOWN")
    };
    let caching = if args.no_cache {
        false
    } else if args.cache {
        true
    } else {
        true // default enabled
    };

    let row_limit = args
        .rows
        .or_else(|| cfg.get_usize("ROW_LIMIT"))
        .unwrap_or(100);

    // Route to handler
    if args.synth {
        let max_attempts = args
            .max_attempts
            .or_else(|| cfg.get_usize("MAX_REPAIR_ATTEMPTS"))
            .unwrap_or(3);
        return handlers::synth::run(
            &args.csv,
            &cfg,
            &effective_model,
            args.temperature,
            args.top_p,
            row_limit,
            max_attempts,
            args.save_code.as_deref(),
        )
        .await;
    }

    if args.analysis_only {
        return handlers::report::run_analysis_only(&args.csv, row_limit);
    }

    handlers::report::run(
        &cfg,
        ReportOptions {
            csv: args.csv.clone(),
            description,
            model: effective_model,
            temperature: args.temperature,
            top_p: args.top_p,
            row_limit,
            out_dir: args.out_dir.clone(),
            markdown,
            caching,
            skip_critique: args.no_critique,
        },
    )
    .await
}
