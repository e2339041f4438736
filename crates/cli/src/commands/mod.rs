pub mod ask;
pub mod chat;
pub mod doctor;
pub mod onboard;

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;
use zoogent_agent::{Pipeline, PipelineEvent, TurnResult};
use zoogent_config::AppConfig;
use zoogent_search::GoogleSearch;

/// Load config and wire provider + search backend into a pipeline.
pub fn build_pipeline() -> Result<(AppConfig, Pipeline), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() && !is_local(&config.default_provider) {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    AWS_BEARER_TOKEN_BEDROCK=...   (Bedrock, default)");
        eprintln!("    OPENAI_API_KEY=sk-...          (with ZOOGENT_PROVIDER=openai)");
        eprintln!("    ZOOGENT_API_KEY=...            (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = zoogent_providers::build_from_config(&config)?;
    let backend = GoogleSearch::from_config(&config.search)
        .map_err(|e| format!("{e}. Set GOOGLE_API_KEY and GOOGLE_CX or run `zoogent onboard`."))?;

    info!(
        provider = %provider.name(),
        search = "google_cse",
        variant = ?config.pipeline.variant,
        "Pipeline ready"
    );
    let pipeline = Pipeline::from_config(provider, Arc::new(backend), &config);
    Ok((config, pipeline))
}

fn is_local(provider: &str) -> bool {
    matches!(provider, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

/// Print stage progress on stderr until the sender side closes.
pub fn spawn_progress_printer() -> (mpsc::Sender<PipelineEvent>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<PipelineEvent>(32);
    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                PipelineEvent::Stage { stage, index } => {
                    eprintln!("  [{index}/6] {}...", stage.label());
                }
                PipelineEvent::Degraded { step, .. } => {
                    eprintln!("        ({step} unavailable, using fallback)");
                }
                PipelineEvent::Done { .. } | PipelineEvent::Failed { .. } => {}
            }
        }
    });
    (tx, handle)
}

pub fn print_result(result: &TurnResult) {
    println!();
    println!("  {}", result.summary);
    println!();

    for (i, product) in result.ranked_products.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, product.title);
        println!("      {} — {}", product.domain, product.link);
        if let Some(intro) = result
            .introductions
            .iter()
            .find(|intro| intro.link == product.link)
        {
            println!("      {}", intro.introduction);
        }
    }

    println!();
    println!("  Forum take: {}", result.forum_info.summary);
    for thread in &result.forum_info.results {
        println!("    - {} ({})", thread.title, thread.link);
    }
    println!();
    println!(
        "  Searched for \"{}\" as a {} buyer{}",
        result.search_query,
        result.user_type,
        if result.is_follow_up { " (follow-up)" } else { "" }
    );
    println!();
}
