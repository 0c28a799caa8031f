//! Resolve command - one lookup through the configured cache

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde_json::{Map, Value};

use crate::config::AppConfig;
use crate::domain::GenerationRequest;
use crate::infrastructure::logging;

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Prompt text
    #[arg(long)]
    pub prompt: String,

    /// Pass-through backend parameter, e.g. `--param size=256x256`
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, Value)>,

    /// Where to write the artifact; nothing is written if omitted
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Parse `key=value`; values that are valid JSON keep their type
fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;

    if key.is_empty() {
        return Err(format!("empty parameter name in '{}'", raw));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));

    Ok((key.to_string(), value))
}

impl ResolveArgs {
    pub fn to_request(&self) -> GenerationRequest {
        let parameters: Map<String, Value> = self.params.iter().cloned().collect();

        GenerationRequest {
            prompt: self.prompt.clone(),
            parameters,
        }
    }
}

/// Resolve once, report the cache indicator and write the artifact
pub async fn run(args: ResolveArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);

    let cache = crate::build_cache_service(&config).await?;
    let result = cache.resolve(&args.to_request()).await;
    cache.shutdown().await;

    let resolution = result.context("Resolve failed")?;

    println!(
        "{} entry={} bytes={} content_type={}{}",
        if resolution.served_from_cache { "HIT" } else { "MISS" },
        resolution.entry_id,
        resolution.artifact.len(),
        resolution.artifact.content_type(),
        resolution
            .similarity
            .map(|s| format!(" similarity={:.4}", s))
            .unwrap_or_default(),
    );

    if let Some(path) = &args.output {
        tokio::fs::write(path, resolution.artifact.data())
            .await
            .with_context(|| format!("Failed to write artifact to {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    Ok(())
}
