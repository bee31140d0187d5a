use std::env;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use askdocs_core::config::Settings;
use askdocs_embed::{get_default_embedder, OllamaClient};
use askdocs_rag::RagService;
use askdocs_vector::{IndexBuilder, IndexHandle};

const USAGE: &str = "Usage: askdocs <index [DIR] | ask [--json] <question...>>";

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() { eprintln!("{USAGE}"); std::process::exit(1); }
    let cmd = args.remove(0);
    (cmd, args)
}

/// Logs go to stderr so `ask --json` output stays machine readable.
fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let mut settings = Settings::load().context("loading configuration")?;
    let (cmd, args) = parse_args();

    match cmd.as_str() {
        "index" => {
            if let Some(dir) = args.first() {
                settings.rag.documents_dir = dir.clone();
            }
            let ollama = Arc::new(OllamaClient::new(&settings)?);
            let embedder = get_default_embedder(ollama);
            let builder = IndexBuilder::new(&settings.rag).with_progress(true);
            println!("Indexing {}", builder.documents_dir().display());
            let index = builder.build(embedder.as_ref())?;
            let stats = index.stats();
            println!(
                "✅ Indexed {} chunks from {} documents ({} without embedding, {} failed)",
                stats.indexed, stats.documents, stats.skipped_empty, stats.failed
            );
        }
        "ask" => {
            let json = args.iter().any(|a| a == "--json");
            let question = args.iter().filter(|a| *a != "--json").cloned().collect::<Vec<_>>().join(" ");
            if question.trim().is_empty() { eprintln!("{USAGE}"); std::process::exit(1); }

            let ollama = Arc::new(OllamaClient::new(&settings)?);
            let embedder = get_default_embedder(Arc::clone(&ollama));
            info!(host = ollama.base_url(), model = embedder.model_id(), "answering");
            let builder = IndexBuilder::new(&settings.rag).with_progress(!json);
            let handle = Arc::new(IndexHandle::new(builder, embedder));
            let service = Arc::new(RagService::new(&settings.rag, handle, ollama));

            let runtime = tokio::runtime::Runtime::new()?;
            let answer = runtime.block_on(Arc::clone(&service).answer_async(question))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                println!("{}", answer.answer);
                if !answer.sources.is_empty() {
                    println!("\nSources:");
                    for (i, source) in answer.sources.iter().enumerate() {
                        println!("  {}. {}", i + 1, source.source);
                        println!("     {}", source.preview.replace('\n', " "));
                    }
                }
            }
        }
        _ => { eprintln!("Unknown command: {cmd}\n{USAGE}"); std::process::exit(1); }
    }
    Ok(())
}
