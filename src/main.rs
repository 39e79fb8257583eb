use anyhow::Result;
use clap::Parser;
use insight_engine::dataset::{Dataset, DatasetContext};
use insight_engine::engine::AnalysisEngine;
use insight_engine::llm::{LlmClient, ResolvedRequest};
use insight_engine::stats::OperationRequest;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "insight-engine")]
#[command(about = "Dataset-aware query resolution engine for tabular data")]
struct Args {
    /// Path to a JSON file holding the dataset as an array of row objects
    data: PathBuf,

    /// Natural-language question (resolved via the LLM collaborator)
    #[arg(short, long)]
    question: Option<String>,

    /// Inline JSON operation request, bypassing the LLM (offline path)
    #[arg(short, long)]
    request: Option<String>,

    /// Print the dataset profile and exit
    #[arg(long)]
    profile: bool,

    /// OpenAI API key (or set OPENAI_API_KEY env var)
    #[arg(long)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let raw = std::fs::read_to_string(&args.data)?;
    let rows: Dataset = serde_json::from_str(&raw)?;
    info!("Loaded {} rows from {}", rows.len(), args.data.display());

    let ctx = DatasetContext::new(rows);
    let engine = AnalysisEngine::with_defaults();

    if args.profile {
        let profile = engine.profile(&ctx)?;
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    let result = if let Some(request_json) = &args.request {
        let request: OperationRequest = serde_json::from_str(request_json)?;
        let resolved = ResolvedRequest {
            operations: vec![request],
            ..ResolvedRequest::default()
        };
        engine.respond(&resolved, &ctx)
    } else if let Some(question) = &args.question {
        let api_key = args
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "dummy-api-key".to_string());
        let llm = LlmClient::new(api_key);
        engine.answer(question, &llm, &ctx).await
    } else {
        anyhow::bail!("provide either --question or --request");
    };

    match result {
        Ok(envelope) => println!("{}", serde_json::to_string_pretty(&envelope)?),
        Err(e) => {
            error!("Analysis failed: {}", e);
            println!("{}", serde_json::to_string_pretty(&e.to_failure())?);
        }
    }

    Ok(())
}
