//! Example answering support questions end to end.
//!
//! Requires `GEMINI_API_KEY` (or `GOOGLE_API_KEY`) in the environment.

use eatsy::prelude::*;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::resolve("config.yaml")?;
    let provider = Arc::new(GeminiProvider::new(&config)?);
    let pipeline = Pipeline::new(config, &SampleSource, provider).await?;

    let queries = [
        "How can I get a discount?",
        "I want to cancel my order and get a refund.",
        "I want to customize my order as I have a dietary restriction",
    ];

    for strategy in ["bm25", "embedding"] {
        println!("=== {} ===\n", strategy);
        for query in queries {
            let result = pipeline.answer_query(query, strategy).await?;
            println!("Query: {}", result.query);
            match result.answer {
                GenerationOutcome::Answer(text) => println!("Answer: {}\n", text.trim()),
                GenerationOutcome::Failed(message) => println!("Error generating answer: {}\n", message),
            }
        }
    }

    Ok(())
}
