use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use eatsy_core::config::Config;
use eatsy_core::rag::{DocumentSource, DocumentStore, JsonFileSource, LexicalIndex, SampleSource};
use eatsy_core::{GeminiProvider, GenerationOutcome, Pipeline, QueryAnswer, SearchResult, Strategy};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const DEMO_QUERIES: [&str; 3] = [
    "How can I get a discount?",
    "I want to cancel my order and get a refund.",
    "I want to customize my order as I have a dietary restriction",
];

#[derive(Parser)]
#[command(name = "eatsy")]
#[command(about = "Answer Eatsy support questions from the knowledge base", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(short, long, global = true, default_value = "config.yaml")]
    config: PathBuf,

    #[arg(short, long, global = true, help = "JSON knowledge base to load instead of the built-in sample")]
    data: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable debug logging")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Answer a support question")]
    Ask {
        query: String,

        #[arg(short, long, default_value = "lexical", help = "Retrieval strategy: lexical (bm25) or semantic (embedding)")]
        strategy: String,
    },

    #[command(about = "Show the documents retrieved for a query")]
    Search {
        query: String,

        #[arg(short, long, default_value = "lexical")]
        strategy: String,

        #[arg(short = 'k', long, help = "Number of results (defaults to rag.top_k)")]
        top_k: Option<usize>,
    },

    #[command(about = "Answer the sample support questions")]
    Demo {
        #[arg(short, long, default_value = "lexical")]
        strategy: String,
    },

    #[command(about = "Show current configuration")]
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Ask { query, strategy } => ask(&cli.config, cli.data.as_deref(), &query, &strategy).await,
        Commands::Search { query, strategy, top_k } => {
            search(&cli.config, cli.data.as_deref(), &query, &strategy, top_k).await
        }
        Commands::Demo { strategy } => demo(&cli.config, cli.data.as_deref(), &strategy).await,
        Commands::Config => show_config(&cli.config),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(config_path: &Path) -> Result<Config> {
    let config = Config::resolve(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    debug!(path = %config_path.display(), model = %config.llm.model, top_k = config.rag.top_k, "Loaded config");
    Ok(config)
}

fn document_source(data: Option<&Path>) -> Box<dyn DocumentSource> {
    match data {
        Some(path) => Box::new(JsonFileSource::new(path)),
        None => Box::new(SampleSource),
    }
}

async fn build_pipeline(config: Config, data: Option<&Path>, strategy: Strategy) -> Result<Pipeline> {
    let provider = Arc::new(GeminiProvider::new(&config).context("Failed to create Gemini provider")?);
    let source = document_source(data);
    info!(source = source.name(), strategy = %strategy, "Building pipeline");

    let pipeline = match strategy {
        Strategy::Lexical => Pipeline::lexical_only(config, source.as_ref(), provider).await,
        Strategy::Semantic => Pipeline::new(config, source.as_ref(), provider).await,
    };
    pipeline.context("Failed to build retrieval pipeline")
}

/// Logs every failed answer and returns how many there were.
fn report_failures(answers: &[QueryAnswer]) -> usize {
    let mut failures = 0;
    for answer in answers {
        if let GenerationOutcome::Failed(message) = &answer.answer {
            warn!(query = %answer.query, error = %message, "Query was not answered");
            failures += 1;
        }
    }
    failures
}

async fn ask(config_path: &Path, data: Option<&Path>, query: &str, strategy: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let parsed: Strategy = strategy.parse()?;
    let pipeline = build_pipeline(config, data, parsed).await?;

    let answer = pipeline.answer_query(query, strategy).await?;
    report_failures(std::slice::from_ref(&answer));
    print_answer(&answer, parsed);
    Ok(())
}

async fn search(
    config_path: &Path,
    data: Option<&Path>,
    query: &str,
    strategy: &str,
    top_k: Option<usize>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let parsed: Strategy = strategy.parse()?;
    let top_k = top_k.unwrap_or(config.rag.top_k);

    let results = match parsed {
        // No credentials needed: score locally without building a provider.
        Strategy::Lexical => {
            let store = DocumentStore::from_source(document_source(data).as_ref())
                .await
                .context("Failed to load documents")?;
            LexicalIndex::with_params(store, config.rag.bm25).search(query, top_k)?
        }
        Strategy::Semantic => {
            let pipeline = build_pipeline(config, data, parsed).await?;
            pipeline.retrieve(query, strategy, top_k).await?
        }
    };

    println!("{} {} ({})", "Results for:".bold().green(), query, parsed.to_string().cyan());
    println!();
    if results.is_empty() {
        println!("  {}", "No matching documents".yellow());
    }
    for (rank, result) in results.iter().enumerate() {
        print_result(rank + 1, result);
    }
    Ok(())
}

async fn demo(config_path: &Path, data: Option<&Path>, strategy: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let parsed: Strategy = strategy.parse()?;
    let pipeline = build_pipeline(config, data, parsed).await?;

    println!("{} {}", "→".blue(), format!("Answering {} queries with {} retrieval", DEMO_QUERIES.len(), parsed).dimmed());
    println!();

    let answers = futures::future::join_all(
        DEMO_QUERIES
            .iter()
            .map(|query| pipeline.answer_query(query, strategy)),
    )
    .await;

    let answers = answers.into_iter().collect::<Result<Vec<_>, _>>()?;
    let failures = report_failures(&answers);
    info!(queries = answers.len(), failures, "Demo finished");

    for answer in &answers {
        print_answer(answer, parsed);
        println!();
    }
    Ok(())
}

fn print_answer(answer: &QueryAnswer, strategy: Strategy) {
    println!("{} {}", "Query:".bold(), answer.query);
    println!("{} {}", "Strategy:".bold(), strategy.to_string().cyan());
    if !answer.sources.is_empty() {
        println!("{} {}", "Sources:".bold(), answer.sources.join(", ").dimmed());
    }
    match &answer.answer {
        GenerationOutcome::Answer(text) => println!("{}\n{}", "Answer:".bold().green(), text.trim()),
        GenerationOutcome::Failed(message) => println!("{} {}", "✗ Error generating answer:".red().bold(), message),
    }
}

fn print_result(rank: usize, result: &SearchResult) {
    let document = &result.document;
    println!(
        "  {}. {} {}",
        rank,
        document.id.cyan(),
        format!("(score {:.4})", result.score).dimmed()
    );
    if let Some(category) = document.category() {
        println!("     Category: {}", category);
    }
    println!("     {}", document.text);
}

fn show_config(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;

    let api_key = match config.api_key() {
        Ok(key) => mask(key),
        Err(_) => "(not set)".yellow().to_string(),
    };

    println!("{}", "Current Configuration:".bold().green());
    println!();
    println!("{}", "LLM:".bold());
    println!("  Model:           {}", config.llm.model.cyan());
    println!("  Base URL:        {}", config.llm.base_url);
    println!("  API Key:         {}", api_key);
    println!("  Timeout:         {}s", config.llm.request_timeout_secs);
    println!("  Max Retries:     {}", config.llm.max_retries);
    match config.llm.temperature {
        Some(temperature) => println!("  Temperature:     {}", temperature),
        None => println!("  Temperature:     {}", "(model default)".dimmed()),
    }
    println!();
    println!("{}", "RAG:".bold());
    println!("  Embedding Model: {}", config.rag.embedding_model.cyan());
    println!("  Top K:           {}", config.rag.top_k);
    println!("  BM25 k1 / b:     {} / {}", config.rag.bm25.k1, config.rag.bm25.b);
    println!();
    println!("{}", "Context:".bold());
    println!("  Max Documents:   {}", config.context.max_documents);
    println!("  Max Chars/Doc:   {}", config.context.max_chars_per_document);
    println!();
    println!("{}", "System Prompt:".bold());
    for line in config.system_prompt.lines() {
        println!("  {}", line.dimmed());
    }

    Ok(())
}

/// Keeps the last four characters of keys long enough to stay secret.
fn mask(key: &str) -> String {
    let len = key.chars().count();
    if len <= 8 {
        return "****".to_string();
    }
    let visible: String = key.chars().skip(len - 4).collect();
    format!("****{}", visible)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_hides_key() {
        assert_eq!(mask("AIzaSyExampleKey1234"), "****1234");
        assert_eq!(mask("short"), "****");
    }

    #[test]
    fn test_report_failures_counts_failed_answers() {
        let answer = |query: &str, outcome: GenerationOutcome| QueryAnswer {
            query: query.to_string(),
            answer: outcome,
            sources: Vec::new(),
        };
        let answers = vec![
            answer("discount", GenerationOutcome::Answer("Refer a friend.".into())),
            answer("refund", GenerationOutcome::Failed("quota exceeded".into())),
        ];
        assert_eq!(report_failures(&answers), 1);
        assert_eq!(report_failures(&answers[..1]), 0);
    }

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::parse_from(["eatsy", "search", "refund", "--top-k", "2", "--verbose"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("config.yaml"));
        match cli.command {
            Commands::Search { query, strategy, top_k } => {
                assert_eq!(query, "refund");
                assert_eq!(strategy, "lexical");
                assert_eq!(top_k, Some(2));
            }
            _ => panic!("expected search command"),
        }
    }
}
