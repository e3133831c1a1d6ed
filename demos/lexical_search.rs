//! Example demonstrating offline lexical retrieval.
//!
//! This example shows how to:
//! - Load the built-in knowledge base
//! - Build a BM25 index over it
//! - Assemble the context a generation call would receive
//!
//! No API key or network access is needed.

use eatsy::prelude::*;
use eatsy::rag::{ContextAssembler, DocumentStore, LexicalIndex};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("Eatsy - Lexical Search Example");
    println!("==============================\n");

    let config = Config::load_or_default();
    let store = DocumentStore::from_source(&SampleSource).await?;
    println!("Knowledge base: {} documents\n", store.len());

    let index = LexicalIndex::with_params(store, config.rag.bm25);
    let assembler = ContextAssembler::from_config(&config.context);

    for query in ["How can I get a discount?", "vegan options", "refund for a late delivery"] {
        println!("Query: {}", query);
        let results = index.search(query, config.rag.top_k)?;
        for result in &results {
            println!("  {:>8.4}  {}  {}", result.score, result.document.id, result.document.text);
        }
        println!("Context:\n{}", assembler.assemble(&results));
    }

    Ok(())
}
