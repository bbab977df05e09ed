use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use docqa_core::config::{resolve_with_base, Config, Settings};
use docqa_core::traits::VectorStore;
use docqa_core::types::AnswerResult;
use docqa_rag::extract::source_id_for;
use docqa_rag::{clear_documents, collect_documents, reset_store, RagPipeline, EXAMPLE_QUESTIONS};
use docqa_vector::LanceVectorStore;

#[derive(Parser)]
#[command(name = "docqa", version, about = "Ask questions about your documents, answered locally")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, chunk, embed and store documents (files or directories)
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Answer one question from the loaded documents
    Ask {
        question: String,
        /// Number of chunks to retrieve (defaults to rag.top_k)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        top_k: Option<u64>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive question loop; `:quit` exits
    Chat,
    /// List loaded documents
    Sources,
    /// Delete every collection and the stored documents
    Reset,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let base = std::env::current_dir()?;

    match cli.command {
        Command::Ingest { paths } => ingest(&RagPipeline::from_settings(&settings, &base)?, &paths),
        Command::Ask { question, top_k, json } => {
            let pipeline = RagPipeline::from_settings(&settings, &base)?;
            let result = pipeline.ask_with(&question, top_k.map_or(settings.rag.top_k, |k| k as usize));
            if json { println!("{}", serde_json::to_string_pretty(&result)?); } else { print_result(&result); }
            Ok(())
        }
        Command::Chat => chat(&RagPipeline::from_settings(&settings, &base)?),
        Command::Sources => {
            let store = open_store(&settings, &base)?;
            let sources = store.sources(&settings.rag.collection)?;
            if sources.is_empty() { println!("No documents loaded."); }
            for s in sources { println!("{s}"); }
            Ok(())
        }
        Command::Reset => {
            let collections = reset_store(&open_store(&settings, &base)?)?;
            let documents = clear_documents(&resolve_with_base(&base, &settings.data.data_dir))?;
            println!("Deleted {collections} collection(s) and {documents} stored document(s).");
            Ok(())
        }
    }
}

fn open_store(settings: &Settings, base: &std::path::Path) -> Result<LanceVectorStore> {
    LanceVectorStore::open(&resolve_with_base(base, &settings.data.db_dir))
}

fn ingest(pipeline: &RagPipeline, paths: &[PathBuf]) -> Result<()> {
    let files = collect_documents(paths);
    if files.is_empty() { println!("No .pdf or .txt documents found."); return Ok(()); }
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents {msg}")?.progress_chars("#>-"));
    let report = pipeline.ingest_documents(&files, |path, outcome| {
        pb.inc(1);
        match outcome {
            Ok(chunks) => pb.set_message(format!("{} ({} chunks)", source_id_for(path), chunks)),
            Err(e) => pb.println(format!("❌ {e}")),
        }
    });
    pb.finish_and_clear();
    for doc in &report.loaded { println!("✅ {} ({} chunks)", doc.source_id, doc.chunks); }
    for path in &report.replaced { println!("⚠️  {} replaced an earlier file with the same name", path.display()); }
    println!("📊 Loaded {} document(s), {} failed", report.loaded.len(), report.failed.len());
    Ok(())
}

fn print_result(result: &AnswerResult) {
    match (&result.answer, &result.error) {
        (Some(answer), None) => {
            println!("{answer}\n");
            println!("Sources:");
            for s in &result.sources { println!("  {} | chunk {} | score {:.2}", s.source_id, s.index, s.similarity); }
            println!("Confidence: {:.2}", result.confidence);
        }
        (_, Some(error)) => println!("❌ {error}"),
        (None, None) => println!("Sorry, I couldn't find an answer."),
    }
}

fn chat(pipeline: &RagPipeline) -> Result<()> {
    let loaded = pipeline.loaded_sources()?;
    if loaded.is_empty() {
        println!("Please ingest at least one document first (docqa ingest <PATH>).");
        return Ok(());
    }
    println!("Loaded: {}", loaded.join(", "));
    println!("Example questions:");
    for q in EXAMPLE_QUESTIONS { println!("  - {q}"); }

    let stdin = io::stdin();
    loop {
        print!("\n> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 { break; }
        let question = line.trim();
        if question.is_empty() { continue; }
        if question == ":quit" { break; }
        print_result(&pipeline.ask(question));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_k_must_be_positive() {
        assert!(Cli::try_parse_from(["docqa", "ask", "why?", "--top-k", "0"]).is_err());
        let cli = Cli::try_parse_from(["docqa", "ask", "why?", "--top-k", "3"]).expect("parse");
        assert!(matches!(cli.command, Command::Ask { top_k: Some(3), .. }));
    }
}
