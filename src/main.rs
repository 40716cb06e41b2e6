// rag_playground/src/main.rs
// Entry point for the rag-playground CLI.

use clap::Parser;
use rag_playground::cli::{AskArgs, Cli, Commands, ExtractArgs, LoadArgs};
use rag_playground::config::{OpenAISettings, PostgresSettings, load_dotenv};
use rag_playground::documents::{
    ConfluenceLoader, DocumentLoader, GoogleDriveLoader, PdfLoader, load_all,
};
use rag_playground::embeddings::OpenAIEmbedder;
use rag_playground::error::Result;
use rag_playground::extraction::{Extractor, SAMPLE_ESSAY, extract_and_store};
use rag_playground::llm::OpenAIChat;
use rag_playground::postgres::CompanyStore;
use rag_playground::qdrant::{QdrantStore, VectorStore};
use rag_playground::rag::RagChain;
use rag_playground::splitter::TextSplitter;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(),> {
    load_dotenv();

    // Initialize tracing
    let file_appender = tracing_appender::rolling::never(".", "rag-playground.log",);
    let (non_blocking, _guard,) = tracing_appender::non_blocking(file_appender,);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info",),),)
        .with(fmt::layer().with_writer(std::io::stderr,),)
        .with(fmt::layer().with_writer(non_blocking,).with_ansi(false,),)
        .init();

    let cli = Cli::parse();
    let openai = OpenAISettings::try_from(&cli.openai,)?;

    match &cli.command {
        Commands::Load(args,) => handle_load(args, &openai,).await,
        Commands::Ask(args,) => handle_ask(args, &openai,).await,
        Commands::Extract(args,) => handle_extract(args, &openai,).await,
    }
}

fn build_loaders(args: &LoadArgs,) -> Vec<Box<dyn DocumentLoader,>,> {
    let mut loaders: Vec<Box<dyn DocumentLoader,>,> = Vec::new();

    match args.confluence.settings() {
        Some(settings,) => match ConfluenceLoader::new(&settings,) {
            Ok(loader,) => loaders.push(Box::new(loader,),),
            Err(e,) => warn!("Confluence loading failed: {}", e),
        },
        None => warn!("Confluence settings incomplete, skipping Confluence"),
    }

    match args.google_drive.settings() {
        Some(settings,) => match GoogleDriveLoader::new(&settings,) {
            Ok(loader,) => loaders.push(Box::new(loader,),),
            Err(e,) => warn!("Google Drive loading failed: {}", e),
        },
        None => warn!("No Google Drive file ids configured, skipping Google Drive"),
    }

    if let Some(path,) = &args.pdf_path {
        loaders.push(Box::new(PdfLoader::new(path.clone(),),),);
    }

    loaders
}

async fn handle_load(args: &LoadArgs, openai: &OpenAISettings,) -> Result<(),> {
    let splitter = TextSplitter::new(args.chunk_size, args.chunk_overlap,)?;
    let loaders = build_loaders(args,);

    let documents = load_all(&loaders,).await;
    info!("Loaded {} documents", documents.len());

    let chunks = splitter.split_documents(&documents,);
    info!(
        "Split into {} chunks (size {}, overlap {})",
        chunks.len(),
        args.chunk_size,
        args.chunk_overlap
    );
    if chunks.is_empty() {
        warn!("No chunks to store");
        return Ok((),);
    }

    let embedder = OpenAIEmbedder::new(openai,);
    let store = QdrantStore::connect(&args.qdrant.qdrant_url, &args.qdrant.collection_name,).await?;
    let written = store.add_chunks(&chunks, &embedder,).await?;
    info!(
        "Stored {} chunks in collection {} using {}",
        written,
        store.collection_name(),
        embedder.model()
    );

    Ok((),)
}

async fn handle_ask(args: &AskArgs, openai: &OpenAISettings,) -> Result<(),> {
    let store = QdrantStore::connect(&args.qdrant.qdrant_url, &args.qdrant.collection_name,).await?;
    let chain = RagChain::new(
        Box::new(store,),
        Box::new(OpenAIEmbedder::new(openai,),),
        Box::new(OpenAIChat::new(openai,),),
        args.k,
    );

    if let Some(question,) = &args.question {
        let answer = chain.invoke(question,).await?;
        println!("{}", answer);
        return Ok((),);
    }

    if args.test_queries {
        chain.run_test_queries().await;
        return Ok((),);
    }

    chain.run_interactive().await
}

async fn handle_extract(args: &ExtractArgs, openai: &OpenAISettings,) -> Result<(),> {
    let essay = match &args.input {
        Some(path,) => tokio::fs::read_to_string(path,).await?,
        None => SAMPLE_ESSAY.to_string(),
    };

    let chat = OpenAIChat::new(openai,);
    info!("Extracting companies with {}", chat.model());
    let extractor = Extractor::new(&chat,);
    let store = CompanyStore::connect(&PostgresSettings::from(&args.postgres,),).await?;

    let stored = extract_and_store(&essay, &extractor, &store,).await?;
    if stored.is_empty() {
        println!("No companies were successfully stored");
    } else {
        println!("\nFinal Results in Database:");
        println!("Number of companies stored: {}", stored.len());
        for company in &stored {
            println!(
                "{:>4}  {}  {}  ({})",
                company.id,
                company.founded_in,
                company.company_name,
                company.founded_by.join(", ")
            );
        }
    }

    Ok((),)
}
