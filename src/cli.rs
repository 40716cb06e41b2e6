// rag_playground/src/cli.rs
// Command line interface. Every flag falls back to an environment variable so
// each subcommand also runs with no flags at all.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// RAG playground and company extraction demos.
#[derive(Parser, Debug,)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    #[clap(flatten)]
    pub openai: OpenAIArgs,
}

#[derive(Subcommand, Debug,)]
pub enum Commands {
    /// Load Confluence, Google Drive and PDF documents into the vector store
    Load(LoadArgs,),
    /// Answer questions from the loaded documents
    Ask(AskArgs,),
    /// Extract company details from text and store them in PostgreSQL
    Extract(ExtractArgs,),
}

#[derive(Args, Debug,)]
pub struct OpenAIArgs {
    /// OpenAI API key used for chat completions and embeddings
    #[clap(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub openai_api_key: Option<String,>,

    /// Base URL of the OpenAI-compatible API
    #[clap(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1", global = true)]
    pub openai_base_url: String,

    /// Chat model used for answers and extraction
    #[clap(long, env = "LLM_MODEL", default_value = "gpt-4o-mini", global = true)]
    pub llm_model: String,

    /// Embedding model used for chunks and queries
    #[clap(long, env = "EMBEDDING_MODEL", default_value = "text-embedding-3-small", global = true)]
    pub embedding_model: String,
}

#[derive(Args, Debug,)]
pub struct QdrantArgs {
    /// Qdrant gRPC endpoint
    #[clap(long, env = "QDRANT_URL", default_value = "http://localhost:6334")]
    pub qdrant_url: String,

    /// Name of the collection holding the document chunks
    #[clap(long, env = "COLLECTION_NAME", default_value = crate::DEFAULT_COLLECTION_NAME)]
    pub collection_name: String,
}

#[derive(Args, Debug,)]
pub struct ConfluenceArgs {
    /// Confluence site URL, e.g. https://acme.atlassian.net/wiki
    #[clap(long, env = "CONFLUENCE_BASE_URL")]
    pub confluence_base_url: Option<String,>,

    /// Confluence account used with the API token
    #[clap(long, env = "CONFLUENCE_USERNAME")]
    pub confluence_username: Option<String,>,

    /// Confluence API token
    #[clap(long, env = "CONFLUENCE_API_TOKEN", hide_env_values = true)]
    pub confluence_api_token: Option<String,>,

    /// URL of the Code of Conduct page
    #[clap(long, env = "CODE_OF_CONDUCT_URL")]
    pub code_of_conduct_url: Option<String,>,
}

#[derive(Args, Debug,)]
pub struct GoogleDriveArgs {
    /// Service-account key file
    #[clap(long, env = "GOOGLE_CREDENTIALS", default_value = "google_credentials.json")]
    pub google_credentials: PathBuf,

    /// Drive file id of the anti-harassment policy
    #[clap(long, env = "ANTI_HARASSMENT_FILE_ID")]
    pub anti_harassment_file_id: Option<String,>,

    /// Drive file id of the nomination guidelines
    #[clap(long, env = "NOMINATION_GUIDELINE_DOC_ID")]
    pub nomination_guideline_doc_id: Option<String,>,
}

#[derive(Args, Debug,)]
pub struct LoadArgs {
    #[clap(flatten)]
    pub qdrant: QdrantArgs,

    #[clap(flatten)]
    pub confluence: ConfluenceArgs,

    #[clap(flatten)]
    pub google_drive: GoogleDriveArgs,

    /// PDF file or directory of PDFs to load
    #[clap(long, env = "PDF_PATH")]
    pub pdf_path: Option<PathBuf,>,

    /// Maximum characters per chunk
    #[clap(long, env = "CHUNK_SIZE", default_value_t = crate::DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Characters shared between neighbouring chunks
    #[clap(long, env = "CHUNK_OVERLAP", default_value_t = crate::DEFAULT_CHUNK_OVERLAP)]
    pub chunk_overlap: usize,
}

#[derive(Args, Debug,)]
pub struct AskArgs {
    #[clap(flatten)]
    pub qdrant: QdrantArgs,

    /// Number of chunks retrieved per question
    #[clap(short, long, env = "RETRIEVAL_K", default_value_t = crate::DEFAULT_RETRIEVAL_K)]
    pub k: u64,

    /// Run the built-in policy questions instead of the interactive prompt
    #[clap(long)]
    pub test_queries: bool,

    /// Answer a single question and exit
    #[clap(short, long)]
    pub question: Option<String,>,
}

#[derive(Args, Debug,)]
pub struct PostgresArgs {
    #[clap(long, env = "POSTGRES_HOST", default_value = "localhost")]
    pub postgres_host: String,

    #[clap(long, env = "POSTGRES_PORT", default_value_t = 5432)]
    pub postgres_port: u16,

    #[clap(long, env = "POSTGRES_DB", default_value = "company")]
    pub postgres_db: String,

    #[clap(long, env = "POSTGRES_USER", default_value = "postgres")]
    pub postgres_user: String,

    #[clap(long, env = "POSTGRES_PASSWORD", default_value = "postgres", hide_env_values = true)]
    pub postgres_password: String,
}

#[derive(Args, Debug,)]
pub struct ExtractArgs {
    #[clap(flatten)]
    pub postgres: PostgresArgs,

    /// Text file to extract from; the bundled sample essay is used when omitted
    #[clap(short, long)]
    pub input: Option<PathBuf,>,
}
