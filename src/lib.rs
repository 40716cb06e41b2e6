// rag_playground/src/lib.rs
// Public API for the RAG playground and the company extraction demo.

pub mod cli;
pub mod config;
pub mod documents;
pub mod embeddings;
pub mod error;
pub mod extraction;
pub mod llm;
pub mod postgres;
pub mod qdrant;
pub mod rag;
pub mod retry;
pub mod splitter;

pub const DEFAULT_COLLECTION_NAME: &str = "rag_exercise";
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_RETRIEVAL_K: u64 = 4;
pub const COMPANY_TABLE_NAME: &str = "company_details";
