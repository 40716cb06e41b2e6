// rag_playground/src/rag.rs
// Retrieval-augmented question answering over the loaded documents.

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, error};

use crate::embeddings::Embedder;
use crate::error::{PlaygroundError, Result};
use crate::llm::{ChatMessage, ChatModel};
use crate::qdrant::{ScoredChunk, VectorStore};

pub const TEST_QUERIES: [&str; 4] = [
    "What are the main principles in our code of conduct?",
    "What constitutes harassment according to our policy?",
    "Who should I contact for policy violations?",
    "What support is available for workplace issues?",
];

const RULE_WIDTH: usize = 60;

/// Joins retrieved chunk texts into one context block.
pub fn format_docs(chunks: &[ScoredChunk],) -> String {
    chunks
        .iter()
        .map(|c| c.chunk.text.as_str(),)
        .collect::<Vec<_,>>()
        .join("\n\n",)
}

pub fn build_prompt(question: &str, context: &str,) -> String {
    format!(
        "You are an assistant for question-answering tasks. Use the following pieces of retrieved \
         context to answer the question. If you don't know the answer, just say that you don't \
         know. Use three sentences maximum and keep the answer concise.\nQuestion: {question} \
         \nContext: {context} \nAnswer:"
    )
}

/// What the interactive prompt should do with a line of input.
#[derive(Debug, PartialEq, Eq,)]
pub enum LineAction<'a,> {
    Quit,
    Skip,
    Ask(&'a str,),
}

pub fn classify_line(line: &str,) -> LineAction<'_,> {
    let question = line.trim();
    if question.is_empty() {
        LineAction::Skip
    } else if question.eq_ignore_ascii_case("quit",) || question.eq_ignore_ascii_case("q",) {
        LineAction::Quit
    } else {
        LineAction::Ask(question,)
    }
}

pub struct RagChain {
    store:    Box<dyn VectorStore,>,
    embedder: Box<dyn Embedder,>,
    chat:     Box<dyn ChatModel,>,
    k:        u64,
}

impl RagChain {
    pub fn new(
        store: Box<dyn VectorStore,>,
        embedder: Box<dyn Embedder,>,
        chat: Box<dyn ChatModel,>,
        k: u64,
    ) -> Self {
        Self {
            store,
            embedder,
            chat,
            k,
        }
    }

    pub async fn retrieve(&self, question: &str,) -> Result<Vec<ScoredChunk,>,> {
        self.store
            .similarity_search(question, self.k, self.embedder.as_ref(),)
            .await
    }

    pub async fn invoke(&self, question: &str,) -> Result<String,> {
        let chunks = self.retrieve(question,).await?;
        debug!("Retrieved {} chunks for question", chunks.len());

        let prompt = build_prompt(question, &format_docs(&chunks,),);
        self.chat.complete(&[ChatMessage::user(prompt,)],).await
    }

    pub async fn run_test_queries(&self,) {
        println!("\nRunning test queries...");

        for (i, query,) in TEST_QUERIES.iter().enumerate() {
            println!("\n{}. Query: {}", i + 1, query);
            println!("{}", "-".repeat(RULE_WIDTH,));

            match self.invoke(query,).await {
                Ok(answer,) => println!("Answer: {}", answer),
                Err(e,) => {
                    error!("Query failed: {}", e);
                    println!("Error: {}", e);
                },
            }
        }
    }

    pub async fn run_interactive(&self,) -> Result<(),> {
        let mut rl = DefaultEditor::new()
            .map_err(|e| PlaygroundError::Other(format!("Failed to start line editor: {}", e),),)?;

        println!("\n{}", "=".repeat(RULE_WIDTH,));
        println!("Ask queries from the doc!");
        println!("Type 'quit' to exit");
        println!("{}", "=".repeat(RULE_WIDTH,));

        loop {
            let line = match rl.readline("\nYour question: ",) {
                Ok(line,) => line,
                Err(ReadlineError::Interrupted | ReadlineError::Eof,) => break,
                Err(e,) => return Err(PlaygroundError::Other(format!("Failed to read input: {}", e),),),
            };

            match classify_line(&line,) {
                LineAction::Quit => break,
                LineAction::Skip => continue,
                LineAction::Ask(question,) => {
                    if let Err(e,) = rl.add_history_entry(question,) {
                        debug!("Failed to add history entry: {}", e);
                    }
                    match self.invoke(question,).await {
                        Ok(answer,) => println!("\nAnswer: {}", answer),
                        Err(e,) => println!("Error: {}", e),
                    }
                },
            }
        }

        println!("Goodbye!");
        Ok((),)
    }
}
