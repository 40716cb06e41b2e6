// rag_playground/src/documents/mod.rs
// Document model and the loaders that fetch documents from their sources.

pub mod confluence;
pub mod docx;
pub mod google_drive;
pub mod pdf;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

pub use confluence::ConfluenceLoader;
pub use google_drive::GoogleDriveLoader;
pub use pdf::PdfLoader;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Confluence,
    GoogleDrive,
    Pdf,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result {
        let name = match self {
            SourceType::Confluence => "confluence",
            SourceType::GoogleDrive => "google_drive",
            SourceType::Pdf => "pdf",
        };
        f.write_str(name,)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize,)]
pub struct DocumentMetadata {
    pub source:      String,
    pub title:       String,
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id:          Option<String,>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type:   Option<String,>,
    /// 1-based page number for paginated sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page:        Option<u32,>,
}

impl DocumentMetadata {
    pub fn new(source: impl Into<String,>, title: impl Into<String,>, source_type: SourceType,) -> Self {
        Self {
            source: source.into(),
            title: title.into(),
            source_type,
            id: None,
            mime_type: None,
            page: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq,)]
pub struct Document {
    pub content:  String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(content: impl Into<String,>, metadata: DocumentMetadata,) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// A source of documents.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Human readable loader name used in logs.
    fn name(&self,) -> &str;

    async fn load(&self,) -> Result<Vec<Document,>,>;
}

/// Runs every loader in turn. A failing loader is logged and skipped so the
/// remaining sources still load.
pub async fn load_all(loaders: &[Box<dyn DocumentLoader,>],) -> Vec<Document,> {
    let mut documents = Vec::new();

    for loader in loaders {
        match loader.load().await {
            Ok(docs,) => {
                info!("Loaded {} documents from {}", docs.len(), loader.name());
                documents.extend(docs,);
            },
            Err(e,) => warn!("{} loading failed: {}", loader.name(), e),
        }
    }

    documents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlaygroundError;

    struct StaticLoader(Vec<Document,>,);
    struct FailingLoader;

    #[async_trait]
    impl DocumentLoader for StaticLoader {
        fn name(&self,) -> &str {
            "static"
        }

        async fn load(&self,) -> Result<Vec<Document,>,> {
            Ok(self.0.clone(),)
        }
    }

    #[async_trait]
    impl DocumentLoader for FailingLoader {
        fn name(&self,) -> &str {
            "failing"
        }

        async fn load(&self,) -> Result<Vec<Document,>,> {
            Err(PlaygroundError::DocumentError("boom".into(),),)
        }
    }

    #[tokio::test]
    async fn failing_loader_does_not_stop_others() {
        let doc = Document::new("policy text", DocumentMetadata::new("a.pdf", "A", SourceType::Pdf,),);
        let loaders: Vec<Box<dyn DocumentLoader,>,> = vec![
            Box::new(FailingLoader,),
            Box::new(StaticLoader(vec![doc.clone()],),),
        ];

        let docs = load_all(&loaders,).await;
        assert_eq!(docs, vec![doc]);
    }

    #[test]
    fn metadata_serializes_without_empty_fields() {
        let meta = DocumentMetadata::new("https://wiki/pages/1", "Code of Conduct", SourceType::Confluence,);
        let json = serde_json::to_value(&meta,).unwrap();
        assert_eq!(json["source_type"], "confluence");
        assert!(json.get("page",).is_none());
    }
}
