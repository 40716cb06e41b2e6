// rag_playground/src/documents/pdf.rs
// Local PDF loading. One document per page.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{Document, DocumentLoader, DocumentMetadata, SourceType};
use crate::error::{PlaygroundError, Result};

pub struct PdfLoader {
    path: PathBuf,
}

impl PdfLoader {
    pub fn new(path: impl Into<PathBuf,>,) -> Self {
        Self { path: path.into(), }
    }

    async fn load_file(&self, path: &Path,) -> Result<Vec<Document,>,> {
        let bytes = tokio::fs::read(path,).await?;
        let pages = pdf_bytes_to_pages(bytes,).await?;

        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned(),)
            .unwrap_or_default();
        let source = path.to_string_lossy().into_owned();

        Ok(pages
            .into_iter()
            .map(|(page, text,)| {
                let mut metadata = DocumentMetadata::new(source.clone(), title.clone(), SourceType::Pdf,);
                metadata.mime_type = Some("application/pdf".to_string(),);
                metadata.page = Some(page,);
                Document::new(text, metadata,)
            },)
            .collect(),)
    }
}

#[async_trait]
impl DocumentLoader for PdfLoader {
    fn name(&self,) -> &str {
        "PDF"
    }

    async fn load(&self,) -> Result<Vec<Document,>,> {
        let files = collect_pdf_paths(&self.path,)?;
        debug!("Found {} PDF files under {}", files.len(), self.path.display());

        let mut documents = Vec::new();
        for file in files {
            match self.load_file(&file,).await {
                Ok(docs,) => documents.extend(docs,),
                Err(e,) => warn!("Failed to load PDF {}: {}", file.display(), e),
            }
        }
        Ok(documents,)
    }
}

/// Resolves `path` to the PDF files it names: the file itself, or every
/// `*.pdf` below a directory in sorted order.
pub fn collect_pdf_paths(path: &Path,) -> Result<Vec<PathBuf,>,> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()],);
    }
    if !path.is_dir() {
        return Err(PlaygroundError::DocumentError(format!(
            "PDF path {} does not exist",
            path.display()
        ),),);
    }

    let mut files: Vec<PathBuf,> = WalkDir::new(path,)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok(),)
        .filter(|e| e.file_type().is_file(),)
        .map(|e| e.into_path(),)
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf",),)
        },)
        .collect();
    files.sort();
    Ok(files,)
}

/// Extracts the text of a PDF as `(page number, text)` pairs, skipping
/// blank pages. Page numbers start at 1.
///
/// Extraction runs on the blocking pool; a parser panic on a malformed file
/// is reported as a document error.
pub async fn pdf_bytes_to_pages(bytes: Vec<u8,>,) -> Result<Vec<(u32, String,),>,> {
    let pages = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem_by_pages(&bytes,),)
        .await
        .map_err(|e| PlaygroundError::DocumentError(format!("PDF extraction aborted: {}", e),),)?
        .map_err(|e| PlaygroundError::DocumentError(format!("Failed to extract PDF text: {}", e),),)?;

    Ok(number_pages(pages,),)
}

fn number_pages(pages: Vec<String,>,) -> Vec<(u32, String,),> {
    pages
        .into_iter()
        .zip(1..,)
        .filter_map(|(text, page,)| {
            let text = text.trim();
            (!text.is_empty()).then(|| (page, text.to_string(),),)
        },)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_PAGE_PDF: &[u8] = include_bytes!("../../tests/fixtures/two_pages.pdf");

    #[test]
    fn blank_pages_keep_later_page_numbers() {
        let pages = number_pages(vec!["Page one text\n".into(), "  \n".into(), "Page three".into()],);
        assert_eq!(pages, vec![(1, "Page one text".to_string(),), (3, "Page three".to_string(),)]);
    }

    #[tokio::test]
    async fn loads_one_document_per_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.pdf",);
        std::fs::write(&path, TWO_PAGE_PDF,).unwrap();

        let docs = PdfLoader::new(&path,).load().await.unwrap();

        assert_eq!(docs.len(), 2);
        assert!(docs[0].content.contains("Harassment"));
        assert!(docs[1].content.contains("HR"));
        assert_eq!(docs[0].metadata.page, Some(1));
        assert_eq!(docs[1].metadata.page, Some(2));
        assert_eq!(docs[1].metadata.title, "policy");
    }

    #[test]
    fn directory_walk_only_returns_pdfs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested",),).unwrap();
        std::fs::write(dir.path().join("b.pdf",), b"",).unwrap();
        std::fs::write(dir.path().join("nested/a.PDF",), b"",).unwrap();
        std::fs::write(dir.path().join("notes.txt",), b"",).unwrap();

        let files = collect_pdf_paths(dir.path(),).unwrap();
        let names: Vec<_,> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned(),)
            .collect();
        assert_eq!(names, vec!["b.pdf", "a.PDF"]);
    }

    #[test]
    fn missing_path_is_an_error() {
        assert!(collect_pdf_paths(Path::new("/definitely/not/here",)).is_err());
    }

    #[tokio::test]
    async fn corrupt_pdf_is_skipped_by_loader() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.pdf",), b"not a pdf",).unwrap();

        let docs = PdfLoader::new(dir.path(),).load().await.unwrap();
        assert!(docs.is_empty());
    }
}
