// rag_playground/src/documents/docx.rs
// Plain text from Word (.docx) files.

use std::io::{Cursor, Read};

use scraper::{ElementRef, Html, Node};
use zip::ZipArchive;

use crate::error::{PlaygroundError, Result};

const DOCUMENT_PART: &str = "word/document.xml";

/// Extracts the body text of a .docx file, paragraphs separated by blank
/// lines. Unzipping runs on the blocking pool.
pub async fn docx_bytes_to_text(bytes: Vec<u8,>,) -> Result<String,> {
    let xml = tokio::task::spawn_blocking(move || read_document_part(&bytes,),)
        .await
        .map_err(|e| PlaygroundError::DocumentError(format!("DOCX extraction aborted: {}", e),),)??;

    Ok(document_xml_to_text(&xml,),)
}

fn read_document_part(bytes: &[u8],) -> Result<String,> {
    let mut archive = ZipArchive::new(Cursor::new(bytes,),)
        .map_err(|e| PlaygroundError::DocumentError(format!("Not a DOCX archive: {}", e),),)?;
    let mut part = archive
        .by_name(DOCUMENT_PART,)
        .map_err(|e| PlaygroundError::DocumentError(format!("Missing {}: {}", DOCUMENT_PART, e),),)?;

    let mut xml = String::new();
    part.read_to_string(&mut xml,)?;
    Ok(xml,)
}

/// Collects the `w:t` runs of WordprocessingML, one paragraph per `w:p`.
/// Tabs and breaks inside a paragraph are kept; field codes and deleted
/// text are dropped.
pub fn document_xml_to_text(xml: &str,) -> String {
    let fragment = Html::parse_fragment(xml,);
    let mut paragraphs = vec![String::new()];
    collect_runs(fragment.root_element(), false, &mut paragraphs,);

    paragraphs
        .iter()
        .map(|p| p.trim(),)
        .filter(|p| !p.is_empty(),)
        .collect::<Vec<_,>>()
        .join("\n\n",)
}

// The HTML parser lowercases tag names and treats `<w:tab/>` as an open
// element, so following runs may nest under it. Text order is unaffected.
fn collect_runs(element: ElementRef<'_,>, in_text: bool, paragraphs: &mut Vec<String,>,) {
    for child in element.children() {
        match child.value() {
            Node::Text(text,) if in_text => {
                if let Some(current,) = paragraphs.last_mut() {
                    current.push_str(text,);
                }
            },
            Node::Element(el,) => {
                let name = el.name();
                match name {
                    "w:instrtext" | "w:deltext" => continue,
                    "w:p" => paragraphs.push(String::new(),),
                    "w:tab" => push_char(paragraphs, '\t',),
                    "w:br" | "w:cr" => push_char(paragraphs, '\n',),
                    _ => {},
                }
                if let Some(child,) = ElementRef::wrap(child,) {
                    collect_runs(child, in_text || name == "w:t", paragraphs,);
                }
            },
            _ => {},
        }
    }
}

fn push_char(paragraphs: &mut [String], ch: char,) {
    if let Some(current,) = paragraphs.last_mut() {
        current.push(ch,);
    }
}
