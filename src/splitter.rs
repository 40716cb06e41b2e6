// rag_playground/src/splitter.rs
// Recursive character text splitting.

use std::collections::VecDeque;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::documents::{Document, DocumentMetadata};
use crate::error::{PlaygroundError, Result};

/// A slice of a document, the unit that gets embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize,)]
pub struct Chunk {
    pub text:        String,
    /// Byte offset of `text` in the source document's content.
    pub offset:      usize,
    /// Byte length of `text`.
    pub length:      usize,
    pub chunk_index: usize,
    pub metadata:    DocumentMetadata,
}

/// Splits text on the first separator that occurs in it, recursing with the
/// next separator into pieces that are still too long, then merges adjacent
/// pieces back up to `chunk_size` characters with `chunk_overlap` characters
/// carried over between neighbours.
///
/// Separators stay attached to the start of the piece that follows them, so
/// every chunk is a contiguous slice of the input.
#[derive(Debug, Clone,)]
pub struct TextSplitter {
    chunk_size:    usize,
    chunk_overlap: usize,
    separators:    Vec<String,>,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size:    crate::DEFAULT_CHUNK_SIZE,
            chunk_overlap: crate::DEFAULT_CHUNK_OVERLAP,
            separators:    default_separators(),
        }
    }
}

fn default_separators() -> Vec<String,> {
    ["\n\n", "\n", " ", "",].iter().map(|s| s.to_string(),).collect()
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize,) -> Result<Self,> {
        if chunk_size == 0 {
            return Err(PlaygroundError::ConfigurationError("chunk size must be positive".to_string(),),);
        }
        if chunk_overlap >= chunk_size {
            return Err(PlaygroundError::ConfigurationError(format!(
                "chunk overlap {} must be smaller than chunk size {}",
                chunk_overlap, chunk_size
            ),),);
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: default_separators(),
        },)
    }

    /// Byte ranges of the chunks of `text`, whitespace-trimmed.
    pub fn split_ranges(&self, text: &str,) -> Vec<Range<usize,>,> {
        let mut out = Vec::new();
        self.split_recursive(text, 0..text.len(), &self.separators, &mut out,);
        out
    }

    pub fn split_text(&self, text: &str,) -> Vec<String,> {
        self.split_ranges(text,)
            .into_iter()
            .map(|r| text[r].to_string(),)
            .collect()
    }

    pub fn split_documents(&self, documents: &[Document],) -> Vec<Chunk,> {
        let mut chunks = Vec::new();
        for doc in documents {
            for (chunk_index, range,) in self.split_ranges(&doc.content,).into_iter().enumerate() {
                chunks.push(Chunk {
                    text: doc.content[range.clone()].to_string(),
                    offset: range.start,
                    length: range.len(),
                    chunk_index,
                    metadata: doc.metadata.clone(),
                },);
            }
        }
        debug!("Split {} documents into {} chunks", documents.len(), chunks.len());
        chunks
    }

    fn split_recursive(
        &self,
        text: &str,
        range: Range<usize,>,
        separators: &[String],
        out: &mut Vec<Range<usize,>,>,
    ) {
        let slice = &text[range.clone()];

        let (separator, remaining,) = separators
            .iter()
            .enumerate()
            .find(|(_, s,)| s.is_empty() || slice.contains(s.as_str(),),)
            .map(|(i, s,)| (s.as_str(), &separators[i + 1..],),)
            .unwrap_or(("", &[][..],),);

        let mut good: Vec<Range<usize,>,> = Vec::new();
        for piece in piece_ranges(slice, separator, range.start,) {
            if char_len(&text[piece.clone()],) < self.chunk_size {
                good.push(piece,);
                continue;
            }

            if !good.is_empty() {
                self.merge(text, &good, out,);
                good.clear();
            }
            if remaining.is_empty() {
                push_trimmed(text, piece, out,);
            } else {
                self.split_recursive(text, piece, remaining, out,);
            }
        }

        if !good.is_empty() {
            self.merge(text, &good, out,);
        }
    }

    fn merge(&self, text: &str, pieces: &[Range<usize,>], out: &mut Vec<Range<usize,>,>,) {
        let mut current: VecDeque<(Range<usize,>, usize,),> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            let len = char_len(&text[piece.clone()],);

            if total + len > self.chunk_size && !current.is_empty() {
                emit(text, &current, out,);
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match current.pop_front() {
                        Some((_, dropped,),) => total -= dropped,
                        None => break,
                    }
                }
            }

            current.push_back((piece.clone(), len,),);
            total += len;
        }

        emit(text, &current, out,);
    }
}

fn emit(text: &str, current: &VecDeque<(Range<usize,>, usize,),>, out: &mut Vec<Range<usize,>,>,) {
    if let (Some((first, _,),), Some((last, _,),),) = (current.front(), current.back(),) {
        push_trimmed(text, first.start..last.end, out,);
    }
}

fn push_trimmed(text: &str, range: Range<usize,>, out: &mut Vec<Range<usize,>,>,) {
    let slice = &text[range.clone()];
    let start = range.start + (slice.len() - slice.trim_start().len());
    let end = range.end - (slice.len() - slice.trim_end().len());
    if start < end {
        out.push(start..end,);
    }
}

/// Splits `slice` before every occurrence of `separator`, returning ranges
/// shifted by `base`. An empty separator yields one range per character.
fn piece_ranges(slice: &str, separator: &str, base: usize,) -> Vec<Range<usize,>,> {
    if separator.is_empty() {
        return slice
            .char_indices()
            .map(|(i, c,)| base + i..base + i + c.len_utf8(),)
            .collect();
    }

    let mut starts: Vec<usize,> = vec![0];
    starts.extend(slice.match_indices(separator,).map(|(i, _,)| i,).filter(|i| *i > 0,),);

    let mut ranges = Vec::with_capacity(starts.len(),);
    for (k, start,) in starts.iter().enumerate() {
        let end = starts.get(k + 1,).copied().unwrap_or(slice.len(),);
        if start < &end {
            ranges.push(base + start..base + end,);
        }
    }
    ranges
}

fn char_len(s: &str,) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::SourceType;

    fn words(n: usize,) -> String {
        (0..n).map(|i| format!("word{i}"),).collect::<Vec<_,>>().join(" ",)
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(TextSplitter::new(100, 100,).is_err());
        assert!(TextSplitter::new(0, 0,).is_err());
        assert!(TextSplitter::new(100, 20,).is_ok());
    }

    #[test]
    fn short_text_is_one_trimmed_chunk() {
        let splitter = TextSplitter::default();
        assert_eq!(splitter.split_text("  Be kind.\n",), vec!["Be kind.".to_string()]);
        assert!(splitter.split_text("   \n\n ",).is_empty());
    }

    #[test]
    fn paragraph_boundaries_are_preferred() {
        let first = "a".repeat(30,);
        let second = "b".repeat(30,);
        let text = format!("{first}\n\n{second}");

        let splitter = TextSplitter::new(40, 0,).unwrap();
        assert_eq!(splitter.split_text(&text,), vec![first, second]);
    }

    #[test]
    fn chunks_respect_size_and_overlap() {
        let text = words(300,);
        let splitter = TextSplitter::new(100, 30,).unwrap();
        let ranges = splitter.split_ranges(&text,);

        assert!(ranges.len() > 1);
        for r in &ranges {
            assert!(text[r.clone()].chars().count() <= 100);
        }
        for pair in ranges.windows(2,) {
            assert!(pair[1].start < pair[0].end, "neighbouring chunks should overlap");
            assert!(pair[1].start > pair[0].start);
        }
        assert_eq!(ranges.first().unwrap().start, 0);
        assert_eq!(ranges.last().unwrap().end, text.len());
    }

    #[test]
    fn multibyte_text_falls_back_to_characters() {
        let text = "é".repeat(30,);
        let splitter = TextSplitter::new(10, 2,).unwrap();
        let chunks = splitter.split_text(&text,);

        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks[3].chars().count(), 6);
    }

    #[test]
    fn document_chunks_point_back_into_content() {
        let content = format!("Code of Conduct\n\n{}\n\nReporting\n\n{}", words(120), words(80));
        let doc = Document::new(
            content.clone(),
            DocumentMetadata::new("coc.pdf", "Code of Conduct", SourceType::Pdf,),
        );

        let chunks = TextSplitter::new(200, 40,).unwrap().split_documents(&[doc],);
        assert!(chunks.len() > 3);
        for (i, chunk,) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
            assert_eq!(&content[chunk.offset..chunk.offset + chunk.length], chunk.text);
            assert_eq!(chunk.metadata.title, "Code of Conduct");
        }
    }
}
