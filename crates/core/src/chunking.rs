use crate::error::IngestError;
use crate::models::{Chunk, ExtractedDocument};

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Window sizes are measured in characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk_size must be positive".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "chunk_overlap {} must be smaller than chunk_size {}",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self, IngestError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    /// Cuts every section of one paper into chunks. `chunk_index` starts at 0
    /// for each document.
    pub fn chunk_document(&self, extracted: &ExtractedDocument) -> Vec<Chunk> {
        let paper_name = &extracted.document.filename;
        let mut chunks = Vec::new();
        let mut chunk_index = 0u64;

        for section in &extracted.sections {
            let text = section.text.trim();
            let page_number = section.midpoint_page();

            let pieces = if text.chars().count() <= self.config.chunk_size {
                vec![text.to_string()]
            } else {
                split_with_overlap(text, self.config)
            };

            for piece in pieces.into_iter().filter(|piece| !piece.trim().is_empty()) {
                chunks.push(Chunk {
                    text: piece,
                    paper_name: paper_name.clone(),
                    section_name: section.name.clone(),
                    page_number,
                    chunk_index,
                });
                chunk_index += 1;
            }
        }

        chunks
    }

    pub fn chunk_documents(&self, documents: &[ExtractedDocument]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|document| self.chunk_document(document))
            .collect()
    }
}

/// Sliding window over `text` that prefers to end a chunk right after a
/// sentence terminator when one falls in the back half of the window.
pub fn split_with_overlap(text: &str, config: ChunkingConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();

    window_bounds(&chars, config)
        .into_iter()
        .filter_map(|(start, end)| {
            let piece: String = chars[start..end].iter().collect();
            let piece = piece.trim();
            (!piece.is_empty()).then(|| piece.to_string())
        })
        .collect()
}

/// Character ranges `[start, end)` of every window, in order.
fn window_bounds(chars: &[char], config: ChunkingConfig) -> Vec<(usize, usize)> {
    let len = chars.len();
    let mut windows = Vec::new();
    let mut start = 0usize;

    while start < len {
        let mut end = start + config.chunk_size;

        if end < len {
            if let Some(offset) = last_sentence_end(&chars[start..end]) {
                if offset * 2 > config.chunk_size {
                    end = start + offset + 1;
                }
            }
        }

        let end = end.min(len);
        windows.push((start, end));

        if end >= len {
            break;
        }
        // A sentence cut can land inside the overlap; always move forward.
        start = end.saturating_sub(config.chunk_overlap).max(start + 1);
    }

    windows
}

fn last_sentence_end(window: &[char]) -> Option<usize> {
    (0..window.len().saturating_sub(1))
        .rev()
        .find(|&index| matches!(window[index], '.' | '!' | '?') && window[index + 1] == ' ')
}
