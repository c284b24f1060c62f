use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_TITLE: &str = "Unknown Title";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// File stem of the source PDF, used as the paper name in citations.
    pub filename: String,
    pub title: String,
    pub page_count: u32,
    pub source_path: String,
    pub checksum: String,
    pub ingested_at: DateTime<Utc>,
}

/// Contiguous span of a paper attributed to one section label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub text: String,
    pub page_start: u32,
    pub page_end: u32,
}

impl Section {
    /// Representative page for everything cut from this section.
    pub fn midpoint_page(&self) -> u32 {
        (self.page_start + self.page_end) / 2
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub document: Document,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub paper_name: String,
    pub section_name: String,
    pub page_number: u32,
    pub chunk_index: u64,
}

/// Payload stored next to each vector. Serialized as a flat JSON object on
/// the wire to the remote index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    pub text: String,
    pub paper_name: String,
    pub section_name: String,
    pub page_number: u32,
    pub chunk_index: u64,
}

impl From<&Chunk> for ChunkMetadata {
    fn from(chunk: &Chunk) -> Self {
        Self {
            text: chunk.text.clone(),
            paper_name: chunk.paper_name.clone(),
            section_name: chunk.section_name.clone(),
            page_number: chunk.page_number,
            chunk_index: chunk.chunk_index,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub metadata: ChunkMetadata,
    pub similarity: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub paper: String,
    pub section: String,
    pub page: u32,
    pub excerpt: String,
    pub similarity_score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryAnswer {
    pub answer: String,
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaperInfo {
    pub filename: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub collection: String,
    pub top_k: usize,
    pub similarity_threshold: f32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            collection: "research_papers".to_string(),
            top_k: 5,
            similarity_threshold: 0.7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midpoint_page_truncates() {
        let section = Section {
            name: "Results".to_string(),
            text: String::new(),
            page_start: 2,
            page_end: 5,
        };
        assert_eq!(section.midpoint_page(), 3);
    }

    #[test]
    fn metadata_serializes_as_flat_object() {
        let metadata = ChunkMetadata {
            text: "We study X.".to_string(),
            paper_name: "paper".to_string(),
            section_name: "Introduction".to_string(),
            page_number: 1,
            chunk_index: 0,
        };
        let value = serde_json::to_value(&metadata).expect("metadata serializes");
        assert_eq!(value["paper_name"], "paper");
        assert_eq!(value["page_number"], 1);
    }
}
