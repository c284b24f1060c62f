pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod similarity;
pub mod store;
pub mod stores;
pub mod structure;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use chunking::{split_with_overlap, Chunker, ChunkingConfig};
pub use embeddings::{
    CharacterNgramEmbedder, EmbeddingConfig, EmbeddingProvider, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{IngestError, ProviderError, QueryError, StoreError};
pub use extractor::{LopdfExtractor, PageText, PdfExtractor, TextSpan};
pub use generation::{GenerationConfig, GenerationProvider};
pub use ingest::{discover_pdf_files, list_papers, IngestionReport, SkippedPdf};
pub use models::{
    Chunk, ChunkMetadata, Document, ExtractedDocument, PaperInfo, PipelineSettings, QueryAnswer,
    SearchHit, Section, Source,
};
pub use pipeline::{RagPipeline, NO_RELEVANT_CONTEXT_ANSWER};
pub use providers::ProviderConfig;
pub use similarity::{cosine_similarity, MemoryIndex};
pub use store::{FallbackPolicy, RetrievalStore, StoreMode};
pub use stores::{RemoteIndexClient, RemoteStoreConfig};
pub use structure::SectionDetector;
pub use traits::{Embedder, Generator};
