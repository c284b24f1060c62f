use crate::chunking::Chunker;
use crate::embeddings::EmbeddingProvider;
use crate::error::{IngestError, QueryError};
use crate::extractor::{LopdfExtractor, PdfExtractor};
use crate::generation::GenerationProvider;
use crate::ingest::{discover_pdf_files, IngestionReport, SkippedPdf};
use crate::models::{
    Chunk, ChunkMetadata, ExtractedDocument, PipelineSettings, QueryAnswer, SearchHit, Source,
};
use crate::store::RetrievalStore;
use crate::traits::{Embedder, Generator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const NO_RELEVANT_CONTEXT_ANSWER: &str =
    "I couldn't find relevant information in the papers to answer this question.";

const EXCERPT_CHARS: usize = 200;
const RAW_CONTEXT_CHARS: usize = 500;

const SYSTEM_PROMPT: &str = "You are a research assistant answering questions about a private \
collection of research papers.
- Answer only from the supplied context; do not use outside knowledge.
- Synthesize across excerpts and use bullet points or numbered lists where they help.
- Quote specific findings, methods or contributions when the context states them.
- Partial or related information is still useful: use it rather than refusing.
- Say you cannot answer only when the context has nothing relevant at all.";

impl QueryAnswer {
    pub fn no_relevant_context() -> Self {
        Self {
            answer: NO_RELEVANT_CONTEXT_ANSWER.to_string(),
            sources: Vec::new(),
        }
    }
}

/// Ingestion and question answering over one retrieval store.
///
/// Built once by the host process and shared by reference; it holds no
/// global state.
pub struct RagPipeline<X = LopdfExtractor, E = EmbeddingProvider, G = GenerationProvider>
where
    X: PdfExtractor + 'static,
    E: Embedder,
    G: Generator,
{
    extractor: Arc<X>,
    chunker: Chunker,
    embedder: E,
    store: RetrievalStore,
    generator: Option<G>,
    settings: PipelineSettings,
}

impl<X, E, G> RagPipeline<X, E, G>
where
    X: PdfExtractor + 'static,
    E: Embedder,
    G: Generator,
{
    pub async fn new(
        extractor: X,
        chunker: Chunker,
        embedder: E,
        store: RetrievalStore,
        generator: Option<G>,
        settings: PipelineSettings,
    ) -> Self {
        store
            .create_collection(&settings.collection, embedder.dimension())
            .await;

        info!(
            collection = %settings.collection,
            dimension = embedder.dimension(),
            mode = ?store.mode(),
            generation = generator.is_some(),
            "rag pipeline ready"
        );

        Self {
            extractor: Arc::new(extractor),
            chunker,
            embedder,
            store,
            generator,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn store(&self) -> &RetrievalStore {
        &self.store
    }

    pub async fn ingest_folder(&self, folder: &Path) -> Result<IngestionReport, IngestError> {
        let files = discover_pdf_files(folder);
        if files.is_empty() {
            return Err(IngestError::NoDocuments(format!(
                "no pdf files found in {}",
                folder.display()
            )));
        }
        self.ingest_papers(&files).await
    }

    /// Extracts, chunks, embeds and stores every paper. A paper that fails to
    /// extract is recorded in the report and skipped.
    pub async fn ingest_papers(&self, paths: &[PathBuf]) -> Result<IngestionReport, IngestError> {
        let mut report = IngestionReport::default();
        let mut chunks: Vec<Chunk> = Vec::new();

        for path in paths {
            match self.extract(path).await {
                Ok(extracted) => {
                    let paper_chunks = self.chunker.chunk_document(&extracted);
                    info!(
                        paper = %extracted.document.filename,
                        sections = extracted.sections.len(),
                        chunks = paper_chunks.len(),
                        "processed paper"
                    );
                    chunks.extend(paper_chunks);
                    report.documents.push(extracted.document);
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "skipping paper");
                    report.skipped_files.push(SkippedPdf {
                        path: path.clone(),
                        reason: error.to_string(),
                    });
                }
            }
        }

        if chunks.is_empty() {
            return Err(IngestError::NoDocuments(format!(
                "no chunks created from {} file(s), {} skipped",
                paths.len(),
                report.skipped_files.len()
            )));
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.embedder.embed_many(&texts).await?;
        let metadata: Vec<ChunkMetadata> = chunks.iter().map(ChunkMetadata::from).collect();

        self.store
            .insert_vectors(&self.settings.collection, vectors, metadata)
            .await?;

        report.chunk_count = chunks.len();
        info!(
            chunks = report.chunk_count,
            papers = report.documents.len(),
            skipped = report.skipped_files.len(),
            "ingestion complete"
        );
        Ok(report)
    }

    pub async fn query(
        &self,
        question: &str,
        top_k: Option<usize>,
    ) -> Result<QueryAnswer, QueryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QueryError::EmptyQuestion);
        }

        let top_k = top_k.unwrap_or(self.settings.top_k);
        let threshold = self.settings.similarity_threshold;
        let embedding = self.embedder.embed_one(question).await?;

        // Fetch unfiltered so the best score can be reported when nothing
        // clears the threshold.
        let hits = self
            .store
            .search(&self.settings.collection, &embedding, top_k, 0.0)
            .await;

        debug!(
            results = hits.len(),
            top_scores = ?hits.iter().take(3).map(|hit| hit.similarity).collect::<Vec<_>>(),
            threshold,
            "retrieved candidates"
        );

        let relevant: Vec<&SearchHit> = hits
            .iter()
            .filter(|hit| hit.similarity >= threshold)
            .collect();

        if relevant.is_empty() {
            if let Some(best) = hits.first() {
                info!(
                    candidates = hits.len(),
                    best = best.similarity,
                    threshold,
                    "all candidates below similarity threshold"
                );
            }
            return Ok(QueryAnswer::no_relevant_context());
        }

        let context = build_context(&relevant);
        let sources = relevant.iter().map(|hit| source_from_hit(hit)).collect();
        let answer = self.answer(question, &context).await;

        Ok(QueryAnswer { answer, sources })
    }

    /// Drops every stored vector and recreates the empty collection.
    pub async fn reset(&self) {
        self.store.delete_collection(&self.settings.collection).await;
        self.store
            .create_collection(&self.settings.collection, self.embedder.dimension())
            .await;
    }

    /// PDF parsing and hashing are blocking; they run on the blocking pool.
    async fn extract(&self, path: &Path) -> Result<ExtractedDocument, IngestError> {
        let extractor = Arc::clone(&self.extractor);
        let owned = path.to_path_buf();

        tokio::task::spawn_blocking(move || extractor.extract(&owned))
            .await
            .unwrap_or_else(|error| {
                Err(IngestError::ExtractionFailure {
                    path: path.to_path_buf(),
                    reason: format!("extraction task failed: {error}"),
                })
            })
    }

    async fn answer(&self, question: &str, context: &str) -> String {
        let Some(generator) = &self.generator else {
            return format!(
                "Based on the retrieved documents:\n\n{}...",
                truncate_chars(context, RAW_CONTEXT_CHARS)
            );
        };

        match generator.generate(SYSTEM_PROMPT, &user_prompt(question, context)).await {
            Ok(answer) => answer,
            Err(error) => {
                warn!(%error, "generation failed, returning retrieved context");
                format!(
                    "Retrieved context:\n\n{}...",
                    truncate_chars(context, RAW_CONTEXT_CHARS)
                )
            }
        }
    }
}

fn build_context(hits: &[&SearchHit]) -> String {
    hits.iter()
        .map(|hit| {
            format!(
                "[From: {} - {}]\n{}",
                hit.metadata.paper_name, hit.metadata.section_name, hit.metadata.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn source_from_hit(hit: &SearchHit) -> Source {
    Source {
        paper: hit.metadata.paper_name.clone(),
        section: hit.metadata.section_name.clone(),
        page: hit.metadata.page_number,
        excerpt: truncate_chars(&hit.metadata.text, EXCERPT_CHARS).to_string(),
        similarity_score: hit.similarity,
    }
}

fn user_prompt(question: &str, context: &str) -> String {
    format!(
        "Question: {question}\n\n\
         Context from research papers:\n{context}\n\n\
         Using the context above, give a helpful answer to the question. \
         Present it clearly, with bullet points or numbered lists where appropriate, \
         and quote findings that are stated explicitly.\n\n\
         Answer:"
    )
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
