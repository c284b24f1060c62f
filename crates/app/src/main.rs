use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use paper_rag_core::providers::{gemini, openai};
use paper_rag_core::{
    list_papers, Chunker, ChunkingConfig, EmbeddingConfig, EmbeddingProvider, FallbackPolicy,
    GenerationConfig, GenerationProvider, IngestionReport, LopdfExtractor, PipelineSettings,
    ProviderConfig, QueryAnswer, RagPipeline, RemoteStoreConfig, RetrievalStore, StoreMode,
    DEFAULT_EMBEDDING_DIMENSIONS,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "paper-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Folder that holds the research papers (searched recursively).
    #[arg(long, env = "PAPERS_DIR", default_value = "data/papers")]
    papers_dir: PathBuf,

    /// Chunk size in characters.
    #[arg(long, env = "CHUNK_SIZE", default_value = "500")]
    chunk_size: usize,

    /// Overlap between consecutive chunks in characters.
    #[arg(long, env = "CHUNK_OVERLAP", default_value = "50")]
    chunk_overlap: usize,

    /// Number of chunks retrieved per question.
    #[arg(long, env = "TOP_K", default_value = "5")]
    top_k: usize,

    /// Minimum cosine similarity for a chunk to be used as context.
    #[arg(long, env = "SIMILARITY_THRESHOLD", default_value = "0.7")]
    similarity_threshold: f32,

    /// Remote vector index base URL.
    #[arg(long, env = "INDEX_URL", default_value = "http://localhost:8000")]
    index_url: String,

    /// Collection name in the vector index.
    #[arg(long, env = "INDEX_COLLECTION", default_value = "research_papers")]
    collection: String,

    /// What to do after a remote index call fails.
    #[arg(long, value_enum, default_value_t = PolicyArg::Sticky)]
    fallback_policy: PolicyArg,

    #[arg(long, value_enum, env = "EMBEDDING_PROVIDER", default_value_t = EmbeddingArg::Ngram)]
    embedding_provider: EmbeddingArg,

    /// Embedding model; defaults to the provider's standard model.
    #[arg(long, env = "EMBEDDING_MODEL")]
    embedding_model: Option<String>,

    #[arg(long, value_enum, env = "LLM_PROVIDER", default_value_t = LlmArg::None)]
    llm_provider: LlmArg,

    /// Generation model; defaults to the provider's standard model.
    #[arg(long, env = "LLM_MODEL")]
    llm_model: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, default_value = "")]
    openai_api_key: String,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, default_value = "")]
    gemini_api_key: String,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest every PDF in the papers folder into the index.
    Ingest,
    /// Answer one question with citations.
    Ask {
        #[arg(long)]
        question: String,
        /// Override the configured top-k for this question.
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Interactive question loop; `exit`, `quit` or `q` ends it.
    Chat,
    /// List the papers in the papers folder.
    Papers,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Sticky,
    RetryRemote,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmbeddingArg {
    Ngram,
    Openai,
    Gemini,
}

#[derive(Clone, Copy, ValueEnum)]
enum LlmArg {
    None,
    Openai,
    Gemini,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "paper-rag boot"
    );

    match &cli.command {
        Command::Papers => {
            let papers = list_papers(&cli.papers_dir)?;
            if papers.is_empty() {
                println!("no papers found in {}", cli.papers_dir.display());
            }
            for paper in papers {
                println!("{}  ({} bytes)", paper.filename, paper.size_bytes);
            }
        }
        Command::Ingest => {
            let pipeline = build_pipeline(&cli).await?;
            let report = pipeline.ingest_folder(&cli.papers_dir).await?;
            print_report(&report);
            if pipeline.store().mode() == StoreMode::LocalFallback {
                warn!("index is in-memory only; ingested chunks are dropped when this process exits");
            }
        }
        Command::Ask { question, top_k } => {
            let pipeline = build_pipeline(&cli).await?;
            ingest_if_volatile(&pipeline, &cli.papers_dir).await?;
            let answer = pipeline.query(question, *top_k).await?;
            print_answer(&answer);
        }
        Command::Chat => {
            let pipeline = build_pipeline(&cli).await?;
            ingest_if_volatile(&pipeline, &cli.papers_dir).await?;
            chat(&pipeline).await?;
        }
    }

    Ok(())
}

async fn build_pipeline(cli: &Cli) -> anyhow::Result<RagPipeline> {
    let chunker = Chunker::new(ChunkingConfig {
        chunk_size: cli.chunk_size,
        chunk_overlap: cli.chunk_overlap,
    })?;
    let embedder = EmbeddingProvider::from_config(&embedding_config(cli))?;

    let generator = generation_config(cli).and_then(|config| {
        match GenerationProvider::from_config(&config) {
            Ok(provider) => Some(provider),
            Err(error) => {
                warn!(%error, "generation unavailable, answers will show retrieved context only");
                None
            }
        }
    });

    let policy = match cli.fallback_policy {
        PolicyArg::Sticky => FallbackPolicy::Sticky,
        PolicyArg::RetryRemote => FallbackPolicy::RetryRemote,
    };
    let store = RetrievalStore::connect(
        RemoteStoreConfig {
            base_url: cli.index_url.clone(),
            ..RemoteStoreConfig::default()
        },
        policy,
    )
    .await;

    let settings = PipelineSettings {
        collection: cli.collection.clone(),
        top_k: cli.top_k,
        similarity_threshold: cli.similarity_threshold,
    };

    info!(embedder = embedder.name(), store_mode = ?store.mode(), "building pipeline");

    Ok(RagPipeline::new(
        LopdfExtractor::new()?,
        chunker,
        embedder,
        store,
        generator,
        settings,
    )
    .await)
}

fn embedding_config(cli: &Cli) -> EmbeddingConfig {
    match cli.embedding_provider {
        EmbeddingArg::Ngram => EmbeddingConfig::Ngram {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        },
        EmbeddingArg::Openai => EmbeddingConfig::OpenAi(ProviderConfig::openai(
            &cli.openai_api_key,
            cli.embedding_model
                .as_deref()
                .unwrap_or(openai::DEFAULT_EMBEDDING_MODEL),
        )),
        EmbeddingArg::Gemini => EmbeddingConfig::Gemini(ProviderConfig::gemini(
            &cli.gemini_api_key,
            cli.embedding_model
                .as_deref()
                .unwrap_or(gemini::DEFAULT_EMBEDDING_MODEL),
        )),
    }
}

fn generation_config(cli: &Cli) -> Option<GenerationConfig> {
    match cli.llm_provider {
        LlmArg::None => None,
        LlmArg::Openai => Some(GenerationConfig::OpenAi(ProviderConfig::openai(
            &cli.openai_api_key,
            cli.llm_model.as_deref().unwrap_or(openai::DEFAULT_CHAT_MODEL),
        ))),
        LlmArg::Gemini => Some(GenerationConfig::Gemini(ProviderConfig::gemini(
            &cli.gemini_api_key,
            cli.llm_model.as_deref().unwrap_or(gemini::DEFAULT_CHAT_MODEL),
        ))),
    }
}

/// The in-memory index starts empty in every process, so papers are ingested
/// before answering. A remote index already holds them.
async fn ingest_if_volatile(pipeline: &RagPipeline, folder: &Path) -> anyhow::Result<()> {
    if pipeline.store().mode() == StoreMode::Remote {
        return Ok(());
    }
    info!(folder = %folder.display(), "ingesting papers into in-memory index");
    let report = pipeline.ingest_folder(folder).await?;
    print_report(&report);
    Ok(())
}

async fn chat(pipeline: &RagPipeline) -> anyhow::Result<()> {
    println!("Ask questions about your research papers. Type 'exit', 'quit' or 'q' to end.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("question> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if matches!(question.to_lowercase().as_str(), "exit" | "quit" | "q") {
            break;
        }
        if question.is_empty() {
            continue;
        }

        match pipeline.query(question, None).await {
            Ok(answer) => print_answer(&answer),
            Err(error) => println!("error: {error}"),
        }
    }

    Ok(())
}

fn print_report(report: &IngestionReport) {
    for skipped in &report.skipped_files {
        warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped pdf");
    }
    for document in &report.documents {
        println!(
            "ingested {} \"{}\" ({} pages)",
            document.filename, document.title, document.page_count
        );
    }
    println!(
        "{} chunks from {} paper(s) ingested at {} ({} skipped)",
        report.chunk_count,
        report.documents.len(),
        Utc::now().to_rfc3339(),
        report.skipped_files.len()
    );
}

fn print_answer(answer: &QueryAnswer) {
    println!("answer:\n{}\n", answer.answer);

    for (position, source) in answer.sources.iter().enumerate() {
        let excerpt: String = source.excerpt.chars().take(150).collect();
        println!("[{}] {} - {}", position + 1, source.paper, source.section);
        println!(
            "    page={} similarity={:.3}",
            source.page, source.similarity_score
        );
        println!("    excerpt: \"{excerpt}...\"");
    }
}
