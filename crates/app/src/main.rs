mod server;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use study_assistant_core::{
    read_upload_files, AssistantConfig, CharacterNgramEmbedder, ConfigStore, EmbeddingBackend,
    EmbeddingProvider, MemoryIndex, OllamaClient, OllamaEmbedder, QdrantStore, StudyAssistant,
    VectorIndex, DEFAULT_SUMMARY_DETAIL,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "study-assistant", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON config file (llm, embedding, rag sections)
    #[arg(long, env = "STUDY_ASSISTANT_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Vector store backend
    #[arg(long, value_enum, env = "STUDY_ASSISTANT_VECTOR_STORE", default_value = "memory")]
    vector_store: VectorStoreKind,

    /// Snapshot file for the memory vector store
    #[arg(long, env = "STUDY_ASSISTANT_INDEX_PATH", default_value = "study_index.json")]
    index_path: PathBuf,

    /// Qdrant base URL
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6333")]
    qdrant_url: String,

    /// Collection name
    #[arg(long, default_value = "study_documents")]
    collection: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum VectorStoreKind {
    Memory,
    Qdrant,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8000")]
        bind: String,
    },
    /// Add pasted text (or a text file) to the collection.
    Submit {
        #[arg(long)]
        title: String,
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        content: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Extract, chunk and index up to five PDFs. Directories are searched recursively.
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Summarize a text without touching the collection.
    Summarize {
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        text: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long, default_value = DEFAULT_SUMMARY_DETAIL)]
        detail: String,
    },
    /// Answer a question from the indexed documents.
    Ask {
        #[arg(long)]
        question: String,
    },
    /// Print the number of indexed chunks.
    Status,
    /// Show or replace the config.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    /// Replace the whole config with the contents of a JSON file.
    Set {
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "study-assistant boot"
    );

    let config_store = Arc::new(ConfigStore::load(&cli.config));
    let config = config_store.current();

    let embedder = build_embedder(&config)?;
    let index = build_index(&cli, embedder.as_ref()).await?;
    let llm = Arc::new(OllamaClient::new(&config.llm.host)?);

    let assistant = StudyAssistant::new(embedder, index, llm, config_store.clone())?;
    info!(
        collection = %cli.collection,
        collection_size = assistant.document_count().await?,
        "collection ready"
    );

    match cli.command {
        Command::Serve { bind } => {
            server::run_server(Arc::new(assistant), &bind).await?;
        }
        Command::Submit {
            title,
            content,
            file,
        } => {
            let content = read_text_arg(content, file).await?;
            let chunks = assistant.ingest_document(&title, &content).await?;
            println!("Successfully processed and added text '{title}' to the database. chunks_loaded={chunks}");
        }
        Command::Upload { paths } => {
            let files = read_upload_files(&paths)?;
            let report = assistant.ingest_uploads(&files).await?;
            for skipped in &report.skipped_files {
                warn!(file = %skipped.name, reason = %skipped.reason, "skipped upload");
            }
            println!("{} chunks_loaded={}", report.message(), report.chunks_added);
        }
        Command::Summarize { text, file, detail } => {
            let text = read_text_arg(text, file).await?;
            println!("{}", assistant.summarize(&text, &detail).await?);
        }
        Command::Ask { question } => {
            println!("{}", assistant.answer(&question).await?);
        }
        Command::Status => {
            println!(
                "collection={} chunks={}",
                cli.collection,
                assistant.document_count().await?
            );
        }
        Command::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", serde_json::to_string_pretty(assistant.config().as_ref())?);
            }
            ConfigAction::Set { file } => {
                let raw = tokio::fs::read_to_string(&file).await?;
                let replacement: AssistantConfig = serde_json::from_str(&raw)?;
                let updated = assistant.update_config(replacement)?;
                println!("{}", serde_json::to_string_pretty(updated.as_ref())?);
            }
        },
    }

    Ok(())
}

fn build_embedder(config: &AssistantConfig) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let embedder: Arc<dyn EmbeddingProvider> = match config.embedding.provider {
        EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::new(
            &config.llm.host,
            config.embedding.model.clone(),
        )?),
        EmbeddingBackend::Ngram => Arc::new(CharacterNgramEmbedder::default()),
    };
    Ok(embedder)
}

async fn build_index(
    cli: &Cli,
    embedder: &dyn EmbeddingProvider,
) -> anyhow::Result<Arc<dyn VectorIndex>> {
    let index: Arc<dyn VectorIndex> = match cli.vector_store {
        VectorStoreKind::Memory => {
            Arc::new(MemoryIndex::open(cli.collection.clone(), cli.index_path.clone()).await?)
        }
        VectorStoreKind::Qdrant => {
            let vector_size = embedder.embed_one("dimension probe").await?.len();
            let store = QdrantStore::new(&cli.qdrant_url, &cli.collection, vector_size);
            store.ensure_collection().await?;
            Arc::new(store)
        }
    };
    Ok(index)
}

async fn read_text_arg(inline: Option<String>, file: Option<PathBuf>) -> anyhow::Result<String> {
    match (inline, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => Ok(tokio::fs::read_to_string(path).await?),
        (None, None) => anyhow::bail!("either --content/--text or --file is required"),
    }
}
