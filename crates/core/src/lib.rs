pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod store;
pub mod stores;
pub mod traits;

pub use chunking::{TextChunker, PARAGRAPH_BOUNDARY};
pub use config::{
    load_config, AssistantConfig, ConfigStore, EmbeddingBackend, EmbeddingConfig, LlmConfig,
    RagConfig,
};
pub use embeddings::{
    cosine_similarity, CharacterNgramEmbedder, EmbeddingProvider, OllamaEmbedder,
    DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{AssistantError, ErrorKind, Result};
pub use extractor::{LopdfExtractor, PageText, PdfExtractor};
pub use ingest::{discover_pdf_files, read_upload_files, MAX_UPLOAD_FILES};
pub use llm::OllamaClient;
pub use models::{
    GenerationOptions, IndexedRecord, IngestionReport, Message, RecordMetadata, RetrievedChunk,
    SkippedFile, UploadedFile,
};
pub use orchestrator::{StudyAssistant, EMPTY_DATABASE_MESSAGE};
pub use prompt::{compose_answer_prompt, compose_summary_prompt, DEFAULT_SUMMARY_DETAIL};
pub use store::DocumentStore;
pub use stores::{MemoryIndex, QdrantStore};
pub use traits::{LanguageModelClient, VectorIndex};
