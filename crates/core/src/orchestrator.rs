use crate::config::{AssistantConfig, ConfigStore};
use crate::embeddings::EmbeddingProvider;
use crate::error::{AssistantError, Result};
use crate::extractor::{LopdfExtractor, PdfExtractor};
use crate::ingest::ingest_upload_batch;
use crate::models::{GenerationOptions, IngestionReport, Message, UploadedFile};
use crate::prompt::{compose_answer_prompt, compose_summary_prompt};
use crate::store::DocumentStore;
use crate::traits::{LanguageModelClient, VectorIndex};
use std::sync::Arc;
use tracing::{info, warn};

pub const EMPTY_DATABASE_MESSAGE: &str =
    "The document database is empty. Please upload a document first.";

/// Owns the collaborators of the question-answering pipeline. Built once at
/// startup and shared with request handlers behind an `Arc`.
pub struct StudyAssistant {
    documents: DocumentStore,
    llm: Arc<dyn LanguageModelClient>,
    extractor: Arc<dyn PdfExtractor>,
    config: Arc<ConfigStore>,
}

impl StudyAssistant {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LanguageModelClient>,
        config: Arc<ConfigStore>,
    ) -> Result<Self> {
        Ok(Self {
            documents: DocumentStore::new(embedder, index)?,
            llm,
            extractor: Arc::new(LopdfExtractor),
            config,
        })
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn PdfExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> Arc<AssistantConfig> {
        self.config.current()
    }

    pub fn update_config(&self, config: AssistantConfig) -> Result<Arc<AssistantConfig>> {
        self.config.replace(config)
    }

    pub async fn document_count(&self) -> Result<usize> {
        self.documents.index().count().await
    }

    pub async fn ingest_document(&self, name: &str, text: &str) -> Result<usize> {
        if text.trim().is_empty() {
            return Err(AssistantError::EmptyInput("Text input is empty.".to_string()));
        }
        self.documents.add_document(name, text).await
    }

    /// Extraction failures count as "nothing ingested", never as errors.
    pub async fn ingest_upload(&self, name: &str, bytes: &[u8]) -> Result<usize> {
        let text = self.extractor.extract_text(bytes);
        if text.trim().is_empty() {
            warn!(file = %name, "no text extracted from upload");
            return Ok(0);
        }
        self.documents.add_document(name, &text).await
    }

    pub async fn ingest_uploads(&self, files: &[UploadedFile]) -> Result<IngestionReport> {
        let report = ingest_upload_batch(&self.documents, self.extractor.as_ref(), files).await?;
        info!(
            processed = report.processed_files.len(),
            skipped = report.skipped_files.len(),
            chunks = report.chunks_added,
            "upload batch ingested"
        );
        Ok(report)
    }

    pub async fn summarize(&self, text: &str, detail: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(AssistantError::EmptyInput("Text to summarize is empty.".to_string()));
        }

        let config = self.config.current();
        let prompt = compose_summary_prompt(config.llm.system_prompt.as_deref(), text, detail);

        info!("generating summary");
        let summary = self.generate(&config, prompt).await?;
        info!("summary generated");
        Ok(summary)
    }

    /// The empty-database check comes first, before any input validation.
    /// The collection only grows, so a non-zero count stays valid for the
    /// query that follows; an empty query result is still answered with the
    /// empty-database message.
    pub async fn answer(&self, question: &str) -> Result<String> {
        let index = self.documents.index();
        if index.count().await? == 0 {
            warn!("query attempted on empty database");
            return Ok(EMPTY_DATABASE_MESSAGE.to_string());
        }

        if question.trim().is_empty() {
            return Err(AssistantError::EmptyInput("Question is empty.".to_string()));
        }

        let config = self.config.current();
        let top_k = config.rag.top_k.max(1);
        info!(%question, top_k, "querying collection");

        let query_vector = self.documents.embedder().embed_one(question).await?;
        let retrieved = index.query(&query_vector, top_k).await?;
        if retrieved.is_empty() {
            warn!("query returned no records");
            return Ok(EMPTY_DATABASE_MESSAGE.to_string());
        }

        let prompt = compose_answer_prompt(config.llm.system_prompt.as_deref(), &retrieved, question);

        info!(retrieved = retrieved.len(), "generating rag response");
        let answer = self.generate(&config, prompt).await?;
        info!("rag response generated");
        Ok(answer)
    }

    async fn generate(&self, config: &AssistantConfig, prompt: String) -> Result<String> {
        let options = GenerationOptions {
            temperature: config.llm.effective_temperature(),
            max_tokens: config.llm.effective_max_tokens(),
        };
        self.llm
            .generate(&config.llm.model, &[Message::user(prompt)], options)
            .await
    }
}
