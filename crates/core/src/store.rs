use crate::chunking::TextChunker;
use crate::embeddings::EmbeddingProvider;
use crate::error::{AssistantError, Result};
use crate::models::{record_id, RecordMetadata};
use crate::traits::VectorIndex;
use std::sync::Arc;
use tracing::{info, warn};

/// Ingestion pipeline: text to paragraph chunks to vectors to index records.
pub struct DocumentStore {
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
}

impl DocumentStore {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Result<Self> {
        Ok(Self::with_chunker(TextChunker::new()?, embedder, index))
    }

    pub fn with_chunker(
        chunker: TextChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            chunker,
            embedder,
            index,
        }
    }

    pub fn embedder(&self) -> &dyn EmbeddingProvider {
        self.embedder.as_ref()
    }

    pub fn index(&self) -> &dyn VectorIndex {
        self.index.as_ref()
    }

    /// Returns the number of chunks written. Text without any non-blank
    /// paragraph leaves the index untouched and returns 0.
    pub async fn add_document(&self, name: &str, text: &str) -> Result<usize> {
        info!(document = %name, "adding document to the collection");

        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            warn!(document = %name, "no text chunks found");
            return Ok(0);
        }

        let vectors = self.embedder.embed(&chunks).await?;
        if vectors.len() != chunks.len() {
            return Err(AssistantError::upstream(
                "embedding",
                format!(
                    "embedding count {} doesn't match chunk count {}",
                    vectors.len(),
                    chunks.len()
                ),
            ));
        }

        let ids = (0..chunks.len())
            .map(|index| record_id(name, index))
            .collect::<Vec<_>>();
        let metadatas = vec![RecordMetadata::for_source(name); chunks.len()];

        self.index.upsert(&ids, &vectors, &chunks, &metadatas).await?;

        let collection_size = self.index.count().await?;
        info!(
            document = %name,
            chunks = chunks.len(),
            collection_size,
            "document added"
        );
        Ok(chunks.len())
    }
}
