use crate::error::Result;
use crate::models::{GenerationOptions, Message, RecordMetadata, RetrievedChunk};
use async_trait::async_trait;

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Inserts new ids and overwrites existing ones. All four slices must
    /// have the same length.
    async fn upsert(
        &self,
        ids: &[String],
        vectors: &[Vec<f32>],
        documents: &[String],
        metadatas: &[RecordMetadata],
    ) -> Result<()>;

    /// Up to `top_k` records, most similar first.
    async fn query(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>>;

    async fn count(&self) -> Result<usize>;
}

#[async_trait]
pub trait LanguageModelClient: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        messages: &[Message],
        options: GenerationOptions,
    ) -> Result<String>;
}

pub(crate) fn check_batch_lengths(
    ids: &[String],
    vectors: &[Vec<f32>],
    documents: &[String],
    metadatas: &[RecordMetadata],
) -> Result<()> {
    let expected = ids.len();
    if vectors.len() != expected || documents.len() != expected || metadatas.len() != expected {
        return Err(crate::AssistantError::InvalidArgument(format!(
            "upsert batch lengths differ: ids={} vectors={} documents={} metadatas={}",
            ids.len(),
            vectors.len(),
            documents.len(),
            metadatas.len()
        )));
    }
    Ok(())
}
