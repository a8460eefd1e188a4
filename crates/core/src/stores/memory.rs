use crate::embeddings::cosine_similarity;
use crate::error::{AssistantError, Result};
use crate::models::{IndexedRecord, RecordMetadata, RetrievedChunk};
use crate::traits::{check_batch_lengths, VectorIndex};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::info;

#[derive(Default, Serialize, Deserialize)]
struct Snapshot {
    collection: String,
    records: Vec<IndexedRecord>,
}

/// In-process collection with cosine similarity search.
///
/// Every upsert and query runs under one lock, so each call sees a
/// consistent snapshot. When opened on a path, the collection is written
/// back to disk before `upsert` returns.
pub struct MemoryIndex {
    collection: String,
    records: RwLock<BTreeMap<String, IndexedRecord>>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryIndex {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            records: RwLock::new(BTreeMap::new()),
            snapshot_path: None,
        }
    }

    /// Loads the snapshot at `path`, or starts an empty collection when the
    /// file does not exist yet.
    pub async fn open(collection: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self> {
        let collection = collection.into();
        let path = path.into();

        let records = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
                snapshot
                    .records
                    .into_iter()
                    .map(|record| (record.id.clone(), record))
                    .collect()
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(error) => return Err(error.into()),
        };

        info!(
            collection = %collection,
            path = %path.display(),
            collection_size = records.len(),
            "memory index opened"
        );

        Ok(Self {
            collection,
            records: RwLock::new(records),
            snapshot_path: Some(path),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn persist(&self, path: &Path, records: &BTreeMap<String, IndexedRecord>) -> Result<()> {
        let snapshot = Snapshot {
            collection: self.collection.clone(),
            records: records.values().cloned().collect(),
        };
        let encoded = serde_json::to_vec(&snapshot)?;

        let staging = path.with_extension("tmp");
        tokio::fs::write(&staging, encoded).await?;
        tokio::fs::rename(&staging, path).await?;
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(
        &self,
        ids: &[String],
        vectors: &[Vec<f32>],
        documents: &[String],
        metadatas: &[RecordMetadata],
    ) -> Result<()> {
        check_batch_lengths(ids, vectors, documents, metadatas)?;
        if ids.is_empty() {
            return Ok(());
        }

        let mut records = self.records.write().await;
        let dimension = records
            .values()
            .next()
            .map(|record| record.vector.len())
            .unwrap_or_else(|| vectors[0].len());

        if let Some(vector) = vectors.iter().find(|vector| vector.len() != dimension) {
            return Err(AssistantError::InvalidArgument(format!(
                "embedding dimension {} != {}",
                vector.len(),
                dimension
            )));
        }

        let mut staged = records.clone();
        for (((id, vector), document), metadata) in ids
            .iter()
            .zip(vectors.iter())
            .zip(documents.iter())
            .zip(metadatas.iter())
        {
            staged.insert(
                id.clone(),
                IndexedRecord {
                    id: id.clone(),
                    vector: vector.clone(),
                    document: document.clone(),
                    metadata: metadata.clone(),
                },
            );
        }

        if let Some(path) = &self.snapshot_path {
            self.persist(path, &staged).await?;
        }
        *records = staged;

        Ok(())
    }

    async fn query(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>> {
        let records = self.records.read().await;

        let mut scored = records
            .values()
            .map(|record| (cosine_similarity(query_vector, &record.vector), record))
            .collect::<Vec<_>>();
        scored.sort_by(|left, right| right.0.total_cmp(&left.0));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(score, record)| RetrievedChunk {
                document: record.document.clone(),
                metadata: record.metadata.clone(),
                score,
            })
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryIndex;
    use crate::models::RecordMetadata;
    use crate::traits::VectorIndex;
    use tempfile::tempdir;

    fn batch(names: &[&str]) -> (Vec<String>, Vec<String>, Vec<RecordMetadata>) {
        let ids = names.iter().map(|name| name.to_string()).collect();
        let documents = names.iter().map(|name| format!("text of {name}")).collect();
        let metadatas = names
            .iter()
            .map(|_| RecordMetadata::for_source("doc"))
            .collect();
        (ids, documents, metadatas)
    }

    #[tokio::test]
    async fn query_returns_most_similar_first() {
        let index = MemoryIndex::new("test");
        let (ids, documents, metadatas) = batch(&["a", "b", "c"]);
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]];
        index
            .upsert(&ids, &vectors, &documents, &metadatas)
            .await
            .expect("upsert");

        let hits = index.query(&[0.0, 1.0], 2).await.expect("query");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document, "text of b");
        assert_eq!(hits[1].document, "text of c");
    }

    #[tokio::test]
    async fn colliding_ids_overwrite() {
        let index = MemoryIndex::new("test");
        let (ids, documents, metadatas) = batch(&["doc_0", "doc_1"]);
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        index.upsert(&ids, &vectors, &documents, &metadatas).await.expect("first");
        index.upsert(&ids, &vectors, &documents, &metadatas).await.expect("second");
        assert_eq!(index.count().await.expect("count"), 2);
    }

    #[tokio::test]
    async fn mismatched_batches_are_rejected() {
        let index = MemoryIndex::new("test");
        let (ids, documents, metadatas) = batch(&["a", "b"]);
        let result = index
            .upsert(&ids, &[vec![1.0]], &documents, &metadatas)
            .await;
        assert!(result.is_err());
        assert_eq!(index.count().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn empty_index_query_is_empty() {
        let index = MemoryIndex::new("test");
        assert!(index.query(&[1.0, 0.0], 3).await.expect("query").is_empty());
    }

    #[tokio::test]
    async fn snapshot_survives_reopen() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("index.json");

        let index = MemoryIndex::open("study_documents", &path).await?;
        assert_eq!(index.count().await?, 0);
        let (ids, documents, metadatas) = batch(&["notes_0"]);
        index
            .upsert(&ids, &[vec![0.5, 0.5]], &documents, &metadatas)
            .await?;

        let reopened = MemoryIndex::open("study_documents", &path).await?;
        assert_eq!(reopened.count().await?, 1);
        let hits = reopened.query(&[0.5, 0.5], 1).await?;
        assert_eq!(hits[0].document, "text of notes_0");
        Ok(())
    }
}
