use crate::error::{AssistantError, Result};
use crate::models::{RecordMetadata, RetrievedChunk};
use crate::traits::{check_batch_lengths, VectorIndex};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::info;

pub struct QdrantStore {
    endpoint: String,
    collection: String,
    client: Client,
    vector_size: usize,
}

impl QdrantStore {
    pub fn new(endpoint: impl Into<String>, collection: impl Into<String>, vector_size: usize) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
            client: Client::new(),
            vector_size,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.endpoint, self.collection)
    }

    /// Get-or-create: a missing collection is created with cosine distance;
    /// an existing one must have the configured vector size.
    pub async fn ensure_collection(&self) -> Result<()> {
        let response = self.client.get(self.collection_url()).send().await?;
        if response.status().is_success() {
            let parsed: Value = response.json().await?;
            return self.check_vector_size(&parsed);
        }

        if response.status() != StatusCode::NOT_FOUND {
            return Err(backend_error(response.status()));
        }

        let response = self
            .client
            .put(self.collection_url())
            .json(&json!({
                "vectors": {
                    "size": self.vector_size,
                    "distance": "Cosine",
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response.status()));
        }

        info!(collection = %self.collection, vector_size = self.vector_size, "qdrant collection created");
        Ok(())
    }
}

impl QdrantStore {
    fn check_vector_size(&self, collection_info: &Value) -> Result<()> {
        match collection_vector_size(collection_info) {
            Some(size) if size as usize == self.vector_size => Ok(()),
            Some(size) => Err(AssistantError::InvalidConfig(format!(
                "qdrant collection {} has vector size {}, embeddings have {}",
                self.collection, size, self.vector_size
            ))),
            None => Err(AssistantError::upstream(
                "qdrant",
                "collection info missing result.config.params.vectors.size",
            )),
        }
    }
}

fn collection_vector_size(collection_info: &Value) -> Option<u64> {
    collection_info
        .pointer("/result/config/params/vectors/size")
        .and_then(Value::as_u64)
}

/// Qdrant only accepts unsigned integers or UUIDs as point ids, so record ids
/// are mapped onto a stable 64-bit prefix of their SHA-256 digest.
pub fn point_id(record_id: &str) -> u64 {
    let digest = Sha256::digest(record_id.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

fn backend_error(status: StatusCode) -> AssistantError {
    AssistantError::upstream("qdrant", status.to_string())
}

#[async_trait]
impl VectorIndex for QdrantStore {
    async fn upsert(
        &self,
        ids: &[String],
        vectors: &[Vec<f32>],
        documents: &[String],
        metadatas: &[RecordMetadata],
    ) -> Result<()> {
        check_batch_lengths(ids, vectors, documents, metadatas)?;

        let points = ids
            .iter()
            .zip(vectors.iter())
            .zip(documents.iter())
            .zip(metadatas.iter())
            .map(|(((id, vector), document), metadata)| {
                if vector.len() != self.vector_size {
                    return Err(AssistantError::InvalidArgument(format!(
                        "embedding dimension {} != {}",
                        vector.len(),
                        self.vector_size
                    )));
                }

                Ok(json!({
                    "id": point_id(id),
                    "vector": vector,
                    "payload": {
                        "id": id,
                        "document": document,
                        "source": metadata.source,
                    },
                }))
            })
            .collect::<Result<Vec<_>>>()?;

        if points.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .put(format!("{}/points?wait=true", self.collection_url()))
            .json(&json!({ "points": points }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response.status()));
        }

        Ok(())
    }

    async fn query(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>> {
        if query_vector.len() != self.vector_size {
            return Err(AssistantError::InvalidArgument(format!(
                "query vector dim {} is not {}",
                query_vector.len(),
                self.vector_size
            )));
        }

        let response = self
            .client
            .post(format!("{}/points/search", self.collection_url()))
            .json(&json!({
                "vector": query_vector,
                "limit": top_k,
                "with_payload": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response.status()));
        }

        let parsed: Value = response.json().await?;
        Ok(parse_search_hits(&parsed))
    }

    async fn count(&self) -> Result<usize> {
        let response = self
            .client
            .post(format!("{}/points/count", self.collection_url()))
            .json(&json!({ "exact": true }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response.status()));
        }

        let parsed: Value = response.json().await?;
        parsed
            .pointer("/result/count")
            .and_then(Value::as_u64)
            .map(|count| count as usize)
            .ok_or_else(|| AssistantError::upstream("qdrant", "count response missing result.count"))
    }
}

fn parse_search_hits(parsed: &Value) -> Vec<RetrievedChunk> {
    parsed
        .pointer("/result")
        .and_then(Value::as_array)
        .map(|hits| {
            hits.iter()
                .map(|hit| RetrievedChunk {
                    document: hit
                        .pointer("/payload/document")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    metadata: RecordMetadata::for_source(
                        hit.pointer("/payload/source")
                            .and_then(Value::as_str)
                            .unwrap_or_default(),
                    ),
                    score: hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0) as f32,
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{collection_vector_size, parse_search_hits, point_id, QdrantStore};
    use crate::AssistantError;
    use serde_json::json;

    #[test]
    fn point_ids_are_stable_and_distinct() {
        assert_eq!(point_id("doc_0"), point_id("doc_0"));
        assert_ne!(point_id("doc_0"), point_id("doc_1"));
    }

    #[test]
    fn existing_collection_must_match_vector_size() {
        let info = json!({
            "result": {"config": {"params": {"vectors": {"size": 384, "distance": "Cosine"}}}}
        });
        assert_eq!(collection_vector_size(&info), Some(384));

        let matching = QdrantStore::new("http://localhost:6333", "study_documents", 384);
        assert!(matching.check_vector_size(&info).is_ok());

        let mismatched = QdrantStore::new("http://localhost:6333", "study_documents", 128);
        assert!(matches!(
            mismatched.check_vector_size(&info),
            Err(AssistantError::InvalidConfig(_))
        ));
        assert!(mismatched.check_vector_size(&json!({"result": {}})).is_err());
    }

    #[test]
    fn search_hits_keep_rank_order() {
        let response = json!({
            "result": [
                {"id": 1, "score": 0.91, "payload": {"id": "b_0", "document": "second doc", "source": "b"}},
                {"id": 2, "score": 0.42, "payload": {"id": "a_3", "document": "first doc", "source": "a"}},
            ]
        });

        let hits = parse_search_hits(&response);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].metadata.source, "b");
        assert_eq!(hits[1].document, "first doc");
    }
}
