//! Qdrant-backed corpus
//!
//! Chunks are stored as points whose payload carries the chunk text
//! (`document`), its origin (`source`, `offset`) and any metadata.

use async_trait::async_trait;
use qdrant_client::{
    client::QdrantClient,
    qdrant::{
        vectors_config::Config, with_payload_selector::SelectorOptions, CreateCollection,
        Distance, PointStruct, SearchPoints, Value as QdrantValue, VectorParams, VectorsConfig,
        WithPayloadSelector,
    },
};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::corpus::{ChunkOrigin, ChunkStore, Corpus, Embedder, EvidenceChunk};
use crate::errors::{PipelineError, Result};

const DOCUMENT_KEY: &str = "document";
const SOURCE_KEY: &str = "source";
const OFFSET_KEY: &str = "offset";

/// Corpus stored in one Qdrant collection
pub struct QdrantCorpus {
    client: QdrantClient,
    collection: String,
    embedder: Arc<dyn Embedder>,
}

impl QdrantCorpus {
    /// Connect to Qdrant; the collection is created lazily on first store
    pub fn connect(url: &str, collection: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let client = QdrantClient::from_url(url)
            .build()
            .map_err(|e| PipelineError::Configuration(format!("Failed to create Qdrant client: {}", e)))?;

        Ok(Self {
            client,
            collection: collection.to_string(),
            embedder,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Check if Qdrant answers
    pub async fn health_check(&self) -> bool {
        self.client.health_check().await.is_ok()
    }

    /// Number of stored chunks
    pub async fn point_count(&self) -> Result<u64> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| retrieval_error("Failed to get collection info", e))?;

        Ok(info.result.and_then(|r| r.points_count).unwrap_or(0))
    }

    /// Create the collection with cosine distance if it is missing
    async fn ensure_collection(&self, dimension: u64) -> Result<()> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| retrieval_error("Failed to list collections", e))?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if !exists {
            info!(collection = %self.collection, dimension, "creating collection");
            self.client
                .create_collection(&CreateCollection {
                    collection_name: self.collection.clone(),
                    vectors_config: Some(VectorsConfig {
                        config: Some(Config::Params(VectorParams {
                            size: dimension,
                            distance: Distance::Cosine.into(),
                            ..Default::default()
                        })),
                    }),
                    ..Default::default()
                })
                .await
                .map_err(|e| retrieval_error("Failed to create collection", e))?;
        }

        Ok(())
    }
}

#[async_trait]
impl Corpus for QdrantCorpus {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<EvidenceChunk>> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| PipelineError::Retrieval(format!("Query embedding failed: {}", e)))?;

        let search_result = self
            .client
            .search_points(&SearchPoints {
                collection_name: self.collection.clone(),
                vector,
                limit: k as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| retrieval_error("Failed to search points", e))?;

        let chunks: Vec<EvidenceChunk> = search_result
            .result
            .into_iter()
            .map(|point| {
                let fallback_id = point_id_to_string(&point.id);
                chunk_from_payload(point.payload, point.score, fallback_id)
            })
            .collect();

        debug!(hits = chunks.len(), k, "qdrant search");
        Ok(chunks)
    }
}

#[async_trait]
impl ChunkStore for QdrantCorpus {
    async fn store(&self, chunks: Vec<EvidenceChunk>) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let mut points = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let embedding = self.embedder.embed(&chunk.text).await?;
            if points.is_empty() {
                self.ensure_collection(embedding.len() as u64).await?;
            }
            let id = uuid::Uuid::new_v4().to_string();
            points.push(PointStruct::new(id, embedding, payload_from_chunk(chunk)));
        }

        let count = points.len();
        self.client
            .upsert_points_blocking(self.collection.as_str(), None, points, None)
            .await
            .map_err(|e| retrieval_error("Failed to upsert points", e))?;

        Ok(count)
    }
}

fn retrieval_error(context: &str, err: impl std::fmt::Display) -> PipelineError {
    PipelineError::Retrieval(format!("{}: {}", context, err))
}

fn payload_from_chunk(chunk: EvidenceChunk) -> HashMap<String, QdrantValue> {
    let mut payload = HashMap::new();
    for (key, value) in chunk.metadata {
        payload.insert(key, json_to_qdrant_value(value));
    }
    payload.insert(DOCUMENT_KEY.to_string(), QdrantValue::from(chunk.text));
    payload.insert(SOURCE_KEY.to_string(), QdrantValue::from(chunk.origin.source_id));
    payload.insert(OFFSET_KEY.to_string(), QdrantValue::from(chunk.origin.offset as i64));
    payload
}

fn chunk_from_payload(
    payload: HashMap<String, QdrantValue>,
    score: f32,
    fallback_id: String,
) -> EvidenceChunk {
    let text = payload
        .get(DOCUMENT_KEY)
        .and_then(qdrant_value_to_string)
        .unwrap_or_default();
    let source_id = payload
        .get(SOURCE_KEY)
        .and_then(qdrant_value_to_string)
        .unwrap_or(fallback_id);
    let offset = payload
        .get(OFFSET_KEY)
        .and_then(qdrant_to_json_value)
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as usize;

    let mut metadata = serde_json::Map::new();
    for (key, value) in payload {
        if key != DOCUMENT_KEY {
            if let Some(json_val) = qdrant_to_json_value(&value) {
                metadata.insert(key, json_val);
            }
        }
    }
    if let Some(score) = serde_json::Number::from_f64(score as f64) {
        metadata.insert("score".to_string(), JsonValue::Number(score));
    }

    EvidenceChunk {
        text,
        metadata,
        origin: ChunkOrigin::new(source_id, offset),
    }
}

fn json_to_qdrant_value(json: JsonValue) -> QdrantValue {
    match json {
        JsonValue::String(s) => QdrantValue::from(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                QdrantValue::from(i)
            } else if let Some(f) = n.as_f64() {
                QdrantValue::from(f)
            } else {
                QdrantValue::from(0)
            }
        }
        JsonValue::Bool(b) => QdrantValue::from(b),
        other => QdrantValue::from(other.to_string()),
    }
}

fn qdrant_to_json_value(value: &QdrantValue) -> Option<JsonValue> {
    value.kind.as_ref().and_then(|kind| {
        use qdrant_client::qdrant::value::Kind;
        match kind {
            Kind::StringValue(s) => Some(JsonValue::String(s.clone())),
            Kind::IntegerValue(i) => Some(JsonValue::Number((*i).into())),
            Kind::DoubleValue(f) => serde_json::Number::from_f64(*f).map(JsonValue::Number),
            Kind::BoolValue(b) => Some(JsonValue::Bool(*b)),
            _ => None,
        }
    })
}

fn qdrant_value_to_string(value: &QdrantValue) -> Option<String> {
    value.kind.as_ref().and_then(|kind| {
        use qdrant_client::qdrant::value::Kind;
        match kind {
            Kind::StringValue(s) => Some(s.clone()),
            _ => None,
        }
    })
}

fn point_id_to_string(point_id: &Option<qdrant_client::qdrant::PointId>) -> String {
    point_id
        .as_ref()
        .map(|id| {
            use qdrant_client::qdrant::point_id::PointIdOptions;
            match &id.point_id_options {
                Some(PointIdOptions::Num(n)) => n.to_string(),
                Some(PointIdOptions::Uuid(u)) => u.clone(),
                None => "unknown".to_string(),
            }
        })
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_round_trip_keeps_origin() {
        let chunk = EvidenceChunk::new("Article 4 applies.", ChunkOrigin::new("rules.md", 1500))
            .with_metadata("file_name", "rules.md");

        let restored = chunk_from_payload(payload_from_chunk(chunk.clone()), 0.5, "id-1".into());

        assert_eq!(restored.text, chunk.text);
        assert_eq!(restored.origin, chunk.origin);
        assert_eq!(restored.metadata["file_name"], "rules.md");
        assert_eq!(restored.metadata["score"], 0.5);
    }

    #[test]
    fn test_missing_source_falls_back_to_point_id() {
        let mut payload = HashMap::new();
        payload.insert(DOCUMENT_KEY.to_string(), QdrantValue::from("text".to_string()));

        let chunk = chunk_from_payload(payload, 0.1, "42".into());
        assert_eq!(chunk.origin, ChunkOrigin::new("42", 0));
    }

    #[test]
    fn test_json_value_conversion() {
        let value = json_to_qdrant_value(JsonValue::from(7));
        assert_eq!(qdrant_to_json_value(&value), Some(JsonValue::from(7)));

        let value = json_to_qdrant_value(JsonValue::Bool(true));
        assert_eq!(qdrant_to_json_value(&value), Some(JsonValue::Bool(true)));
    }
}
