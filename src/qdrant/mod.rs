// rag_playground/src/qdrant/mod.rs
// Qdrant-backed vector store for document chunks.

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CountPoints, CreateCollection, Distance, PointStruct, SearchPoints, UpsertPoints, VectorParams,
    WithPayloadSelector, with_payload_selector::SelectorOptions,
};
use qdrant_client::qdrant::{PointId, point_id::PointIdOptions};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::documents::DocumentMetadata;
use crate::embeddings::Embedder;
use crate::error::{PlaygroundError, Result};
use crate::retry::{execute_with_retry, wrap_error};
use crate::splitter::Chunk;

/// Number of chunks embedded and upserted per request.
pub const UPSERT_BATCH_SIZE: usize = 64;

/// A chunk returned by similarity search.
#[derive(Debug, Clone, PartialEq,)]
pub struct ScoredChunk {
    pub id:    String,
    pub score: f32,
    pub chunk: Chunk,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embeds and stores `chunks`, returning how many were written.
    async fn add_chunks(&self, chunks: &[Chunk], embedder: &dyn Embedder,) -> Result<usize,>;

    /// The `k` stored chunks closest to `query`, best first.
    async fn similarity_search(
        &self,
        query: &str,
        k: u64,
        embedder: &dyn Embedder,
    ) -> Result<Vec<ScoredChunk,>,>;
}

/// Point payload layout.
#[derive(Serialize, Deserialize,)]
struct ChunkPayload {
    page_content: String,
    offset:       usize,
    length:       usize,
    chunk_index:  usize,
    metadata:     DocumentMetadata,
}

impl From<&Chunk,> for ChunkPayload {
    fn from(chunk: &Chunk,) -> Self {
        Self {
            page_content: chunk.text.clone(),
            offset:       chunk.offset,
            length:       chunk.length,
            chunk_index:  chunk.chunk_index,
            metadata:     chunk.metadata.clone(),
        }
    }
}

impl From<ChunkPayload,> for Chunk {
    fn from(payload: ChunkPayload,) -> Self {
        Self {
            text:        payload.page_content,
            offset:      payload.offset,
            length:      payload.length,
            chunk_index: payload.chunk_index,
            metadata:    payload.metadata,
        }
    }
}

pub struct QdrantStore {
    client:          Qdrant,
    collection_name: String,
}

impl QdrantStore {
    pub async fn connect(url: &str, collection_name: &str,) -> Result<Self,> {
        let client = Qdrant::from_url(url,).build().map_err(|e| {
            PlaygroundError::ConnectionError(format!("Failed to create Qdrant client: {}", e),)
        },)?;

        execute_with_retry(|| async {
            client.health_check().await.map(|_| (),).map_err(|e| {
                wrap_error(PlaygroundError::ConnectionError(format!(
                    "Failed to connect to Qdrant: {}",
                    e
                ),),)
            },)
        },)
        .await?;

        Ok(QdrantStore {
            client,
            collection_name: collection_name.to_string(),
        },)
    }

    pub fn collection_name(&self,) -> &str {
        &self.collection_name
    }

    /// Creates the collection with cosine distance unless it already exists.
    pub async fn ensure_collection(&self, vector_size: u64,) -> Result<(),> {
        let exists = execute_with_retry(|| async {
            self.client
                .collection_exists(self.collection_name.as_str(),)
                .await
                .map_err(|e| wrap_error(e.into(),),)
        },)
        .await?;

        if exists {
            debug!("Qdrant collection {} already exists", self.collection_name);
            return Ok((),);
        }

        let create_collection_req = CreateCollection {
            collection_name: self.collection_name.clone(),
            vectors_config: Some(qdrant_client::qdrant::VectorsConfig {
                config: Some(qdrant_client::qdrant::vectors_config::Config::Params(VectorParams {
                    size: vector_size,
                    distance: Distance::Cosine as i32,
                    ..Default::default()
                },),),
            },),
            ..Default::default()
        };

        execute_with_retry(|| async {
            self.client
                .create_collection(create_collection_req.clone(),)
                .await
                .map(|_| (),)
                .map_err(|e| wrap_error(e.into(),),)
        },)
        .await?;
        info!(
            "Created Qdrant collection: {} (size {})",
            self.collection_name, vector_size
        );
        Ok((),)
    }

    pub async fn count_points(&self,) -> Result<u64,> {
        let response = execute_with_retry(|| async {
            self.client
                .count(CountPoints {
                    collection_name: self.collection_name.clone(),
                    exact: Some(true,),
                    ..Default::default()
                },)
                .await
                .map_err(|e| wrap_error(e.into(),),)
        },)
        .await?;
        Ok(response.result.map(|r| r.count,).unwrap_or(0,),)
    }

    async fn upsert_batch(&self, chunks: &[Chunk], vectors: Vec<Vec<f32,>,>,) -> Result<(),> {
        let mut points = Vec::with_capacity(chunks.len(),);
        for (chunk, vector,) in chunks.iter().zip(vectors,) {
            let payload = serde_json::to_value(ChunkPayload::from(chunk,),)?;
            let payload = match json_to_qdrant_value(&payload,).kind {
                Some(qdrant_client::qdrant::value::Kind::StructValue(s,),) => s.fields,
                _ => HashMap::new(),
            };

            points.push(PointStruct {
                id: Some(PointId {
                    point_id_options: Some(PointIdOptions::Uuid(Uuid::new_v4().to_string(),),),
                },),
                payload,
                vectors: Some(vector.into(),),
            },);
        }

        let upsert_req = UpsertPoints {
            collection_name: self.collection_name.clone(),
            wait: Some(true,),
            points,
            ..Default::default()
        };

        execute_with_retry(|| async {
            self.client
                .upsert_points(upsert_req.clone(),)
                .await
                .map(|_| (),)
                .map_err(|e| wrap_error(e.into(),),)
        },)
        .await
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn add_chunks(&self, chunks: &[Chunk], embedder: &dyn Embedder,) -> Result<usize,> {
        let mut written = 0;
        let mut collection_ready = false;

        for batch in chunks.chunks(UPSERT_BATCH_SIZE,) {
            let texts: Vec<String,> = batch.iter().map(|c| c.text.clone(),).collect();
            let vectors = embedder.embed_documents(&texts,).await?;

            if !collection_ready {
                let size = vectors.first().map(|v| v.len() as u64,).unwrap_or(0,);
                if size == 0 {
                    return Err(PlaygroundError::VectorStoreError(
                        "embedder returned an empty vector".to_string(),
                    ),);
                }
                self.ensure_collection(size,).await?;
                collection_ready = true;
            }

            self.upsert_batch(batch, vectors,).await?;
            written += batch.len();
            debug!("Upserted {}/{} chunks", written, chunks.len());
        }

        Ok(written,)
    }

    async fn similarity_search(
        &self,
        query: &str,
        k: u64,
        embedder: &dyn Embedder,
    ) -> Result<Vec<ScoredChunk,>,> {
        let vector = embedder.embed_query(query,).await?;

        let request = SearchPoints {
            collection_name: self.collection_name.clone(),
            vector,
            limit: k,
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(SelectorOptions::Enable(true,),),
            },),
            ..Default::default()
        };

        let response = execute_with_retry(|| async {
            self.client
                .search_points(request.clone(),)
                .await
                .map_err(|e| wrap_error(e.into(),),)
        },)
        .await?;

        let mut results = Vec::with_capacity(response.result.len(),);
        for point in response.result {
            let id = match point.id.and_then(|id| id.point_id_options,) {
                Some(PointIdOptions::Uuid(uuid,),) => uuid,
                Some(PointIdOptions::Num(n,),) => n.to_string(),
                None => String::new(),
            };
            let payload = serde_json::Value::Object(
                point
                    .payload
                    .iter()
                    .map(|(k, v,)| (k.clone(), qdrant_value_to_json(v,),),)
                    .collect(),
            );
            let chunk: ChunkPayload = serde_json::from_value(payload,)?;
            results.push(ScoredChunk {
                id,
                score: point.score,
                chunk: chunk.into(),
            },);
        }

        Ok(results,)
    }
}

fn json_to_qdrant_value(json_val: &serde_json::Value,) -> qdrant_client::qdrant::Value {
    use qdrant_client::qdrant::value::Kind;

    let kind = match json_val {
        serde_json::Value::Null => Kind::NullValue(0,),
        serde_json::Value::Bool(b,) => Kind::BoolValue(*b,),
        serde_json::Value::Number(n,) => match (n.as_i64(), n.as_f64(),) {
            (Some(i,), _,) => Kind::IntegerValue(i,),
            (None, Some(f,),) => Kind::DoubleValue(f,),
            (None, None,) => Kind::StringValue(n.to_string(),),
        },
        serde_json::Value::String(s,) => Kind::StringValue(s.clone(),),
        serde_json::Value::Array(arr,) => Kind::ListValue(qdrant_client::qdrant::ListValue {
            values: arr.iter().map(json_to_qdrant_value,).collect(),
        },),
        serde_json::Value::Object(obj,) => Kind::StructValue(qdrant_client::qdrant::Struct {
            fields: obj
                .iter()
                .map(|(k, v,)| (k.clone(), json_to_qdrant_value(v,),),)
                .collect(),
        },),
    };

    qdrant_client::qdrant::Value { kind: Some(kind,), }
}

fn qdrant_value_to_json(value: &qdrant_client::qdrant::Value,) -> serde_json::Value {
    use qdrant_client::qdrant::value::Kind;

    match &value.kind {
        None | Some(Kind::NullValue(_,),) => serde_json::Value::Null,
        Some(Kind::BoolValue(b,),) => serde_json::Value::Bool(*b,),
        Some(Kind::IntegerValue(i,),) => serde_json::Value::from(*i,),
        Some(Kind::DoubleValue(f,),) => serde_json::Number::from_f64(*f,)
            .map(serde_json::Value::Number,)
            .unwrap_or(serde_json::Value::Null,),
        Some(Kind::StringValue(s,),) => serde_json::Value::String(s.clone(),),
        Some(Kind::ListValue(list,),) => {
            serde_json::Value::Array(list.values.iter().map(qdrant_value_to_json,).collect(),)
        },
        Some(Kind::StructValue(s,),) => serde_json::Value::Object(
            s.fields
                .iter()
                .map(|(k, v,)| (k.clone(), qdrant_value_to_json(v,),),)
                .collect(),
        ),
    }
}
