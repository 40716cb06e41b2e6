use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::OpenAISettings;
use crate::error::{PlaygroundError, Result};

/// Maximum number of inputs sent in one embeddings request.
pub const EMBEDDING_BATCH_SIZE: usize = 512;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_documents(&self, texts: &[String],) -> Result<Vec<Vec<f32,>,>,>;

    async fn embed_query(&self, text: &str,) -> Result<Vec<f32,>,> {
        self.embed_documents(&[text.to_string(),],)
            .await?
            .pop()
            .ok_or_else(|| PlaygroundError::Other("empty embedding response".to_string(),),)
    }
}

pub struct OpenAIEmbedder {
    client:   Client,
    api_key:  SecretString,
    base_url: String,
    model:    String,
}

impl OpenAIEmbedder {
    pub fn new(settings: &OpenAISettings,) -> Self {
        Self {
            client:   Client::new(),
            api_key:  settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/',).to_string(),
            model:    settings.embedding_model.clone(),
        }
    }

    pub fn model(&self,) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String],) -> Result<Vec<Vec<f32,>,>,> {
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url),)
            .bearer_auth(self.api_key.expose_secret(),)
            .json(&OpenAIRequest {
                input: texts,
                model: &self.model,
            },)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PlaygroundError::ApiError { status, body, },);
        }

        let result: OpenAIResponse = response.json().await?;
        if result.data.len() != texts.len() {
            return Err(PlaygroundError::Other(format!(
                "OpenAI returned {} embeddings for {} inputs",
                result.data.len(),
                texts.len()
            ),),);
        }

        let mut data = result.data;
        data.sort_by_key(|d| d.index,);
        Ok(data.into_iter().map(|d| d.embedding,).collect(),)
    }
}

#[derive(Serialize,)]
struct OpenAIRequest<'a,> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize,)]
struct OpenAIResponse {
    data: Vec<EmbeddingData,>,
}

#[derive(Deserialize,)]
struct EmbeddingData {
    embedding: Vec<f32,>,
    #[serde(default)]
    index:     usize,
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed_documents(&self, texts: &[String],) -> Result<Vec<Vec<f32,>,>,> {
        if texts.is_empty() {
            return Ok(vec![],);
        }

        let mut embeddings = Vec::with_capacity(texts.len(),);
        for batch in texts.chunks(EMBEDDING_BATCH_SIZE,) {
            debug!("Embedding batch of {} texts with {}", batch.len(), self.model);
            embeddings.extend(self.embed_batch(batch,).await?,);
        }
        Ok(embeddings,)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(base_url: String,) -> OpenAISettings {
        OpenAISettings {
            api_key: SecretString::new("test-key".to_string(),),
            base_url,
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
        }
    }

    #[tokio::test]
    async fn embeddings_are_returned_in_input_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings",)
            .match_header("authorization", "Bearer test-key",)
            .with_status(200,)
            .with_header("content-type", "application/json",)
            .with_body(
                r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#,
            )
            .create_async()
            .await;

        let embedder = OpenAIEmbedder::new(&settings(server.url(),),);
        let out = embedder
            .embed_documents(&["first".to_string(), "second".to_string(),],)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(out, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn large_inputs_are_sent_in_batches_and_keep_order() {
        let mut server = mockito::Server::new_async().await;
        // Echo each input's number back as its embedding, listed in reverse.
        let mock = server
            .mock("POST", "/embeddings",)
            .with_status(200,)
            .with_header("content-type", "application/json",)
            .with_body_from_request(|request| {
                let body: serde_json::Value = serde_json::from_slice(request.body().unwrap(),).unwrap();
                let inputs = body["input"].as_array().unwrap();
                let data: Vec<_,> = inputs
                    .iter()
                    .enumerate()
                    .rev()
                    .map(|(index, text,)| {
                        let n: f32 = text.as_str().unwrap().trim_start_matches("text-",).parse().unwrap();
                        serde_json::json!({"index": index, "embedding": [n]})
                    },)
                    .collect();
                serde_json::json!({ "data": data }).to_string().into_bytes()
            },)
            .expect(2,)
            .create_async()
            .await;

        let texts: Vec<String,> = (0..EMBEDDING_BATCH_SIZE + 1).map(|i| format!("text-{i}"),).collect();
        let embedder = OpenAIEmbedder::new(&settings(server.url(),),);
        let out = embedder.embed_documents(&texts,).await.unwrap();

        mock.assert_async().await;
        assert_eq!(out.len(), EMBEDDING_BATCH_SIZE + 1);
        for (i, embedding,) in out.iter().enumerate() {
            assert_eq!(embedding, &vec![i as f32]);
        }
    }

    #[tokio::test]
    async fn api_failure_surfaces_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embeddings",)
            .with_status(401,)
            .with_body("invalid api key",)
            .create_async()
            .await;

        let embedder = OpenAIEmbedder::new(&settings(server.url(),),);
        let err = embedder.embed_query("hello",).await.unwrap_err();

        match err {
            PlaygroundError::ApiError { status, body, } => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid api key");
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_input_makes_no_request() {
        let embedder = OpenAIEmbedder::new(&settings("http://127.0.0.1:9".to_string(),),);
        assert!(embedder.embed_documents(&[],).await.unwrap().is_empty());
    }
}
