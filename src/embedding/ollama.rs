//! 로컬 Ollama 임베딩
//!
//! `POST {endpoint}/api/embed` 로 배치 임베딩을 요청합니다.
//! 기본 모델은 `all-minilm` (MiniLM-L6, 384차원) 입니다.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::EmbeddingProvider;
use crate::knowledge::Vector;

/// Ollama 임베딩 구현체
#[derive(Debug)]
pub struct OllamaEmbedding {
    client: reqwest::Client,
    model: String,
    url_embed: String,
    name: String,
}

impl OllamaEmbedding {
    /// 엔드포인트와 모델로 생성
    ///
    /// 엔드포인트는 `http://` 또는 `https://` 로 시작해야 합니다.
    pub fn new(endpoint: &str, model: &str) -> Result<Self> {
        let url_embed = format!("{}/api/embed", validate_endpoint(endpoint)?);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            model: model.to_string(),
            url_embed,
            name: format!("ollama:{model}"),
        })
    }

    async fn embed_inputs(&self, input: &[String]) -> Result<Vec<Vector>> {
        let body = EmbedRequest {
            model: &self.model,
            input,
        };

        tracing::debug!("POST {} ({} inputs)", self.url_embed, input.len());
        let response = self
            .client
            .post(&self.url_embed)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to reach Ollama at {}", self.url_embed))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(240).collect();
            anyhow::bail!("Ollama error ({}) from {}: {}", status, self.url_embed, snippet);
        }

        let out: EmbedResponse = response
            .json()
            .await
            .context("Failed to parse Ollama embed response, expected `{ embeddings: number[][] }`")?;

        if out.embeddings.len() != input.len() {
            anyhow::bail!(
                "Ollama returned {} embeddings for {} inputs",
                out.embeddings.len(),
                input.len()
            );
        }

        Ok(out.embeddings)
    }
}

/// 엔드포인트 검증 후 끝의 `/` 제거
pub(crate) fn validate_endpoint(endpoint: &str) -> Result<&str> {
    let trimmed = endpoint.trim();
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        anyhow::bail!("Invalid Ollama endpoint: {:?}", endpoint);
    }
    Ok(trimmed.trim_end_matches('/'))
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedding {
    async fn embed_query(&self, text: &str) -> Result<Vector> {
        let mut vectors = self.embed_inputs(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Ollama returned no embedding"))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.embed_inputs(texts).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
