//! Ollama 답변 재작성기 (`/api/generate`, stream=false)

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{build_prompt, AnswerRewriter};
use crate::embedding::validate_endpoint;

/// Ollama 기반 재작성기
#[derive(Debug)]
pub struct OllamaRewriter {
    client: reqwest::Client,
    model: String,
    url_generate: String,
}

impl OllamaRewriter {
    pub fn new(endpoint: &str, model: &str) -> Result<Self> {
        let url_generate = format!("{}/api/generate", validate_endpoint(endpoint)?);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            model: model.to_string(),
            url_generate,
        })
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait]
impl AnswerRewriter for OllamaRewriter {
    async fn rewrite(&self, question: &str, passages: &[&str]) -> Result<String> {
        let prompt = build_prompt(question, passages);
        let body = GenerateRequest {
            model: &self.model,
            prompt: &prompt,
            stream: false,
            options: GenerateOptions { temperature: 0.2 },
        };

        tracing::debug!("POST {}", self.url_generate);
        let response = self
            .client
            .post(&self.url_generate)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to reach Ollama at {}", self.url_generate))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(240).collect();
            anyhow::bail!("Ollama generate error ({}): {}", status, snippet);
        }

        let out: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse Ollama generate response")?;
        Ok(out.response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_endpoint() {
        assert!(OllamaRewriter::new("ftp://host", "llama3.2").is_err());
        let r = OllamaRewriter::new("http://localhost:11434", "llama3.2").unwrap();
        assert_eq!(r.url_generate, "http://localhost:11434/api/generate");
        assert_eq!(r.model(), "llama3.2");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_error() {
        let r = OllamaRewriter::new("http://127.0.0.1:9", "llama3.2").unwrap();
        assert!(r.rewrite("q", &["p"]).await.is_err());
    }
}
