//! Gemini 답변 재작성기 (`generateContent`)

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{build_prompt, AnswerRewriter};

const GEMINI_GENERATE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

const GEMINI_GENERATE_MODEL: &str = "gemini-2.0-flash";

/// Gemini 기반 재작성기
#[derive(Debug)]
pub struct GeminiRewriter {
    api_key: String,
    client: reqwest::Client,
}

impl GeminiRewriter {
    pub fn new(api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { api_key, client })
    }
}

#[async_trait]
impl AnswerRewriter for GeminiRewriter {
    async fn rewrite(&self, question: &str, passages: &[&str]) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![GenerateContent {
                parts: vec![TextPart {
                    text: build_prompt(question, passages),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                max_output_tokens: 1024,
            },
        };

        let response = self
            .client
            .post(GEMINI_GENERATE_URL)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send generateContent request")?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            anyhow::bail!("Gemini generate error ({}): {}", status, body);
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).context("Failed to parse generateContent response")?;

        Ok(parsed.first_text())
    }

    fn model(&self) -> &str {
        GEMINI_GENERATE_MODEL
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<GenerateContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GenerateContent {
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TextPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: GenerateContent,
}

impl GenerateResponse {
    /// 첫 후보의 텍스트 파트를 이어 붙임
    fn first_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}],"role":"model"}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.first_text(), "Hello world");
    }

    #[test]
    fn test_parse_empty_candidates() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.first_text(), "");
    }

    #[test]
    fn test_model_name() {
        let r = GeminiRewriter::new("fake_key".to_string()).unwrap();
        assert_eq!(r.model(), "gemini-2.0-flash");
    }
}
