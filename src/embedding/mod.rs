//! 임베딩 모듈 - 텍스트 벡터화
//!
//! 텍스트를 고정 길이 벡터로 변환하는 프로바이더들입니다.
//! 프로바이더는 시작 시 한 번 생성되어 `Arc<dyn EmbeddingProvider>` 로 주입됩니다.
//!
//! - [`GeminiEmbedding`]: Google Gemini API (`gemini-embedding-001`)
//! - [`OllamaEmbedding`]: 로컬 Ollama 서버 (`/api/embed`)
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = create_embedder(&settings)?;
//! let vector = embedder.embed_query("Where did Saqlain study?").await?;
//! ```

mod gemini;
mod ollama;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::{EmbeddingKind, Settings};
use crate::knowledge::Vector;

pub use gemini::{GeminiEmbedding, DEFAULT_GEMINI_DIMENSION};
pub use ollama::OllamaEmbedding;
pub(crate) use ollama::validate_endpoint;

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 검색 질의 임베딩
    async fn embed_query(&self, text: &str) -> Result<Vector>;

    /// 문서 청크 배치 임베딩 (기본 구현: 순차 호출)
    ///
    /// 결과는 입력과 같은 순서, 같은 길이입니다.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vector>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed_query(text).await?);
        }
        Ok(results)
    }

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// API Key Management
// ============================================================================

/// API 키 로드 (환경변수에서)
///
/// 우선순위:
/// 1. `GEMINI_API_KEY` 환경변수
/// 2. `GOOGLE_AI_API_KEY` 환경변수
pub fn get_api_key() -> Result<String> {
    for var in ["GEMINI_API_KEY", "GOOGLE_AI_API_KEY"] {
        if let Ok(key) = std::env::var(var) {
            if !key.trim().is_empty() {
                tracing::debug!("Using API key from {}", var);
                return Ok(key);
            }
        }
    }

    anyhow::bail!(
        "API key not found. Set GEMINI_API_KEY or GOOGLE_AI_API_KEY environment variable.\n\
         Get your API key at: https://aistudio.google.com/app/apikey"
    )
}

// ============================================================================
// Factory Function
// ============================================================================

/// 설정에 따라 임베딩 프로바이더 생성
pub fn create_embedder(settings: &Settings) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedder: Arc<dyn EmbeddingProvider> = match settings.embedding {
        EmbeddingKind::Gemini => {
            let key = settings.require_gemini_key()?;
            Arc::new(GeminiEmbedding::with_dimension(key, settings.gemini_dimension)?)
        }
        EmbeddingKind::Ollama => Arc::new(OllamaEmbedding::new(
            &settings.ollama_url,
            &settings.ollama_embed_model,
        )?),
    };

    tracing::info!("Using embedding provider: {}", embedder.name());
    Ok(embedder)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct LengthEmbedding;

    #[async_trait]
    impl EmbeddingProvider for LengthEmbedding {
        async fn embed_query(&self, text: &str) -> Result<Vector> {
            Ok(vec![text.len() as f32, 1.0])
        }

        fn name(&self) -> &str {
            "length"
        }
    }

    #[tokio::test]
    async fn test_default_batch_preserves_order() {
        let texts = vec!["a".to_string(), "bbb".to_string(), "cc".to_string()];
        let vectors = LengthEmbedding.embed_documents(&texts).await.unwrap();
        assert_eq!(vectors, vec![vec![1.0, 1.0], vec![3.0, 1.0], vec![2.0, 1.0]]);
    }

    #[test]
    fn test_create_ollama_embedder() {
        let settings = Settings::from_lookup(|k| match k {
            "DOCQA_EMBEDDING_PROVIDER" => Some("ollama".to_string()),
            _ => None,
        })
        .unwrap();
        let embedder = create_embedder(&settings).unwrap();
        assert_eq!(embedder.name(), "ollama:all-minilm");
    }

    #[test]
    fn test_create_gemini_embedder_with_key() {
        let settings = Settings::from_lookup(|k| match k {
            "GEMINI_API_KEY" => Some("fake_key".to_string()),
            _ => None,
        })
        .unwrap();
        let embedder = create_embedder(&settings).unwrap();
        assert_eq!(embedder.name(), "gemini-embedding-001");
    }
}
