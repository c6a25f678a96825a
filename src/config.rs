//! 설정 모듈
//!
//! 환경변수(및 `.env`)에서 실행 설정을 한 번 읽어 [`Settings`] 로 만듭니다.
//! CLI 플래그가 주어지면 환경변수보다 우선합니다.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};

use crate::embedding::{get_api_key, DEFAULT_GEMINI_DIMENSION};
use crate::knowledge::{
    get_data_dir, ChunkConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_TOP_K,
};

/// 기본 바인드 주소
pub const DEFAULT_BIND: &str = "0.0.0.0:8000";

/// 기본 Ollama 엔드포인트
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// 기본 Ollama 임베딩 모델
pub const DEFAULT_OLLAMA_EMBED_MODEL: &str = "all-minilm";

/// 기본 Ollama 생성 모델
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

/// 기본 요청 본문 한도 (업로드 문서 포함, 64 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

// ============================================================================
// Provider Kinds
// ============================================================================

/// 임베딩 프로바이더 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingKind {
    Gemini,
    Ollama,
}

impl FromStr for EmbeddingKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => bail!("Unknown embedding provider: {other} (expected gemini or ollama)"),
        }
    }
}

/// 답변 재작성(생성 모델) 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriterKind {
    None,
    Gemini,
    Ollama,
}

impl FromStr for RewriterKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" | "off" => Ok(Self::None),
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => bail!("Unknown rewriter: {other} (expected none, gemini or ollama)"),
        }
    }
}

// ============================================================================
// Settings
// ============================================================================

/// 실행 설정
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub bind: SocketAddr,
    pub frontend_dir: PathBuf,
    pub chunk: ChunkConfig,
    pub top_k: usize,
    pub max_upload_bytes: usize,
    pub embedding: EmbeddingKind,
    pub gemini_api_key: Option<String>,
    pub gemini_dimension: usize,
    pub ollama_url: String,
    pub ollama_embed_model: String,
    pub ollama_model: String,
    pub rewriter: RewriterKind,
}

impl Settings {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 키 조회 함수로 설정 구성 (빈 값은 미설정으로 취급)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let gemini_api_key = get("GEMINI_API_KEY").or_else(|| get("GOOGLE_AI_API_KEY"));

        let embedding = match get("DOCQA_EMBEDDING_PROVIDER") {
            Some(v) => v.parse()?,
            None if gemini_api_key.is_some() => EmbeddingKind::Gemini,
            None => EmbeddingKind::Ollama,
        };

        let rewriter = match get("DOCQA_REWRITER") {
            Some(v) => v.parse()?,
            None => RewriterKind::None,
        };

        let size = parse_or(get("DOCQA_CHUNK_SIZE"), "DOCQA_CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        let overlap = parse_or(
            get("DOCQA_CHUNK_OVERLAP"),
            "DOCQA_CHUNK_OVERLAP",
            DEFAULT_CHUNK_OVERLAP,
        )?;
        let chunk = ChunkConfig::new(size, overlap).context("Invalid chunk configuration")?;

        let bind = get("DOCQA_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| anyhow!("Invalid DOCQA_BIND: {e}"))?;

        Ok(Self {
            data_dir: get("DOCQA_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(get_data_dir),
            bind,
            frontend_dir: get("DOCQA_FRONTEND_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("frontend")),
            chunk,
            top_k: parse_or(get("DOCQA_TOP_K"), "DOCQA_TOP_K", DEFAULT_TOP_K)?,
            max_upload_bytes: parse_or(
                get("DOCQA_MAX_UPLOAD_BYTES"),
                "DOCQA_MAX_UPLOAD_BYTES",
                DEFAULT_MAX_UPLOAD_BYTES,
            )?,
            embedding,
            gemini_api_key,
            gemini_dimension: parse_or(
                get("DOCQA_GEMINI_DIMENSION"),
                "DOCQA_GEMINI_DIMENSION",
                DEFAULT_GEMINI_DIMENSION,
            )?,
            ollama_url: get("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            ollama_embed_model: get("OLLAMA_EMBED_MODEL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_EMBED_MODEL.to_string()),
            ollama_model: get("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            rewriter,
        })
    }

    /// Gemini API 키 (없으면 오류)
    pub fn require_gemini_key(&self) -> Result<String> {
        match &self.gemini_api_key {
            Some(key) => Ok(key.clone()),
            None => get_api_key(),
        }
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {key} value {v:?}: {e}")),
        None => Ok(default),
    }
}

// ============================================================================
// Tests
// ============================================================================
