//! 질의응답 파이프라인 - 수집/검색/답변 흐름
//!
//! 수집: 텍스트 → 청킹 → 배치 임베딩 → 저장소 추가
//! 질의: 질문 임베딩 → 코사인 Top-k → 답변 구성
//!
//! 저장소는 `RwLock` 뒤에 있으므로 수집은 직렬화되고 질의는 동시에 읽을 수 있습니다.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

use anyhow::Context;

use crate::answer::{compose, create_rewriter, Answer, AnswerRewriter};
use crate::config::Settings;
use crate::embedding::{create_embedder, EmbeddingProvider};

use super::chunker::{ChunkConfig, Chunker, WindowChunker};
use super::retriever::{rank, RankedChunk, RetrievalError};
use super::store::{Chunk, ChunkStore, StoreError};

/// 원시 텍스트 수집 시 출처 이름
pub const RAW_TEXT_SOURCE: &str = "raw_text";

// ============================================================================
// Types
// ============================================================================

/// 파이프라인 오류
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 임베딩 서비스 실패 (요청 전체 실패)
    #[error("embedding failed: {0:#}")]
    Embedding(anyhow::Error),

    #[error("embedding returned {vectors} vectors for {chunks} chunks")]
    EmbeddingCount { chunks: usize, vectors: usize },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
}

/// 질의 결과
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub answer: Answer,
    pub results: Vec<RankedChunk>,
}

/// 수집 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PipelineStatus {
    pub ingested: bool,
    pub chunks: usize,
}

// ============================================================================
// QaPipeline
// ============================================================================

/// 문서 질의응답 파이프라인
///
/// 임베딩 프로바이더와 재작성기는 시작 시 한 번 생성되어 주입됩니다.
pub struct QaPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    rewriter: Option<Arc<dyn AnswerRewriter>>,
    chunker: WindowChunker,
    store: RwLock<ChunkStore>,
}

impl QaPipeline {
    pub fn new(
        store: ChunkStore,
        embedder: Arc<dyn EmbeddingProvider>,
        rewriter: Option<Arc<dyn AnswerRewriter>>,
        chunk: ChunkConfig,
    ) -> Self {
        Self {
            embedder,
            rewriter,
            chunker: WindowChunker::new(chunk),
            store: RwLock::new(store),
        }
    }

    /// 설정으로 저장소, 임베딩 프로바이더, 재작성기를 구성
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let store = ChunkStore::open(&settings.data_dir).context("Failed to open chunk store")?;
        let embedder = create_embedder(settings)?;
        let rewriter = create_rewriter(settings)?;
        Ok(Self::new(store, embedder, rewriter, settings.chunk))
    }

    /// 임베딩 프로바이더 이름
    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }

    /// 재작성 모델 이름 (비활성화면 None)
    pub fn rewriter_model(&self) -> Option<&str> {
        self.rewriter.as_deref().map(|r| r.model())
    }

    /// 텍스트 수집
    ///
    /// 청크가 하나도 없으면 임베딩 호출 없이 0을 반환합니다.
    pub async fn ingest(&self, text: &str, source: &str) -> Result<usize, PipelineError> {
        let pieces = self.chunker.chunk(text);
        if pieces.is_empty() {
            tracing::warn!("No chunks generated for source: {}", source);
            return Ok(0);
        }

        let vectors = self
            .embedder
            .embed_documents(&pieces)
            .await
            .map_err(PipelineError::Embedding)?;

        if vectors.len() != pieces.len() {
            return Err(PipelineError::EmbeddingCount {
                chunks: pieces.len(),
                vectors: vectors.len(),
            });
        }

        let chunks: Vec<Chunk> = pieces
            .into_iter()
            .enumerate()
            .map(|(i, text)| Chunk::new(text, source, i))
            .collect();

        let added = self.store.write().await.append(chunks, vectors)?;

        tracing::info!("Ingested {} (chunks={})", source, added);
        Ok(added)
    }

    /// 질문에 대한 답변과 검색 결과
    ///
    /// 저장소가 비어 있으면 임베딩 호출 전에 [`RetrievalError::EmptyStore`] 로 실패합니다.
    pub async fn query(&self, question: &str, top_k: usize) -> Result<QueryOutcome, PipelineError> {
        if self.store.read().await.is_empty() {
            return Err(RetrievalError::EmptyStore.into());
        }

        let query_vector = self
            .embedder
            .embed_query(question)
            .await
            .map_err(PipelineError::Embedding)?;

        let results = {
            let store = self.store.read().await;
            rank(&query_vector, &store, top_k)?
        };

        tracing::debug!("Query {:?} matched {} chunks", question, results.len());

        let answer = compose(question, &results, self.rewriter.as_deref()).await;
        Ok(QueryOutcome { answer, results })
    }

    /// 저장소 초기화
    pub async fn reset(&self) -> Result<(), PipelineError> {
        self.store.write().await.reset()?;
        Ok(())
    }

    /// 수집 상태
    pub async fn status(&self) -> PipelineStatus {
        let store = self.store.read().await;
        PipelineStatus {
            ingested: !store.is_empty(),
            chunks: store.len(),
        }
    }

    /// 저장소가 비어 있으면 시드 문서 수집
    ///
    /// 실패는 기록만 하고 무시합니다. 수집된 청크 수를 반환합니다.
    pub async fn seed_if_empty(&self, path: &Path) -> usize {
        if !self.store.read().await.is_empty() {
            tracing::debug!("Store already populated, skipping seed {:?}", path);
            return 0;
        }

        let (source, doc) = match crate::extractor::read_document(path).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Seed document {:?} not loaded: {:#}", path, e);
                return 0;
            }
        };

        match self.ingest(&doc.text, &source).await {
            Ok(added) => {
                tracing::info!("Auto-ingested seed {:?}: {} chunks", path, added);
                added
            }
            Err(e) => {
                tracing::warn!("Seed ingest failed for {:?}: {}", path, e);
                0
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
