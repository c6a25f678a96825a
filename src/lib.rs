//! docqa-rag - 문서 질의응답 서비스
//!
//! 텍스트/PDF 문서를 고정 크기 청크로 나눠 임베딩하고, 플랫 파일 스냅샷에
//! 저장한 뒤 코사인 유사도로 가장 가까운 청크를 찾아 답변합니다.
//! 생성 모델 재작성은 선택 사항이며 실패해도 검색 결과 답변을 유지합니다.

pub mod answer;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod extractor;
pub mod knowledge;
pub mod server;

// Re-exports
pub use answer::{compose, deterministic_answer, Answer, AnswerRewriter};
pub use config::{EmbeddingKind, RewriterKind, Settings};
pub use embedding::{get_api_key, EmbeddingProvider, GeminiEmbedding, OllamaEmbedding};
pub use knowledge::{
    chunk_text, get_data_dir, rank, Chunk, ChunkConfig, ChunkStore, Chunker, PipelineError,
    PipelineStatus, QaPipeline, QueryOutcome, RankedChunk, RetrievalError, StoreError,
    StoreStats, Vector, WindowChunker,
};
