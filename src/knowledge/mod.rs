//! Knowledge 모듈 - 문서 질의응답용 검색 코어
//!
//! - Chunker: 고정 크기 겹침 윈도우로 텍스트 분할
//! - Vector: L2 정규화/내적 + 바이너리 스냅샷 포맷
//! - Store: 청크 + 벡터 저장소 (플랫 파일 스냅샷)
//! - Retriever: 코사인 유사도 Top-k 검색
//! - Pipeline: 수집/질의 흐름 (Chunker → Embedding → Store, Embedding → Retriever → Answer)

mod chunker;
mod pipeline;
mod retriever;
mod store;
mod vector;

// Re-exports
pub use chunker::{
    chunk_text, ChunkConfig, ChunkError, Chunker, WindowChunker, DEFAULT_CHUNK_OVERLAP,
    DEFAULT_CHUNK_SIZE,
};
pub use pipeline::{PipelineError, PipelineStatus, QaPipeline, QueryOutcome, RAW_TEXT_SOURCE};
pub use retriever::{rank, RankedChunk, RetrievalError, DEFAULT_TOP_K};
pub use store::{get_data_dir, Chunk, ChunkStore, StoreError, StoreStats};
pub use vector::{
    cosine_similarity, decode_vectors, dot, encode_vectors, l2_normalize, Vector,
    VectorCodecError, NORM_EPSILON,
};
