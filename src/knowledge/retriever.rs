//! Retriever - 코사인 유사도 기반 Top-k 검색
//!
//! 질의 벡터와 저장된 모든 벡터를 L2 정규화한 뒤 내적으로 점수를 매기고,
//! 점수 내림차순으로 정렬합니다. 정렬은 안정 정렬이므로 동점이면
//! 먼저 수집된 청크가 앞에 옵니다.

use serde::Serialize;
use thiserror::Error;

use super::store::{Chunk, ChunkStore};
use super::vector::{dot, l2_normalize};

/// 기본 결과 수
pub const DEFAULT_TOP_K: usize = 3;

// ============================================================================
// Types
// ============================================================================

/// 검색 결과 (점수 + 청크)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedChunk {
    /// 코사인 유사도 (-1.0 ~ 1.0)
    pub score: f32,
    pub chunk: Chunk,
}

/// 검색 오류
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetrievalError {
    /// 아직 수집된 문서가 없음 ("결과 없음"과 구분)
    #[error("No documents ingested yet. Call /ingest first.")]
    EmptyStore,

    #[error("query vector has dimension {query}, stored vectors have {stored}")]
    DimensionMismatch { query: usize, stored: usize },
}

// ============================================================================
// Ranking
// ============================================================================

/// 질의 벡터와 유사한 청크를 최대 `top_k` 개 반환
///
/// 결과 길이는 `top_k` 와 저장된 청크 수를 넘지 않습니다.
pub fn rank(
    query: &[f32],
    store: &ChunkStore,
    top_k: usize,
) -> Result<Vec<RankedChunk>, RetrievalError> {
    let (chunks, vectors) = store.all();

    if chunks.is_empty() {
        return Err(RetrievalError::EmptyStore);
    }

    if let Some(stored) = store.dimension() {
        if stored != query.len() {
            return Err(RetrievalError::DimensionMismatch {
                query: query.len(),
                stored,
            });
        }
    }

    let query = l2_normalize(query);

    let mut scored: Vec<(usize, f32)> = vectors
        .iter()
        .enumerate()
        .map(|(i, v)| (i, dot(&query, &l2_normalize(v))))
        .collect();

    // sort_by는 안정 정렬: 동점은 삽입 순서 유지
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(top_k);

    tracing::debug!(
        "Ranked {} stored chunks, returning {}",
        chunks.len(),
        scored.len()
    );

    Ok(scored
        .into_iter()
        .map(|(i, score)| RankedChunk {
            score,
            chunk: chunks[i].clone(),
        })
        .collect())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with(vectors: Vec<Vec<f32>>) -> (TempDir, ChunkStore) {
        let dir = TempDir::new().unwrap();
        let mut store = ChunkStore::open(dir.path()).unwrap();
        let chunks = (0..vectors.len())
            .map(|i| Chunk::new(format!("c{i}"), "test", i))
            .collect();
        store.append(chunks, vectors).unwrap();
        (dir, store)
    }

    fn texts(results: &[RankedChunk]) -> Vec<&str> {
        results.iter().map(|r| r.chunk.text.as_str()).collect()
    }

    #[test]
    fn test_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::open(dir.path()).unwrap();
        assert_eq!(rank(&[1.0, 0.0], &store, 3), Err(RetrievalError::EmptyStore));
    }

    #[test]
    fn test_rank_descending() {
        let (_dir, store) = store_with(vec![
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![-1.0, 0.0],
        ]);

        let results = rank(&[1.0, 0.0], &store, 4).unwrap();
        assert_eq!(texts(&results), vec!["c1", "c2", "c0", "c3"]);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        assert!((results[0].score - 1.0).abs() < 1e-5);
        assert!((results[3].score + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_scale_invariant() {
        let (_dir, store) = store_with(vec![vec![10.0, 0.0], vec![0.0, 0.1]]);
        let results = rank(&[0.001, 0.0], &store, 2).unwrap();
        assert_eq!(texts(&results), vec!["c0", "c1"]);
        assert!((results[0].score - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let (_dir, store) = store_with(vec![
            vec![0.0, 1.0],
            vec![2.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 3.0],
            vec![5.0, 0.0],
        ]);

        let results = rank(&[1.0, 0.0], &store, 5).unwrap();
        assert_eq!(texts(&results), vec!["c1", "c2", "c4", "c0", "c3"]);
    }

    #[test]
    fn test_top_k_bounds() {
        let (_dir, store) = store_with(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]);

        assert_eq!(rank(&[1.0, 0.0], &store, 2).unwrap().len(), 2);
        assert_eq!(rank(&[1.0, 0.0], &store, 20).unwrap().len(), 3);
        assert!(rank(&[1.0, 0.0], &store, 0).unwrap().is_empty());
    }

    #[test]
    fn test_zero_query_vector() {
        let (_dir, store) = store_with(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let results = rank(&[0.0, 0.0], &store, 2).unwrap();
        assert!(results.iter().all(|r| r.score == 0.0));
        assert_eq!(texts(&results), vec!["c0", "c1"]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let (_dir, store) = store_with(vec![vec![1.0, 0.0, 0.0]]);
        assert_eq!(
            rank(&[1.0, 0.0], &store, 1),
            Err(RetrievalError::DimensionMismatch { query: 2, stored: 3 })
        );
    }
}
