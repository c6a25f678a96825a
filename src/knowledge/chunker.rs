//! Text Chunking Module
//!
//! 고정 크기 슬라이딩 윈도우로 텍스트를 분할합니다.
//! 윈도우는 문자(Unicode scalar) 단위이며, `size - overlap` 만큼씩 전진합니다.

use thiserror::Error;

/// 기본 윈도우 크기 (문자 수)
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// 기본 오버랩 크기 (문자 수)
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정 오류
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk size must be greater than zero")]
    ZeroSize,

    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

/// 청킹 설정
///
/// `overlap < size` 가 생성 시점에 검증되므로 윈도우는 항상 전진합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    size: usize,
    overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkConfig {
    /// 검증된 설정 생성
    pub fn new(size: usize, overlap: usize) -> Result<Self, ChunkError> {
        if size == 0 {
            return Err(ChunkError::ZeroSize);
        }
        if overlap >= size {
            return Err(ChunkError::OverlapTooLarge { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    /// 윈도우 크기
    pub fn size(&self) -> usize {
        self.size
    }

    /// 오버랩 크기
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// 윈도우 전진 폭 (항상 1 이상)
    pub fn step(&self) -> usize {
        self.size - self.overlap
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str) -> Vec<String>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// WindowChunker
// ============================================================================

/// 슬라이딩 윈도우 청커
///
/// 1. `\r` 을 공백으로 치환
/// 2. `size` 문자 윈도우를 `size - overlap` 씩 이동
/// 3. 각 윈도우 앞뒤 공백 제거, 빈 윈도우는 버림
pub struct WindowChunker {
    config: ChunkConfig,
}

impl WindowChunker {
    /// 설정으로 생성
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// 기본 설정(500/50)으로 생성
    pub fn with_defaults() -> Self {
        Self::new(ChunkConfig::default())
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// 트림 전 원본 윈도우 목록
    fn windows(&self, text: &str) -> Vec<String> {
        let normalized = normalize_line_endings(text);
        let chars: Vec<char> = normalized.chars().collect();
        let step = self.config.step();

        let mut windows = Vec::with_capacity(chars.len() / step + 1);
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.config.size).min(chars.len());
            windows.push(chars[start..end].iter().collect());
            start += step;
        }

        windows
    }
}

impl Chunker for WindowChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        self.windows(text)
            .into_iter()
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty())
            .collect()
    }

    fn name(&self) -> &'static str {
        "WindowChunker"
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 캐리지 리턴을 공백으로 치환
#[inline]
fn normalize_line_endings(text: &str) -> String {
    text.replace('\r', " ")
}

/// 기본 설정으로 텍스트 분할
pub fn chunk_text(text: &str) -> Vec<String> {
    WindowChunker::with_defaults().chunk(text)
}

// ============================================================================
// Tests
// ============================================================================
