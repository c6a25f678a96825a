//! Chunk Store - 플랫 파일 스냅샷 기반 청크/벡터 저장소
//!
//! 청크 목록과 병렬 벡터 목록을 메모리에 보관하고, 변경될 때마다
//! 데이터 디렉토리의 스냅샷 파일로 저장합니다.
//!
//! - `chunks.json`: 청크 메타데이터 (JSON 배열)
//! - `vectors.bin`: 임베딩 벡터 (바이너리, [`super::vector`] 포맷)
//!
//! 저장 위치: ~/.docqa-rag/ (기본값)

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::vector::{decode_vectors, encode_vectors, Vector};

const CHUNKS_FILE: &str = "chunks.json";
const VECTORS_FILE: &str = "vectors.bin";

// ============================================================================
// Data Directory
// ============================================================================

/// 데이터 디렉토리 경로 (~/.docqa-rag/)
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".docqa-rag")
}

// ============================================================================
// Types
// ============================================================================

/// 저장된 청크
///
/// 수집 시점에 생성되며 이후 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// 고유 ID (UUID v4)
    pub id: String,
    /// 청크 텍스트
    pub text: String,
    /// 원본 문서 이름
    pub source: String,
    /// 원본 문서 내 위치 (0-based)
    pub index: usize,
}

impl Chunk {
    /// 새 ID로 청크 생성
    pub fn new(text: impl Into<String>, source: impl Into<String>, index: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            source: source.into(),
            index,
        }
    }
}

/// 저장소 통계
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub chunk_count: usize,
    pub dimension: Option<usize>,
    pub data_dir: PathBuf,
}

/// 저장소 오류
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("chunk/vector count mismatch: {chunks} chunks, {vectors} vectors")]
    LengthMismatch { chunks: usize, vectors: usize },

    #[error("vector dimension {actual} does not match store dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("empty vectors cannot be stored")]
    EmptyVector,

    #[error("corrupted snapshot {}: {reason}", .path.display())]
    Corrupted { path: PathBuf, reason: String },

    #[error("store I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn corrupted(path: &Path, reason: impl ToString) -> Self {
        Self::Corrupted {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

// ============================================================================
// ChunkStore
// ============================================================================

/// 청크 + 벡터 저장소
///
/// `chunks[i]` 와 `vectors[i]` 는 항상 짝을 이룹니다.
#[derive(Debug)]
pub struct ChunkStore {
    data_dir: PathBuf,
    chunks: Vec<Chunk>,
    vectors: Vec<Vector>,
}

impl ChunkStore {
    /// 저장소 열기 (디렉토리가 없으면 생성)
    ///
    /// 스냅샷이 손상되었으면 오류를 기록하고 빈 저장소로 시작합니다.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir).map_err(|e| StoreError::io(data_dir, e))?;

        let mut store = Self {
            data_dir: data_dir.to_path_buf(),
            chunks: Vec::new(),
            vectors: Vec::new(),
        };

        match store.load() {
            Ok(()) => {
                tracing::debug!(
                    "Chunk store opened at {:?} ({} chunks)",
                    store.data_dir,
                    store.len()
                );
            }
            Err(e) => {
                tracing::error!("Failed to load snapshot, starting with an empty store: {}", e);
            }
        }

        Ok(store)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn chunks_path(&self) -> PathBuf {
        self.data_dir.join(CHUNKS_FILE)
    }

    pub fn vectors_path(&self) -> PathBuf {
        self.data_dir.join(VECTORS_FILE)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// 저장된 벡터 차원 (비어 있으면 None)
    pub fn dimension(&self) -> Option<usize> {
        self.vectors.first().map(Vec::len)
    }

    /// 현재 청크/벡터 뷰
    pub fn all(&self) -> (&[Chunk], &[Vector]) {
        (&self.chunks, &self.vectors)
    }

    /// 청크와 벡터를 위치 순서대로 추가 후 저장
    ///
    /// 검증 또는 저장에 실패하면 메모리 상태는 변경되지 않습니다.
    pub fn append(&mut self, chunks: Vec<Chunk>, vectors: Vec<Vector>) -> Result<usize, StoreError> {
        if chunks.len() != vectors.len() {
            return Err(StoreError::LengthMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }

        if vectors.iter().any(Vec::is_empty) {
            return Err(StoreError::EmptyVector);
        }

        if let Some(expected) = self.dimension().or_else(|| vectors.first().map(Vec::len)) {
            if let Some(v) = vectors.iter().find(|v| v.len() != expected) {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    actual: v.len(),
                });
            }
        }

        let added = chunks.len();
        let previous = self.len();
        self.chunks.extend(chunks);
        self.vectors.extend(vectors);

        if let Err(e) = self.save() {
            self.chunks.truncate(previous);
            self.vectors.truncate(previous);
            // 디스크를 직전 상태로 되돌림
            if let Err(restore) = self.save() {
                tracing::error!("Failed to restore snapshot after append error: {}", restore);
            }
            return Err(e);
        }

        tracing::info!("Appended {} chunks (total={})", added, self.len());
        Ok(added)
    }

    /// 전체 초기화 (스냅샷 파일 삭제)
    ///
    /// 파일 삭제에 실패하면 메모리 상태는 그대로 둡니다.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        for path in [self.chunks_path(), self.vectors_path()] {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::io(&path, e)),
            }
        }

        self.chunks.clear();
        self.vectors.clear();

        tracing::info!("Chunk store reset at {:?}", self.data_dir);
        Ok(())
    }

    /// 스냅샷 파일에서 로드
    ///
    /// 파일이 없으면 빈 저장소입니다. 실패하면 메모리 상태를 비우고 오류를 반환합니다.
    pub fn load(&mut self) -> Result<(), StoreError> {
        self.chunks.clear();
        self.vectors.clear();

        let chunks = self.read_chunks()?;
        let vectors = self.read_vectors()?;

        if chunks.len() != vectors.len() {
            return Err(StoreError::corrupted(
                &self.data_dir,
                format!("{} chunks but {} vectors", chunks.len(), vectors.len()),
            ));
        }

        self.chunks = chunks;
        self.vectors = vectors;
        Ok(())
    }

    /// 스냅샷 파일로 저장
    ///
    /// 두 임시 파일을 모두 기록한 뒤에만 rename 하므로, 기록 실패 시
    /// 기존 스냅샷 쌍은 그대로 남습니다.
    pub fn save(&self) -> Result<(), StoreError> {
        let chunks_path = self.chunks_path();
        let vectors_path = self.vectors_path();
        let bytes = encode_vectors(&self.vectors)
            .map_err(|e| StoreError::corrupted(&vectors_path, e))?;

        let chunks_tmp = write_tmp(&chunks_path, |w| {
            serde_json::to_writer(&mut *w, &self.chunks).map_err(std::io::Error::from)
        })?;
        let vectors_tmp = match write_tmp(&vectors_path, |w| w.write_all(&bytes)) {
            Ok(tmp) => tmp,
            Err(e) => {
                discard_tmp(&chunks_tmp);
                return Err(e);
            }
        };

        if let Err(e) = std::fs::rename(&vectors_tmp, &vectors_path) {
            discard_tmp(&chunks_tmp);
            discard_tmp(&vectors_tmp);
            return Err(StoreError::io(&vectors_path, e));
        }
        if let Err(e) = std::fs::rename(&chunks_tmp, &chunks_path) {
            discard_tmp(&chunks_tmp);
            return Err(StoreError::io(&chunks_path, e));
        }

        tracing::debug!("Saved snapshot ({} chunks) to {:?}", self.len(), self.data_dir);
        Ok(())
    }

    /// 저장소 통계
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            chunk_count: self.len(),
            dimension: self.dimension(),
            data_dir: self.data_dir.clone(),
        }
    }

    fn read_chunks(&self) -> Result<Vec<Chunk>, StoreError> {
        let path = self.chunks_path();
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        serde_json::from_reader(BufReader::new(file)).map_err(|e| StoreError::corrupted(&path, e))
    }

    fn read_vectors(&self) -> Result<Vec<Vector>, StoreError> {
        let path = self.vectors_path();
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        decode_vectors(&bytes).map_err(|e| StoreError::corrupted(&path, e))
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// `path.tmp` 에 기록하고 임시 파일 경로 반환
fn write_tmp<F>(path: &Path, write: F) -> Result<PathBuf, StoreError>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let tmp_path = path.with_extension("tmp");

    let file = File::create(&tmp_path).map_err(|e| StoreError::io(&tmp_path, e))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer).map_err(|e| StoreError::io(&tmp_path, e))?;
    writer.flush().map_err(|e| StoreError::io(&tmp_path, e))?;

    Ok(tmp_path)
}

fn discard_tmp(tmp_path: &Path) {
    if let Err(e) = std::fs::remove_file(tmp_path) {
        tracing::debug!("Could not remove {:?}: {}", tmp_path, e);
    }
}

// ============================================================================
// Tests
// ============================================================================
