//! Vector - 벡터 연산 및 바이너리 스냅샷 코덱
//!
//! 코사인 유사도 계산과 `vectors.bin` 스냅샷 포맷을 담당합니다.
//!
//! 포맷 (little-endian):
//! ```text
//! magic "DQAV" | version u32 | count u32 | dimension u32 | count * dimension * f32
//! ```

use thiserror::Error;

/// 임베딩 벡터
pub type Vector = Vec<f32>;

/// L2 정규화 분모 안정화 상수 (영벡터 나눗셈 방지)
pub const NORM_EPSILON: f32 = 1e-10;

const SNAPSHOT_MAGIC: &[u8; 4] = b"DQAV";
const SNAPSHOT_VERSION: u32 = 1;
const HEADER_LEN: usize = 16;

// ============================================================================
// Math
// ============================================================================

/// L2 노름
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// L2 정규화 (`v / (||v|| + eps)`)
///
/// 영벡터는 영벡터로 남습니다.
pub fn l2_normalize(v: &[f32]) -> Vector {
    let denom = l2_norm(v) + NORM_EPSILON;
    v.iter().map(|x| x / denom).collect()
}

/// 내적
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// 코사인 유사도 계산
///
/// 결과는 -1.0 ~ 1.0 범위입니다. 길이가 다르거나 비어 있으면 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    dot(&l2_normalize(a), &l2_normalize(b))
}

// ============================================================================
// Snapshot Codec
// ============================================================================

/// 벡터 스냅샷 디코딩 오류
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VectorCodecError {
    #[error("vector snapshot too short ({0} bytes)")]
    Truncated(usize),

    #[error("bad vector snapshot magic")]
    BadMagic,

    #[error("unsupported vector snapshot version {0}")]
    UnsupportedVersion(u32),

    #[error("vector snapshot payload is {actual} bytes, header expects {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("vector {index} has dimension {actual}, expected {expected}")]
    RaggedVectors {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("vector snapshot holds {0} zero-dimension vectors")]
    ZeroDimension(usize),

    #[error("vector snapshot exceeds format limits")]
    TooLarge,
}

/// 벡터 목록을 바이너리 스냅샷으로 인코딩
///
/// 모든 벡터는 같은 차원이어야 합니다.
pub fn encode_vectors(vectors: &[Vector]) -> Result<Vec<u8>, VectorCodecError> {
    let dimension = vectors.first().map(Vec::len).unwrap_or(0);

    if let Some((index, v)) = vectors
        .iter()
        .enumerate()
        .find(|(_, v)| v.len() != dimension)
    {
        return Err(VectorCodecError::RaggedVectors {
            index,
            expected: dimension,
            actual: v.len(),
        });
    }

    if dimension == 0 && !vectors.is_empty() {
        return Err(VectorCodecError::ZeroDimension(vectors.len()));
    }

    let count = u32::try_from(vectors.len()).map_err(|_| VectorCodecError::TooLarge)?;
    let dim = u32::try_from(dimension).map_err(|_| VectorCodecError::TooLarge)?;

    let mut buffer = Vec::with_capacity(HEADER_LEN + vectors.len() * dimension * 4);
    buffer.extend_from_slice(SNAPSHOT_MAGIC);
    buffer.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
    buffer.extend_from_slice(&count.to_le_bytes());
    buffer.extend_from_slice(&dim.to_le_bytes());

    for value in vectors.iter().flatten() {
        buffer.extend_from_slice(&value.to_le_bytes());
    }

    Ok(buffer)
}

/// 바이너리 스냅샷을 벡터 목록으로 디코딩
pub fn decode_vectors(bytes: &[u8]) -> Result<Vec<Vector>, VectorCodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(VectorCodecError::Truncated(bytes.len()));
    }
    if &bytes[0..4] != SNAPSHOT_MAGIC {
        return Err(VectorCodecError::BadMagic);
    }

    let version = read_u32(bytes, 4);
    if version != SNAPSHOT_VERSION {
        return Err(VectorCodecError::UnsupportedVersion(version));
    }

    let count = read_u32(bytes, 8) as usize;
    let dimension = read_u32(bytes, 12) as usize;

    if dimension == 0 && count > 0 {
        return Err(VectorCodecError::ZeroDimension(count));
    }

    let payload = &bytes[HEADER_LEN..];
    let expected = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or(VectorCodecError::TooLarge)?;
    if payload.len() != expected {
        return Err(VectorCodecError::LengthMismatch {
            expected,
            actual: payload.len(),
        });
    }

    if count == 0 {
        return Ok(Vec::new());
    }

    Ok(payload
        .chunks_exact(dimension * 4)
        .map(|row| {
            row.chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()
        })
        .collect())
}

#[inline]
fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_same() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c) - 0.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = vec![1.0, 0.0, 0.0];
        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) - -1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_empty() {
        let a: Vec<f32> = vec![];
        let b: Vec<f32> = vec![];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_normalize_zero_vector() {
        let z = l2_normalize(&[0.0, 0.0, 0.0]);
        assert!(z.iter().all(|x| *x == 0.0 && x.is_finite()));
    }

    #[test]
    fn test_normalize_unit_length() {
        let n = l2_normalize(&[3.0, 4.0]);
        assert!((l2_norm(&n) - 1.0).abs() < 1e-6);
        assert!((n[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_codec_preserves_bits() {
        let vectors = vec![
            vec![0.1, -2.5e-30, f32::MAX, 1.0 / 3.0],
            vec![f32::MIN_POSITIVE, -0.0, 123_456.79, 7.0],
        ];
        let decoded = decode_vectors(&encode_vectors(&vectors).unwrap()).unwrap();

        assert_eq!(decoded.len(), 2);
        for (a, b) in vectors.iter().flatten().zip(decoded.iter().flatten()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_codec_empty() {
        let bytes = encode_vectors(&[]).unwrap();
        assert_eq!(bytes.len(), HEADER_LEN);
        assert!(decode_vectors(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_codec_rejects_ragged() {
        let err = encode_vectors(&[vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert_eq!(
            err,
            VectorCodecError::RaggedVectors {
                index: 1,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_decode_malformed() {
        assert_eq!(decode_vectors(b"DQ"), Err(VectorCodecError::Truncated(2)));
        assert_eq!(
            decode_vectors(b"NOPE\x01\0\0\0\0\0\0\0\0\0\0\0"),
            Err(VectorCodecError::BadMagic)
        );

        let mut bytes = encode_vectors(&[vec![1.0, 2.0]]).unwrap();
        bytes.pop();
        assert!(matches!(
            decode_vectors(&bytes),
            Err(VectorCodecError::LengthMismatch { expected: 8, actual: 7 })
        ));

        let mut bytes = encode_vectors(&[vec![1.0]]).unwrap();
        bytes[4] = 9;
        assert_eq!(
            decode_vectors(&bytes),
            Err(VectorCodecError::UnsupportedVersion(9))
        );
    }

    #[test]
    fn test_decode_zero_dimension_header() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(SNAPSHOT_MAGIC);
        bytes.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());

        assert_eq!(
            decode_vectors(&bytes),
            Err(VectorCodecError::ZeroDimension(u32::MAX as usize))
        );
    }

    #[test]
    fn test_encode_rejects_zero_dimension() {
        assert_eq!(
            encode_vectors(&[Vec::new(), Vec::new()]),
            Err(VectorCodecError::ZeroDimension(2))
        );
    }
}
