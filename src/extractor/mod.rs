//! 콘텐츠 추출 모듈
//!
//! 업로드된 파일 바이트에서 텍스트를 추출합니다.
//! - 텍스트 파일: UTF-8 디코딩 (잘못된 바이트는 버림)
//! - PDF 파일: 페이지 텍스트 추출 후 빈 줄로 연결, 실패 시 텍스트로 디코딩

pub mod pdf;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

// ============================================================================
// Document Kind
// ============================================================================

/// 지원하는 문서 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// 텍스트 파일
    Text,
    /// PDF 파일
    Pdf,
}

impl DocumentKind {
    /// 파일 이름 확장자로 타입 결정 (`.pdf` 외에는 텍스트)
    pub fn from_file_name(name: &str) -> Self {
        if name.to_lowercase().ends_with(".pdf") {
            DocumentKind::Pdf
        } else {
            DocumentKind::Text
        }
    }
}

// ============================================================================
// Extracted Document
// ============================================================================

/// 추출된 문서
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// 추출된 텍스트
    pub text: String,
    /// 원본 파일 타입
    pub kind: DocumentKind,
    /// PDF 페이지 수 (PDF로 추출된 경우)
    pub pages: Option<usize>,
}

/// 파일 바이트에서 텍스트 추출
///
/// PDF 추출은 CPU 바운드이므로 `spawn_blocking` 에서 실행합니다.
pub async fn extract_document(file_name: &str, bytes: Vec<u8>) -> Result<ExtractedDocument> {
    let kind = DocumentKind::from_file_name(file_name);

    if kind == DocumentKind::Text {
        return Ok(ExtractedDocument {
            text: decode_text(&bytes),
            kind,
            pages: None,
        });
    }

    extract_pdf_with(file_name, bytes, pdf::extract_pages).await
}

/// PDF 추출기를 blocking 스레드에서 실행
///
/// 추출기가 오류를 반환하거나 패닉하면 바이트를 텍스트로 디코딩합니다.
async fn extract_pdf_with<F>(file_name: &str, bytes: Vec<u8>, extract: F) -> Result<ExtractedDocument>
where
    F: FnOnce(&[u8]) -> Result<Vec<String>> + Send + 'static,
{
    let bytes = Arc::new(bytes);
    let task_bytes = Arc::clone(&bytes);

    let failure = match tokio::task::spawn_blocking(move || extract(task_bytes.as_slice())).await {
        Ok(Ok(pages)) => {
            return Ok(ExtractedDocument {
                text: pdf::join_pages(&pages),
                kind: DocumentKind::Pdf,
                pages: Some(pages.len()),
            });
        }
        Ok(Err(e)) => format!("{e:#}"),
        Err(e) if e.is_panic() => "PDF decoder panicked".to_string(),
        Err(e) => return Err(e).context("PDF extraction task failed"),
    };

    tracing::warn!(
        "PDF extraction failed for {}, decoding as text: {}",
        file_name,
        failure
    );
    Ok(ExtractedDocument {
        text: decode_text(&bytes),
        kind: DocumentKind::Pdf,
        pages: None,
    })
}

/// 로컬 파일을 읽어 텍스트 추출
///
/// 반환값의 첫 요소는 출처로 쓰일 파일 이름입니다.
pub async fn read_document(path: &Path) -> Result<(String, ExtractedDocument)> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read file: {:?}", path))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    let doc = extract_document(&file_name, bytes).await?;
    Ok((file_name, doc))
}

/// UTF-8 디코딩, 잘못된 바이트 시퀀스는 제거
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => String::from_utf8_lossy(bytes).replace(char::REPLACEMENT_CHARACTER, ""),
    }
}

// ============================================================================
// Tests
// ============================================================================
