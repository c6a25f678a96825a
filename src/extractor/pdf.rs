//! PDF 텍스트 추출 모듈
//!
//! pdf-extract 크레이트로 PDF 바이트에서 페이지별 텍스트를 추출합니다.

use anyhow::{Context, Result};
use regex::Regex;

/// PDF에서 페이지별 텍스트 추출
///
/// 텍스트가 전혀 없으면 (스캔 문서 등) 빈 페이지 하나를 반환합니다.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>> {
    let text = pdf_extract::extract_text_from_mem(bytes).context("Failed to extract text from PDF")?;

    if text.trim().is_empty() {
        tracing::warn!("No text extracted from PDF. It might be a scanned document.");
        return Ok(vec![String::new()]);
    }

    Ok(split_pdf_pages(&text))
}

/// 페이지 텍스트를 빈 줄로 연결
pub fn join_pages(pages: &[String]) -> String {
    pages.join("\n\n")
}

/// PDF 텍스트를 페이지별로 분리
fn split_pdf_pages(text: &str) -> Vec<String> {
    // 폼피드 문자 (\x0c)로 페이지 분리 시도
    let pages: Vec<String> = text
        .split('\x0c')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if pages.len() > 1 {
        return pages;
    }

    // "--- Page 1 ---" 형태의 구분자
    if let Ok(page_pattern) =
        Regex::new(r"(?m)^[\s]*[-=]+[\s]*(?:Page[\s]*)?(\d+)[\s]*[-=]+[\s]*$")
    {
        let pages: Vec<String> = page_pattern
            .split(text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if pages.len() > 1 {
            return pages;
        }
    }

    vec![text.trim().to_string()]
}
