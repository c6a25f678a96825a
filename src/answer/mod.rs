//! 답변 구성 모듈
//!
//! 검색된 청크 텍스트를 빈 줄로 이어 붙인 결정적 답변이 기본입니다.
//! 생성 모델 재작성기가 설정되어 있으면 그 응답으로 대체하되,
//! 재작성 실패는 [`compose`] 에서 한 번 기록하고 버립니다.

mod gemini;
mod ollama;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::{RewriterKind, Settings};
use crate::knowledge::RankedChunk;

pub use gemini::GeminiRewriter;
pub use ollama::OllamaRewriter;

/// 결정적 답변의 청크 구분자
pub const PASSAGE_SEPARATOR: &str = "\n\n";

// ============================================================================
// Answer
// ============================================================================

/// 최종 답변
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// 검색 결과를 그대로 이어 붙인 답변
    Deterministic(String),
    /// 생성 모델이 재작성한 답변
    Enhanced { text: String, model: String },
}

impl Answer {
    pub fn text(&self) -> &str {
        match self {
            Answer::Deterministic(text) => text,
            Answer::Enhanced { text, .. } => text,
        }
    }

    pub fn is_enhanced(&self) -> bool {
        matches!(self, Answer::Enhanced { .. })
    }

    pub fn into_text(self) -> String {
        match self {
            Answer::Deterministic(text) => text,
            Answer::Enhanced { text, .. } => text,
        }
    }
}

// ============================================================================
// AnswerRewriter Trait
// ============================================================================

/// 생성 모델 기반 답변 재작성기
#[async_trait]
pub trait AnswerRewriter: Send + Sync {
    /// 질문과 검색된 본문으로 답변 생성
    async fn rewrite(&self, question: &str, passages: &[&str]) -> Result<String>;

    /// 모델 이름
    fn model(&self) -> &str;
}

// ============================================================================
// Composition
// ============================================================================

/// 결정적 답변: 청크 텍스트를 빈 줄로 연결
pub fn deterministic_answer(results: &[RankedChunk]) -> String {
    results
        .iter()
        .map(|r| r.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(PASSAGE_SEPARATOR)
}

/// 답변 구성
///
/// 재작성기가 없거나 실패하면(빈 응답 포함) 결정적 답변을 반환합니다.
pub async fn compose(
    question: &str,
    results: &[RankedChunk],
    rewriter: Option<&dyn AnswerRewriter>,
) -> Answer {
    let fallback = deterministic_answer(results);

    let Some(rewriter) = rewriter else {
        return Answer::Deterministic(fallback);
    };
    if results.is_empty() {
        return Answer::Deterministic(fallback);
    }

    let passages: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();

    match rewriter.rewrite(question, &passages).await {
        Ok(text) if !text.trim().is_empty() => Answer::Enhanced {
            text: text.trim().to_string(),
            model: rewriter.model().to_string(),
        },
        Ok(_) => {
            tracing::warn!(
                "Rewriter {} returned an empty answer, keeping retrieved passages",
                rewriter.model()
            );
            Answer::Deterministic(fallback)
        }
        Err(e) => {
            tracing::warn!(
                "Rewriter {} failed, keeping retrieved passages: {:#}",
                rewriter.model(),
                e
            );
            Answer::Deterministic(fallback)
        }
    }
}

/// 재작성 프롬프트 구성
pub fn build_prompt(question: &str, passages: &[&str]) -> String {
    let mut prompt = String::from(
        "Answer the question using only the passages below. \
         If the passages do not contain the answer, say so briefly.\n\n",
    );

    for (i, passage) in passages.iter().enumerate() {
        prompt.push_str(&format!("[Passage {}]\n{}\n\n", i + 1, passage));
    }

    prompt.push_str(&format!("Question: {}\nAnswer:", question));
    prompt
}

// ============================================================================
// Factory Function
// ============================================================================

/// 설정에 따라 재작성기 생성 (`none` 이면 None)
pub fn create_rewriter(settings: &Settings) -> Result<Option<Arc<dyn AnswerRewriter>>> {
    let rewriter: Arc<dyn AnswerRewriter> = match settings.rewriter {
        RewriterKind::None => return Ok(None),
        RewriterKind::Gemini => Arc::new(GeminiRewriter::new(settings.require_gemini_key()?)?),
        RewriterKind::Ollama => Arc::new(OllamaRewriter::new(
            &settings.ollama_url,
            &settings.ollama_model,
        )?),
    };

    tracing::info!("Answer rewriting enabled with {}", rewriter.model());
    Ok(Some(rewriter))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::Chunk;

    struct FixedRewriter(Result<String, String>);

    #[async_trait]
    impl AnswerRewriter for FixedRewriter {
        async fn rewrite(&self, _question: &str, _passages: &[&str]) -> Result<String> {
            self.0.clone().map_err(|e| anyhow::anyhow!(e))
        }

        fn model(&self) -> &str {
            "fixed"
        }
    }

    fn results(texts: &[&str]) -> Vec<RankedChunk> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| RankedChunk {
                score: 1.0 - i as f32 * 0.1,
                chunk: Chunk::new(*t, "cv.pdf", i),
            })
            .collect()
    }

    #[test]
    fn test_deterministic_answer_joins_verbatim() {
        let r = results(&["  first ", "second\nline", "third"]);
        assert_eq!(deterministic_answer(&r), "  first \n\nsecond\nline\n\nthird");
        assert_eq!(deterministic_answer(&[]), "");
    }

    #[tokio::test]
    async fn test_compose_without_rewriter() {
        let r = results(&["a", "b"]);
        let answer = compose("q", &r, None).await;
        assert_eq!(answer, Answer::Deterministic("a\n\nb".to_string()));
        assert!(!answer.is_enhanced());
    }

    #[tokio::test]
    async fn test_compose_enhanced() {
        let r = results(&["a", "b"]);
        let rewriter = FixedRewriter(Ok(" He studied at FAST. ".to_string()));
        let answer = compose("q", &r, Some(&rewriter)).await;
        assert_eq!(
            answer,
            Answer::Enhanced {
                text: "He studied at FAST.".to_string(),
                model: "fixed".to_string()
            }
        );
        assert_eq!(answer.text(), "He studied at FAST.");
    }

    #[tokio::test]
    async fn test_compose_falls_back_on_error() {
        let r = results(&["a", "b"]);
        let rewriter = FixedRewriter(Err("service unavailable".to_string()));
        let answer = compose("q", &r, Some(&rewriter)).await;
        assert_eq!(answer.into_text(), "a\n\nb");
    }

    #[tokio::test]
    async fn test_compose_falls_back_on_empty() {
        let r = results(&["a"]);
        let rewriter = FixedRewriter(Ok("   ".to_string()));
        let answer = compose("q", &r, Some(&rewriter)).await;
        assert_eq!(answer, Answer::Deterministic("a".to_string()));
    }

    #[test]
    fn test_build_prompt() {
        let prompt = build_prompt("Where?", &["p1", "p2"]);
        assert!(prompt.contains("[Passage 1]\np1"));
        assert!(prompt.contains("[Passage 2]\np2"));
        assert!(prompt.ends_with("Question: Where?\nAnswer:"));
    }

    #[test]
    fn test_create_rewriter_none() {
        let settings = Settings::from_lookup(|_| None).unwrap();
        assert!(create_rewriter(&settings).unwrap().is_none());
    }
}
