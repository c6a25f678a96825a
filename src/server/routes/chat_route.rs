//! POST /chat (alias POST /query) - 질문에 대한 Top-k 검색 + 답변

use std::sync::Arc;

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde::{Deserialize, Serialize};

use crate::knowledge::RankedChunk;
use crate::server::error::{AppError, AppResult};
use crate::server::AppState;

// ============================================================================
// DTOs
// ============================================================================

/// 질의 요청
///
/// 프론트엔드는 multipart 폼을 보내고, 스크립트는 JSON 또는 urlencoded 폼을 보냅니다.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    /// 없으면 서버 기본값
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ResultMeta {
    pub source: String,
    pub chunk_index: usize,
}

#[derive(Debug, Serialize)]
pub struct ResultItem {
    pub score: f32,
    pub text: String,
    pub meta: ResultMeta,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    /// 생성 모델 재작성 적용 여부
    pub enhanced: bool,
    pub results: Vec<ResultItem>,
}

impl From<RankedChunk> for ResultItem {
    fn from(ranked: RankedChunk) -> Self {
        Self {
            score: ranked.score,
            text: ranked.chunk.text,
            meta: ResultMeta {
                source: ranked.chunk.source,
                chunk_index: ranked.chunk.index,
            },
        }
    }
}

impl<S> FromRequest<S> for ChatRequest
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state).await?;
            return Self::from_multipart(multipart).await;
        }

        if content_type.starts_with("application/json") {
            let Json(body) = Json::<ChatRequest>::from_request(req, state).await?;
            return Ok(body);
        }

        let Form(body) = Form::<ChatRequest>::from_request(req, state).await?;
        Ok(body)
    }
}

impl ChatRequest {
    async fn from_multipart(mut multipart: Multipart) -> AppResult<Self> {
        let mut question = None;
        let mut top_k = None;

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some("question") => question = Some(field.text().await?),
                Some("top_k") => {
                    let raw = field.text().await?;
                    let raw = raw.trim();
                    if !raw.is_empty() {
                        top_k = Some(raw.parse::<usize>().map_err(|_| {
                            AppError::BadRequest(format!(
                                "top_k must be a non-negative integer, got {raw:?}"
                            ))
                        })?);
                    }
                }
                _ => {}
            }
        }

        let question =
            question.ok_or_else(|| AppError::BadRequest("Missing field: question".to_string()))?;

        Ok(Self { question, top_k })
    }
}

// ============================================================================
// Handler
// ============================================================================

/// Handler: POST /chat
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8000/chat -F question='Where did Saqlain study?' -F top_k=5
/// curl -X POST http://127.0.0.1:8000/query \
///   -H 'content-type: application/json' \
///   -d '{"question":"Where did Saqlain study?","top_k":3}'
/// ```
pub async fn chat(
    State(state): State<Arc<AppState>>,
    request: ChatRequest,
) -> AppResult<Json<ChatResponse>> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(AppError::BadRequest("question must not be empty".to_string()));
    }

    let top_k = request.top_k.unwrap_or(state.default_top_k);
    let outcome = state.pipeline.query(question, top_k).await?;

    let enhanced = outcome.answer.is_enhanced();
    Ok(Json(ChatResponse {
        answer: outcome.answer.into_text(),
        enhanced,
        results: outcome.results.into_iter().map(ResultItem::from).collect(),
    }))
}
