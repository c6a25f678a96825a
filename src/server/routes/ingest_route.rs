//! POST /ingest - 파일 또는 텍스트 수집
//! DELETE /ingest, POST /reset - 저장소 초기화

use std::sync::Arc;

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::extractor::extract_document;
use crate::knowledge::RAW_TEXT_SOURCE;
use crate::server::error::{AppError, AppResult};
use crate::server::AppState;

// ============================================================================
// DTOs
// ============================================================================

/// 업로드된 파일
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// multipart 수집 요청 (`file` 또는 `text`)
#[derive(Debug, Clone, Default)]
pub struct IngestForm {
    pub file: Option<UploadedFile>,
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
    pub chunks_added: usize,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub status: &'static str,
}

impl<S> FromRequest<S> for IngestForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state).await?;

        let mut form = IngestForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some("file") => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let bytes = field.bytes().await?;
                    // 파일을 고르지 않은 브라우저 폼은 빈 파트를 보냄
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    form.file = Some(UploadedFile {
                        name: if file_name.is_empty() {
                            "upload".to_string()
                        } else {
                            file_name
                        },
                        bytes: bytes.to_vec(),
                    });
                }
                Some("text") => form.text = Some(field.text().await?),
                _ => {}
            }
        }

        Ok(form)
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler: POST /ingest
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8000/ingest -F file=@cv.pdf
/// curl -X POST http://127.0.0.1:8000/ingest -F text='Saqlain studied at FAST.'
/// ```
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    form: IngestForm,
) -> AppResult<Json<IngestResponse>> {
    let (content, source) = if let Some(file) = form.file {
        let doc = extract_document(&file.name, file.bytes)
            .await
            .map_err(|e| AppError::Http {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "EXTRACT_FAILED",
                message: format!("{e:#}"),
            })?;
        (doc.text, file.name)
    } else if let Some(text) = form.text {
        (text, RAW_TEXT_SOURCE.to_string())
    } else {
        return Err(AppError::BadRequest(
            "Provide either a file or text field.".to_string(),
        ));
    };

    let chunks_added = state.pipeline.ingest(&content, &source).await?;

    Ok(Json(IngestResponse {
        status: "ok",
        chunks_added,
    }))
}

/// Handler: DELETE /ingest, POST /reset
pub async fn reset(State(state): State<Arc<AppState>>) -> AppResult<Json<OkResponse>> {
    state.pipeline.reset().await?;
    Ok(Json(OkResponse { status: "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header::CONTENT_TYPE;
    use tempfile::TempDir;

    use crate::server::routes::test_support::{multipart_body, test_state};

    fn text_form(text: &str) -> IngestForm {
        IngestForm {
            file: None,
            text: Some(text.to_string()),
        }
    }

    #[tokio::test]
    async fn test_ingest_text() {
        let dir = TempDir::new().unwrap();
        let state = test_state(dir.path());

        let Json(resp) = ingest(State(state.clone()), text_form("alpha beta gamma"))
            .await
            .unwrap();
        assert_eq!(resp.status, "ok");
        assert_eq!(resp.chunks_added, 4);
        assert_eq!(state.pipeline.status().await.chunks, 4);
    }

    #[tokio::test]
    async fn test_ingest_file_uses_file_name_as_source() {
        let dir = TempDir::new().unwrap();
        let state = test_state(dir.path());

        let form = IngestForm {
            file: Some(UploadedFile {
                name: "notes.txt".to_string(),
                bytes: b"alpha\xff beta".to_vec(),
            }),
            text: Some("ignored".to_string()),
        };
        let Json(resp) = ingest(State(state.clone()), form).await.unwrap();
        assert_eq!(resp.chunks_added, 2);

        let outcome = state.pipeline.query("alpha", 1).await.unwrap();
        assert_eq!(outcome.results[0].chunk.source, "notes.txt");
    }

    #[tokio::test]
    async fn test_ingest_requires_file_or_text() {
        let dir = TempDir::new().unwrap();
        let state = test_state(dir.path());

        let err = ingest(State(state), IngestForm::default()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Provide either a file or text field.");
    }

    #[tokio::test]
    async fn test_reset() {
        let dir = TempDir::new().unwrap();
        let state = test_state(dir.path());
        ingest(State(state.clone()), text_form("alpha beta gamma"))
            .await
            .unwrap();

        let Json(resp) = reset(State(state.clone())).await.unwrap();
        assert_eq!(resp.status, "ok");

        let status = state.pipeline.status().await;
        assert!(!status.ingested);
        assert_eq!(status.chunks, 0);
    }

    #[tokio::test]
    async fn test_form_from_multipart() {
        let boundary = "XBOUNDARYX";
        let body = multipart_body(
            boundary,
            &[
                ("text", None, &b"raw words"[..]),
                ("file", Some("cv.txt"), &b"file words"[..]),
            ],
        );
        let req = axum::http::Request::builder()
            .method("POST")
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap();

        let form = IngestForm::from_request(req, &()).await.unwrap();
        assert_eq!(form.text.as_deref(), Some("raw words"));
        let file = form.file.unwrap();
        assert_eq!(file.name, "cv.txt");
        assert_eq!(file.bytes, b"file words");
    }

    #[tokio::test]
    async fn test_form_skips_empty_file_part() {
        let boundary = "XBOUNDARYX";
        let body = multipart_body(boundary, &[("file", Some(""), &b""[..]), ("text", None, &b"hi"[..])]);
        let req = axum::http::Request::builder()
            .method("POST")
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap();

        let form = IngestForm::from_request(req, &()).await.unwrap();
        assert!(form.file.is_none());
        assert_eq!(form.text.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn test_form_rejects_non_multipart() {
        let req = axum::http::Request::builder()
            .method("POST")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let err = IngestForm::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
