//! HTTP 오류 타입
//!
//! 모든 핸들러 오류는 `{error: CODE, detail: message}` JSON으로 응답합니다.
//! 프론트엔드는 `detail` 필드를 사용자에게 보여줍니다.

use axum::{
    extract::multipart::MultipartError,
    extract::multipart::MultipartRejection,
    extract::rejection::{FormRejection, JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::knowledge::{PipelineError, RetrievalError};

/// 애플리케이션 오류
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Not found")]
    NotFound,

    /// 하위 계층에서 매핑된 상태 코드 + 오류 코드
    #[error("{message}")]
    Http {
        status: StatusCode,
        code: &'static str,
        message: String,
    },
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Http { status, .. } => *status,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NotFound => "NOT_FOUND",
            AppError::Http { code, .. } => code,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{} {}: {}", status.as_u16(), self.error_code(), self);
        }

        let body = ErrorBody {
            error: self.error_code(),
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// 핸들러 결과 별칭
pub type AppResult<T> = Result<T, AppError>;

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Retrieval(RetrievalError::EmptyStore) => AppError::Http {
                status: StatusCode::BAD_REQUEST,
                code: "EMPTY_STORE",
                message: RetrievalError::EmptyStore.to_string(),
            },
            PipelineError::Retrieval(e @ RetrievalError::DimensionMismatch { .. }) => {
                AppError::Http {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "DIMENSION_MISMATCH",
                    message: format!(
                        "{e}. The embedding model changed since ingest; reset and re-ingest."
                    ),
                }
            }
            e @ (PipelineError::Embedding(_) | PipelineError::EmbeddingCount { .. }) => {
                AppError::Http {
                    status: StatusCode::BAD_GATEWAY,
                    code: "EMBEDDING_FAILED",
                    message: e.to_string(),
                }
            }
            PipelineError::Store(e) => AppError::Http {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "STORE_ERROR",
                message: e.to_string(),
            },
        }
    }
}

/// 추출기 거부를 오류로 변환
///
/// 413, 415 는 상태 코드를 유지하고 나머지는 400 입니다.
fn rejection(status: StatusCode, detail: String) -> AppError {
    match status {
        StatusCode::PAYLOAD_TOO_LARGE => AppError::Http {
            status,
            code: "PAYLOAD_TOO_LARGE",
            message: detail,
        },
        StatusCode::UNSUPPORTED_MEDIA_TYPE => AppError::Http {
            status,
            code: "UNSUPPORTED_MEDIA_TYPE",
            message: detail,
        },
        _ => AppError::BadRequest(detail),
    }
}

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        rejection(err.status(), err.body_text())
    }
}

impl From<FormRejection> for AppError {
    fn from(err: FormRejection) -> Self {
        rejection(err.status(), err.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(err: MultipartRejection) -> Self {
        rejection(err.status(), err.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        rejection(err.status(), err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::StoreError;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_empty_store_maps_to_400() {
        let err = AppError::from(PipelineError::Retrieval(RetrievalError::EmptyStore));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "EMPTY_STORE");
        assert_eq!(body["detail"], "No documents ingested yet. Call /ingest first.");
    }

    #[tokio::test]
    async fn test_embedding_failure_maps_to_502() {
        let err = AppError::from(PipelineError::Embedding(anyhow::anyhow!("timeout")));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "EMBEDDING_FAILED");
        assert_eq!(body["detail"], "embedding failed: timeout");
    }

    #[tokio::test]
    async fn test_store_failure_maps_to_500() {
        let err = AppError::from(PipelineError::Store(StoreError::LengthMismatch {
            chunks: 2,
            vectors: 1,
        }));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "STORE_ERROR");
    }

    #[tokio::test]
    async fn test_bad_request_body() {
        let (status, body) = body_json(AppError::BadRequest("Provide either a file or text field.".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "BAD_REQUEST");
        assert_eq!(body["detail"], "Provide either a file or text field.");
    }

    #[test]
    fn test_rejection_keeps_size_and_media_type_status() {
        let err = rejection(StatusCode::PAYLOAD_TOO_LARGE, "too large".into());
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.error_code(), "PAYLOAD_TOO_LARGE");

        let err = rejection(StatusCode::UNSUPPORTED_MEDIA_TYPE, "form expected".into());
        assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let err = rejection(StatusCode::UNPROCESSABLE_ENTITY, "missing field".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "missing field");
    }
}
