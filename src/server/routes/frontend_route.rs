//! GET / - 프론트엔드 index.html
//! GET /static/{file} - 프론트엔드 디렉토리의 정적 파일

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{Html, IntoResponse, Response},
};

use crate::server::error::{AppError, AppResult};
use crate::server::AppState;

/// Handler: GET /
pub async fn index(State(state): State<Arc<AppState>>) -> AppResult<Html<String>> {
    let path = state.frontend_dir.join("index.html");
    let html = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| read_error(&path, e))?;
    Ok(Html(html))
}

/// Handler: GET /static/{file}
///
/// 하위 디렉토리나 상위 경로는 허용하지 않습니다.
pub async fn static_file(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
) -> AppResult<Response> {
    if file.is_empty() || file.contains("..") || file.contains(['/', '\\']) {
        return Err(AppError::NotFound);
    }

    let path = state.frontend_dir.join(&file);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| read_error(&path, e))?;

    Ok(([(CONTENT_TYPE, content_type_for(&file))], bytes).into_response())
}

fn read_error(path: &std::path::Path, e: std::io::Error) -> AppError {
    if e.kind() == std::io::ErrorKind::NotFound {
        tracing::debug!("Frontend file not found: {:?}", path);
        AppError::NotFound
    } else {
        AppError::Http {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "IO_ERROR",
            message: format!("Failed to read {}: {e}", path.display()),
        }
    }
}

/// 확장자로 Content-Type 결정
fn content_type_for(file: &str) -> &'static str {
    let ext = file.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "ico" => "image/x-icon",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::server::routes::test_support::test_state;

    #[tokio::test]
    async fn test_index_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let state = test_state(dir.path());

        let err = index(State(state)).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_index_served() {
        let dir = TempDir::new().unwrap();
        let state = test_state(dir.path());
        std::fs::create_dir_all(&state.frontend_dir).unwrap();
        std::fs::write(state.frontend_dir.join("index.html"), "<h1>chat</h1>").unwrap();

        let Html(html) = index(State(state)).await.unwrap();
        assert_eq!(html, "<h1>chat</h1>");
    }

    #[tokio::test]
    async fn test_static_file_with_content_type() {
        let dir = TempDir::new().unwrap();
        let state = test_state(dir.path());
        std::fs::create_dir_all(&state.frontend_dir).unwrap();
        std::fs::write(state.frontend_dir.join("script.js"), "const x = 1;").unwrap();

        let response = static_file(State(state), Path("script.js".to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "text/javascript; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_static_file_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let state = test_state(dir.path());

        for name in ["../secret", "a/b.js", "..", ""] {
            let err = static_file(State(state.clone()), Path(name.to_string()))
                .await
                .unwrap_err();
            assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("INDEX.HTML"), "text/html; charset=utf-8");
        assert_eq!(content_type_for("style.css"), "text/css; charset=utf-8");
        assert_eq!(content_type_for("blob"), "application/octet-stream");
    }
}
