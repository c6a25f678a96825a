//! HTTP 서버 모듈
//!
//! 같은 라우트를 `/` 와 `/api` 아래에 함께 마운트합니다.
//! 번들 프론트엔드는 `/api/...` 를 호출합니다.

mod error;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tokio::signal;

pub use error::{AppError, AppResult};
pub use routes::chat_route::{ChatRequest, ChatResponse, ResultItem, ResultMeta};
pub use routes::ingest_route::{IngestForm, IngestResponse, OkResponse, UploadedFile};
pub use state::AppState;

use routes::{
    chat_route::chat,
    frontend_route::{index, static_file},
    ingest_route::{ingest, reset},
    status_route::status,
};

/// 라우터 구성
///
/// 본문 한도는 `AppState::max_upload_bytes` 를 따릅니다.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    let api = Router::new()
        .route("/ingest", post(ingest).delete(reset))
        .route("/reset", post(reset))
        .route("/chat", post(chat))
        .route("/query", post(chat))
        .route("/status", get(status));

    Router::new()
        .route("/", get(index))
        .route("/static/{file}", get(static_file))
        .merge(api.clone())
        .nest("/api", api)
        .layer(body_limit)
        .layer(middleware::from_fn(allow_any_origin))
        .with_state(state)
}

/// 서버 시작 (Ctrl+C 로 정상 종료)
pub async fn start(state: Arc<AppState>, bind: SocketAddr) -> Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;

    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Ctrl+C 를 기다림
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// 모든 출처 허용 CORS (preflight 는 바로 응답)
async fn allow_any_origin(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("*"),
    );
    response
}
