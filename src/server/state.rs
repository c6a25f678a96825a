use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::config::{Settings, DEFAULT_MAX_UPLOAD_BYTES};
use crate::knowledge::QaPipeline;

/// 모든 HTTP 핸들러가 공유하는 상태
pub struct AppState {
    pub pipeline: QaPipeline,
    /// 요청에 `top_k` 가 없을 때 사용
    pub default_top_k: usize,
    /// `index.html` 과 정적 파일 위치
    pub frontend_dir: PathBuf,
    /// 요청 본문 최대 크기
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: QaPipeline, default_top_k: usize, frontend_dir: PathBuf) -> Self {
        Self {
            pipeline,
            default_top_k,
            frontend_dir,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// 설정으로 파이프라인을 구성한 공유 상태
    pub fn from_settings(settings: &Settings) -> Result<Arc<Self>> {
        Ok(Arc::new(
            Self::new(
                QaPipeline::from_settings(settings)?,
                settings.top_k,
                settings.frontend_dir.clone(),
            )
            .with_max_upload_bytes(settings.max_upload_bytes),
        ))
    }
}
