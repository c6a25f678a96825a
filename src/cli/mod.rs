//! CLI 모듈
//!
//! docqa CLI 명령어 정의 및 구현

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::extractor::read_document;
use crate::knowledge::{
    ChunkStore, PipelineError, QaPipeline, RetrievalError, RAW_TEXT_SOURCE,
};
use crate::server::{self, AppState};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "docqa")]
#[command(version, about = "문서 질의응답 서비스", long_about = None)]
pub struct Cli {
    /// 데이터 디렉토리 (기본값: DOCQA_DATA_DIR 또는 ~/.docqa-rag)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// HTTP 서버 실행
    Serve {
        /// 바인드 주소 (기본값: DOCQA_BIND 또는 0.0.0.0:8000)
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// 저장소가 비어 있으면 시작 시 수집할 문서
        #[arg(long)]
        seed: Option<PathBuf>,
    },

    /// 파일 또는 텍스트를 저장소에 추가
    Ingest {
        /// 직접 입력할 텍스트
        #[arg(short, long)]
        text: Option<String>,

        /// 수집할 파일 경로 (텍스트 또는 PDF)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// 질문하기
    Query {
        /// 질문
        question: String,

        /// 결과 개수 (기본값: DOCQA_TOP_K 또는 3)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// 저장소 초기화
    Reset,

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::from_env().context("설정 로드 실패")?;
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }

    match cli.command {
        Commands::Serve { bind, seed } => cmd_serve(settings, bind, seed).await,
        Commands::Ingest { text, file } => cmd_ingest(&settings, text, file).await,
        Commands::Query { question, top_k } => cmd_query(&settings, &question, top_k).await,
        Commands::Reset => cmd_reset(&settings),
        Commands::Status => cmd_status(&settings),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 서버 명령어 (serve)
async fn cmd_serve(
    mut settings: Settings,
    bind: Option<SocketAddr>,
    seed: Option<PathBuf>,
) -> Result<()> {
    if let Some(bind) = bind {
        settings.bind = bind;
    }

    let state = AppState::from_settings(&settings).context("서버 상태 초기화 실패")?;

    if let Some(ref seed) = seed {
        state.pipeline.seed_if_empty(seed).await;
    }

    tracing::info!(
        "Serving docqa (embedding={}, data_dir={:?})",
        state.pipeline.embedder_name(),
        settings.data_dir
    );

    server::start(state, settings.bind).await
}

/// 수집 명령어 (ingest)
///
/// 파일 또는 텍스트를 청킹/임베딩하여 저장소에 추가합니다.
async fn cmd_ingest(settings: &Settings, text: Option<String>, file: Option<PathBuf>) -> Result<()> {
    let (content, source) = if let Some(ref path) = file {
        println!("[*] 파일 읽는 중: {}", path.display());
        let (name, doc) = read_document(path).await.context("파일 읽기 실패")?;
        if let Some(pages) = doc.pages {
            println!("    PDF {} 페이지", pages);
        }
        (doc.text, name)
    } else if let Some(text) = text {
        (text, RAW_TEXT_SOURCE.to_string())
    } else {
        bail!("--text 또는 --file 중 하나를 지정해야 합니다");
    };

    let pipeline = QaPipeline::from_settings(settings).context("파이프라인 초기화 실패")?;

    println!("[*] 청킹 및 임베딩 생성 중 ({})...", pipeline.embedder_name());
    let added = pipeline
        .ingest(&content, &source)
        .await
        .context("문서 추가 실패")?;

    println!("[OK] {} 청크가 추가되었습니다", added);
    println!("     출처: {}", source);
    Ok(())
}

/// 질문 명령어 (query)
async fn cmd_query(settings: &Settings, question: &str, top_k: Option<usize>) -> Result<()> {
    let top_k = top_k.unwrap_or(settings.top_k);
    let pipeline = QaPipeline::from_settings(settings).context("파이프라인 초기화 실패")?;

    println!("[*] 검색 중: \"{}\"", question);

    let outcome = match pipeline.query(question, top_k).await {
        Ok(outcome) => outcome,
        Err(PipelineError::Retrieval(RetrievalError::EmptyStore)) => {
            bail!("수집된 문서가 없습니다. 먼저 `docqa ingest` 를 실행하세요.")
        }
        Err(e) => return Err(e).context("검색 실패"),
    };

    println!();
    if let Some(model) = pipeline.rewriter_model().filter(|_| outcome.answer.is_enhanced()) {
        println!("[OK] 답변 ({}):", model);
    } else {
        println!("[OK] 답변:");
    }
    println!("{}", outcome.answer.text());
    println!();

    println!("[*] 근거 ({} 건):\n", outcome.results.len());
    for (i, result) in outcome.results.iter().enumerate() {
        println!(
            "{}. [점수: {:.4}] {} #{}",
            i + 1,
            result.score,
            result.chunk.source,
            result.chunk.index
        );
        println!("   내용: {}", truncate_text(&result.chunk.text, 200));
        println!();
    }

    Ok(())
}

/// 초기화 명령어 (reset)
fn cmd_reset(settings: &Settings) -> Result<()> {
    let mut store = ChunkStore::open(&settings.data_dir).context("ChunkStore 열기 실패")?;
    let count = store.len();
    store.reset().context("저장소 초기화 실패")?;

    println!("[OK] 저장소 초기화됨 ({} 청크 삭제)", count);
    Ok(())
}

/// 상태 명령어 (status)
fn cmd_status(settings: &Settings) -> Result<()> {
    println!("docqa v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("[*] 데이터 디렉토리: {}", settings.data_dir.display());
    println!("[*] 임베딩 프로바이더: {:?}", settings.embedding);
    println!("[*] 답변 재작성: {:?}", settings.rewriter);

    if settings.gemini_api_key.is_some() {
        println!("[OK] Gemini API 키: 설정됨");
    } else {
        println!("[!] Gemini API 키: 미설정");
    }

    match ChunkStore::open(&settings.data_dir) {
        Ok(store) => {
            let stats = store.stats();
            println!("[OK] 저장된 청크: {} 건", stats.chunk_count);
            if let Some(dim) = stats.dimension {
                println!("     벡터 차원: {}", dim);
            }
            let size = snapshot_size(&store.chunks_path()) + snapshot_size(&store.vectors_path());
            println!("     스냅샷 크기: {}", format_bytes(size));
        }
        Err(e) => {
            println!("[!] ChunkStore 열기 실패: {}", e);
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 스냅샷 파일 크기 (없으면 0)
fn snapshot_size(path: &Path) -> usize {
    std::fs::metadata(path).map(|m| m.len() as usize).unwrap_or(0)
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// 바이트 크기 포맷팅
fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_query_with_top_k() {
        let cli = Cli::try_parse_from(["docqa", "query", "Where did he study?", "-k", "5"]).unwrap();
        match cli.command {
            Commands::Query { question, top_k } => {
                assert_eq!(question, "Where did he study?");
                assert_eq!(top_k, Some(5));
            }
            _ => panic!("expected query"),
        }
    }

    #[test]
    fn test_parse_global_data_dir() {
        let cli = Cli::try_parse_from(["docqa", "status", "--data-dir", "/tmp/dq"]).unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/dq")));
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn test_parse_serve() {
        let cli =
            Cli::try_parse_from(["docqa", "serve", "--bind", "127.0.0.1:9000", "--seed", "cv.pdf"])
                .unwrap();
        match cli.command {
            Commands::Serve { bind, seed } => {
                assert_eq!(bind, Some("127.0.0.1:9000".parse().unwrap()));
                assert_eq!(seed, Some(PathBuf::from("cv.pdf")));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_reset_clears_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = ChunkStore::open(dir.path()).unwrap();
        store
            .append(
                vec![crate::knowledge::Chunk::new("a", "raw_text", 0)],
                vec![vec![1.0, 0.0]],
            )
            .unwrap();

        let mut settings = Settings::from_lookup(|_| None).unwrap();
        settings.data_dir = dir.path().to_path_buf();
        cmd_reset(&settings).unwrap();

        assert!(ChunkStore::open(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("hello world", 5), "hello...");
        assert_eq!(truncate_text("hello\nworld", 20), "hello world");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
    }

    #[test]
    fn test_truncate_unicode() {
        let korean = "안녕하세요 세계";
        let truncated = truncate_text(korean, 5);
        assert_eq!(truncated, "안녕하세요...");
    }
}
