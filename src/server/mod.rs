//! HTTP 서버 (axum)
//!
//! - `/`, `/health`: 서비스 정보
//! - `/rag`: 레거시 질의 엔드포인트
//! - `/api/chat/*`: 채팅 API

mod errors;
mod handlers;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::cache::AnswerCache;
use crate::config::AppConfig;
use crate::rag::RagService;

pub use errors::ApiError;
pub use handlers::{ChatMessage, ChatResponse, MAX_QUESTION_CHARS};

/// 서비스 이름
pub const SERVICE_NAME: &str = "Baobab AI Backend";

// ============================================================================
// AppState
// ============================================================================

/// 핸들러 공유 상태
pub struct AppState {
    pub rag: Arc<RagService>,
    /// 비활성화되었거나 열기에 실패하면 None
    pub cache: Option<Arc<AnswerCache>>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(rag: Arc<RagService>, cache: Option<Arc<AnswerCache>>) -> Self {
        Self {
            rag,
            cache,
            started_at: Utc::now(),
        }
    }

    /// 설정에서 서비스와 캐시 구성
    ///
    /// 캐시를 열 수 없으면 경고 후 캐시 없이 동작합니다.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let rag = RagService::from_config(config)?;

        let cache = if config.cache_enabled {
            match AnswerCache::open(&config.cache_path(), config.cache_ttl) {
                Ok(cache) => Some(Arc::new(cache)),
                Err(e) => {
                    tracing::warn!("Answer cache unavailable, continuing without it: {:#}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self::new(Arc::new(rag), cache))
    }
}

// ============================================================================
// Router
// ============================================================================

/// 전체 라우터 생성
pub fn router(state: Arc<AppState>) -> Router {
    let chat = Router::new()
        .route("/ask", post(handlers::ask))
        .route("/ask-anonymous", post(handlers::ask_anonymous))
        .route("/languages", get(handlers::languages))
        .route("/context-info", get(handlers::context_info))
        .route("/health", get(handlers::chat_health))
        .route("/cache", get(handlers::cache_stats));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/rag", post(handlers::legacy_rag))
        .nest("/api/chat", chat)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 서버 실행
pub async fn serve(config: &AppConfig) -> Result<()> {
    let state = Arc::new(AppState::from_config(config)?);

    let bind_addr = config.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    tracing::info!(
        "Listening on {} (cache: {})",
        addr,
        if state.cache.is_some() { "on" } else { "off" }
    );

    let app = router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
