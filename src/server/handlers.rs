//! 요청 핸들러

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::cache::{cache_key, AnswerCache, CachedAnswer};
use crate::rag::{Answer, AnswerOutcome, Language, RagRequest, MAX_CITED_SOURCES};

use super::{ApiError, AppState, SERVICE_NAME};

/// 질문 최대 길이 (문자)
pub const MAX_QUESTION_CHARS: usize = 1000;

const HEALTH_QUESTION: &str = "What is AI?";

// ============================================================================
// Request / Response
// ============================================================================

/// 채팅 요청
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub question: String,
    #[serde(default = "default_language")]
    pub language: String,
    /// `african` 또는 `global`
    #[serde(default = "default_context_preference")]
    pub context_preference: String,
    /// 받기만 하고 파이프라인에는 전달하지 않음
    #[serde(default)]
    pub history: Vec<Value>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_context_preference() -> String {
    "african".to_string()
}

impl ChatMessage {
    fn validate(&self) -> Result<(), ApiError> {
        validate_question(&self.question)
    }

    fn wants_african_focus(&self) -> bool {
        self.context_preference.trim().eq_ignore_ascii_case("african")
    }
}

/// 채팅 응답
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub language: Language,
    pub sources_used: Vec<String>,
    pub african_context: bool,
    /// 처리 시간 (초, 소수점 둘째 자리)
    pub processing_time: f64,
    pub cached: bool,
}

/// 레거시 요청
#[derive(Debug, Deserialize)]
pub struct LegacyQuestion {
    pub question: String,
    #[serde(default)]
    pub history: Vec<Value>,
}

fn validate_question(question: &str) -> Result<(), ApiError> {
    if question.trim().is_empty() {
        return Err(ApiError::BadRequest("question must not be empty".to_string()));
    }
    let len = question.chars().count();
    if len > MAX_QUESTION_CHARS {
        return Err(ApiError::BadRequest(format!(
            "question is too long ({} > {} characters)",
            len, MAX_QUESTION_CHARS
        )));
    }
    Ok(())
}

// ============================================================================
// Service endpoints
// ============================================================================

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Bienvenue sur Baobab AI Backend",
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/health"
    }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "started_at": state.started_at.to_rfc3339()
    }))
}

/// 레거시 엔드포인트: 프랑스어, 웹 출처 3개
pub async fn legacy_rag(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LegacyQuestion>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(question) = payload?;
    validate_question(&question.question)?;

    tracing::info!(
        "RAG query: {}...",
        question.question.chars().take(100).collect::<String>()
    );

    let request = RagRequest::new(question.question)
        .language(Language::Fr)
        .web_sources(3);
    let (answer, _) = answer_with_cache(&state, &request).await;

    Ok(Json(json!({ "answer": answer.text })))
}

// ============================================================================
// Chat endpoints
// ============================================================================

pub async fn ask(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatMessage>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(message) = payload?;
    message.validate()?;

    let started = Instant::now();
    let african_focus = message.wants_african_focus();
    let request = RagRequest::new(message.question.clone())
        .language(Language::from_code(&message.language))
        .web_sources(5)
        .domain_focus(african_focus);

    let (answer, cached) = answer_with_cache(&state, &request).await;
    let sources_used = answer
        .sources
        .iter()
        .take(MAX_CITED_SOURCES)
        .map(|s| format!("{} - {}", s.title, s.link))
        .collect();

    Ok(Json(ChatResponse {
        answer: answer.text,
        language: answer.language,
        sources_used,
        african_context: african_focus,
        processing_time: elapsed_secs(started),
        cached,
    }))
}

/// 익명 요청: 웹 출처 3개, 지역 보정 항상 적용, 출처 목록 비공개
pub async fn ask_anonymous(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatMessage>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(message) = payload?;
    message.validate()?;

    let started = Instant::now();
    let request = RagRequest::new(message.question.clone())
        .language(Language::from_code(&message.language))
        .web_sources(3)
        .domain_focus(true);

    let (answer, cached) = answer_with_cache(&state, &request).await;

    Ok(Json(ChatResponse {
        answer: answer.text,
        language: answer.language,
        sources_used: vec![],
        african_context: true,
        processing_time: elapsed_secs(started),
        cached,
    }))
}

pub async fn languages() -> impl IntoResponse {
    let list: Vec<Value> = Language::ALL
        .iter()
        .map(|lang| {
            json!({
                "code": lang.code(),
                "name": lang.name(),
                "native_name": lang.native_name()
            })
        })
        .collect();
    Json(list)
}

pub async fn context_info() -> impl IntoResponse {
    Json(json!({
        "african_knowledge": "Specialized knowledge about African AI market, startups, languages, and business contexts",
        "web_search": "Real-time web search for current information and African sources",
        "languages": "Multi-language support with cultural context awareness",
        "business_focus": "Emphasis on practical implementation for African businesses and SMEs",
        "data_sources": "Combination of curated African AI content and live web sources"
    }))
}

/// 최소 구성으로 파이프라인을 한 번 실행해 상태 확인
pub async fn chat_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let request = RagRequest::new(HEALTH_QUESTION)
        .web_sources(1)
        .knowledge_base(false)
        .domain_focus(false);
    let answer = state.rag.run_rag(&request).await;

    if answer.outcome == AnswerOutcome::Failed {
        return Json(json!({
            "status": "unhealthy",
            "error": answer.text
        }));
    }

    Json(json!({
        "status": "healthy",
        "rag_service": "operational",
        "test_response_length": answer.text.chars().count()
    }))
}

pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let Some(cache) = &state.cache else {
        return Ok(Json(json!({ "enabled": false })));
    };

    let stats = with_cache(cache, |c| c.stats())
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(json!({
        "enabled": true,
        "ttl_secs": cache.ttl().as_secs(),
        "stats": stats
    })))
}

// ============================================================================
// Helpers
// ============================================================================

/// 캐시 조회 후 없으면 파이프라인 실행. 캐시 오류는 경고만 남김
async fn answer_with_cache(state: &AppState, request: &RagRequest) -> (Answer, bool) {
    let Some(cache) = &state.cache else {
        return (state.rag.run_rag(request).await, false);
    };

    let key = cache_key(request);
    let lookup_key = key.clone();
    match with_cache(cache, move |c| c.get(&lookup_key)).await {
        Ok(Some(hit)) => return (hit.into_answer(), true),
        Ok(None) => {}
        Err(e) => tracing::warn!("Cache read failed: {:#}", e),
    }

    let answer = state.rag.run_rag(request).await;
    if let Some(entry) = CachedAnswer::from_answer(&answer) {
        if let Err(e) = with_cache(cache, move |c| c.put(&key, &entry)).await {
            tracing::warn!("Cache write failed: {:#}", e);
        }
    }

    (answer, false)
}

/// SQLite 호출은 블로킹 스레드에서 실행
async fn with_cache<T, F>(cache: &Arc<AnswerCache>, op: F) -> anyhow::Result<T>
where
    F: FnOnce(&AnswerCache) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let cache = Arc::clone(cache);
    tokio::task::spawn_blocking(move || op(&cache))
        .await
        .context("Cache task failed")?
}

fn elapsed_secs(started: Instant) -> f64 {
    (started.elapsed().as_secs_f64() * 100.0).round() / 100.0
}
