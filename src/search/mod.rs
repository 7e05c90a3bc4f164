//! 웹 검색 모듈
//!
//! 외부 검색 API에 질의하여 (제목, 링크, 스니펫) 목록을 순위대로 반환합니다.
//! `WebSearchClient`는 도메인 포커스 시 질의를 보정하고,
//! 프로바이더 오류를 빈 결과로 흡수합니다.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 이미 포함되어 있으면 질의를 보정하지 않는 키워드
const FOCUS_KEYWORDS: &[&str] = &["africa", "african", "nigeria", "kenya", "south africa"];

/// 도메인 포커스 보정 문구
const FOCUS_SUFFIX: &str = "Africa African business";

/// SerpAPI 엔드포인트
/// ref: https://serpapi.com/search-api
const SERPAPI_URL: &str = "https://serpapi.com/search.json";

// ============================================================================
// Types
// ============================================================================

/// 검색 결과 한 건
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            snippet: None,
        }
    }
}

/// 검색 프로바이더 오류
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search provider is not configured (missing API key)")]
    NotConfigured,
    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("search API error ({status}): {message}")]
    Api { status: u16, message: String },
}

// ============================================================================
// SearchProvider Trait
// ============================================================================

/// 검색 프로바이더 트레이트
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// 질의 실행. 결과는 프로바이더 순위 순서, 최대 `num_results`건
    async fn search(&self, query: &str, num_results: usize)
        -> Result<Vec<SearchResult>, SearchError>;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// SerpAPI
// ============================================================================

/// SerpAPI (Google) 검색 구현체
#[derive(Debug, Clone)]
pub struct SerpApiSearch {
    api_key: Option<String>,
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic_results: Vec<SerpOrganic>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SerpOrganic {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: Option<String>,
}

impl SerpApiSearch {
    /// 새 SerpAPI 클라이언트 생성
    ///
    /// API 키가 없으면 모든 검색이 `SearchError::NotConfigured`를 반환합니다.
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key,
            endpoint: SERPAPI_URL.to_string(),
            client,
        })
    }

    /// 엔드포인트 교체 (프록시/테스트 서버용)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl SearchProvider for SerpApiSearch {
    async fn search(
        &self,
        query: &str,
        num_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let api_key = self.api_key.as_deref().ok_or(SearchError::NotConfigured)?;

        let num = num_results.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("num", num.as_str()),
                ("api_key", api_key),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SearchError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: SerpResponse = serde_json::from_str(&body).map_err(|e| SearchError::Api {
            status: status.as_u16(),
            message: format!("malformed response: {}", e),
        })?;

        if let Some(message) = parsed.error {
            return Err(SearchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(parsed
            .organic_results
            .into_iter()
            .filter(|r| !r.link.is_empty())
            .take(num_results)
            .map(|r| SearchResult {
                title: r.title,
                link: r.link,
                snippet: r.snippet.filter(|s| !s.is_empty()),
            })
            .collect())
    }

    fn name(&self) -> &str {
        "serpapi"
    }
}

// ============================================================================
// WebSearchClient
// ============================================================================

/// 도메인 포커스를 적용하는 검색 클라이언트
pub struct WebSearchClient {
    provider: Arc<dyn SearchProvider>,
}

impl WebSearchClient {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }

    /// 검색 실행
    ///
    /// 프로바이더 오류는 로그만 남기고 빈 목록을 반환합니다.
    pub async fn search(
        &self,
        query: &str,
        num_results: usize,
        domain_focus: bool,
    ) -> Vec<SearchResult> {
        if num_results == 0 {
            return vec![];
        }

        let query = focus_query(query, domain_focus);
        tracing::debug!("Searching via {}: {}", self.provider.name(), query);

        match self.provider.search(&query, num_results).await {
            Ok(mut results) => {
                results.truncate(num_results);
                tracing::info!("Web search returned {} results", results.len());
                results
            }
            Err(SearchError::NotConfigured) => {
                tracing::debug!("Web search skipped: provider not configured");
                vec![]
            }
            Err(e) => {
                tracing::warn!("Web search failed: {}", e);
                vec![]
            }
        }
    }
}

/// 도메인 포커스 질의 보정
///
/// 포커스가 켜져 있고 질의에 대상 지역 키워드가 없으면 보정 문구를 덧붙입니다.
pub fn focus_query(query: &str, domain_focus: bool) -> String {
    let lower = query.to_lowercase();
    if domain_focus && !FOCUS_KEYWORDS.iter().any(|k| lower.contains(k)) {
        format!("{} {}", query, FOCUS_SUFFIX)
    } else {
        query.to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
