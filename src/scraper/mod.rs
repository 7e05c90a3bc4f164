//! 웹 스크래퍼 모듈 - URL 콘텐츠 추출
//!
//! HTML을 가져와 보이는 텍스트만 추출합니다.
//! script/style/nav/footer 등 비본문 요소는 제거하고 최대 문자 수로 자릅니다.
//! 실패는 `FetchOutcome::Failed`로 반환되며 재시도하지 않습니다.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// 본문에서 제외할 요소
const EXCLUDED_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "noscript", "iframe",
];

/// 본문 후보 셀렉터 (우선순위 순)
const CONTENT_SELECTORS: &[&str] = &["main", "article", "div.content"];

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

// ============================================================================
// Types
// ============================================================================

/// 스크랩된 콘텐츠
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedContent {
    /// 페이지 제목
    pub title: Option<String>,
    /// 본문 텍스트 (HTML 태그 제거됨, 최대 문자 수 이하)
    pub content: String,
    /// 원본 URL
    pub url: String,
}

/// 페이지 요청 실패
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(u16),
}

/// 페이지 요청 결과
#[derive(Debug)]
pub enum FetchOutcome {
    /// 본문 추출 성공
    Fetched(ScrapedContent),
    /// 요청은 성공했으나 본문이 없음
    Empty,
    /// 네트워크/HTTP 오류
    Failed(FetchError),
}

impl FetchOutcome {
    /// 본문 텍스트 (실패/빈 페이지는 빈 문자열)
    pub fn into_text(self) -> String {
        match self {
            FetchOutcome::Fetched(page) => page.content,
            FetchOutcome::Empty | FetchOutcome::Failed(_) => String::new(),
        }
    }

    pub fn is_fetched(&self) -> bool {
        matches!(self, FetchOutcome::Fetched(_))
    }
}

// ============================================================================
// PageFetcher Trait
// ============================================================================

/// 페이지 본문 추출 인터페이스
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// URL에서 본문 추출. 에러를 던지지 않고 결과로 표현합니다.
    async fn fetch(&self, url: &str) -> FetchOutcome;
}

// ============================================================================
// WebScraper
// ============================================================================

/// 웹 스크래퍼
#[derive(Debug, Clone)]
pub struct WebScraper {
    client: reqwest::Client,
    max_chars: usize,
}

impl WebScraper {
    /// 새 스크래퍼 생성
    ///
    /// # Arguments
    /// * `timeout` - 요청 타임아웃
    /// * `max_chars` - 본문 최대 문자 수
    pub fn new(timeout: Duration, max_chars: usize) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, max_chars })
    }

    async fn try_fetch(&self, url: &str) -> Result<Option<ScrapedContent>, FetchError> {
        let parsed = Url::parse(url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::UnsupportedScheme(parsed.scheme().to_string()));
        }

        let response = self.client.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let html = response.text().await?;
        let page = extract_page(&html, url, self.max_chars);

        Ok((!page.content.is_empty()).then_some(page))
    }
}

#[async_trait]
impl PageFetcher for WebScraper {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        tracing::debug!("Fetching: {}", url);

        match self.try_fetch(url).await {
            Ok(Some(page)) => FetchOutcome::Fetched(page),
            Ok(None) => {
                tracing::debug!("No visible text at {}", url);
                FetchOutcome::Empty
            }
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", url, e);
                FetchOutcome::Failed(e)
            }
        }
    }
}

// ============================================================================
// HTML Extraction
// ============================================================================

/// HTML 문서에서 제목과 본문 추출
pub fn extract_page(html: &str, url: &str, max_chars: usize) -> ScrapedContent {
    let document = Html::parse_document(html);

    ScrapedContent {
        title: extract_title(&document),
        content: truncate_chars(&extract_content(&document), max_chars),
        url: url.to_string(),
    }
}

/// 제목 추출 (<title> 우선, 없으면 <h1>)
fn extract_title(document: &Html) -> Option<String> {
    for selector_str in ["title", "h1"] {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                let title = visible_text(&element);
                if !title.is_empty() {
                    return Some(title);
                }
            }
        }
    }

    None
}

/// 본문 추출: main > article > div.content > 문서 전체
fn extract_content(document: &Html) -> String {
    for selector_str in CONTENT_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                return visible_text(&element);
            }
        }
    }

    visible_text(&document.root_element())
}

/// 요소 하위의 텍스트 노드를 공백 하나로 연결 (제외 요소 내부는 건너뜀)
fn visible_text(element: &ElementRef) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|e| EXCLUDED_TAGS.contains(&e.name()))
                .unwrap_or(false)
        });
        if hidden {
            continue;
        }

        parts.extend(text.split_whitespace());
    }

    parts.join(" ")
}

/// 문자 경계 안전 자르기
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
