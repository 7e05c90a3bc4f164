//! LLM 모듈 - 텍스트 완성 프로바이더
//!
//! 단일 프롬프트 문자열을 받아 생성된 텍스트를 반환합니다.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::embedding::OpenAiError;

/// 완성 최대 토큰 수
const DEFAULT_MAX_TOKENS: u32 = 512;

// ============================================================================
// Errors
// ============================================================================

/// 완성 호출 실패
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion provider is not configured (missing API key)")]
    NotConfigured,
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("completion API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("completion response malformed: {0}")]
    Malformed(String),
}

// ============================================================================
// CompletionProvider Trait
// ============================================================================

/// 텍스트 완성 프로바이더 트레이트
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// 프롬프트 완성
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// OpenAI Completion
// ============================================================================

/// OpenAI 호환 `/completions` 구현체
///
/// ref: https://platform.openai.com/docs/api-reference/completions
#[derive(Debug)]
pub struct OpenAiCompletion {
    api_key: Option<String>,
    endpoint: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}

impl OpenAiCompletion {
    /// 새 완성 클라이언트 생성
    ///
    /// API 키가 없으면 모든 호출이 `CompletionError::NotConfigured`를 반환합니다.
    pub fn new(
        api_key: Option<String>,
        base_url: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key,
            endpoint: format!("{}/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.7,
            client,
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(CompletionError::NotConfigured)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&CompletionRequest {
                model: &self.model,
                prompt,
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<OpenAiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: CompletionResponse =
            serde_json::from_str(&body).map_err(|e| CompletionError::Malformed(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| CompletionError::Malformed("no choices returned".to_string()))
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Tests
// ============================================================================
