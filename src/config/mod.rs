//! 설정 모듈 - 환경변수 기반 애플리케이션 설정
//!
//! `.env` 파일이 있으면 먼저 로드한 뒤 환경변수를 읽습니다.
//! 모든 값은 기본값을 가지며, 숫자 값 파싱 실패는 시작 오류입니다.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

// ============================================================================
// Defaults
// ============================================================================

/// OpenAI 호환 API 기본 URL
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
/// 기본 완성 모델
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-3.5-turbo-instruct";
/// 기본 임베딩 모델
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
/// 답변 캐시 TTL 상한 (30일)
pub const MAX_CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;

// ============================================================================
// PipelineSettings
// ============================================================================

/// RAG 파이프라인 튜닝 값
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// 청크 당 단어 수
    pub chunk_words: usize,
    /// 청크 간 중첩 단어 수 (chunk_words 미만이어야 함)
    pub chunk_overlap: usize,
    /// 이보다 짧은 청크는 버림 (문자 수)
    pub min_chunk_chars: usize,
    /// 검색할 상위 청크 수
    pub retrieval_k: usize,
    /// 페이지 요청 타임아웃
    pub fetch_timeout: Duration,
    /// 페이지 본문 최대 문자 수
    pub fetch_max_chars: usize,
    /// 검색/생성 API 타임아웃
    pub api_timeout: Duration,
    /// 코퍼스가 비었을 때 컨텍스트로 쓸 지식베이스 항목 수
    pub fallback_entries: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_words: 600,
            chunk_overlap: 100,
            min_chunk_chars: 50,
            retrieval_k: 8,
            fetch_timeout: Duration::from_secs(10),
            fetch_max_chars: 8000,
            api_timeout: Duration::from_secs(30),
            fallback_entries: 5,
        }
    }
}

impl PipelineSettings {
    /// 설정 값 검증
    pub fn validate(&self) -> Result<()> {
        if self.chunk_words == 0 {
            bail!("chunk_words must be greater than zero");
        }
        if self.chunk_overlap >= self.chunk_words {
            bail!(
                "chunk_overlap ({}) must be smaller than chunk_words ({})",
                self.chunk_overlap,
                self.chunk_words
            );
        }
        if self.retrieval_k == 0 {
            bail!("retrieval_k must be at least 1");
        }
        if self.fetch_timeout.is_zero() || self.api_timeout.is_zero() {
            bail!("timeouts must be greater than zero");
        }
        if self.fetch_max_chars == 0 {
            bail!("fetch_max_chars must be greater than zero");
        }
        Ok(())
    }
}

// ============================================================================
// AppConfig
// ============================================================================

/// 애플리케이션 전체 설정
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub completion_model: String,
    pub embedding_model: String,
    pub serpapi_api_key: Option<String>,
    pub host: String,
    pub port: u16,
    /// 지식베이스 JSON 파일 (문자열 배열). 없으면 내장 목록 사용
    pub knowledge_file: Option<PathBuf>,
    pub cache_enabled: bool,
    pub cache_ttl: Duration,
    pub data_dir: PathBuf,
    pub pipeline: PipelineSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            completion_model: DEFAULT_COMPLETION_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            serpapi_api_key: None,
            host: "0.0.0.0".to_string(),
            port: 8000,
            knowledge_file: None,
            cache_enabled: true,
            cache_ttl: Duration::from_secs(7200),
            data_dir: get_data_dir(),
            pipeline: PipelineSettings::default(),
        }
    }
}

impl AppConfig {
    /// `.env` + 환경변수에서 설정 로드
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_env()
    }

    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 키 조회 함수로 설정 구성 (테스트용으로도 사용)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        let pipeline_defaults = PipelineSettings::default();

        let pipeline = PipelineSettings {
            chunk_words: parse_or(&get, "BAOBAB_CHUNK_WORDS", pipeline_defaults.chunk_words)?,
            chunk_overlap: parse_or(&get, "BAOBAB_CHUNK_OVERLAP", pipeline_defaults.chunk_overlap)?,
            min_chunk_chars: pipeline_defaults.min_chunk_chars,
            retrieval_k: parse_or(&get, "BAOBAB_RETRIEVAL_K", pipeline_defaults.retrieval_k)?,
            fetch_timeout: Duration::from_secs(parse_or(
                &get,
                "BAOBAB_FETCH_TIMEOUT_SECS",
                pipeline_defaults.fetch_timeout.as_secs(),
            )?),
            fetch_max_chars: parse_or(
                &get,
                "BAOBAB_FETCH_MAX_CHARS",
                pipeline_defaults.fetch_max_chars,
            )?,
            api_timeout: pipeline_defaults.api_timeout,
            fallback_entries: pipeline_defaults.fallback_entries,
        };
        pipeline.validate().context("Invalid pipeline settings")?;

        let cache_ttl_secs: u64 =
            parse_or(&get, "BAOBAB_CACHE_TTL_SECS", defaults.cache_ttl.as_secs())?;
        if cache_ttl_secs > MAX_CACHE_TTL_SECS {
            bail!(
                "BAOBAB_CACHE_TTL_SECS ({}) must not exceed {} seconds",
                cache_ttl_secs,
                MAX_CACHE_TTL_SECS
            );
        }

        Ok(Self {
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            completion_model: get("OPENAI_COMPLETION_MODEL").unwrap_or(defaults.completion_model),
            embedding_model: get("OPENAI_EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            serpapi_api_key: get("SERPAPI_API_KEY"),
            host: get("BAOBAB_HOST").unwrap_or(defaults.host),
            port: parse_or(&get, "BAOBAB_PORT", defaults.port)?,
            knowledge_file: get("BAOBAB_KNOWLEDGE_FILE").map(PathBuf::from),
            cache_enabled: parse_bool_or(&get, "BAOBAB_CACHE_ENABLED", defaults.cache_enabled)?,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            data_dir: get("BAOBAB_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            pipeline,
        })
    }

    /// OpenAI 키 설정 여부
    pub fn has_openai_key(&self) -> bool {
        self.openai_api_key.is_some()
    }

    /// SerpAPI 키 설정 여부
    pub fn has_serpapi_key(&self) -> bool {
        self.serpapi_api_key.is_some()
    }

    /// 캐시 DB 경로
    pub fn cache_path(&self) -> PathBuf {
        self.data_dir.join("answer_cache.db")
    }

    /// 서버 바인드 주소
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ============================================================================
// Data Directory
// ============================================================================

/// 데이터 디렉토리 경로 (~/.baobab-rag/)
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".baobab-rag")
}

// ============================================================================
// Helper Functions
// ============================================================================

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {} ({})", key, raw, e)),
        None => Ok(default),
    }
}

fn parse_bool_or<G>(get: &G, key: &str, default: bool) -> Result<bool>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => bail!("Invalid boolean for {}: {}", key, other),
        },
        None => Ok(default),
    }
}

// ============================================================================
// Tests
// ============================================================================
