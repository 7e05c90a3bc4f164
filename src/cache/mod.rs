//! Answer Cache - rusqlite 기반 답변 캐시
//!
//! 같은 질문/옵션 조합의 성공 답변을 TTL 동안 재사용합니다.
//! 저장 위치: ~/.baobab-rag/answer_cache.db

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::rag::{Answer, AnswerOutcome, Language, RagRequest};
use crate::search::SearchResult;

/// 채팅 답변 키 접두사
pub const CHAT_PREFIX: &str = "chat:";

// ============================================================================
// Types
// ============================================================================

/// 캐시에 저장되는 답변
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedAnswer {
    pub text: String,
    pub language: Language,
    pub sources: Vec<SearchResult>,
}

impl CachedAnswer {
    /// 성공 답변만 캐시 대상
    pub fn from_answer(answer: &Answer) -> Option<Self> {
        (answer.outcome == AnswerOutcome::Answered).then(|| Self {
            text: answer.text.clone(),
            language: answer.language,
            sources: answer.sources.clone(),
        })
    }

    pub fn into_answer(self) -> Answer {
        Answer {
            text: self.text,
            language: self.language,
            sources: self.sources,
            outcome: AnswerOutcome::Answered,
        }
    }
}

/// 캐시 통계
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub expired: usize,
    pub hits: u64,
    pub misses: u64,
    pub db_path: PathBuf,
}

// ============================================================================
// AnswerCache
// ============================================================================

/// 답변 캐시
pub struct AnswerCache {
    conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl AnswerCache {
    /// 캐시 열기 (없으면 생성)
    ///
    /// # Arguments
    /// * `path` - DB 파일 경로
    /// * `ttl` - 기본 만료 시간
    pub fn open(path: &Path, ttl: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).context("Failed to create cache directory")?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open SQLite cache")?;

        let cache = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: path.to_path_buf(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        };

        cache.initialize()?;
        Ok(cache)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS answers (
                key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )",
            [],
        )
        .context("Failed to create answers table")?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_answers_expires ON answers(expires_at)",
            [],
        )
        .context("Failed to create expiry index")?;

        tracing::debug!("Answer cache initialized at {:?}", self.db_path);
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))
    }

    /// 만료되지 않은 답변 조회
    pub fn get(&self, key: &str) -> Result<Option<CachedAnswer>> {
        let conn = self.lock()?;
        let now = Utc::now().timestamp();

        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM answers WHERE key = ?1 AND expires_at > ?2",
                params![key, now],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read cache entry")?;

        let cached = match payload {
            Some(raw) => match serde_json::from_str::<CachedAnswer>(&raw) {
                Ok(answer) => Some(answer),
                Err(e) => {
                    tracing::warn!("Dropping corrupt cache entry {}: {}", key, e);
                    conn.execute("DELETE FROM answers WHERE key = ?1", params![key])?;
                    None
                }
            },
            None => None,
        };

        if cached.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Cache hit for {}", key);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }

        Ok(cached)
    }

    /// 답변 저장 (기본 TTL)
    pub fn put(&self, key: &str, answer: &CachedAnswer) -> Result<()> {
        self.put_with_ttl(key, answer, self.ttl)
    }

    /// 답변 저장 (TTL 지정, 같은 키는 덮어씀)
    pub fn put_with_ttl(&self, key: &str, answer: &CachedAnswer, ttl: Duration) -> Result<()> {
        let payload = serde_json::to_string(answer).context("Failed to serialize answer")?;
        let now = Utc::now();
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = now.timestamp().saturating_add(ttl_secs);

        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO answers (key, payload, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![key, payload, now.to_rfc3339(), expires_at],
        )
        .context("Failed to write cache entry")?;

        tracing::debug!("Cache set for {}", key);
        Ok(())
    }

    /// 키 삭제
    pub fn remove(&self, key: &str) -> Result<bool> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM answers WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }

    /// 만료되지 않은 키 존재 여부
    pub fn contains(&self, key: &str) -> Result<bool> {
        let conn = self.lock()?;
        let now = Utc::now().timestamp();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM answers WHERE key = ?1 AND expires_at > ?2",
            params![key, now],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// 접두사로 시작하는 모든 키 삭제
    pub fn clear_prefix(&self, prefix: &str) -> Result<usize> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "DELETE FROM answers WHERE substr(key, 1, length(?1)) = ?1",
            params![prefix],
        )?;
        tracing::info!("Cleared {} cache entries with prefix {:?}", rows, prefix);
        Ok(rows)
    }

    /// 만료된 항목 삭제
    pub fn purge_expired(&self) -> Result<usize> {
        let conn = self.lock()?;
        let now = Utc::now().timestamp();
        let rows = conn.execute("DELETE FROM answers WHERE expires_at <= ?1", params![now])?;
        Ok(rows)
    }

    /// 캐시 통계
    pub fn stats(&self) -> Result<CacheStats> {
        let conn = self.lock()?;
        let now = Utc::now().timestamp();

        let entries: i64 = conn.query_row(
            "SELECT COUNT(*) FROM answers WHERE expires_at > ?1",
            params![now],
            |row| row.get(0),
        )?;
        let expired: i64 = conn.query_row(
            "SELECT COUNT(*) FROM answers WHERE expires_at <= ?1",
            params![now],
            |row| row.get(0),
        )?;

        Ok(CacheStats {
            entries: entries as usize,
            expired: expired as usize,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            db_path: self.db_path.clone(),
        })
    }
}

/// 요청 옵션을 포함한 캐시 키 (`chat:` + SHA-256 hex)
pub fn cache_key(request: &RagRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request.question.trim().to_lowercase().as_bytes());
    hasher.update([0u8]);
    hasher.update(request.language.code().as_bytes());
    hasher.update([0u8]);
    hasher.update(request.num_web_sources.to_le_bytes());
    hasher.update([
        request.include_knowledge_base as u8,
        request.domain_focus as u8,
    ]);
    format!("{}{}", CHAT_PREFIX, hex::encode(hasher.finalize()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_cache(dir: &TempDir) -> AnswerCache {
        AnswerCache::open(&dir.path().join("cache.db"), Duration::from_secs(60)).expect("open")
    }

    fn sample() -> CachedAnswer {
        CachedAnswer {
            text: "Paris".to_string(),
            language: Language::Fr,
            sources: vec![SearchResult::new("Wiki", "https://wiki.example")],
        }
    }

    #[test]
    fn test_put_get_roundtrip_counts_hits() {
        let dir = TempDir::new().expect("tempdir");
        let cache = open_cache(&dir);

        assert!(cache.get("chat:a").expect("get").is_none());
        cache.put("chat:a", &sample()).expect("put");
        assert_eq!(cache.get("chat:a").expect("get"), Some(sample()));
        assert!(cache.contains("chat:a").expect("contains"));

        let stats = cache.stats().expect("stats");
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_expired_entries_are_invisible() {
        let dir = TempDir::new().expect("tempdir");
        let cache = open_cache(&dir);

        cache
            .put_with_ttl("chat:old", &sample(), Duration::from_secs(0))
            .expect("put");
        assert!(cache.get("chat:old").expect("get").is_none());
        assert!(!cache.contains("chat:old").expect("contains"));
        assert_eq!(cache.stats().expect("stats").expired, 1);
        assert_eq!(cache.purge_expired().expect("purge"), 1);
    }

    #[test]
    fn test_huge_ttl_saturates_instead_of_expiring() {
        let dir = TempDir::new().expect("tempdir");
        let cache = open_cache(&dir);

        cache
            .put_with_ttl("chat:max", &sample(), Duration::from_secs(u64::MAX))
            .expect("put");
        cache
            .put_with_ttl("chat:i64", &sample(), Duration::from_secs(i64::MAX as u64))
            .expect("put");

        assert_eq!(cache.get("chat:max").expect("get"), Some(sample()));
        assert_eq!(cache.get("chat:i64").expect("get"), Some(sample()));
    }

    #[test]
    fn test_remove_and_clear_prefix() {
        let dir = TempDir::new().expect("tempdir");
        let cache = open_cache(&dir);

        cache.put("chat:1", &sample()).expect("put");
        cache.put("chat:2", &sample()).expect("put");
        cache.put("other:1", &sample()).expect("put");

        assert!(cache.remove("chat:1").expect("remove"));
        assert!(!cache.remove("chat:1").expect("remove"));
        assert_eq!(cache.clear_prefix(CHAT_PREFIX).expect("clear"), 1);
        assert!(cache.contains("other:1").expect("contains"));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().expect("tempdir");
        open_cache(&dir).put("chat:p", &sample()).expect("put");
        let reopened = open_cache(&dir);
        assert_eq!(reopened.get("chat:p").expect("get"), Some(sample()));
    }

    #[test]
    fn test_cache_key_depends_on_options() {
        let base = RagRequest::new("What is M-Pesa?");
        let key = cache_key(&base);
        assert!(key.starts_with(CHAT_PREFIX));
        assert_eq!(key, cache_key(&RagRequest::new("  what is m-pesa?  ")));
        assert_ne!(key, cache_key(&base.clone().language(Language::Fr)));
        assert_ne!(key, cache_key(&base.clone().web_sources(3)));
        assert_ne!(key, cache_key(&base.clone().domain_focus(false)));
    }

    #[test]
    fn test_only_answered_outcomes_are_cacheable() {
        let answer = Answer {
            text: "Sorry".to_string(),
            language: Language::En,
            sources: vec![],
            outcome: AnswerOutcome::Apology,
        };
        assert!(CachedAnswer::from_answer(&answer).is_none());

        let ok = Answer {
            outcome: AnswerOutcome::Answered,
            ..answer
        };
        let cached = CachedAnswer::from_answer(&ok).expect("cacheable");
        assert_eq!(cached.into_answer(), ok);
    }
}
