//! Text Chunking Module
//!
//! 단어 단위 고정 크기 윈도우 분할을 제공합니다.
//! 윈도우는 `chunk_size - overlap` 단어씩 전진하며,
//! 너무 짧은 윈도우(꼬리 조각)는 버립니다.

use std::fmt;

use thiserror::Error;

// ============================================================================
// Types
// ============================================================================

/// 청크 출처
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOrigin {
    /// 웹 검색 결과 페이지
    Web { title: String, link: String },
    /// 정적 지식베이스 항목
    KnowledgeBase,
}

impl fmt::Display for ChunkOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkOrigin::Web { title, link } => write!(f, "{} ({})", title, link),
            ChunkOrigin::KnowledgeBase => f.write_str("knowledge-base"),
        }
    }
}

/// 임베딩 단위가 되는 텍스트 조각
///
/// `content`는 비어 있지 않습니다.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub content: String,
    pub origin: ChunkOrigin,
}

impl TextChunk {
    /// 내용이 공백뿐이면 `None`
    pub fn new(content: impl Into<String>, origin: ChunkOrigin) -> Option<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            return None;
        }
        Some(Self { content, origin })
    }

    /// 지식베이스 청크 생성
    pub fn knowledge(content: impl Into<String>) -> Option<Self> {
        Self::new(content, ChunkOrigin::KnowledgeBase)
    }
}

/// 청킹 설정 오류
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error("chunk size must be greater than zero")]
    ZeroSize,
    #[error("overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    InvalidOverlap { chunk_size: usize, overlap: usize },
}

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정 (생성 시 검증됨)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    chunk_size: usize,
    overlap: usize,
    min_chars: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 600,
            overlap: 100,
            min_chars: 50,
        }
    }
}

impl ChunkConfig {
    /// 검증된 설정 생성
    ///
    /// `overlap >= chunk_size`이면 윈도우가 전진하지 못하므로 거부합니다.
    pub fn new(chunk_size: usize, overlap: usize, min_chars: usize) -> Result<Self, ChunkError> {
        if chunk_size == 0 {
            return Err(ChunkError::ZeroSize);
        }
        if overlap >= chunk_size {
            return Err(ChunkError::InvalidOverlap {
                chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
            min_chars,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn min_chars(&self) -> usize {
        self.min_chars
    }

    /// 윈도우 전진 폭
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str, origin: &ChunkOrigin) -> Vec<TextChunk>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// WordChunker
// ============================================================================

/// 단어 윈도우 청커
#[derive(Debug, Clone, Default)]
pub struct WordChunker {
    config: ChunkConfig,
}

impl WordChunker {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }
}

impl Chunker for WordChunker {
    fn chunk(&self, text: &str, origin: &ChunkOrigin) -> Vec<TextChunk> {
        split_windows(text, &self.config)
            .into_iter()
            .filter_map(|content| TextChunk::new(content, origin.clone()))
            .collect()
    }

    fn name(&self) -> &'static str {
        "WordChunker"
    }
}

// ============================================================================
// Functions
// ============================================================================

/// 텍스트를 단어 윈도우로 분할
///
/// # Panics
/// `overlap >= chunk_size` 또는 `chunk_size == 0`이면 패닉합니다.
/// 호출자가 보장해야 하는 전제 조건이며, 설정 값이라면 `ChunkConfig::new`를 사용하세요.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize, min_chars: usize) -> Vec<String> {
    assert!(
        chunk_size > 0 && overlap < chunk_size,
        "overlap ({}) must be smaller than chunk size ({})",
        overlap,
        chunk_size
    );
    let config = ChunkConfig {
        chunk_size,
        overlap,
        min_chars,
    };
    split_windows(text, &config)
}

fn split_windows(text: &str, config: &ChunkConfig) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();

    if words.is_empty() {
        return vec![];
    }

    let keep = |chunk: &str| chunk.chars().count() > config.min_chars;

    if words.len() <= config.chunk_size {
        let trimmed = text.trim();
        return if keep(trimmed) {
            vec![trimmed.to_string()]
        } else {
            vec![]
        };
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let end = (start + config.chunk_size).min(words.len());
        let chunk = words[start..end].join(" ");
        if keep(&chunk) {
            chunks.push(chunk);
        }

        if end >= words.len() {
            break;
        }

        start += config.step();
    }

    chunks
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_chunk_text_windows() {
        let text = "a b c d e f g h i j";
        let chunks = chunk_text(text, 4, 1, 0);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "a b c d");
        assert_eq!(chunks[1], "d e f g");
        assert_eq!(chunks[2], "g h i j");
    }

    #[test]
    fn test_chunk_text_empty() {
        assert!(chunk_text("", 4, 1, 0).is_empty());
        assert!(chunk_text("   \n\t ", 4, 1, 0).is_empty());
    }

    #[test]
    fn test_short_text_is_single_trimmed_chunk() {
        let text = "  Mobile money   drives fintech adoption across East Africa today.  ";
        let chunks = chunk_text(text, 50, 10, 20);
        assert_eq!(chunks, vec![text.trim().to_string()]);
    }

    #[test]
    fn test_short_text_under_threshold_is_dropped() {
        let chunks = chunk_text("too short", 50, 10, 50);
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_chunk_count_formula() {
        for (n, size, overlap) in [(10, 4, 1), (100, 30, 5), (61, 20, 0), (1000, 600, 100)] {
            let chunks = chunk_text(&words(n), size, overlap, 0);
            let step = size - overlap;
            let expected = (n - overlap).div_ceil(step);
            assert_eq!(chunks.len(), expected, "n={} size={} overlap={}", n, size, overlap);
        }
    }

    #[test]
    fn test_consecutive_chunks_share_overlap_words() {
        let overlap = 3;
        let chunks = chunk_text(&words(40), 10, overlap, 0);
        for pair in chunks.windows(2) {
            let prev: Vec<&str> = pair[0].split(' ').collect();
            let next: Vec<&str> = pair[1].split(' ').collect();
            assert_eq!(&prev[prev.len() - overlap..], &next[..overlap]);
        }
    }

    #[test]
    fn test_trailing_fragment_below_threshold_dropped() {
        // 마지막 윈도우 "w8 w9"는 min_chars 미만
        let text = words(10);
        let chunks = chunk_text(&text, 8, 0, 10);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].starts_with("w0"));
    }

    #[test]
    #[should_panic(expected = "must be smaller than chunk size")]
    fn test_chunk_text_rejects_overlap_equal_to_size() {
        let _ = chunk_text("a b c", 4, 4, 0);
    }

    #[test]
    fn test_config_rejects_invalid_overlap() {
        assert_eq!(
            ChunkConfig::new(10, 10, 0),
            Err(ChunkError::InvalidOverlap {
                chunk_size: 10,
                overlap: 10
            })
        );
        assert_eq!(ChunkConfig::new(0, 0, 0), Err(ChunkError::ZeroSize));
        assert!(ChunkConfig::new(10, 9, 0).is_ok());
    }

    #[test]
    fn test_default_config() {
        let config = ChunkConfig::default();
        assert_eq!(config.chunk_size(), 600);
        assert_eq!(config.overlap(), 100);
        assert_eq!(config.step(), 500);
    }

    #[test]
    fn test_word_chunker_tags_origin() {
        let chunker = WordChunker::new(ChunkConfig::new(5, 1, 0).expect("config"));
        let origin = ChunkOrigin::Web {
            title: "Kenya tech".to_string(),
            link: "https://example.com/kenya".to_string(),
        };
        let chunks = chunker.chunk(&words(12), &origin);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.origin == origin));
        assert!(chunks.iter().all(|c| !c.content.is_empty()));
    }

    #[test]
    fn test_text_chunk_rejects_blank() {
        assert!(TextChunk::knowledge("   ").is_none());
        assert!(TextChunk::knowledge("Nairobi hosts many tech hubs.").is_some());
    }

    #[test]
    fn test_origin_display() {
        let origin = ChunkOrigin::Web {
            title: "Zindi".to_string(),
            link: "https://zindi.africa".to_string(),
        };
        assert_eq!(origin.to_string(), "Zindi (https://zindi.africa)");
        assert_eq!(ChunkOrigin::KnowledgeBase.to_string(), "knowledge-base");
    }
}
