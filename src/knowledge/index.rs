//! In-memory Vector Index
//!
//! 요청마다 새로 만드는 인메모리 인덱스입니다.
//! 코퍼스 전체를 임베딩한 뒤 코사인 유사도로 상위 k개를 반환합니다.

use thiserror::Error;

use crate::embedding::{EmbeddingError, EmbeddingProvider};

use super::chunker::{ChunkOrigin, TextChunk};

// ============================================================================
// Types
// ============================================================================

/// 질문과 관련된 것으로 선택된 청크
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedDocument {
    pub content: String,
    pub origin: ChunkOrigin,
    /// 코사인 유사도 (순위용, 임계값 없음)
    pub score: f32,
}

/// 인덱스 오류
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("cannot build a vector index over an empty corpus")]
    EmptyCorpus,
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error("embedding provider returned {got} vectors for {expected} chunks")]
    CountMismatch { expected: usize, got: usize },
}

// ============================================================================
// VectorIndex
// ============================================================================

/// 인메모리 벡터 인덱스
#[derive(Debug, Clone)]
pub struct VectorIndex {
    chunks: Vec<TextChunk>,
    embeddings: Vec<Vec<f32>>,
}

impl VectorIndex {
    /// 코퍼스를 임베딩하여 인덱스 생성
    ///
    /// 빈 코퍼스는 거부합니다. 호출자는 먼저 비었는지 확인하고
    /// 대체 컨텍스트를 사용해야 합니다.
    pub async fn build(
        embedder: &dyn EmbeddingProvider,
        corpus: Vec<TextChunk>,
    ) -> Result<Self, IndexError> {
        if corpus.is_empty() {
            return Err(IndexError::EmptyCorpus);
        }

        let texts: Vec<String> = corpus.iter().map(|c| c.content.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;

        if embeddings.len() != corpus.len() {
            return Err(IndexError::CountMismatch {
                expected: corpus.len(),
                got: embeddings.len(),
            });
        }

        tracing::debug!(
            "Built vector index: {} chunks via {}",
            corpus.len(),
            embedder.name()
        );

        Ok(Self {
            chunks: corpus,
            embeddings,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// 질문을 임베딩하여 상위 k개 검색
    pub async fn query(
        &self,
        embedder: &dyn EmbeddingProvider,
        question: &str,
        k: usize,
    ) -> Result<Vec<RetrievedDocument>, IndexError> {
        let query_embedding = embedder.embed(question).await?;
        Ok(self.nearest(&query_embedding, k))
    }

    /// 임베딩 벡터로 상위 k개 검색 (유사도 내림차순, 동점은 삽입 순서)
    pub fn nearest(&self, query_embedding: &[f32], k: usize) -> Vec<RetrievedDocument> {
        let mut scored: Vec<(usize, f32)> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(query_embedding, e)))
            .collect();

        // sort_by는 안정 정렬이므로 동점은 삽입 순서 유지
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        scored
            .into_iter()
            .take(k)
            .map(|(i, score)| RetrievedDocument {
                content: self.chunks[i].content.clone(),
                origin: self.chunks[i].origin.clone(),
                score,
            })
            .collect()
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 코사인 유사도 계산
///
/// 결과는 -1.0 ~ 1.0 범위이며, 길이가 다르거나 영벡터면 0.0입니다.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

// ============================================================================
// Tests
// ============================================================================
