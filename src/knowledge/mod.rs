//! Knowledge 모듈 - 요청 단위 검색 코퍼스
//!
//! - Chunker: 단어 윈도우 텍스트 분할
//! - KnowledgeBase: 정적 도메인 지식 (시작 시 1회 로드)
//! - VectorIndex: 인메모리 코사인 유사도 top-k 검색

mod base;
mod chunker;
mod index;

// Re-exports
pub use base::KnowledgeBase;
pub use chunker::{
    chunk_text, ChunkConfig, ChunkError, ChunkOrigin, Chunker, TextChunk, WordChunker,
};
pub use index::{cosine_similarity, IndexError, RetrievedDocument, VectorIndex};
