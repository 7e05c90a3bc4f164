//! baobab-rag - 아프리카 비즈니스 맥락 RAG 챗봇 백엔드
//!
//! 웹 검색 + 페이지 추출 + 정적 지식베이스를 임베딩 검색으로 묶어
//! 다국어 답변을 생성합니다.

pub mod cache;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod knowledge;
pub mod llm;
pub mod rag;
pub mod scraper;
pub mod search;
pub mod server;

// Re-exports
pub use cache::{cache_key, AnswerCache, CacheStats, CachedAnswer};
pub use config::{get_data_dir, AppConfig, PipelineSettings};
pub use embedding::{EmbeddingError, EmbeddingProvider, HashingEmbedding, OpenAiEmbedding};
pub use knowledge::{
    chunk_text, ChunkConfig, ChunkOrigin, Chunker, KnowledgeBase, RetrievedDocument, TextChunk,
    VectorIndex, WordChunker,
};
pub use llm::{CompletionError, CompletionProvider, OpenAiCompletion};
pub use rag::{Answer, AnswerOutcome, Language, PromptComposer, RagError, RagRequest, RagService};
pub use scraper::{FetchError, FetchOutcome, PageFetcher, ScrapedContent, WebScraper};
pub use search::{SearchError, SearchProvider, SearchResult, SerpApiSearch, WebSearchClient};
pub use server::{router, AppState};
