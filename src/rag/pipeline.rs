//! RAG 파이프라인
//!
//! 검색 → 페이지 추출/청킹 → 코퍼스 조립 → 인덱스/검색 → 프롬프트 → 생성.
//! 단계는 순차로만 진행되고, 인덱스는 요청마다 새로 만듭니다.

use std::sync::Arc;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{AppConfig, PipelineSettings};
use crate::embedding::{EmbeddingProvider, HashingEmbedding, OpenAiEmbedding};
use crate::knowledge::{
    ChunkConfig, ChunkError, ChunkOrigin, Chunker, IndexError, KnowledgeBase, TextChunk,
    VectorIndex, WordChunker,
};
use crate::llm::{CompletionProvider, OpenAiCompletion};
use crate::scraper::{FetchOutcome, PageFetcher, WebScraper};
use crate::search::{SearchProvider, SearchResult, SerpApiSearch, WebSearchClient};

use super::prompt::{Language, PromptComposer};
use super::synthesizer::{AnswerOutcome, AnswerSynthesizer, MAX_CITED_SOURCES};

// ============================================================================
// Types
// ============================================================================

/// 파이프라인 요청
#[derive(Debug, Clone, PartialEq)]
pub struct RagRequest {
    pub question: String,
    pub language: Language,
    /// 가져올 웹 출처 수
    pub num_web_sources: usize,
    /// 정적 지식베이스를 코퍼스에 포함할지
    pub include_knowledge_base: bool,
    /// 검색 질의에 지역 보정을 적용할지
    pub domain_focus: bool,
}

impl RagRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            language: Language::En,
            num_web_sources: 5,
            include_knowledge_base: true,
            domain_focus: true,
        }
    }

    pub fn language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn web_sources(mut self, n: usize) -> Self {
        self.num_web_sources = n;
        self
    }

    pub fn knowledge_base(mut self, include: bool) -> Self {
        self.include_knowledge_base = include;
        self
    }

    pub fn domain_focus(mut self, focus: bool) -> Self {
        self.domain_focus = focus;
        self
    }
}

/// 최종 답변
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub language: Language,
    /// 인용된 웹 출처 (순위 순, 최대 3개)
    pub sources: Vec<SearchResult>,
    pub outcome: AnswerOutcome,
}

/// 파이프라인 경계에서 잡히는 오류
#[derive(Debug, Error)]
pub enum RagError {
    #[error("question is empty")]
    EmptyQuestion,
    #[error(transparent)]
    Chunking(#[from] ChunkError),
    #[error(transparent)]
    Index(#[from] IndexError),
}

// ============================================================================
// RagService
// ============================================================================

/// RAG 서비스
///
/// 시작 시 한 번 생성하여 `Arc`로 공유합니다. 요청 간 가변 상태는 없습니다.
pub struct RagService {
    search: WebSearchClient,
    fetcher: Arc<dyn PageFetcher>,
    chunker: WordChunker,
    knowledge: Arc<KnowledgeBase>,
    embedder: Arc<dyn EmbeddingProvider>,
    composer: PromptComposer,
    synthesizer: AnswerSynthesizer,
    settings: PipelineSettings,
}

impl RagService {
    /// 구성 요소로 서비스 생성
    pub fn new(
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn PageFetcher>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn CompletionProvider>,
        knowledge: Arc<KnowledgeBase>,
        settings: PipelineSettings,
    ) -> Result<Self, RagError> {
        let chunk_config = ChunkConfig::new(
            settings.chunk_words,
            settings.chunk_overlap,
            settings.min_chunk_chars,
        )?;

        Ok(Self {
            search: WebSearchClient::new(search),
            fetcher,
            chunker: WordChunker::new(chunk_config),
            knowledge,
            embedder,
            composer: PromptComposer,
            synthesizer: AnswerSynthesizer::new(llm),
            settings,
        })
    }

    /// 설정에서 실제 프로바이더로 서비스 생성
    ///
    /// OpenAI 키가 없으면 임베딩은 오프라인 해싱 임베딩으로 대체됩니다.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let settings = config.pipeline.clone();

        let search = SerpApiSearch::new(config.serpapi_api_key.clone(), settings.api_timeout)
            .context("Failed to create search client")?;
        let fetcher = WebScraper::new(settings.fetch_timeout, settings.fetch_max_chars)
            .context("Failed to create web scraper")?;

        let embedder: Arc<dyn EmbeddingProvider> = match &config.openai_api_key {
            Some(key) => Arc::new(
                OpenAiEmbedding::new(
                    key.clone(),
                    &config.openai_base_url,
                    &config.embedding_model,
                    settings.api_timeout,
                )
                .context("Failed to create embedder")?,
            ),
            None => {
                tracing::warn!("OPENAI_API_KEY not set, using offline hashing embeddings");
                Arc::new(HashingEmbedding::default())
            }
        };

        let llm = OpenAiCompletion::new(
            config.openai_api_key.clone(),
            &config.openai_base_url,
            &config.completion_model,
            settings.api_timeout,
        )
        .context("Failed to create completion client")?;

        let knowledge = match &config.knowledge_file {
            Some(path) => KnowledgeBase::from_json_file(path)?,
            None => KnowledgeBase::african(),
        };

        tracing::info!(
            "RAG service ready: {} knowledge entries, embedder={}",
            knowledge.len(),
            embedder.name()
        );

        Self::new(
            Arc::new(search),
            Arc::new(fetcher),
            embedder,
            Arc::new(llm),
            Arc::new(knowledge),
            settings,
        )
        .context("Invalid pipeline settings")
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// 파이프라인 실행
    ///
    /// 항상 답변을 반환합니다. 경계까지 올라온 오류는 일반 오류 문구로 바뀝니다.
    pub async fn run_rag(&self, request: &RagRequest) -> Answer {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("rag", %request_id, language = %request.language);

        async {
            match self.try_run(request).await {
                Ok(answer) => answer,
                Err(e) => {
                    tracing::error!("RAG pipeline failed: {}", e);
                    Answer {
                        text: format!("Error processing your question: {}", e),
                        language: request.language,
                        sources: vec![],
                        outcome: AnswerOutcome::Failed,
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn try_run(&self, request: &RagRequest) -> Result<Answer, RagError> {
        let question = request.question.trim();
        if question.is_empty() {
            return Err(RagError::EmptyQuestion);
        }

        // 1. 검색
        let results = self
            .search
            .search(question, request.num_web_sources, request.domain_focus)
            .await;

        // 2. 페이지 추출 + 청킹
        let (web_chunks, cited) = self.collect_web_chunks(&results).await;
        tracing::info!(
            "Collected {} web chunks from {}/{} sources",
            web_chunks.len(),
            cited.len(),
            results.len()
        );

        // 3. 코퍼스 조립
        let mut corpus = web_chunks;
        if request.include_knowledge_base {
            corpus.extend(self.knowledge.chunks());
        }

        // 4. 인덱스 + 검색
        let context = if corpus.is_empty() {
            tracing::debug!("Empty corpus, using knowledge base fallback");
            self.fallback_context()
        } else {
            match self.retrieve(corpus, question).await {
                Ok(context) => context,
                Err(e) => {
                    tracing::warn!("Retrieval failed, using knowledge base fallback: {}", e);
                    self.fallback_context()
                }
            }
        };

        // 5. 프롬프트
        let prompt = self.composer.compose(question, &context, request.language);

        // 6. 생성
        let synthesis = self
            .synthesizer
            .synthesize(&prompt, request.language, &cited)
            .await;

        let sources = match synthesis.outcome {
            AnswerOutcome::Answered => cited.into_iter().take(MAX_CITED_SOURCES).collect(),
            _ => vec![],
        };

        Ok(Answer {
            text: synthesis.text,
            language: request.language,
            sources,
            outcome: synthesis.outcome,
        })
    }

    /// 검색 결과를 순서대로 가져와 청킹. 청크를 낸 출처만 인용 대상
    async fn collect_web_chunks(
        &self,
        results: &[SearchResult],
    ) -> (Vec<TextChunk>, Vec<SearchResult>) {
        let mut chunks = Vec::new();
        let mut cited = Vec::new();

        for result in results {
            let page = match self.fetcher.fetch(&result.link).await {
                FetchOutcome::Fetched(page) => page,
                FetchOutcome::Empty | FetchOutcome::Failed(_) => continue,
            };

            let title = if result.title.trim().is_empty() {
                page.title.clone().unwrap_or_default()
            } else {
                result.title.clone()
            };
            let origin = ChunkOrigin::Web {
                title: title.clone(),
                link: result.link.clone(),
            };

            let page_chunks = self.chunker.chunk(&page.content, &origin);
            if page_chunks.is_empty() {
                continue;
            }

            chunks.extend(page_chunks);
            cited.push(SearchResult {
                title,
                ..result.clone()
            });
        }

        (chunks, cited)
    }

    async fn retrieve(&self, corpus: Vec<TextChunk>, question: &str) -> Result<String, RagError> {
        let index = VectorIndex::build(self.embedder.as_ref(), corpus).await?;
        let docs = index
            .query(self.embedder.as_ref(), question, self.settings.retrieval_k)
            .await?;

        tracing::debug!("Retrieved {} of {} chunks", docs.len(), index.len());

        Ok(docs
            .iter()
            .map(|d| d.content.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn fallback_context(&self) -> String {
        self.knowledge
            .fallback_slice(self.settings.fallback_entries)
            .join("\n")
    }
}

// ============================================================================
// Tests
// ============================================================================
