//! RAG 파이프라인 통합 테스트
//!
//! 네트워크 없이 가짜 검색/페이지/모델 프로바이더로 전체 흐름을 검증합니다.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use baobab_rag::{
    AnswerOutcome, CompletionError, CompletionProvider, FetchError, FetchOutcome,
    HashingEmbedding, KnowledgeBase, Language, PageFetcher, PipelineSettings, RagRequest,
    RagService, ScrapedContent, SearchError, SearchProvider, SearchResult,
};

// ============================================================================
// Fakes
// ============================================================================

/// 고정 결과를 돌려주고 받은 질의를 기록하는 검색
struct FixedSearch {
    results: Vec<SearchResult>,
    queries: Mutex<Vec<String>>,
}

impl FixedSearch {
    fn new(results: Vec<SearchResult>) -> Arc<Self> {
        Arc::new(Self {
            results,
            queries: Mutex::new(vec![]),
        })
    }

    fn queries(&self) -> Vec<String> {
        self.queries.lock().expect("lock").clone()
    }
}

#[async_trait]
impl SearchProvider for FixedSearch {
    async fn search(&self, query: &str, num_results: usize) -> Result<Vec<SearchResult>, SearchError> {
        self.queries.lock().expect("lock").push(query.to_string());
        Ok(self.results.iter().take(num_results).cloned().collect())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// URL → 본문. 없는 URL은 404 실패
struct MapFetcher {
    pages: HashMap<String, String>,
}

impl MapFetcher {
    fn new<I>(pages: I) -> Arc<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Arc::new(Self {
            pages: pages.into_iter().collect(),
        })
    }
}

#[async_trait]
impl PageFetcher for MapFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        match self.pages.get(url) {
            Some(content) => FetchOutcome::Fetched(ScrapedContent {
                title: Some("Page title".to_string()),
                content: content.clone(),
                url: url.to_string(),
            }),
            None => FetchOutcome::Failed(FetchError::Status(404)),
        }
    }
}

/// 프롬프트의 CONTEXT 블록을 그대로 돌려주고 프롬프트를 기록하는 모델
#[derive(Default)]
struct ContextEcho {
    prompts: Mutex<Vec<String>>,
}

impl ContextEcho {
    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("lock").clone()
    }
}

#[async_trait]
impl CompletionProvider for ContextEcho {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.prompts.lock().expect("lock").push(prompt.to_string());
        let context = prompt
            .split("CONTEXT:\n")
            .nth(1)
            .and_then(|rest| rest.split("\n\nQUESTION:").next())
            .unwrap_or_default();
        Ok(context.to_string())
    }

    fn name(&self) -> &str {
        "echo"
    }
}

struct DownLlm;

#[async_trait]
impl CompletionProvider for DownLlm {
    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        Err(CompletionError::Api {
            status: 503,
            message: "service unavailable".to_string(),
        })
    }

    fn name(&self) -> &str {
        "down"
    }
}

fn build(
    search: Arc<FixedSearch>,
    fetcher: Arc<MapFetcher>,
    llm: Arc<dyn CompletionProvider>,
    knowledge: KnowledgeBase,
    settings: PipelineSettings,
) -> RagService {
    RagService::new(
        search,
        fetcher,
        Arc::new(HashingEmbedding::default()),
        llm,
        Arc::new(knowledge),
        settings,
    )
    .expect("service")
}

fn page(i: usize) -> (SearchResult, (String, String)) {
    let link = format!("https://news{}.example.africa/mobile-money", i);
    let content = format!(
        "Report number {} describes mobile money adoption across East African markets and merchants.",
        i
    );
    (
        SearchResult::new(format!("Report {}", i), link.clone()),
        (link, content),
    )
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn zero_search_results_still_answers_from_knowledge_base() {
    let llm = Arc::new(ContextEcho::default());
    let svc = build(
        FixedSearch::new(vec![]),
        MapFetcher::new(Vec::new()),
        llm.clone(),
        KnowledgeBase::african(),
        PipelineSettings::default(),
    );

    let answer = svc
        .run_rag(&RagRequest::new("How is mobile money used in Kenya?"))
        .await;

    assert_eq!(answer.outcome, AnswerOutcome::Answered);
    assert!(!answer.text.trim().is_empty());
    assert!(answer.sources.is_empty());
    assert!(!answer.text.contains("📚"));
}

#[tokio::test]
async fn failed_fetches_fall_back_to_knowledge_only_retrieval() {
    let results: Vec<SearchResult> = (1..=3).map(|i| page(i).0).collect();
    let settings = PipelineSettings {
        retrieval_k: 3,
        ..PipelineSettings::default()
    };
    let knowledge = KnowledgeBase::from_entries((1..=10).map(|i| format!("knowledge fact {}", i)));
    let svc = build(
        FixedSearch::new(results),
        MapFetcher::new(Vec::new()),
        Arc::new(ContextEcho::default()),
        knowledge.clone(),
        settings,
    );

    let answer = svc.run_rag(&RagRequest::new("knowledge fact")).await;

    assert_eq!(answer.outcome, AnswerOutcome::Answered);
    let lines: Vec<&str> = answer.text.lines().collect();
    assert_eq!(lines.len(), 3);
    for line in lines {
        assert!(knowledge.entries().iter().any(|e| e == line), "unexpected line {:?}", line);
    }
    assert!(answer.sources.is_empty());
}

#[tokio::test]
async fn knowledge_base_fact_answers_without_web_results() {
    let fact = "La capitale de la France est Paris.";
    let question = RagRequest::new("Quelle est la capitale de la France ?").language(Language::Fr);

    let only_fact = build(
        FixedSearch::new(vec![]),
        MapFetcher::new(Vec::new()),
        Arc::new(ContextEcho::default()),
        KnowledgeBase::from_entries([fact]),
        PipelineSettings::default(),
    );
    let answer = only_fact.run_rag(&question).await;
    assert_eq!(answer.outcome, AnswerOutcome::Answered);
    assert!(answer.text.contains("Paris"));
    assert!(answer.sources.is_empty());

    let mut entries = KnowledgeBase::african().entries().to_vec();
    entries.push(fact.to_string());
    let mixed = build(
        FixedSearch::new(vec![]),
        MapFetcher::new(Vec::new()),
        Arc::new(ContextEcho::default()),
        KnowledgeBase::from_entries(entries),
        PipelineSettings::default(),
    );
    let answer = mixed.run_rag(&question).await;
    assert_eq!(answer.outcome, AnswerOutcome::Answered);
    assert!(answer.text.contains("Paris"));
}

#[tokio::test]
async fn web_content_reaches_the_answer_with_citation() {
    let link = "https://encyclopedia.example/france".to_string();
    let content = "The capital of France is Paris. It is the largest city in the country \
        and home to many institutions."
        .to_string();
    let svc = build(
        FixedSearch::new(vec![SearchResult::new("France", link.clone())]),
        MapFetcher::new(vec![(link.clone(), content)]),
        Arc::new(ContextEcho::default()),
        KnowledgeBase::default(),
        PipelineSettings::default(),
    );

    let request = RagRequest::new("What is the capital of France?").knowledge_base(false);
    let answer = svc.run_rag(&request).await;

    assert_eq!(answer.outcome, AnswerOutcome::Answered);
    assert!(answer.text.contains("Paris"));
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].link, link);
    assert!(answer.text.contains(&format!("• France - {}", link)));
}

#[tokio::test]
async fn generation_failure_returns_french_apology() {
    let (result, page) = page(1);
    let svc = build(
        FixedSearch::new(vec![result]),
        MapFetcher::new(vec![page]),
        Arc::new(DownLlm),
        KnowledgeBase::african(),
        PipelineSettings::default(),
    );

    let request = RagRequest::new("Qu'est-ce que M-Pesa ?").language(Language::Fr);
    let answer = svc.run_rag(&request).await;

    assert_eq!(answer.outcome, AnswerOutcome::Apology);
    assert!(answer.text.contains("Désolé"));
    assert!(answer.sources.is_empty());
}

#[tokio::test]
async fn at_most_three_sources_are_cited() {
    let (results, pages): (Vec<_>, Vec<_>) = (1..=5).map(page).unzip();
    let svc = build(
        FixedSearch::new(results),
        MapFetcher::new(pages),
        Arc::new(ContextEcho::default()),
        KnowledgeBase::african(),
        PipelineSettings::default(),
    );

    let answer = svc
        .run_rag(&RagRequest::new("mobile money adoption").web_sources(5))
        .await;

    assert_eq!(answer.sources.len(), 3);
    let titles: Vec<&str> = answer.sources.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Report 1", "Report 2", "Report 3"]);
    assert_eq!(answer.text.matches("\n• ").count(), 3);
    assert!(!answer.text.contains("Report 4 -"));
}

#[tokio::test]
async fn unsupported_language_uses_english_deterministically() {
    let llm = Arc::new(ContextEcho::default());
    let svc = build(
        FixedSearch::new(vec![]),
        MapFetcher::new(Vec::new()),
        llm.clone(),
        KnowledgeBase::african(),
        PipelineSettings::default(),
    );

    let question = "What are the AI opportunities in Lagos?";
    let unknown = svc
        .run_rag(&RagRequest::new(question).language(Language::from_code("xx")))
        .await;
    let english = svc.run_rag(&RagRequest::new(question)).await;

    assert_eq!(unknown.language, Language::En);
    assert_eq!(unknown.text, english.text);

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[0], prompts[1]);
    assert!(prompts[0].starts_with("You are an AI expert"));
}

#[tokio::test]
async fn domain_focus_rewrites_search_query() {
    let search = FixedSearch::new(vec![]);
    let svc = build(
        search.clone(),
        MapFetcher::new(Vec::new()),
        Arc::new(ContextEcho::default()),
        KnowledgeBase::african(),
        PipelineSettings::default(),
    );

    svc.run_rag(&RagRequest::new("fintech regulation")).await;
    svc.run_rag(&RagRequest::new("fintech regulation").domain_focus(false))
        .await;
    svc.run_rag(&RagRequest::new("fintech regulation in Nigeria")).await;

    let queries = search.queries();
    assert_eq!(queries[0], "fintech regulation Africa African business");
    assert_eq!(queries[1], "fintech regulation");
    assert_eq!(queries[2], "fintech regulation in Nigeria");
}

#[tokio::test]
async fn blank_result_title_uses_page_title() {
    let (mut result, page) = page(1);
    result.title = String::new();
    let svc = build(
        FixedSearch::new(vec![result]),
        MapFetcher::new(vec![page]),
        Arc::new(ContextEcho::default()),
        KnowledgeBase::default(),
        PipelineSettings::default(),
    );

    let answer = svc.run_rag(&RagRequest::new("mobile money")).await;

    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].title, "Page title");
}
