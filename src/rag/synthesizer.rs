//! 답변 생성기
//!
//! 프롬프트를 완성 모델로 보내고, 사용된 웹 출처를 최대 3개까지 덧붙입니다.
//! 생성 실패는 언어별 고정 사과 문구로 대체하며 재시도하지 않습니다.

use std::sync::Arc;

use serde::Serialize;

use crate::llm::CompletionProvider;
use crate::search::SearchResult;

use super::prompt::Language;

/// 답변에 인용하는 최대 출처 수
pub const MAX_CITED_SOURCES: usize = 3;

/// 파이프라인 결과 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// 모델이 답변을 생성함
    Answered,
    /// 모델 호출 실패로 사과 문구 반환
    Apology,
    /// 파이프라인 경계에서 오류가 잡힘
    Failed,
}

/// 생성 결과
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub text: String,
    pub outcome: AnswerOutcome,
}

/// 답변 생성기
pub struct AnswerSynthesizer {
    llm: Arc<dyn CompletionProvider>,
}

impl AnswerSynthesizer {
    pub fn new(llm: Arc<dyn CompletionProvider>) -> Self {
        Self { llm }
    }

    /// 프롬프트로 답변 생성
    pub async fn synthesize(
        &self,
        prompt: &str,
        language: Language,
        sources: &[SearchResult],
    ) -> Synthesis {
        let templates = language.templates();

        match self.llm.complete(prompt).await {
            Ok(completion) => {
                let mut text = completion.trim().to_string();
                if text.is_empty() {
                    text = templates.no_answer.trim().to_string();
                }
                text.push_str(&format_sources(language, sources));
                Synthesis {
                    text,
                    outcome: AnswerOutcome::Answered,
                }
            }
            Err(e) => {
                tracing::error!("Response generation failed via {}: {}", self.llm.name(), e);
                Synthesis {
                    text: templates.apology.to_string(),
                    outcome: AnswerOutcome::Apology,
                }
            }
        }
    }
}

/// 출처 블록 (출처가 없으면 빈 문자열)
pub fn format_sources(language: Language, sources: &[SearchResult]) -> String {
    if sources.is_empty() {
        return String::new();
    }

    let mut block = format!("\n\n📚 {} :", language.templates().sources_header);
    for source in sources.iter().take(MAX_CITED_SOURCES) {
        let title = if source.title.trim().is_empty() {
            "Unknown"
        } else {
            source.title.as_str()
        };
        block.push_str(&format!("\n• {} - {}", title, source.link));
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CompletionError;
    use async_trait::async_trait;

    struct FixedLlm(Result<String, u16>);

    #[async_trait]
    impl CompletionProvider for FixedLlm {
        async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            self.0.clone().map_err(|status| CompletionError::Api {
                status,
                message: "down".to_string(),
            })
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn sources(n: usize) -> Vec<SearchResult> {
        (1..=n)
            .map(|i| SearchResult::new(format!("Title {}", i), format!("https://s{}.africa", i)))
            .collect()
    }

    #[tokio::test]
    async fn test_trims_and_appends_sources() {
        let synth = AnswerSynthesizer::new(Arc::new(FixedLlm(Ok("  Answer text \n".to_string()))));
        let result = synth.synthesize("p", Language::En, &sources(2)).await;
        assert_eq!(result.outcome, AnswerOutcome::Answered);
        assert_eq!(
            result.text,
            "Answer text\n\n📚 Sources :\n• Title 1 - https://s1.africa\n• Title 2 - https://s2.africa"
        );
    }

    #[tokio::test]
    async fn test_at_most_three_sources() {
        let synth = AnswerSynthesizer::new(Arc::new(FixedLlm(Ok("ok".to_string()))));
        let result = synth.synthesize("p", Language::Sw, &sources(5)).await;
        assert!(result.text.contains("📚 Vyanzo :"));
        assert_eq!(result.text.matches("• ").count(), 3);
        assert!(result.text.contains("Title 3"));
        assert!(!result.text.contains("Title 4"));
    }

    #[tokio::test]
    async fn test_failure_returns_language_apology() {
        let synth = AnswerSynthesizer::new(Arc::new(FixedLlm(Err(500))));
        let fr = synth.synthesize("p", Language::Fr, &sources(3)).await;
        assert_eq!(fr.outcome, AnswerOutcome::Apology);
        assert!(fr.text.contains("Désolé"));
        assert!(!fr.text.contains("Sources"));

        let sw = synth.synthesize("p", Language::Sw, &[]).await;
        assert_eq!(sw.text, "Samahani, siwezi kujibu swali hilo kwa sasa.");

        let ha = synth.synthesize("p", Language::Ha, &[]).await;
        assert_eq!(ha.text, "Sorry, I cannot answer that question at the moment.");
    }

    #[tokio::test]
    async fn test_empty_completion_uses_no_answer_phrase() {
        let synth = AnswerSynthesizer::new(Arc::new(FixedLlm(Ok("   ".to_string()))));
        let result = synth.synthesize("p", Language::Fr, &[]).await;
        assert_eq!(
            result.text,
            "Je n'ai pas assez d'informations sur ce sujet spécifique."
        );
    }

    #[test]
    fn test_format_sources_unknown_title() {
        let block = format_sources(Language::En, &[SearchResult::new("", "https://x.africa")]);
        assert_eq!(block, "\n\n📚 Sources :\n• Unknown - https://x.africa");
        assert_eq!(format_sources(Language::En, &[]), "");
    }
}
