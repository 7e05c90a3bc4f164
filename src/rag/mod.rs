//! RAG 모듈 - 질의응답 파이프라인
//!
//! - prompt: 언어별 템플릿과 프롬프트 조립
//! - synthesizer: 완성 모델 호출 + 출처 인용
//! - pipeline: 검색부터 생성까지의 순차 오케스트레이션

mod pipeline;
mod prompt;
mod synthesizer;

// Re-exports
pub use pipeline::{Answer, RagError, RagRequest, RagService};
pub use prompt::{Language, LanguageTemplates, PromptComposer};
pub use synthesizer::{
    format_sources, AnswerOutcome, AnswerSynthesizer, Synthesis, MAX_CITED_SOURCES,
};
