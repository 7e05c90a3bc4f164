//! 언어별 프롬프트 템플릿과 프롬프트 조립

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Language
// ============================================================================

/// 응답 언어
///
/// 전용 템플릿은 `En`, `Fr`, `Sw`만 있고 나머지는 영어 템플릿을 사용합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Fr,
    Sw,
    Ha,
    Ar,
    Pt,
}

impl Language {
    /// API에 노출하는 전체 언어 목록
    pub const ALL: [Language; 6] = [
        Language::En,
        Language::Fr,
        Language::Sw,
        Language::Ha,
        Language::Ar,
        Language::Pt,
    ];

    /// 언어 코드 파싱. 알 수 없는 코드는 영어로 처리합니다.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "fr" => Language::Fr,
            "sw" => Language::Sw,
            "ha" => Language::Ha,
            "ar" => Language::Ar,
            "pt" => Language::Pt,
            _ => Language::En,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Fr => "fr",
            Language::Sw => "sw",
            Language::Ha => "ha",
            Language::Ar => "ar",
            Language::Pt => "pt",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Fr => "French",
            Language::Sw => "Swahili",
            Language::Ha => "Hausa",
            Language::Ar => "Arabic",
            Language::Pt => "Portuguese",
        }
    }

    pub fn native_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Fr => "Français",
            Language::Sw => "Kiswahili",
            Language::Ha => "Hausa",
            Language::Ar => "العربية",
            Language::Pt => "Português",
        }
    }

    /// 이 언어가 사용하는 템플릿
    pub fn templates(&self) -> &'static LanguageTemplates {
        match self {
            Language::Fr => &FRENCH,
            Language::Sw => &SWAHILI,
            _ => &ENGLISH,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// Templates
// ============================================================================

/// 언어별 프롬프트 조각
#[derive(Debug, PartialEq, Eq)]
pub struct LanguageTemplates {
    pub system: &'static str,
    pub context_intro: &'static str,
    pub no_answer: &'static str,
    pub cite_sources: &'static str,
    /// 출처 목록 머리말
    pub sources_header: &'static str,
    /// 생성 실패 시 고정 응답
    pub apology: &'static str,
}

const ENGLISH: LanguageTemplates = LanguageTemplates {
    system: "You are an AI expert specializing in African business contexts and AI implementation. ",
    context_intro: "Using the CONTEXT below (from web sources and African AI knowledge base), answer precisely and practically. ",
    no_answer: "I don't have enough information about that specific topic. ",
    cite_sources: "Cite web sources when available and reference African case studies when relevant.",
    sources_header: "Sources",
    apology: "Sorry, I cannot answer that question at the moment.",
};

const FRENCH: LanguageTemplates = LanguageTemplates {
    system: "Tu es un expert en IA spécialisé dans les contextes d'affaires africains et l'implémentation d'IA. ",
    context_intro: "En utilisant le CONTEXTE ci-dessous (sources web et base de connaissances IA africaine), réponds de façon précise et pratique. ",
    no_answer: "Je n'ai pas assez d'informations sur ce sujet spécifique. ",
    cite_sources: "Cite les sources web quand disponibles et référence les études de cas africaines quand pertinentes.",
    sources_header: "Sources",
    apology: "Désolé, je ne peux pas répondre à cette question pour le moment.",
};

const SWAHILI: LanguageTemplates = LanguageTemplates {
    system: "Wewe ni mtaalamu wa AI unayejumuisha mazingira ya biashara za Kiafrika na utekelezaji wa AI. ",
    context_intro: "Kwa kutumia MUKTADHA hapo chini (vyanzo vya wavuti na msingi wa maarifa ya AI ya Kiafrika), jibu kwa usahihi na vitendo. ",
    no_answer: "Sina habari za kutosha kuhusu mada hiyo mahususi. ",
    cite_sources: "Taja vyanzo vya wavuti vinapokona na rejelea masomo ya kesi za Kiafrika vinapofaa.",
    sources_header: "Vyanzo",
    apology: "Samahani, siwezi kujibu swali hilo kwa sasa.",
};

/// 도메인 포커스 지침 (모든 언어 공통)
const DOMAIN_GUIDANCE: &str = "Focus on practical implementation for African businesses. \
Consider local infrastructure, mobile-first approaches, and cost-effective solutions. ";

// ============================================================================
// PromptComposer
// ============================================================================

/// 프롬프트 조립기
///
/// 순서: system + context_intro + 도메인 지침 + cite_sources + CONTEXT + QUESTION + RESPONSE 큐.
/// 질문과 컨텍스트는 고정 블록 안에만 놓입니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptComposer;

impl PromptComposer {
    pub fn compose(&self, question: &str, context: &str, language: Language) -> String {
        let t = language.templates();
        format!(
            "{}{}{}{}\n\nCONTEXT:\n{}\n\nQUESTION: {}\n\nRESPONSE:",
            t.system, t.context_intro, DOMAIN_GUIDANCE, t.cite_sources, context, question
        )
    }
}
