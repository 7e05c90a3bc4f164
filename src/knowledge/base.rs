//! 정적 지식베이스
//!
//! 프로세스 시작 시 한 번 로드되는 짧은 사실 문장 목록입니다.
//! 웹 검색 결과를 보완하거나, 웹 청크가 없을 때 대체 컨텍스트로 쓰입니다.

use std::path::Path;

use anyhow::{Context, Result};

use super::chunker::TextChunk;

/// 내장 아프리카 AI/비즈니스 지식
const AFRICAN_KNOWLEDGE: &[&str] = &[
    // AI 시장 & 비즈니스
    "Africa's AI market is projected to reach $16.5B by 2030 with 28% annual growth rate.",
    "Only 14% of African companies are ready to integrate AI into their operations as of 2024.",
    "South Africa, Nigeria, and Kenya lead AI adoption in Africa with the most startups and investments.",
    "Mobile-first AI solutions are crucial in Africa due to high mobile phone penetration (>80%) vs low desktop access.",
    "Data sovereignty and local language support are key challenges for AI adoption in Africa.",
    // 언어 & 문화
    "Major African languages for AI development: Swahili (100M+ speakers), Hausa (70M+), Yoruba (45M+), Amharic (32M+).",
    "French is spoken by 280M+ people across 29 African countries, making it crucial for AI applications.",
    "Arabic is dominant in North Africa with 200M+ speakers across countries like Egypt, Algeria, Morocco.",
    "Indigenous languages like Igbo, Zulu, Xhosa need AI support for inclusive technology development.",
    "Cultural context matters: African storytelling traditions, community-based decision making, ubuntu philosophy.",
    // 인프라
    "Africa has over 600 active tech hubs, with Nigeria (90+), South Africa (80+), and Kenya (50+) leading.",
    "Cloud adoption growing rapidly: AWS, Google Cloud, Microsoft Azure all expanding African data centers.",
    "Internet penetration varies widely: urban areas 70%+, rural areas often <30%, affecting AI deployment strategies.",
    "Mobile money systems like M-Pesa demonstrate African fintech innovation leadership globally.",
    // 성공 사례
    "African AI startups: DataProphet (South Africa) - predictive maintenance, Zindi - data science competitions.",
    "Healthcare AI: Ubenwa (Nigeria) analyzes infant cries, Ilara Health (Kenya) provides diagnostic tools.",
    "Agriculture AI: Aerobotics (South Africa) crop monitoring, iCow (Kenya) farmer advisory via SMS.",
    "Education AI: Eneza Education (Kenya) serves 6M+ students via SMS/WhatsApp learning platforms.",
    // MLOps & 개발
    "African developers prefer Python (85%), JavaScript (70%), Java (45%) for AI development.",
    "Popular AI frameworks in Africa: TensorFlow, PyTorch, scikit-learn, Hugging Face transformers.",
    "Cloud-first MLOps approach recommended due to limited on-premise infrastructure in many regions.",
    "AutoML tools gaining traction to bridge AI skills gap: H2O.ai, DataRobot, Google AutoML.",
    // 과제 & 기회
    "Data quality and availability major challenges: 60% of African businesses lack quality data for AI.",
    "AI talent shortage: Africa needs 3M+ more AI professionals by 2030 to meet demand.",
    "Regulatory frameworks developing: South Africa's POPIA, Nigeria's NDPR lead data protection efforts.",
    "Investment growing: African AI startups raised $200M+ in 2023, 5x increase from 2019.",
    // Baobab AI Labs
    "Baobab AI Labs focuses on practical AI education for African businesses and developers.",
    "Our mission: Make AI accessible, practical, and impactful for every African business.",
    "We provide MLOps guides optimized for African cloud environments and connectivity patterns.",
    "Community-driven approach: African AI pioneers sharing real success stories and implementation guides.",
];

/// 정적 지식베이스 (불변)
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeBase {
    entries: Vec<String>,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::african()
    }
}

impl KnowledgeBase {
    /// 내장 아프리카 지식으로 생성
    pub fn african() -> Self {
        Self::from_entries(AFRICAN_KNOWLEDGE.iter().copied())
    }

    /// 임의 항목으로 생성 (공백 항목 제거)
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(Into::into)
            .map(|e: String| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();
        Self { entries }
    }

    /// JSON 파일(문자열 배열)에서 로드
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read knowledge file {}", path.display()))?;
        let entries: Vec<String> =
            serde_json::from_str(&raw).context("Knowledge file must be a JSON array of strings")?;
        let kb = Self::from_entries(entries);
        tracing::info!(
            "Loaded {} knowledge entries from {}",
            kb.len(),
            path.display()
        );
        Ok(kb)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 전체 항목을 청크로 변환
    pub fn chunks(&self) -> Vec<TextChunk> {
        self.entries
            .iter()
            .filter_map(|e| TextChunk::knowledge(e.as_str()))
            .collect()
    }

    /// 앞에서부터 `n`개 항목
    pub fn fallback_slice(&self, n: usize) -> &[String] {
        &self.entries[..n.min(self.entries.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_african_default() {
        let kb = KnowledgeBase::default();
        assert_eq!(kb.len(), 30);
        assert!(kb.entries()[0].contains("$16.5B"));
        assert_eq!(kb.chunks().len(), kb.len());
    }

    #[test]
    fn test_from_entries_drops_blank() {
        let kb = KnowledgeBase::from_entries(["La capitale de la France est Paris.", "  ", ""]);
        assert_eq!(kb.len(), 1);
    }

    #[test]
    fn test_fallback_slice_bounds() {
        let kb = KnowledgeBase::from_entries(["a1", "a2", "a3"]);
        assert_eq!(kb.fallback_slice(2), &["a1".to_string(), "a2".to_string()]);
        assert_eq!(kb.fallback_slice(10).len(), 3);
        assert!(KnowledgeBase::from_entries(Vec::<String>::new())
            .fallback_slice(5)
            .is_empty());
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"["Kigali is a growing tech hub.", " ", "M-Pesa launched in 2007."]"#)
            .expect("write");
        let kb = KnowledgeBase::from_json_file(file.path()).expect("load");
        assert_eq!(kb.len(), 2);
    }

    #[test]
    fn test_from_json_file_rejects_non_array() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"facts": []}}"#).expect("write");
        assert!(KnowledgeBase::from_json_file(file.path()).is_err());
    }
}
