//! CLI 모듈
//!
//! baobab-rag CLI 명령어 정의 및 구현

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::cache::{AnswerCache, CHAT_PREFIX};
use crate::config::AppConfig;
use crate::rag::{AnswerOutcome, Language, RagRequest, RagService};
use crate::server;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "baobab-rag")]
#[command(version, about = "아프리카 비즈니스 맥락 RAG 챗봇 백엔드", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// HTTP 서버 실행
    Serve {
        /// 바인드 주소 (기본: BAOBAB_HOST)
        #[arg(long)]
        host: Option<String>,

        /// 포트 (기본: BAOBAB_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// 질문 한 번 실행
    Ask {
        /// 질문
        question: String,

        /// 응답 언어 (en, fr, sw, ha, ar, pt)
        #[arg(short, long, default_value = "en")]
        language: String,

        /// 웹 출처 개수
        #[arg(short, long, default_value = "5")]
        sources: usize,

        /// 정적 지식베이스 제외
        #[arg(long)]
        no_kb: bool,

        /// 검색 지역 보정 끄기
        #[arg(long)]
        no_focus: bool,
    },

    /// 상태 확인
    Status,

    /// 답변 캐시 비우기
    CacheClear,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load()?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            server::serve(&config).await
        }
        Commands::Ask {
            question,
            language,
            sources,
            no_kb,
            no_focus,
        } => {
            let request = RagRequest::new(question)
                .language(Language::from_code(&language))
                .web_sources(sources)
                .knowledge_base(!no_kb)
                .domain_focus(!no_focus);
            cmd_ask(&config, &request).await
        }
        Commands::Status => cmd_status(&config),
        Commands::CacheClear => cmd_cache_clear(&config),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_ask(config: &AppConfig, request: &RagRequest) -> Result<()> {
    let service = RagService::from_config(config).context("Failed to build RAG service")?;

    println!("[*] 질문 처리 중: \"{}\"", truncate_text(&request.question, 80));

    let answer = service.run_rag(request).await;

    match answer.outcome {
        AnswerOutcome::Answered => println!("[OK] 답변 ({}):\n", answer.language.name()),
        AnswerOutcome::Apology => println!("[!] 답변 생성 실패:\n"),
        AnswerOutcome::Failed => println!("[!] 처리 오류:\n"),
    }
    println!("{}", answer.text);

    if !answer.sources.is_empty() {
        println!();
        println!("[*] 인용 출처 {} 건", answer.sources.len());
        for (i, source) in answer.sources.iter().enumerate() {
            println!("  {}. {}", i + 1, truncate_text(&source.title, 60));
        }
    }

    Ok(())
}

fn cmd_status(config: &AppConfig) -> Result<()> {
    println!("baobab-rag v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("[*] 데이터 디렉토리: {}", config.data_dir.display());
    println!("[*] 서버 주소: {}", config.bind_addr());

    if config.has_openai_key() {
        println!("[OK] OpenAI 키: 설정됨 ({})", config.completion_model);
    } else {
        println!("[!] OpenAI 키: 미설정 (답변 생성 불가, 해싱 임베딩 사용)");
        println!("    설정: export OPENAI_API_KEY=your-key");
    }

    if config.has_serpapi_key() {
        println!("[OK] SerpAPI 키: 설정됨");
    } else {
        println!("[!] SerpAPI 키: 미설정 (웹 검색 비활성)");
        println!("    설정: export SERPAPI_API_KEY=your-key");
    }

    match &config.knowledge_file {
        Some(path) => println!("[*] 지식베이스: {}", path.display()),
        None => println!("[*] 지식베이스: 내장 항목"),
    }

    let settings = &config.pipeline;
    println!(
        "[*] 청킹: {} 단어 / 겹침 {} / 검색 k={}",
        settings.chunk_words, settings.chunk_overlap, settings.retrieval_k
    );

    if !config.cache_enabled {
        println!("[*] 답변 캐시: 비활성");
        return Ok(());
    }

    let cache_path = config.cache_path();
    match AnswerCache::open(&cache_path, config.cache_ttl) {
        Ok(cache) => match cache.stats() {
            Ok(stats) => {
                let size = std::fs::metadata(&cache_path)
                    .map(|m| m.len() as usize)
                    .unwrap_or(0);
                println!(
                    "[OK] 답변 캐시: {} 건 (만료 {} 건), {}",
                    stats.entries,
                    stats.expired,
                    format_bytes(size)
                );
            }
            Err(e) => {
                println!("[!] 캐시 통계 조회 실패: {}", e);
            }
        },
        Err(e) => {
            println!("[!] 답변 캐시 열기 실패: {}", e);
        }
    }

    Ok(())
}

fn cmd_cache_clear(config: &AppConfig) -> Result<()> {
    let cache = AnswerCache::open(&config.cache_path(), config.cache_ttl)?;
    let removed = cache.clear_prefix(CHAT_PREFIX)?;
    println!("[OK] 캐시 항목 {} 건 삭제됨", removed);
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// 텍스트 자르기 (줄바꿈 제거)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// 바이트 크기 포맷팅
fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("Kiswahili", 20), "Kiswahili");
        assert_eq!(truncate_text("mobile money", 6), "mobile...");
        assert_eq!(truncate_text("M-Pesa\nKenya", 20), "M-Pesa Kenya");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_parse_ask_flags() {
        let cli = Cli::parse_from([
            "baobab-rag",
            "ask",
            "Qu'est-ce que M-Pesa ?",
            "--language",
            "fr",
            "--sources",
            "2",
            "--no-kb",
        ]);
        match cli.command {
            Commands::Ask {
                question,
                language,
                sources,
                no_kb,
                no_focus,
            } => {
                assert_eq!(question, "Qu'est-ce que M-Pesa ?");
                assert_eq!(language, "fr");
                assert_eq!(sources, 2);
                assert!(no_kb);
                assert!(!no_focus);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_parse_serve_and_cache_clear() {
        let cli = Cli::parse_from(["baobab-rag", "serve", "--port", "9000"]);
        assert!(matches!(
            cli.command,
            Commands::Serve {
                host: None,
                port: Some(9000)
            }
        ));
        let cli = Cli::parse_from(["baobab-rag", "cache-clear"]);
        assert!(matches!(cli.command, Commands::CacheClear));
    }
}
