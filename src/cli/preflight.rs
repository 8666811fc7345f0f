//! Pre-flight checks before starting a chat or server.
//!
//! Validates configuration up front so a bad provider setup is reported
//! once at startup instead of as an apology on every message.

use crate::config::{ChatSettings, LlmSettings, Settings, ToolSettings};
use crate::error::{Result, TolkError};
use crate::llm::ProviderKind;
use crate::tools::SearchEngine;
use std::process::Command;

/// Run all pre-flight checks that would make startup fail.
pub fn check(settings: &Settings) -> Result<()> {
    check_llm(&settings.llm)?;
    check_chat(&settings.chat)?;
    check_search(&settings.tools)?;
    Ok(())
}

/// Check history and iteration limits; zero makes every message fail.
pub fn check_chat(chat: &ChatSettings) -> Result<()> {
    if chat.max_history == 0 {
        return Err(TolkError::Config(
            "max_history must be at least 1 (MAX_HISTORY_MESSAGES)".to_string(),
        ));
    }
    if chat.max_iterations == 0 {
        return Err(TolkError::Config(
            "max_iterations must be at least 1 (MAX_ITERATIONS)".to_string(),
        ));
    }
    Ok(())
}

/// Check provider name, credential and endpoint.
pub fn check_llm(llm: &LlmSettings) -> Result<ProviderKind> {
    let kind: ProviderKind = llm.provider.parse()?;

    if llm.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
        return Err(TolkError::Config(
            "LLM_API_KEY not set. Set it with: export LLM_API_KEY='...'".to_string(),
        ));
    }

    if kind == ProviderKind::OpenAICompatible
        && llm.base_url.as_deref().map_or(true, |u| u.trim().is_empty())
    {
        return Err(TolkError::Config(
            "LLM_BASE_URL is required for openai-compatible providers".to_string(),
        ));
    }

    Ok(kind)
}

/// Check the search engine name. A missing engine key is not fatal.
pub fn check_search(tools: &ToolSettings) -> Result<SearchEngine> {
    tools.search_engine.parse()
}

/// Check if an external tool is available, returning its version line.
pub fn check_tool(name: &str) -> Result<String> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("installed")
            .trim()
            .to_string()),
        Ok(_) => Err(TolkError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(TolkError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(TolkError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
