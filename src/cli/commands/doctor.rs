//! Doctor command - verify system requirements and configuration.

use crate::cli::{mask_secret, preflight, Output};
use crate::config::Settings;
use crate::llm::{default_model, ProviderKind};
use crate::tools::SearchEngine;
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Tolk Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let sections = [
        ("LLM Provider", check_llm(settings)),
        ("Tools", check_tools(settings)),
        ("Configuration", vec![check_config_file(config_path)]),
    ];

    let mut errors = 0;
    let mut warnings = 0;
    for (title, checks) in &sections {
        println!("{}", style(title).bold());
        for check in checks {
            check.print();
            match check.status {
                CheckStatus::Error => errors += 1,
                CheckStatus::Warning => warnings += 1,
                CheckStatus::Ok => {}
            }
        }
        println!();
    }

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Tolk.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Tolk is ready to use.");
    }

    Ok(())
}

/// Provider, credential and endpoint checks.
fn check_llm(settings: &Settings) -> Vec<CheckResult> {
    let llm = &settings.llm;
    let mut results = Vec::new();

    let kind = match llm.provider.parse::<ProviderKind>() {
        Ok(kind) => {
            let model = llm.model.as_deref().unwrap_or_else(|| default_model(kind));
            results.push(CheckResult::ok("Provider", &format!("{} ({})", kind, model)));
            Some(kind)
        }
        Err(e) => {
            results.push(CheckResult::error(
                "Provider",
                &e.to_string(),
                "Set LLM_PROVIDER to anthropic, openai or openai-compatible",
            ));
            None
        }
    };

    match llm.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        Some(key) => results.push(CheckResult::ok(
            "LLM_API_KEY",
            &format!("configured ({})", mask_secret(key)),
        )),
        None => results.push(CheckResult::error(
            "LLM_API_KEY",
            "not set",
            "Set with: export LLM_API_KEY='...' (or add it to .env)",
        )),
    }

    if kind == Some(ProviderKind::OpenAICompatible) {
        match llm.base_url.as_deref().filter(|u| !u.trim().is_empty()) {
            Some(url) => results.push(CheckResult::ok("LLM_BASE_URL", url)),
            None => results.push(CheckResult::error(
                "LLM_BASE_URL",
                "not set",
                "Required for openai-compatible providers",
            )),
        }
    }

    match (llm.supports_tools, kind) {
        (Some(false), _) => results.push(CheckResult::warning(
            "Tool calling",
            "disabled",
            "The model will answer without web search or page fetch",
        )),
        (None, Some(ProviderKind::OpenAICompatible))
            if llm.base_url.as_deref().is_some_and(|u| u.contains("groq.com")) =>
        {
            results.push(CheckResult::warning(
                "Tool calling",
                "disabled by default for Groq",
                "Set LLM_SUPPORTS_TOOLS=true to force it on",
            ))
        }
        _ => results.push(CheckResult::ok("Tool calling", "enabled")),
    }

    results
}

/// Search engine and external tool checks.
fn check_tools(settings: &Settings) -> Vec<CheckResult> {
    let tools = &settings.tools;
    let mut results = Vec::new();

    match preflight::check_search(tools) {
        Ok(SearchEngine::DuckDuckGo) => {
            results.push(CheckResult::ok("Search engine", "duckduckgo (no key needed)"))
        }
        Ok(engine @ SearchEngine::Brave) => {
            results.push(key_check(engine, tools.brave_api_key.as_deref(), "BRAVE_API_KEY"))
        }
        Ok(engine @ SearchEngine::Tavily) => {
            results.push(key_check(engine, tools.tavily_api_key.as_deref(), "TAVILY_API_KEY"))
        }
        Err(e) => results.push(CheckResult::error(
            "Search engine",
            &e.to_string(),
            "Set SEARCH_ENGINE to duckduckgo, brave or tavily",
        )),
    }

    match preflight::check_tool("yt-dlp") {
        Ok(version) => results.push(CheckResult::ok("yt-dlp", &version)),
        Err(_) => results.push(CheckResult::warning(
            "yt-dlp",
            "not found (video info unavailable)",
            install_hint_ytdlp(),
        )),
    }

    results
}

fn key_check(engine: SearchEngine, key: Option<&str>, var: &str) -> CheckResult {
    match key.filter(|k| !k.is_empty()) {
        Some(_) => CheckResult::ok("Search engine", &format!("{} ({} set)", engine, var)),
        None => CheckResult::warning(
            "Search engine",
            &format!("{} without {}", engine, var),
            &format!("Searches will fail until {} is set", var),
        ),
    }
}

/// Check if config file exists.
fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: tolk config init",
        )
    }
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_llm_checks_flag_missing_key() {
        let settings = Settings::default();
        let results = check_llm(&settings);
        let key = results.iter().find(|r| r.name == "LLM_API_KEY").unwrap();
        assert_eq!(key.status, CheckStatus::Error);
    }

    #[test]
    fn test_llm_checks_groq_warning() {
        let mut settings = Settings::default();
        settings.llm.provider = "openai-compatible".to_string();
        settings.llm.api_key = Some("gsk_0123456789abcdef".to_string());
        settings.llm.base_url = Some("https://api.groq.com/openai/v1".to_string());

        let results = check_llm(&settings);
        assert!(results.iter().all(|r| r.status != CheckStatus::Error));
        let tools = results.iter().find(|r| r.name == "Tool calling").unwrap();
        assert_eq!(tools.status, CheckStatus::Warning);
    }

    #[test]
    fn test_brave_without_key_warns() {
        let result = key_check(SearchEngine::Brave, None, "BRAVE_API_KEY");
        assert_eq!(result.status, CheckStatus::Warning);
        assert!(result.message.contains("brave"));
    }
}
