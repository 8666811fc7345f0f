//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::PathBuf;

/// Run the config command.
pub fn run_config(action: &ConfigAction, config_path: Option<PathBuf>, settings: Settings) -> Result<()> {
    let config_path = config_path.unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings.redacted())
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }

        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                Output::warning(&format!(
                    "Config already exists at {} (use --force to overwrite)",
                    config_path.display()
                ));
                return Ok(());
            }

            Settings::default().save_to(&config_path)?;
            Output::success(&format!("Wrote default config to {}", config_path.display()));
            Output::info("Set LLM_API_KEY in your environment or a .env file.");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_and_respects_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        run_config(&ConfigAction::Init { force: false }, Some(path.clone()), Settings::default())
            .unwrap();
        assert!(path.exists());

        std::fs::write(&path, "[server]\nport = 9999\n").unwrap();
        run_config(&ConfigAction::Init { force: false }, Some(path.clone()), Settings::default())
            .unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("port = 9999"));

        run_config(&ConfigAction::Init { force: true }, Some(path.clone()), Settings::default())
            .unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("port = 3000"));
        assert!(written.contains("temperature = 0.7\n"));
    }
}
