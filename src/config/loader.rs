use std::path::{Path, PathBuf};

use crate::config::types::CodepadConfig;
use crate::error::{CodepadError, Result};

/// Get the default configuration file path
pub fn get_config_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("com", "codepad", "codepad") {
        proj_dirs.config_dir().join("config.toml")
    } else {
        // Fallback to home directory
        dirs_fallback().join(".codepad").join("config.toml")
    }
}

fn dirs_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(config_path: Option<&Path>) -> Result<CodepadConfig> {
    let path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(get_config_path);

    if !path.exists() {
        // Return defaults if no config file exists
        return Ok(CodepadConfig::default());
    }

    let content = std::fs::read_to_string(&path)?;
    let config: CodepadConfig =
        toml::from_str(&content).map_err(|e| CodepadError::TomlParse(e.to_string()))?;

    validate_config(&config)?;
    Ok(config)
}

/// Reject settings that would make an enabled backend unusable.
pub fn validate_config(config: &CodepadConfig) -> Result<()> {
    if config.dispatcher.timeout_ms == 0 {
        return Err(CodepadError::Config(
            "dispatcher.timeout_ms must be greater than zero".to_string(),
        ));
    }

    if config.sandboxed.enabled && config.sandboxed.timeout_ms == 0 {
        return Err(CodepadError::Config(
            "sandboxed.timeout_ms must be greater than zero".to_string(),
        ));
    }

    if config.managed.enabled
        && config.managed.interpreter.is_none()
        && config.managed.candidates.is_empty()
    {
        return Err(CodepadError::Config(
            "managed backend needs an interpreter or at least one candidate".to_string(),
        ));
    }

    if config.compiled.enabled {
        let url = reqwest::Url::parse(&config.compiled.endpoint).map_err(|e| {
            CodepadError::Config(format!(
                "invalid compiled.endpoint '{}': {}",
                config.compiled.endpoint, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CodepadError::Config(format!(
                "compiled.endpoint must be an http(s) URL, got '{}'",
                config.compiled.endpoint
            )));
        }
    }

    Ok(())
}
