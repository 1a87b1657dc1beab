use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::prompts;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat-completion provider
    pub provider: ProviderConfig,

    /// Fixed parameters sent with every completion request
    pub completion: CompletionSettings,

    /// Transport timeout applied by the HTTP client
    pub request_timeout_secs: u64,

    /// Quick questions offered before the first exchange
    pub suggested_questions: Vec<String>,

    /// Where the terminal widget writes its log file
    pub log_dir: PathBuf,
}

/// Provider endpoint and credential lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub name: String,
    pub base_url: String,
    pub api_key_env: String,
    pub api_key: Option<String>,
}

/// Model parameters for a completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "Groq".to_string(),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            api_key: None,
        }
    }
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: "llama-3.3-70b-versatile".to_string(),
            max_tokens: 150,
            temperature: 0.7,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: ProviderConfig::default(),
            completion: CompletionSettings::default(),
            request_timeout_secs: 60,
            suggested_questions: prompts::default_suggested_questions(),
            log_dir: softsell_home().join("logs"),
        }
    }
}

fn softsell_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".softsell")
}

impl Config {
    /// Default location of the configuration file
    pub fn default_path() -> PathBuf {
        softsell_home().join("config.toml")
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing file yields the defaults; a file that exists but does not
    /// parse is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_path);

        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Check if API key is configured
    pub fn has_api_key(&self) -> bool {
        self.get_api_key().is_some()
    }

    /// Get API key from config or environment
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key_from(|name| std::env::var(name).ok())
    }

    fn api_key_from(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        self.provider
            .api_key
            .clone()
            .or_else(|| lookup(&self.provider.api_key_env))
            .filter(|key| !key.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_widget_parameters() {
        let config = Config::default();
        assert_eq!(config.completion.model, "llama-3.3-70b-versatile");
        assert_eq!(config.completion.max_tokens, 150);
        assert!((config.completion.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.provider.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(config.suggested_questions.len(), 4);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let config = Config::from_toml_str(
            r#"
            request_timeout_secs = 15

            [completion]
            model = "llama-3.1-8b-instant"
            "#,
        )
        .unwrap();

        assert_eq!(config.request_timeout_secs, 15);
        assert_eq!(config.completion.model, "llama-3.1-8b-instant");
        assert_eq!(config.completion.max_tokens, 150);
        assert_eq!(config.provider.api_key_env, "GROQ_API_KEY");
    }

    #[test]
    fn load_reads_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "suggested_questions = [\"Do you buy Adobe licenses?\"]").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.suggested_questions, vec!["Do you buy Adobe licenses?"]);
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.request_timeout_secs, 60);
    }

    #[test]
    fn load_rejects_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "request_timeout_secs = \"soon\"").unwrap();
        assert!(Config::load(Some(file.path())).is_err());
    }

    #[test]
    fn file_key_wins_over_environment() {
        let mut config = Config::default();
        let from_env = |_: &str| Some("env-key".to_string());

        assert_eq!(config.api_key_from(from_env).as_deref(), Some("env-key"));

        config.provider.api_key = Some("file-key".to_string());
        assert_eq!(config.api_key_from(from_env).as_deref(), Some("file-key"));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let config = Config::default();
        assert!(config.api_key_from(|_| Some("   ".to_string())).is_none());
    }
}
