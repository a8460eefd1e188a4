use crate::error::{AssistantError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 512;
pub const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantConfig {
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub rag: RagConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl LlmConfig {
    pub fn effective_temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn effective_max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    #[default]
    Ollama,
    Ngram,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    #[serde(default)]
    pub provider: EmbeddingBackend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                model: "deepseek-coder:6.7b".to_string(),
                host: "http://localhost:11434".to_string(),
                system_prompt: None,
                temperature: None,
                max_tokens: None,
            },
            embedding: EmbeddingConfig {
                model: "all-minilm".to_string(),
                provider: EmbeddingBackend::Ollama,
            },
            rag: RagConfig {
                top_k: DEFAULT_TOP_K,
            },
        }
    }
}

impl AssistantConfig {
    pub fn validate(&self) -> Result<()> {
        if self.llm.model.trim().is_empty() {
            return Err(AssistantError::InvalidConfig("llm.model is empty".to_string()));
        }
        if self.llm.host.trim().is_empty() {
            return Err(AssistantError::InvalidConfig("llm.host is empty".to_string()));
        }
        if url::Url::parse(&self.llm.host).is_err() {
            return Err(AssistantError::InvalidConfig(format!(
                "llm.host is not a url: {}",
                self.llm.host
            )));
        }
        if self.embedding.model.trim().is_empty() {
            return Err(AssistantError::InvalidConfig("embedding.model is empty".to_string()));
        }
        if self.rag.top_k == 0 {
            return Err(AssistantError::InvalidConfig("rag.top_k must be at least 1".to_string()));
        }
        if let Some(temperature) = self.llm.temperature {
            if !temperature.is_finite() || temperature < 0.0 {
                return Err(AssistantError::InvalidConfig(format!(
                    "llm.temperature must be a non-negative number, got {temperature}"
                )));
            }
        }
        Ok(())
    }
}

/// Reads the config file, falling back to defaults when it is missing or
/// malformed.
pub fn load_config(path: &Path) -> AssistantConfig {
    let parsed = std::fs::read_to_string(path)
        .map_err(AssistantError::from)
        .and_then(|raw| serde_json::from_str::<AssistantConfig>(&raw).map_err(AssistantError::from));

    match parsed {
        Ok(config) => {
            info!(path = %path.display(), "config loaded");
            config
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "could not load config, using defaults");
            AssistantConfig::default()
        }
    }
}

/// The persisted config plus its in-memory copy. Replacement is a whole-value
/// overwrite: the file is written first and memory is only updated once the
/// write succeeded.
pub struct ConfigStore {
    path: PathBuf,
    current: RwLock<Arc<AssistantConfig>>,
}

impl ConfigStore {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let config = load_config(&path);
        Self::with_config(path, config)
    }

    pub fn with_config(path: impl Into<PathBuf>, config: AssistantConfig) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(Arc::new(config)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> Arc<AssistantConfig> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    pub fn replace(&self, config: AssistantConfig) -> Result<Arc<AssistantConfig>> {
        config.validate()?;

        let encoded = serde_json::to_string_pretty(&config)?;
        std::fs::write(&self.path, encoded)?;

        let config = Arc::new(config);
        match self.current.write() {
            Ok(mut guard) => *guard = Arc::clone(&config),
            Err(poisoned) => *poisoned.into_inner() = Arc::clone(&config),
        }
        info!(path = %self.path.display(), "config replaced");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_or_malformed_file_uses_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        assert_eq!(load_config(&dir.path().join("absent.json")), AssistantConfig::default());

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json")?;
        assert_eq!(load_config(&broken), AssistantConfig::default());
        Ok(())
    }

    #[test]
    fn optional_fields_may_be_omitted() -> Result<(), serde_json::Error> {
        let config: AssistantConfig = serde_json::from_str(
            r#"{"llm": {"model": "llama3", "host": "http://ollama:11434"},
                "embedding": {"model": "all-minilm"},
                "rag": {"top_k": 5}}"#,
        )?;
        assert_eq!(config.llm.effective_temperature(), DEFAULT_TEMPERATURE);
        assert_eq!(config.llm.effective_max_tokens(), DEFAULT_MAX_TOKENS);
        assert_eq!(config.embedding.provider, EmbeddingBackend::Ollama);
        assert_eq!(config.rag.top_k, 5);
        Ok(())
    }

    #[test]
    fn replace_persists_then_updates_memory() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("config.json");
        let store = ConfigStore::with_config(&path, AssistantConfig::default());

        let mut updated = AssistantConfig::default();
        updated.llm.system_prompt = Some("Be brief.".to_string());
        updated.rag.top_k = 7;
        store.replace(updated.clone())?;

        assert_eq!(*store.current(), updated);
        assert_eq!(load_config(&path), updated);
        Ok(())
    }

    #[test]
    fn failed_write_keeps_previous_config() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("missing-dir").join("config.json");
        let store = ConfigStore::with_config(&path, AssistantConfig::default());

        let mut updated = AssistantConfig::default();
        updated.rag.top_k = 9;
        assert!(store.replace(updated).is_err());
        assert_eq!(store.current().rag.top_k, DEFAULT_TOP_K);
        Ok(())
    }

    #[test]
    fn invalid_config_is_an_input_error() {
        let store = ConfigStore::with_config("unused.json", AssistantConfig::default());
        let mut updated = AssistantConfig::default();
        updated.rag.top_k = 0;

        let error = store.replace(updated).expect_err("top_k of zero is rejected");
        assert!(error.is_input_error());
    }
}
