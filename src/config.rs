use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    512
}
fn default_chunk_overlap() -> usize {
    64
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dims")]
    pub dims: usize,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dims: default_embedding_dims(),
            url: None,
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_embedding_dims() -> usize {
    1536
}
fn default_embedding_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_response_tokens")]
    pub max_response_tokens: u32,
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    /// Overrides the built-in grounded-answer instruction when set.
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_chat_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: default_chat_model(),
            temperature: default_temperature(),
            max_response_tokens: default_max_response_tokens(),
            context_window: default_context_window(),
            system_prompt: None,
            url: None,
            timeout_secs: default_chat_timeout_secs(),
        }
    }
}

fn default_chat_model() -> String {
    "gpt-4o".to_string()
}
fn default_temperature() -> f32 {
    0.5
}
fn default_max_response_tokens() -> u32 {
    512
}
fn default_context_window() -> usize {
    4096
}
fn default_chat_timeout_secs() -> u64 {
    60
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }

    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.chunk_overlap must be < chunking.chunk_size");
    }

    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    match config.embedding.provider.as_str() {
        "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be openai or ollama.",
            other
        ),
    }

    if config.embedding.model.is_empty() {
        anyhow::bail!("embedding.model must be specified");
    }

    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }

    if config.chat.model.is_empty() {
        anyhow::bail!("chat.model must be specified");
    }

    if !(0.0..=1.0).contains(&config.chat.temperature) {
        anyhow::bail!("chat.temperature must be in [0.0, 1.0]");
    }

    if config.chat.max_response_tokens == 0 {
        anyhow::bail!("chat.max_response_tokens must be > 0");
    }

    if config.chat.context_window == 0 {
        anyhow::bail!("chat.context_window must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        validate(&config).unwrap();
        assert_eq!(config.chunking.chunk_size, 512);
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.chat.model, "gpt-4o");
    }

    #[test]
    fn parses_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [chunking]
            chunk_size = 256

            [chat]
            temperature = 0.2
            "#,
        )
        .unwrap();
        validate(&config).unwrap();
        assert_eq!(config.chunking.chunk_size, 256);
        assert_eq!(config.chunking.chunk_overlap, 64);
        assert!((config.chat.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.chat.max_response_tokens, 512);
    }

    #[test]
    fn rejects_zero_chunk_size() {
        let mut config = Config::default();
        config.chunking.chunk_size = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_overlap_not_below_chunk_size() {
        let mut config = Config::default();
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_zero_top_k() {
        let mut config = Config::default();
        config.retrieval.top_k = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        let mut config = Config::default();
        config.chat.temperature = 1.5;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_unknown_embedding_provider() {
        let mut config = Config::default();
        config.embedding.provider = "cohere".to_string();
        assert!(validate(&config).is_err());
    }
}
