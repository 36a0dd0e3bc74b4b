//! TOML-based configuration for Decksmith
//!
//! This module provides declarative configuration for the server, the
//! presentation database, LLM providers and models, and the research sources
//! via a TOML file (`decksmith.toml`).
//!
//! # Hot Reloading
//!
//! Configuration changes are automatically detected and applied at runtime.
//! Use `DecksmithConfigManager` for thread-safe access to the current configuration.
//! Research settings are read from the live config at the start of every
//! research run, so API keys can be added or rotated without a restart.

use arc_swap::ArcSwap;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Root configuration structure loaded from decksmith.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecksmithConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    /// Named LLM provider configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Named model configurations that reference providers.
    /// `outline` drives generation, `summarizer` (optional) condenses research.
    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,

    /// Research source configuration
    #[serde(default)]
    pub research: ResearchConfig,

    /// Attachment handling
    #[serde(default)]
    pub documents: DocumentsConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

// ============= Documents Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsConfig {
    /// Directory attachments must live under; paths resolving elsewhere are rejected
    #[serde(default = "default_upload_root")]
    pub upload_root: PathBuf,
}

fn default_upload_root() -> PathBuf {
    PathBuf::from("./data/uploads")
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            upload_root: default_upload_root(),
        }
    }
}

// ============= Database Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Local database path, or `:memory:`
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Environment variable for Turso URL (optional cloud config)
    pub turso_url_env: Option<String>,

    /// Environment variable for Turso auth token
    pub turso_token_env: Option<String>,
}

fn default_database_url() -> String {
    "./data/decksmith.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            turso_url_env: None,
            turso_token_env: None,
        }
    }
}

// ============= Provider Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        default_model: String,
    },
    OpenAI {
        /// Environment variable containing API key
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        default_model: String,
    },
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

// ============= Model Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Reference to a provider name defined in [providers]
    pub provider: String,

    /// Model name/identifier; falls back to the provider's default model
    pub model: Option<String>,
}

/// Model key used for outline generation
pub const OUTLINE_MODEL: &str = "outline";
/// Model key used for the research summarizer
pub const SUMMARIZER_MODEL: &str = "summarizer";

// ============= Research Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// API keys by source name, e.g. `tavily = "tvly-..."`
    #[serde(default)]
    pub api_keys: HashMap<String, String>,

    #[serde(default = "default_tavily")]
    pub tavily: SourceConfig,

    #[serde(default = "default_wikipedia")]
    pub wikipedia: SourceConfig,

    #[serde(default = "default_archive")]
    pub archive: SourceConfig,

    #[serde(default)]
    pub summarizer: SummarizerConfig,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_keys: HashMap::new(),
            tavily: default_tavily(),
            wikipedia: default_wikipedia(),
            archive: default_archive(),
            summarizer: SummarizerConfig::default(),
        }
    }
}

impl ResearchConfig {
    /// Resolve the API key for a source: explicit config first, then `<NAME>_API_KEY`.
    ///
    /// `None` means the source is disabled, which is a valid state.
    pub fn api_key(&self, source: &str) -> Option<String> {
        self.api_keys
            .get(source)
            .cloned()
            .or_else(|| std::env::var(format!("{}_API_KEY", source.to_uppercase())).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    pub base_url: String,

    pub timeout_secs: u64,

    pub max_results: usize,
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_tavily() -> SourceConfig {
    SourceConfig {
        enabled: true,
        base_url: "https://api.tavily.com".to_string(),
        timeout_secs: 20,
        max_results: 5,
    }
}

fn default_wikipedia() -> SourceConfig {
    SourceConfig {
        enabled: true,
        base_url: "https://en.wikipedia.org".to_string(),
        timeout_secs: 15,
        max_results: 3,
    }
}

fn default_archive() -> SourceConfig {
    SourceConfig {
        enabled: true,
        base_url: "https://archive.org".to_string(),
        timeout_secs: 15,
        max_results: 3,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Merged research longer than this (in characters) gets condensed
    #[serde(default = "default_threshold_chars")]
    pub threshold_chars: usize,

    /// Input is cut to this many characters before it is sent to the model
    #[serde(default = "default_combined_cap_chars")]
    pub combined_cap_chars: usize,

    /// Upper bound on the digest, also the truncation length of the fallback
    #[serde(default = "default_final_cap_chars")]
    pub final_cap_chars: usize,

    #[serde(default = "default_summarizer_timeout")]
    pub timeout_secs: u64,
}

fn default_threshold_chars() -> usize {
    6_000
}

fn default_combined_cap_chars() -> usize {
    12_000
}

fn default_final_cap_chars() -> usize {
    4_000
}

fn default_summarizer_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_chars: default_threshold_chars(),
            combined_cap_chars: default_combined_cap_chars(),
            final_cap_chars: default_final_cap_chars(),
            timeout_secs: default_summarizer_timeout(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    #[error("Provider '{0}' referenced by model '{1}' does not exist")]
    MissingProvider(String, String),

    #[error("Watch error: {0}")]
    WatchError(#[from] notify::Error),
}

impl DecksmithConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: DecksmithConfig = toml::from_str(&content)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration for internal consistency and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref env) = self.database.turso_url_env {
            self.validate_env_var(env)?;
        }
        if let Some(ref env) = self.database.turso_token_env {
            self.validate_env_var(env)?;
        }

        for provider in self.providers.values() {
            if let ProviderConfig::OpenAI { api_key_env, .. } = provider {
                self.validate_env_var(api_key_env)?;
            }
        }

        for (name, model) in &self.models {
            if !self.providers.contains_key(&model.provider) {
                return Err(ConfigError::MissingProvider(
                    model.provider.clone(),
                    name.clone(),
                ));
            }
        }

        let summarizer = &self.research.summarizer;
        if summarizer.final_cap_chars > summarizer.combined_cap_chars {
            return Err(ConfigError::ValidationError(format!(
                "research.summarizer.final_cap_chars ({}) must not exceed combined_cap_chars ({})",
                summarizer.final_cap_chars, summarizer.combined_cap_chars
            )));
        }

        if !self.models.contains_key(OUTLINE_MODEL) {
            warn!(
                "No [models.{}] configured; outline generation will fail until one is added",
                OUTLINE_MODEL
            );
        }

        Ok(())
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        Ok(())
    }

    /// Get model by name
    pub fn get_model(&self, name: &str) -> Option<&ModelConfig> {
        self.models.get(name)
    }

    /// Get provider by name
    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }
}

// ============= Hot Reloading Configuration Manager =============

/// Thread-safe configuration manager with hot reloading support
pub struct DecksmithConfigManager {
    config: Arc<ArcSwap<DecksmithConfig>>,
    config_path: PathBuf,
    watcher: RwLock<Option<RecommendedWatcher>>,
    reload_tx: Option<mpsc::UnboundedSender<()>>,
}

impl DecksmithConfigManager {
    /// Create a new configuration manager and load the initial config
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        // Convert to absolute path for reliable file watching
        let path = path.as_ref();
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(ConfigError::ReadError)?
                .join(path)
        };

        let config = DecksmithConfig::load(&path)?;

        Ok(Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: path,
            watcher: RwLock::new(None),
            reload_tx: None,
        })
    }

    /// Create a config manager directly from a config (useful for testing)
    /// This won't have file watching capabilities.
    pub fn from_config(config: DecksmithConfig) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: PathBuf::from("test-config.toml"),
            watcher: RwLock::new(None),
            reload_tx: None,
        }
    }

    /// Get the current configuration (lockless read)
    pub fn config(&self) -> Arc<DecksmithConfig> {
        self.config.load_full()
    }

    /// Replace the current configuration without touching disk
    pub fn store(&self, config: DecksmithConfig) {
        self.config.store(Arc::new(config));
    }

    /// Manually reload the configuration from disk
    pub fn reload(&self) -> Result<(), ConfigError> {
        info!("Reloading configuration from {:?}", self.config_path);

        let new_config = DecksmithConfig::load(&self.config_path)?;
        self.config.store(Arc::new(new_config));

        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Start watching for configuration file changes
    pub fn start_watching(&mut self) -> Result<(), ConfigError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        self.reload_tx = Some(tx.clone());

        let config_path = self.config_path.clone();
        let config_arc = Arc::clone(&self.config);

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        // Debounced in the receiver
                        let _ = tx.send(());
                    }
                }
                Err(e) => {
                    error!("Config watcher error: {:?}", e);
                }
            }
        })?;

        // Watch the config file's parent directory
        if let Some(parent) = self.config_path.parent() {
            watcher.watch(parent, RecursiveMode::NonRecursive)?;
        }

        *self.watcher.write() = Some(watcher);

        tokio::spawn(async move {
            let mut last_reload = std::time::Instant::now();
            let debounce_duration = Duration::from_millis(500);

            while rx.recv().await.is_some() {
                if last_reload.elapsed() < debounce_duration {
                    continue;
                }

                // Wait a bit for file write to complete
                tokio::time::sleep(Duration::from_millis(100)).await;

                match DecksmithConfig::load(&config_path) {
                    Ok(new_config) => {
                        config_arc.store(Arc::new(new_config));
                        info!("Configuration hot-reloaded successfully");
                        last_reload = std::time::Instant::now();
                    }
                    Err(e) => {
                        warn!(
                            "Failed to hot-reload config: {}. Keeping previous config.",
                            e
                        );
                    }
                }
            }
        });

        info!("Configuration hot-reload watcher started");
        Ok(())
    }

    /// Stop watching for configuration changes
    pub fn stop_watching(&self) {
        *self.watcher.write() = None;
        info!("Configuration hot-reload watcher stopped");
    }
}

impl Clone for DecksmithConfigManager {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            config_path: self.config_path.clone(),
            watcher: RwLock::new(None), // Watcher is not cloned
            reload_tx: self.reload_tx.clone(),
        }
    }
}
