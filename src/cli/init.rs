//! Init command implementation
//!
//! Scaffolds `decksmith.toml` and `.env.example` for a new deployment.

use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug, PartialEq, Eq)]
pub enum InitResult {
    /// Files written
    Success(Vec<PathBuf>),
    /// decksmith.toml exists and `force` was not given
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
    /// LLM provider to configure (ollama or openai)
    pub provider: String,
}

/// Run the init command
pub fn run(config: &InitConfig) -> InitResult {
    let config_path = config.path.join("decksmith.toml");
    if config_path.exists() && !config.force {
        return InitResult::AlreadyExists;
    }

    if let Err(e) = fs::create_dir_all(config.path.join("data").join("uploads")) {
        return InitResult::Error(format!("Failed to create data directory: {}", e));
    }

    let mut written = Vec::new();
    let files = [
        (config_path, generate_config_toml(&config.provider)),
        (config.path.join(".env.example"), generate_env_example()),
    ];

    for (path, content) in files {
        match write_file(&path, &content, config.force) {
            Ok(true) => written.push(path),
            Ok(false) => {}
            Err(e) => {
                return InitResult::Error(format!("Failed to write {}: {}", path.display(), e))
            }
        }
    }

    InitResult::Success(written)
}

/// Returns whether the file was written
fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    fs::write(path, content)?;
    Ok(true)
}

fn generate_config_toml(provider: &str) -> String {
    let provider_section = if provider == "openai" {
        r#"# OpenAI API (set OPENAI_API_KEY in .env)
[providers.openai]
type = "openai"
api_key_env = "OPENAI_API_KEY"
api_base = "https://api.openai.com/v1"
default_model = "gpt-4o-mini"
"#
    } else {
        r#"# Ollama - Local inference (no API key required)
[providers.ollama-local]
type = "ollama"
base_url = "http://localhost:11434"
default_model = "llama3.2:3b"
"#
    };

    let model_provider = if provider == "openai" {
        "openai"
    } else {
        "ollama-local"
    };

    format!(
        r#"# Decksmith configuration

[server]
host = "127.0.0.1"
port = 3000
log_level = "info"
log_format = "text"   # or "json"

[database]
url = "./data/decksmith.db"   # or ":memory:"
# turso_url_env = "TURSO_DATABASE_URL"
# turso_token_env = "TURSO_AUTH_TOKEN"

[documents]
# Attachments must resolve inside this directory
upload_root = "./data/uploads"

{provider_section}
[models.outline]
provider = "{model_provider}"

# Optional: condense oversized research before generation
# [models.summarizer]
# provider = "{model_provider}"

[research]
enabled = true

# Keys may also come from <NAME>_API_KEY, e.g. TAVILY_API_KEY.
# A source without a key contributes nothing.
[research.api_keys]
# tavily = "tvly-..."

[research.tavily]
base_url = "https://api.tavily.com"
timeout_secs = 20
max_results = 5

[research.wikipedia]
base_url = "https://en.wikipedia.org"
timeout_secs = 15
max_results = 3

[research.archive]
base_url = "https://archive.org"
timeout_secs = 15
max_results = 3

[research.summarizer]
enabled = true
threshold_chars = 6000
combined_cap_chars = 12000
final_cap_chars = 4000
timeout_secs = 30
"#
    )
}

fn generate_env_example() -> String {
    r#"# Research sources
TAVILY_API_KEY=

# OpenAI (only when an openai provider is configured)
OPENAI_API_KEY=

# Remote Turso (requires the `turso` feature)
# TURSO_DATABASE_URL=
# TURSO_AUTH_TOKEN=

RUST_LOG=info
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::toml_config::DecksmithConfig;
    use tempfile::TempDir;

    fn init_config(dir: &TempDir, force: bool) -> InitConfig {
        InitConfig {
            path: dir.path().to_path_buf(),
            force,
            provider: "ollama".to_string(),
        }
    }

    #[test]
    fn test_generated_config_parses_and_validates() {
        for provider in ["ollama", "openai"] {
            let config: DecksmithConfig = toml::from_str(&generate_config_toml(provider)).unwrap();
            assert!(config.models.contains_key("outline"));
            assert_eq!(config.research.tavily.max_results, 5);
            assert_eq!(config.research.wikipedia.timeout_secs, 15);
        }
    }

    #[test]
    fn test_run_creates_files() {
        let dir = TempDir::new().unwrap();
        let result = run(&init_config(&dir, false));

        match result {
            InitResult::Success(written) => assert_eq!(written.len(), 2),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(dir.path().join("decksmith.toml").exists());
        assert!(dir.path().join(".env.example").exists());
        assert!(dir.path().join("data").is_dir());
        assert!(dir.path().join("data").join("uploads").is_dir());
    }

    #[test]
    fn test_run_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("decksmith.toml"), "# mine").unwrap();

        assert_eq!(run(&init_config(&dir, false)), InitResult::AlreadyExists);
        assert_eq!(
            fs::read_to_string(dir.path().join("decksmith.toml")).unwrap(),
            "# mine"
        );

        assert!(matches!(run(&init_config(&dir, true)), InitResult::Success(_)));
        assert_ne!(
            fs::read_to_string(dir.path().join("decksmith.toml")).unwrap(),
            "# mine"
        );
    }
}
