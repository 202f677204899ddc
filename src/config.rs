use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "./config/lta.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

/// Connection and sampling settings for the model-serving endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default = "default_num_ctx")]
    pub num_ctx: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            num_ctx: default_num_ctx(),
        }
    }
}

fn default_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "llama3.1".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_temperature() -> f64 {
    0.1
}
fn default_top_p() -> f64 {
    0.9
}
fn default_num_ctx() -> u32 {
    8192
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    4000
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AnalysisConfig {
    /// Ask the backend for schema-constrained keyword and topic lists.
    #[serde(default)]
    pub structured_output: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BatchConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            extensions: default_extensions(),
            output_dir: None,
        }
    }
}

fn default_workers() -> usize {
    2
}
fn default_extensions() -> Vec<String> {
    vec![".txt".to_string(), ".md".to_string()]
}

/// Commented template written by `lta init`.
pub const CONFIG_TEMPLATE: &str = r#"# long-text-analyzer configuration

[backend]
# Model-serving endpoint (Ollama-compatible /api/generate).
url = "http://localhost:11434"
model = "llama3.1"
# Upper bound for a single request, in seconds.
timeout_secs = 120
temperature = 0.1
top_p = 0.9
num_ctx = 8192

[chunking]
# Maximum characters per chunk sent to the model.
max_chars = 4000

[analysis]
# Request JSON-schema constrained keyword and topic lists.
structured_output = false

[batch]
workers = 2
extensions = [".txt", ".md"]
# output_dir = "reports"
"#;

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = read_config(path)?;
    validate(&config)?;
    Ok(config)
}

/// Parse a config file without validating it. Callers that apply command
/// line overrides validate the merged result themselves.
pub fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    toml::from_str(&content).with_context(|| "Failed to parse config file")
}

/// Parse `path`, falling back to built-in defaults when the default config
/// location does not exist. An explicitly chosen path must exist.
pub fn read_config_or_default(path: &Path) -> Result<Config> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG_PATH) {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        return Ok(Config::default());
    }
    read_config(path)
}

pub fn validate(config: &Config) -> Result<()> {
    let backend = &config.backend;
    if backend.url.trim().is_empty() {
        bail!("backend.url must not be empty");
    }
    if backend.model.trim().is_empty() {
        bail!("backend.model must not be empty");
    }
    if backend.timeout_secs == 0 {
        bail!("backend.timeout_secs must be > 0");
    }
    if !(0.0..=2.0).contains(&backend.temperature) {
        bail!("backend.temperature must be in [0.0, 2.0]");
    }
    if !(backend.top_p > 0.0 && backend.top_p <= 1.0) {
        bail!("backend.top_p must be in (0.0, 1.0]");
    }
    if backend.num_ctx == 0 {
        bail!("backend.num_ctx must be > 0");
    }

    if config.chunking.max_chars == 0 {
        bail!("chunking.max_chars must be > 0");
    }

    if config.batch.workers == 0 {
        bail!("batch.workers must be >= 1");
    }
    if config.batch.extensions.is_empty() {
        bail!("batch.extensions must list at least one extension");
    }

    Ok(())
}
