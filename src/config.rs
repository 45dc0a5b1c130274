use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SequiturConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub judge: JudgeConfig,
    pub linking: LinkingConfig,
    pub traversal: TraversalConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    /// HTTP bind port for the tool server. When unset, the tool server
    /// speaks the protocol over stdio.
    pub port: Option<u16>,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
    /// Capacity of the in-process text → vector LRU cache.
    pub cache_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct JudgeConfig {
    pub model: String,
    pub temperature: f64,
    /// Override for self-hosted OpenAI-compatible endpoints.
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LinkingConfig {
    pub similarity_threshold: f32,
    pub soft_link_threshold: f32,
    pub max_potential_causes: usize,
    pub time_decay_hours: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TraversalConfig {
    /// Forward-traversal hop limit. 0 disables consequence extension.
    pub max_consequence_depth: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    /// Shared secret checked against the `x-api-key` header. Unset = open.
    pub api_key: Option<String>,
    /// Comma-separated allowed origins. `*` allows any origin.
    pub cors_origins: String,
    pub rate_limit_events_per_min: u32,
    pub rate_limit_query_per_min: u32,
}

impl Default for SequiturConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
            judge: JudgeConfig::default(),
            linking: LinkingConfig::default(),
            traversal: TraversalConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: None,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "causal_memory.db".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_sequitur_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
            cache_size: 1000,
        }
    }
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".into(),
            temperature: 0.1,
            base_url: None,
            timeout_secs: 10,
        }
    }
}

impl Default for LinkingConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.5,
            soft_link_threshold: 0.85,
            max_potential_causes: 5,
            time_decay_hours: 24,
        }
    }
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_consequence_depth: 2,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            cors_origins: "*".into(),
            rate_limit_events_per_min: 60,
            rate_limit_query_per_min: 120,
        }
    }
}

/// Returns `~/.sequitur/`
pub fn default_sequitur_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".sequitur")
}

/// Returns the default config file path: `~/.sequitur/config.toml`
pub fn default_config_path() -> PathBuf {
    default_sequitur_dir().join("config.toml")
}

impl SequiturConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            SequiturConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides. Keys follow the deployment
    /// convention of the hosted service (DB_PATH, SIMILARITY_THRESHOLD, ...).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DB_PATH") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("EMBEDDING_MODEL") {
            self.embedding.model = val;
        }
        if let Ok(val) = std::env::var("EMBEDDING_CACHE_SIZE") {
            if let Ok(n) = val.parse() {
                self.embedding.cache_size = n;
            }
        }
        if let Ok(val) = std::env::var("LLM_MODEL") {
            self.judge.model = val;
        }
        if let Ok(val) = std::env::var("LLM_TEMPERATURE") {
            if let Ok(t) = val.parse() {
                self.judge.temperature = t;
            }
        }
        if let Ok(val) = std::env::var("LLM_TIMEOUT_SECS") {
            if let Ok(t) = val.parse() {
                self.judge.timeout_secs = t;
            }
        }
        if let Ok(val) = std::env::var("SIMILARITY_THRESHOLD") {
            if let Ok(t) = val.parse() {
                self.linking.similarity_threshold = t;
            }
        }
        if let Ok(val) = std::env::var("SOFT_LINK_THRESHOLD") {
            if let Ok(t) = val.parse() {
                self.linking.soft_link_threshold = t;
            }
        }
        if let Ok(val) = std::env::var("MAX_POTENTIAL_CAUSES") {
            if let Ok(n) = val.parse() {
                self.linking.max_potential_causes = n;
            }
        }
        if let Ok(val) = std::env::var("TIME_DECAY_HOURS") {
            if let Ok(n) = val.parse() {
                self.linking.time_decay_hours = n;
            }
        }
        if let Ok(val) = std::env::var("MAX_CONSEQUENCE_DEPTH") {
            if let Ok(n) = val.parse() {
                self.traversal.max_consequence_depth = n;
            }
        }
        if let Ok(val) = std::env::var("API_KEY") {
            self.api.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("CORS_ORIGINS") {
            self.api.cors_origins = val;
        }
        if let Ok(val) = std::env::var("RATE_LIMIT_EVENTS_PER_MIN") {
            if let Ok(n) = val.parse() {
                self.api.rate_limit_events_per_min = n;
            }
        }
        if let Ok(val) = std::env::var("RATE_LIMIT_QUERY_PER_MIN") {
            if let Ok(n) = val.parse() {
                self.api.rate_limit_query_per_min = n;
            }
        }
        if let Ok(val) = std::env::var("HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("PORT") {
            if let Ok(p) = val.parse() {
                self.server.port = Some(p);
            }
        }
        if let Ok(val) = std::env::var("SEQUITUR_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
