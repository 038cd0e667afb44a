//! Configuration loading and resolution
//!
//! One [`AppConfig`] is built at startup and handed to the repository and
//! services. Sources, highest priority first:
//! 1. Command-line arguments ([`ConfigOverrides`])
//! 2. Environment variables (`INB_*`, provider secrets)
//! 3. TOML configuration file
//! 4. Built-in defaults

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::store::{DocumentStore, FirestoreStore, SqliteStore};
use crate::{Error, Result};

pub const ROOT_FOLDER_ENV: &str = "INB_ROOT_FOLDER";
pub const CONFIG_PATH_ENV: &str = "INB_CONFIG";
pub const FIRESTORE_PROJECT_ENV: &str = "INB_FIRESTORE_PROJECT_ID";
pub const FIRESTORE_API_KEY_ENV: &str = "INB_FIRESTORE_API_KEY";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const PERPLEXITY_API_KEY_ENV: &str = "PERPLEXITY_API_KEY";
pub const YOUTUBE_API_KEY_ENV: &str = "YOUTUBE_API_KEY";

/// Application directory name under the OS data/config folders
const APP_DIR: &str = "inquiry-notebook";

/// SQLite store file name under the root folder
pub const DB_FILE_NAME: &str = "notebook.db";

/// Local cache directory under the root folder
pub const CACHE_DIR_NAME: &str = "cache";

/// Values shipped in sample configs that must never reach a store client
const PLACEHOLDERS: &[&str] = &["your-project-id", "your-api-key", "your-key-here"];

/// Configuration file contents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Root folder for the SQLite store and local cache
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub ai: AiConfig,

    #[serde(default)]
    pub autosave: AutosaveConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Document store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Firestore,
}

impl std::str::FromStr for StoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "firestore" => Ok(StoreBackend::Firestore),
            other => Err(Error::Config(format!("Unknown store backend: {}", other))),
        }
    }
}

/// `[store]` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Firestore REST base URL override (emulator)
    #[serde(default)]
    pub base_url: Option<String>,
}

/// `[ai]` section
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// Route AI calls through the proxy service instead of calling providers
    #[serde(default)]
    pub use_proxy: bool,
    #[serde(default = "default_proxy_base_url")]
    pub proxy_base_url: String,

    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub perplexity_api_key: Option<String>,
    #[serde(default)]
    pub youtube_api_key: Option<String>,

    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_perplexity_base_url")]
    pub perplexity_base_url: String,
    #[serde(default = "default_youtube_base_url")]
    pub youtube_base_url: String,

    #[serde(default = "default_openai_model")]
    pub openai_model: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            use_proxy: false,
            proxy_base_url: default_proxy_base_url(),
            openai_api_key: None,
            perplexity_api_key: None,
            youtube_api_key: None,
            openai_base_url: default_openai_base_url(),
            perplexity_base_url: default_perplexity_base_url(),
            youtube_base_url: default_youtube_base_url(),
            openai_model: default_openai_model(),
        }
    }
}

/// `[autosave]` section
#[derive(Debug, Clone, Deserialize)]
pub struct AutosaveConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_proxy_base_url() -> String {
    "http://127.0.0.1:5781".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_perplexity_base_url() -> String {
    "https://api.perplexity.ai".to_string()
}

fn default_youtube_base_url() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_debounce_ms() -> u64 {
    2000
}

impl TomlConfig {
    /// Load a TOML file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file not found, using defaults: {}", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
        let config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Command-line values that take priority over every other source
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub root_folder: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub store_backend: Option<StoreBackend>,
    pub use_proxy: Option<bool>,
}

/// Provider secrets and endpoints resolved for the AI clients
#[derive(Debug, Clone, Default)]
pub struct AiSettings {
    pub use_proxy: bool,
    pub proxy_base_url: String,
    pub openai_api_key: Option<String>,
    pub perplexity_api_key: Option<String>,
    pub youtube_api_key: Option<String>,
    pub openai_base_url: String,
    pub perplexity_base_url: String,
    pub youtube_base_url: String,
    pub openai_model: String,
}

impl AiSettings {
    fn resolve(ai: &AiConfig, use_proxy: Option<bool>) -> Self {
        Self {
            use_proxy: use_proxy.unwrap_or(ai.use_proxy),
            proxy_base_url: ai.proxy_base_url.trim_end_matches('/').to_string(),
            openai_api_key: resolve_api_key(
                "OpenAI",
                OPENAI_API_KEY_ENV,
                ai.openai_api_key.as_deref(),
            ),
            perplexity_api_key: resolve_api_key(
                "Perplexity",
                PERPLEXITY_API_KEY_ENV,
                ai.perplexity_api_key.as_deref(),
            ),
            youtube_api_key: resolve_api_key(
                "YouTube",
                YOUTUBE_API_KEY_ENV,
                ai.youtube_api_key.as_deref(),
            ),
            openai_base_url: ai.openai_base_url.trim_end_matches('/').to_string(),
            perplexity_base_url: ai.perplexity_base_url.trim_end_matches('/').to_string(),
            youtube_base_url: ai.youtube_base_url.trim_end_matches('/').to_string(),
            openai_model: ai.openai_model.clone(),
        }
    }
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub store: StoreConfig,
    pub ai: AiSettings,
    pub autosave_debounce: Duration,
}

impl AppConfig {
    /// Resolve configuration from every source
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let toml = match resolve_config_path(overrides.config_path.as_deref()) {
            Some(path) => TomlConfig::load(&path)?,
            None => {
                warn!("No config directory available, using defaults");
                TomlConfig::default()
            }
        };
        Ok(Self::from_toml(toml, overrides))
    }

    /// Resolve configuration from an already-parsed TOML file
    pub fn from_toml(toml: TomlConfig, overrides: &ConfigOverrides) -> Self {
        let root_folder = resolve_root_folder(overrides.root_folder.as_deref(), &toml);

        let mut store = toml.store;
        if let Some(backend) = overrides.store_backend {
            store.backend = backend;
        }
        if let Some(project_id) = env_value(FIRESTORE_PROJECT_ENV) {
            store.project_id = Some(project_id);
        }
        if let Some(api_key) = env_value(FIRESTORE_API_KEY_ENV) {
            store.api_key = Some(api_key);
        }

        Self {
            root_folder,
            log_level: toml.logging.level,
            store,
            ai: AiSettings::resolve(&toml.ai, overrides.use_proxy),
            autosave_debounce: Duration::from_millis(toml.autosave.debounce_ms),
        }
    }

    /// SQLite store file
    pub fn db_path(&self) -> PathBuf {
        self.root_folder.join(DB_FILE_NAME)
    }

    /// Local cache directory
    pub fn cache_dir(&self) -> PathBuf {
        self.root_folder.join(CACHE_DIR_NAME)
    }

    /// Construct the configured document store
    pub async fn build_store(&self) -> Result<Arc<dyn DocumentStore>> {
        match self.store.backend {
            StoreBackend::Sqlite => {
                let store = SqliteStore::open(&self.db_path()).await?;
                Ok(Arc::new(store))
            }
            StoreBackend::Firestore => {
                let project_id = require_setting(
                    self.store.project_id.as_deref(),
                    "Firestore project id",
                    FIRESTORE_PROJECT_ENV,
                )?;
                let api_key = require_setting(
                    self.store.api_key.as_deref(),
                    "Firestore API key",
                    FIRESTORE_API_KEY_ENV,
                )?;
                info!("Using Firestore project {}", project_id);
                let store =
                    FirestoreStore::new(project_id, api_key, self.store.base_url.as_deref())?;
                Ok(Arc::new(store))
            }
        }
    }
}

/// TOML path: command line → `INB_CONFIG` → OS config directory
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env_value(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Root folder: command line → `INB_ROOT_FOLDER` → TOML → OS default
pub fn resolve_root_folder(cli_path: Option<&Path>, toml: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_path {
        return path.to_path_buf();
    }
    if let Some(path) = env_value(ROOT_FOLDER_ENV) {
        return PathBuf::from(path);
    }
    if let Some(path) = &toml.root_folder {
        return path.clone();
    }
    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("./inquiry_notebook_data"))
}

/// Resolve a provider secret: environment → TOML
pub fn resolve_api_key(provider: &str, env_name: &str, toml_value: Option<&str>) -> Option<String> {
    let env_key = env_value(env_name).filter(|k| is_valid_key(k));
    let toml_key = toml_value.filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "{} API key found in environment and TOML. Using environment.",
            provider
        );
    }

    if let Some(key) = env_key {
        info!("{} API key loaded from environment variable", provider);
        return Some(key);
    }
    if let Some(key) = toml_key {
        info!("{} API key loaded from TOML config", provider);
        return Some(key.to_string());
    }
    None
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

fn is_placeholder(value: &str) -> bool {
    PLACEHOLDERS
        .iter()
        .any(|p| value.trim().eq_ignore_ascii_case(p))
}

fn require_setting<'a>(value: Option<&'a str>, what: &str, env_name: &str) -> Result<&'a str> {
    match value {
        Some(v) if is_valid_key(v) && !is_placeholder(v) => Ok(v.trim()),
        _ => Err(Error::Config(format!(
            "{} not configured. Set {} or the [store] section of the config file.",
            what, env_name
        ))),
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
