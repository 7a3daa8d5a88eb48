//! Application configuration for LeadScout.
//!
//! User config lives at `~/.leadscout/leadscout.toml`.
//! CLI flags override config file values, which override defaults.
//! API keys are referenced by env-var name; the key itself is never stored.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LeadScoutError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "leadscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".leadscout";

// ---------------------------------------------------------------------------
// Config structs (matching leadscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Chat-model settings (query expansion, filter extraction, drafting).
    #[serde(default)]
    pub llm: LlmConfig,

    /// Maps/places listing source.
    #[serde(default)]
    pub maps: MapsConfig,

    /// Review-site directory source.
    #[serde(default)]
    pub reviews: ReviewsConfig,

    /// Spreadsheet export service.
    #[serde(default)]
    pub spreadsheet: SpreadsheetConfig,

    /// Tabular document sink.
    #[serde(default)]
    pub sink: SinkConfig,

    /// Outreach mail transport.
    #[serde(default)]
    pub outreach: OutreachConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// How many search queries to expand a user query into.
    #[serde(default = "default_query_count")]
    pub query_count: usize,

    /// Directory for locally written export files.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            query_count: default_query_count(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_query_count() -> usize {
    3
}
fn default_output_dir() -> String {
    "~/leadscout-exports".into()
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,

    /// OpenAI-compatible API base URL.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model to use for expansion, extraction, and drafting.
    #[serde(default = "default_llm_model")]
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_llm_api_key_env(),
            base_url: default_llm_base_url(),
            model: default_llm_model(),
        }
    }
}

fn default_llm_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_llm_model() -> String {
    "gpt-4o-mini".into()
}

/// `[maps]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapsConfig {
    /// Name of the env var holding the places API key.
    #[serde(default = "default_maps_api_key_env")]
    pub api_key_env: String,

    /// Places API base URL.
    #[serde(default = "default_maps_base_url")]
    pub base_url: String,

    /// Fixed delay between pagination steps, in ms.
    #[serde(default = "default_maps_page_delay")]
    pub page_delay_ms: u64,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_maps_api_key_env(),
            base_url: default_maps_base_url(),
            page_delay_ms: default_maps_page_delay(),
        }
    }
}

fn default_maps_api_key_env() -> String {
    "MAPS_API_KEY".into()
}
fn default_maps_base_url() -> String {
    "https://maps.googleapis.com/maps/api/place".into()
}
fn default_maps_page_delay() -> u64 {
    2000
}

/// `[reviews]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewsConfig {
    /// Review-site directory base URL.
    #[serde(default = "default_reviews_base_url")]
    pub base_url: String,

    /// Lower bound of the randomized inter-page delay, in ms.
    #[serde(default = "default_reviews_min_delay")]
    pub min_delay_ms: u64,

    /// Upper bound of the randomized inter-page delay, in ms.
    #[serde(default = "default_reviews_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for ReviewsConfig {
    fn default() -> Self {
        Self {
            base_url: default_reviews_base_url(),
            min_delay_ms: default_reviews_min_delay(),
            max_delay_ms: default_reviews_max_delay(),
        }
    }
}

fn default_reviews_base_url() -> String {
    "https://www.trustpilot.com".into()
}
fn default_reviews_min_delay() -> u64 {
    1000
}
fn default_reviews_max_delay() -> u64 {
    5000
}

/// `[spreadsheet]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadsheetConfig {
    /// Name of the env var holding the OAuth bearer token.
    #[serde(default = "default_sheet_token_env")]
    pub token_env: String,

    /// Spreadsheet API base URL.
    #[serde(default = "default_sheets_base_url")]
    pub sheets_base_url: String,

    /// File-permission API base URL.
    #[serde(default = "default_drive_base_url")]
    pub drive_base_url: String,

    /// Collaborator granted writer access on every exported spreadsheet.
    #[serde(default)]
    pub collaborator_email: Option<String>,
}

impl Default for SpreadsheetConfig {
    fn default() -> Self {
        Self {
            token_env: default_sheet_token_env(),
            sheets_base_url: default_sheets_base_url(),
            drive_base_url: default_drive_base_url(),
            collaborator_email: None,
        }
    }
}

fn default_sheet_token_env() -> String {
    "SHEETS_TOKEN".into()
}
fn default_sheets_base_url() -> String {
    "https://sheets.googleapis.com/v4".into()
}
fn default_drive_base_url() -> String {
    "https://www.googleapis.com/drive/v3".into()
}

/// `[sink]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Endpoint the quoted-CSV payload is delivered to. When unset, the
    /// tabular export is only written locally.
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// `[outreach]` section. Passed through to the mail transport; the core
/// never opens SMTP connections itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
}

impl Default for OutreachConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
        }
    }
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".into()
}
fn default_smtp_port() -> u16 {
    587
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.leadscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LeadScoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.leadscout/leadscout.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LeadScoutError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| LeadScoutError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LeadScoutError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LeadScoutError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LeadScoutError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read a secret named by an env-var reference, erroring with the var name
/// when it is unset or empty.
pub fn resolve_api_key(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(LeadScoutError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}
