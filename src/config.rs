use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{VizCueError, VizCueResult};
use crate::parser::{ModelFamily, ParseMode};

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub mode: ParseMode,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_grid_dim")]
    pub rows: u32,
    #[serde(default = "default_grid_dim")]
    pub cols: u32,
    /// Size the grid from the screenshot instead of `rows`/`cols`.
    #[serde(default)]
    pub auto: bool,
    #[serde(default = "default_target_cell_px")]
    pub target_cell_px: u32,
    /// Draw labeled grid lines onto the screenshot before sending it.
    #[serde(default = "default_true")]
    pub draw_overlay: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: default_grid_dim(),
            cols: default_grid_dim(),
            auto: false,
            target_cell_px: default_target_cell_px(),
            draw_overlay: true,
        }
    }
}

fn default_grid_dim() -> u32 {
    4
}

fn default_target_cell_px() -> u32 {
    80
}

/// How highlight coordinates relate to the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DprPolicy {
    /// The render layer works in logical points; rects pass through unchanged.
    #[default]
    Logical,
    /// The render layer works in physical pixels; rects are multiplied by DPR.
    Physical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    #[serde(default = "default_min_size")]
    pub min_size: f64,
    /// Minimum side used once an icon refiner has reshaped the box.
    #[serde(default = "default_icon_min_size")]
    pub icon_min_size: f64,
    #[serde(default)]
    pub dpr_policy: DprPolicy,
    #[serde(default = "default_true")]
    pub icon_squaring: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            min_size: default_min_size(),
            icon_min_size: default_icon_min_size(),
            dpr_policy: DprPolicy::default(),
            icon_squaring: true,
        }
    }
}

fn default_min_size() -> f64 {
    30.0
}

fn default_icon_min_size() -> f64 {
    20.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightConfig {
    #[serde(default = "default_true")]
    pub flash: bool,
    #[serde(default = "default_flash_cycles")]
    pub flash_cycles: u32,
    #[serde(default = "default_flash_interval_ms")]
    pub flash_interval_ms: u64,
    /// Off by default: a highlight stays until the next request or a clear.
    #[serde(default)]
    pub auto_expire: bool,
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
    #[serde(default = "default_true")]
    pub show_click_indicator: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            flash: true,
            flash_cycles: default_flash_cycles(),
            flash_interval_ms: default_flash_interval_ms(),
            auto_expire: false,
            duration_ms: default_duration_ms(),
            show_click_indicator: true,
        }
    }
}

fn default_flash_cycles() -> u32 {
    5
}

fn default_flash_interval_ms() -> u64 {
    400
}

fn default_duration_ms() -> u64 {
    3000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Pointer transition time before the click.
    #[serde(default = "default_move_duration_ms")]
    pub move_duration_ms: u64,
    /// Interpolation steps for the transition.
    #[serde(default = "default_move_steps")]
    pub move_steps: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            move_duration_ms: default_move_duration_ms(),
            move_steps: default_move_steps(),
        }
    }
}

fn default_move_duration_ms() -> u64 {
    500
}

fn default_move_steps() -> u32 {
    25
}

/// Where screenshots go before the model sees them. Every store is optional;
/// with none configured the image is sent inline as a data URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Base URL accepting `PUT <endpoint>/<name>.png`.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Public base for uploaded objects; defaults to `endpoint`.
    #[serde(default)]
    pub public_base: Option<String>,
    /// Optional bearer token for the upload endpoint.
    #[serde(default)]
    pub token: Option<String>,
    /// Directory for `file://` references.
    #[serde(default)]
    pub local_dir: Option<PathBuf>,
    #[serde(default = "default_upload_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            public_base: None,
            token: None,
            local_dir: None,
            timeout_secs: default_upload_timeout_secs(),
        }
    }
}

fn default_upload_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmConfig {
    pub active_provider: String,
    #[serde(default)]
    pub providers: HashMap<String, ProviderEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub display_name: String,
    pub api_base: String,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Overrides the family inferred from `model`.
    #[serde(default)]
    pub family: Option<ModelFamily>,
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
    /// Optional API key stored in config.toml (falls back to env var VIZCUE_<ID>_API_KEY).
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ProviderEntry {
    pub fn family(&self) -> ModelFamily {
        self.family_for(&self.model)
    }

    /// Family to use when this provider serves `model`: the pinned one, else
    /// inferred from the model id.
    pub fn family_for(&self, model: &str) -> ModelFamily {
        self.family
            .unwrap_or_else(|| ModelFamily::from_model_id(model))
    }
}

fn default_temperature() -> f64 {
    0.1
}

fn default_request_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HistoryConfig {
    /// Directory for `session_<id>.jsonl`; platform data dir when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn resolve_config_path() -> VizCueResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join(CONFIG_FILE);
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join(CONFIG_FILE);
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    if let Some(dir) = dirs::config_dir() {
        let candidate = dir.join("vizcue").join(CONFIG_FILE);
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found in user config dir");
            return Ok(candidate);
        }
    }

    Err(VizCueError::Config(
        "config.toml not found next to executable, in working directory or user config dir".into(),
    ))
}

pub fn parse_config(content: &str) -> VizCueResult<AppConfig> {
    Ok(toml::from_str(content)?)
}

pub fn load_config() -> VizCueResult<AppConfig> {
    let path = resolve_config_path()?;
    let content = std::fs::read_to_string(&path)?;
    let config = parse_config(&content)?;
    tracing::info!(
        path = %path.display(),
        provider = %config.llm.active_provider,
        mode = ?config.mode,
        "config loaded"
    );
    Ok(config)
}

/// Like [`load_config`], but a missing or unreadable file yields defaults.
pub fn load_config_or_default() -> AppConfig {
    match load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "using default configuration");
            AppConfig::default()
        }
    }
}

pub fn save_config(config: &AppConfig) -> VizCueResult<()> {
    let path = match resolve_config_path() {
        Ok(p) => p,
        Err(_) => std::env::current_dir()?.join(CONFIG_FILE),
    };
    save_config_to(config, &path)
}

pub fn save_config_to(config: &AppConfig, path: &Path) -> VizCueResult<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}
