use std::{fs, path::Path};

use serde::Deserialize;

use crate::core::error::EngineError;

pub const DEFAULT_CONFIG_PATH: &str = "config/nightwatch.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_cas_attempts")]
    pub cas_max_attempts: u32,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub geocoder: GeocoderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_sos_interval")]
    pub sos_interval_secs: u64,
    #[serde(default = "default_reports_interval")]
    pub reports_interval_secs: u64,
    #[serde(default = "default_staleness")]
    pub max_staleness_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_recent_reports")]
    pub recent_reports: usize,
    #[serde(default = "default_active_alerts")]
    pub active_alerts: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocoderConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_geocoder_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cas_max_attempts: default_cas_attempts(),
            poll: PollConfig::default(),
            dashboard: DashboardConfig::default(),
            geocoder: GeocoderConfig::default(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            sos_interval_secs: default_sos_interval(),
            reports_interval_secs: default_reports_interval(),
            max_staleness_secs: default_staleness(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            recent_reports: default_recent_reports(),
            active_alerts: default_active_alerts(),
        }
    }
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_geocoder_url(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

pub fn load_config(path: Option<&str>) -> Result<AppConfig, EngineError> {
    let path = Path::new(path.unwrap_or(DEFAULT_CONFIG_PATH));

    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|e| EngineError::Config(e.to_string()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<AppConfig, EngineError> {
    let mut cfg: AppConfig =
        toml::from_str(content).map_err(|e| EngineError::Config(e.to_string()))?;
    cfg.cas_max_attempts = cfg.cas_max_attempts.clamp(1, 5);
    if cfg.poll.sos_interval_secs == 0 || cfg.poll.reports_interval_secs == 0 {
        return Err(EngineError::Config("poll intervals must be positive".into()));
    }
    Ok(cfg)
}

fn default_db_path() -> String {
    "data/nightwatch.db".to_string()
}

fn default_cas_attempts() -> u32 {
    4
}

fn default_sos_interval() -> u64 {
    5
}

fn default_reports_interval() -> u64 {
    10
}

fn default_staleness() -> u64 {
    30
}

fn default_recent_reports() -> usize {
    5
}

fn default_active_alerts() -> usize {
    2
}

fn default_geocoder_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_user_agent() -> String {
    format!("nightwatch/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_ms() -> u64 {
    5_000
}
