use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub refresh: RefreshSettings,
    #[serde(default)]
    pub dashboards: Vec<DashboardDefinition>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshSettings {
    /// Pause between auto-refresh passes.
    #[serde(default = "default_auto_refresh_secs")]
    pub auto_refresh_secs: u64,
    /// Applied to configured widgets without their own timeout. `0` disables it.
    #[serde(default = "default_widget_timeout_ms")]
    pub widget_timeout_ms: u64,
}

impl RefreshSettings {
    pub fn auto_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.auto_refresh_secs)
    }

    pub fn widget_timeout(&self) -> Option<Duration> {
        match self.widget_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            auto_refresh_secs: default_auto_refresh_secs(),
            widget_timeout_ms: default_widget_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub refresh_interval: Option<u64>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
    #[serde(default)]
    pub widgets: Vec<WidgetDefinition>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WidgetDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub refresh_interval: Option<u64>,
    pub refresh_mode: Option<String>,
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub options: Map<String, Value>,
    #[serde(default)]
    pub style: Map<String, Value>,
    pub source: SourceDefinition,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceDefinition {
    /// Fixed value.
    Static { value: Value },
    /// Seconds since the process started.
    Uptime,
    /// Current time as an RFC 3339 string.
    Clock,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_auto_refresh_secs() -> u64 {
    15
}

fn default_widget_timeout_ms() -> u64 {
    10_000
}

/// Load `config/app.*` (optional) overlaid with `DASHBOARD_*` environment
/// variables, e.g. `DASHBOARD_SERVER__BIND=127.0.0.1:9000`.
pub fn load_config() -> anyhow::Result<AppConfig> {
    load_config_from("config/app")
}

pub fn load_config_from(path: &str) -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(path).required(false))
        .add_source(
            config::Environment::with_prefix("DASHBOARD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
