// Widget domain model - configuration, refresh results and staleness
use super::data_source::DataSource;
use crate::error::DashboardError;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetType {
    Metric,
    Chart,
    Table,
    List,
    Gauge,
    Text,
}

impl FromStr for WidgetType {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "metric" => Ok(Self::Metric),
            "chart" => Ok(Self::Chart),
            "table" => Ok(Self::Table),
            "list" => Ok(Self::List),
            "gauge" => Ok(Self::Gauge),
            "text" => Ok(Self::Text),
            other => Err(DashboardError::UnknownWidgetType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    /// Only refreshed on explicit request.
    Manual,
    /// Due once `refresh_interval` seconds have passed since the last attempt.
    #[default]
    Interval,
    /// Due on every pass.
    Realtime,
}

impl FromStr for RefreshMode {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "interval" => Ok(Self::Interval),
            "realtime" => Ok(Self::Realtime),
            other => Err(DashboardError::UnknownRefreshMode(other.to_string())),
        }
    }
}

#[derive(Clone)]
pub struct WidgetConfig {
    pub id: String,
    pub kind: WidgetType,
    pub title: String,
    pub source: Arc<dyn DataSource>,
    pub refresh_interval: u64,
    pub refresh_mode: RefreshMode,
    pub style: Map<String, Value>,
    pub options: Map<String, Value>,
    pub timeout: Option<Duration>,
}

impl WidgetConfig {
    pub fn new(
        id: impl Into<String>,
        kind: WidgetType,
        title: impl Into<String>,
        source: Arc<dyn DataSource>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            source,
            refresh_interval: DEFAULT_REFRESH_INTERVAL_SECS,
            refresh_mode: RefreshMode::default(),
            style: Map::new(),
            options: Map::new(),
            timeout: None,
        }
    }
}

impl fmt::Debug for WidgetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetConfig")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("title", &self.title)
            .field("refresh_interval", &self.refresh_interval)
            .field("refresh_mode", &self.refresh_mode)
            .field("style", &self.style)
            .field("options", &self.options)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Outcome of one refresh attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetData {
    pub widget_id: String,
    pub data: Option<Value>,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
}

impl WidgetData {
    pub fn ok(widget_id: impl Into<String>, data: Value) -> Self {
        Self {
            widget_id: widget_id.into(),
            data: Some(data),
            timestamp: Utc::now(),
            error: None,
        }
    }

    pub fn failed(widget_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            widget_id: widget_id.into(),
            data: None,
            timestamp: Utc::now(),
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Rendered widget state handed to the front end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetSnapshot {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: WidgetType,
    pub title: String,
    pub data: Option<Value>,
    pub timestamp: Option<String>,
    pub error: Option<String>,
    pub options: Map<String, Value>,
}

#[derive(Debug, Default)]
struct WidgetState {
    last_data: Option<WidgetData>,
    last_refresh: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct Widget {
    config: WidgetConfig,
    state: RwLock<WidgetState>,
}

impl Widget {
    pub fn new(config: WidgetConfig) -> Self {
        Self {
            config,
            state: RwLock::new(WidgetState::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    /// Fetch a fresh value from the data source.
    ///
    /// Never fails: source errors, panics and timeouts all come back as a
    /// [`WidgetData`] with `error` set. Every attempt restarts the staleness
    /// clock.
    pub async fn refresh(&self) -> WidgetData {
        let result = match self.fetch().await {
            Ok(value) => {
                tracing::debug!(widget = %self.config.id, "widget refreshed");
                WidgetData::ok(&self.config.id, value)
            }
            Err(message) => {
                tracing::warn!(widget = %self.config.id, error = %message, "widget refresh failed");
                WidgetData::failed(&self.config.id, message)
            }
        };

        let mut state = self.state.write();
        state.last_refresh = Some(result.timestamp);
        state.last_data = Some(result.clone());
        result
    }

    async fn fetch(&self) -> Result<Value, String> {
        let fetch = AssertUnwindSafe(self.config.source.fetch()).catch_unwind();

        let outcome = match self.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, fetch).await {
                Ok(outcome) => outcome,
                Err(_) => return Err(format!("timed out after {}ms", limit.as_millis())),
            },
            None => fetch.await,
        };

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(format!("{:#}", e)),
            Err(panic) => Err(format!("data source panicked: {}", panic_message(panic.as_ref()))),
        }
    }

    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh_at(Utc::now())
    }

    /// Staleness as of `now`.
    pub fn needs_refresh_at(&self, now: DateTime<Utc>) -> bool {
        match self.config.refresh_mode {
            RefreshMode::Manual => false,
            RefreshMode::Realtime => true,
            RefreshMode::Interval => match self.state.read().last_refresh {
                None => true,
                Some(last) => {
                    let elapsed = now.signed_duration_since(last);
                    elapsed.num_milliseconds() >= self.interval_millis()
                }
            },
        }
    }

    fn interval_millis(&self) -> i64 {
        i64::try_from(self.config.refresh_interval)
            .unwrap_or(i64::MAX / 1000)
            .saturating_mul(1000)
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.state.read().last_refresh
    }

    pub fn get_data(&self) -> Option<WidgetData> {
        self.state.read().last_data.clone()
    }

    pub fn snapshot(&self) -> WidgetSnapshot {
        let state = self.state.read();
        let last = state.last_data.as_ref();

        WidgetSnapshot {
            id: self.config.id.clone(),
            kind: self.config.kind,
            title: self.config.title.clone(),
            data: last.and_then(|d| d.data.clone()),
            timestamp: last.map(|d| d.timestamp.to_rfc3339()),
            error: last.and_then(|d| d.error.clone()),
            options: self.config.options.clone(),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::data_source::{constant, from_async, from_fn};
    use chrono::Duration as ChronoDuration;
    use serde_json::json;

    fn widget(mode: RefreshMode, interval: u64) -> Widget {
        let mut config = WidgetConfig::new("users", WidgetType::Metric, "Total Users", constant(1234));
        config.refresh_mode = mode;
        config.refresh_interval = interval;
        Widget::new(config)
    }

    #[test]
    fn test_manual_never_needs_refresh() {
        let widget = widget(RefreshMode::Manual, 1);
        assert!(!widget.needs_refresh());
        assert!(!widget.needs_refresh_at(Utc::now() + ChronoDuration::days(365)));
    }

    #[tokio::test]
    async fn test_manual_stays_fresh_after_refresh() {
        let widget = widget(RefreshMode::Manual, 1);
        widget.refresh().await;
        assert!(!widget.needs_refresh_at(Utc::now() + ChronoDuration::hours(1)));
    }

    #[test]
    fn test_never_refreshed_is_due() {
        assert!(widget(RefreshMode::Interval, 60).needs_refresh());
        assert!(widget(RefreshMode::Realtime, 60).needs_refresh());
    }

    #[tokio::test]
    async fn test_interval_staleness() {
        let widget = widget(RefreshMode::Interval, 30);
        widget.refresh().await;
        let last = widget.last_refresh().unwrap();

        assert!(!widget.needs_refresh());
        assert!(!widget.needs_refresh_at(last + ChronoDuration::seconds(29)));
        assert!(widget.needs_refresh_at(last + ChronoDuration::seconds(30)));
        assert!(widget.needs_refresh_at(last + ChronoDuration::seconds(90)));
    }

    #[tokio::test]
    async fn test_realtime_always_due() {
        let widget = widget(RefreshMode::Realtime, 3600);
        widget.refresh().await;
        assert!(widget.needs_refresh());
    }

    #[tokio::test]
    async fn test_refresh_stores_result() {
        let widget = widget(RefreshMode::Interval, 60);
        assert!(widget.get_data().is_none());

        let data = widget.refresh().await;
        assert!(data.is_ok());
        assert_eq!(data.widget_id, "users");
        assert_eq!(data.data, Some(json!(1234)));
        assert_eq!(widget.get_data(), Some(data.clone()));
        assert_eq!(widget.last_refresh(), Some(data.timestamp));
    }

    #[tokio::test]
    async fn test_failed_refresh_is_captured() {
        let source = from_fn(|| -> anyhow::Result<f64> { anyhow::bail!("connection refused") });
        let widget = Widget::new(WidgetConfig::new("cpu", WidgetType::Gauge, "CPU", source));

        let data = widget.refresh().await;
        assert_eq!(data.data, None);
        assert_eq!(data.error.as_deref(), Some("connection refused"));

        // failed attempts still restart the clock
        let last = widget.last_refresh().unwrap();
        assert_eq!(last, data.timestamp);
        assert!(!widget.needs_refresh_at(last + ChronoDuration::seconds(59)));
        assert!(widget.needs_refresh_at(last + ChronoDuration::seconds(60)));
    }

    #[tokio::test]
    async fn test_panicking_source_is_captured() {
        let source = from_fn(|| -> anyhow::Result<i32> { panic!("index out of bounds") });
        let widget = Widget::new(WidgetConfig::new("orders", WidgetType::Table, "Orders", source));

        let data = widget.refresh().await;
        assert_eq!(data.data, None);
        assert_eq!(
            data.error.as_deref(),
            Some("data source panicked: index out of bounds")
        );
    }

    #[tokio::test]
    async fn test_timeout_is_captured() {
        let source = from_async(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, anyhow::Error>(1)
        });
        let mut config = WidgetConfig::new("slow", WidgetType::Metric, "Slow", source);
        config.timeout = Some(Duration::from_millis(20));
        let widget = Widget::new(config);

        let data = widget.refresh().await;
        assert_eq!(data.error.as_deref(), Some("timed out after 20ms"));
        assert!(widget.last_refresh().is_some());
    }

    #[tokio::test]
    async fn test_error_replaces_previous_data() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = calls.clone();
        let source = from_fn(move || {
            if counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                Ok(42)
            } else {
                anyhow::bail!("upstream gone")
            }
        });
        let widget = Widget::new(WidgetConfig::new("flaky", WidgetType::Metric, "Flaky", source));

        widget.refresh().await;
        widget.refresh().await;

        let snapshot = widget.snapshot();
        assert_eq!(snapshot.data, None);
        assert_eq!(snapshot.error.as_deref(), Some("upstream gone"));
    }

    #[test]
    fn test_snapshot_before_refresh() {
        let mut config = WidgetConfig::new("cpu", WidgetType::Gauge, "CPU Usage", constant(65.5));
        config.options.insert("min".to_string(), json!(0.0));
        let widget = Widget::new(config);

        let snapshot = widget.snapshot();
        assert_eq!(snapshot.data, None);
        assert_eq!(snapshot.timestamp, None);
        assert_eq!(snapshot.error, None);

        let rendered = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(rendered["type"], "gauge");
        assert_eq!(rendered["options"]["min"], 0.0);
    }

    #[tokio::test]
    async fn test_snapshot_timestamp_is_iso8601() {
        let widget = widget(RefreshMode::Interval, 60);
        let data = widget.refresh().await;

        let timestamp = widget.snapshot().timestamp.unwrap();
        let parsed = DateTime::parse_from_rfc3339(&timestamp).unwrap();
        assert_eq!(parsed.with_timezone(&Utc), data.timestamp);
    }

    #[test]
    fn test_parse_kinds_and_modes() {
        assert_eq!("chart".parse::<WidgetType>().unwrap(), WidgetType::Chart);
        assert_eq!("realtime".parse::<RefreshMode>().unwrap(), RefreshMode::Realtime);
        assert_eq!(
            "sparkline".parse::<WidgetType>(),
            Err(DashboardError::UnknownWidgetType("sparkline".to_string()))
        );
    }
}
