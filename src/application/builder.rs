// Dashboard builder - fluent assembly of widgets and layout
use crate::domain::dashboard::{Dashboard, DashboardConfig};
use crate::domain::data_source::DataSource;
use crate::domain::widget::{RefreshMode, Widget, WidgetConfig, WidgetType};
use crate::error::DashboardError;
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

pub struct DashboardBuilder {
    config: DashboardConfig,
    widgets: Vec<WidgetConfig>,
    layout: Vec<Vec<String>>,
    default_timeout: Option<Duration>,
}

impl DashboardBuilder {
    pub fn new(dashboard_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            config: DashboardConfig::new(dashboard_id, name),
            widgets: Vec::new(),
            layout: Vec::new(),
            default_timeout: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.config.description = description.into();
        self
    }

    pub fn refresh_interval(mut self, seconds: u64) -> Self {
        self.config.refresh_interval = seconds;
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.metadata.insert(key.into(), value.into());
        self
    }

    /// Timeout for widgets added after this call that don't set their own.
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    pub fn widget(mut self, mut config: WidgetConfig) -> Self {
        if config.timeout.is_none() {
            config.timeout = self.default_timeout;
        }
        self.widgets.push(config);
        self
    }

    fn push(
        self,
        id: impl Into<String>,
        kind: WidgetType,
        title: impl Into<String>,
        source: Arc<dyn DataSource>,
        options: Map<String, Value>,
    ) -> Self {
        let mut config = WidgetConfig::new(id, kind, title, source);
        config.options = options;
        self.widget(config)
    }

    pub fn metric(self, id: impl Into<String>, title: impl Into<String>, source: Arc<dyn DataSource>) -> Self {
        self.push(id, WidgetType::Metric, title, source, Map::new())
    }

    /// Chart widget; `chart_type` defaults to `"line"`, override with [`Self::options`].
    pub fn chart(self, id: impl Into<String>, title: impl Into<String>, source: Arc<dyn DataSource>) -> Self {
        let mut options = Map::new();
        options.insert("chart_type".to_string(), json!("line"));
        self.push(id, WidgetType::Chart, title, source, options)
    }

    pub fn table(self, id: impl Into<String>, title: impl Into<String>, source: Arc<dyn DataSource>) -> Self {
        self.push(id, WidgetType::Table, title, source, Map::new())
    }

    pub fn list(self, id: impl Into<String>, title: impl Into<String>, source: Arc<dyn DataSource>) -> Self {
        self.push(id, WidgetType::List, title, source, Map::new())
    }

    pub fn gauge(
        self,
        id: impl Into<String>,
        title: impl Into<String>,
        min: f64,
        max: f64,
        source: Arc<dyn DataSource>,
    ) -> Self {
        let mut options = Map::new();
        options.insert("min".to_string(), json!(min));
        options.insert("max".to_string(), json!(max));
        self.push(id, WidgetType::Gauge, title, source, options)
    }

    pub fn text(self, id: impl Into<String>, title: impl Into<String>, source: Arc<dyn DataSource>) -> Self {
        self.push(id, WidgetType::Text, title, source, Map::new())
    }

    fn last_widget(&mut self, apply: impl FnOnce(&mut WidgetConfig)) {
        match self.widgets.last_mut() {
            Some(config) => apply(config),
            None => tracing::warn!(dashboard = %self.config.id, "widget modifier called before any widget"),
        }
    }

    // Widget modifiers below act on the most recently added widget. Called
    // before any widget they change nothing and log a warning.

    /// Merge options into the last added widget. Given keys win over defaults.
    /// No effect before the first widget.
    pub fn options(mut self, options: Map<String, Value>) -> Self {
        self.last_widget(|config| config.options.extend(options));
        self
    }

    /// Merge style keys into the last added widget. No effect before the first widget.
    pub fn style(mut self, style: Map<String, Value>) -> Self {
        self.last_widget(|config| config.style.extend(style));
        self
    }

    /// Put the last added widget on an interval schedule. No effect before the first widget.
    pub fn refresh_every(mut self, seconds: u64) -> Self {
        self.last_widget(|config| {
            config.refresh_interval = seconds;
            config.refresh_mode = RefreshMode::Interval;
        });
        self
    }

    /// No effect before the first widget.
    pub fn refresh_mode(mut self, mode: RefreshMode) -> Self {
        self.last_widget(|config| config.refresh_mode = mode);
        self
    }

    /// Data-source timeout for the last added widget. No effect before the first widget.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.last_widget(|config| config.timeout = Some(timeout));
        self
    }

    pub fn row<I, S>(mut self, widget_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.layout.push(widget_ids.into_iter().map(Into::into).collect());
        self
    }

    /// Assemble the dashboard, rejecting duplicate widget ids and layout
    /// rows that name widgets which were never added.
    pub fn build(self) -> Result<Dashboard, DashboardError> {
        let mut seen = HashSet::new();
        for widget in &self.widgets {
            if !seen.insert(widget.id.as_str()) {
                return Err(DashboardError::DuplicateWidget {
                    dashboard: self.config.id.clone(),
                    widget: widget.id.clone(),
                });
            }
        }

        let mut config = self.config;
        config.layout = self.layout;
        let dashboard = Dashboard::new(config);
        for widget in self.widgets {
            dashboard.add_widget(Widget::new(widget));
        }
        dashboard.validate()?;

        tracing::debug!(dashboard = %dashboard.id(), widgets = dashboard.len(), "built dashboard");
        Ok(dashboard)
    }
}
