// Dashboard domain model
use super::widget::{DEFAULT_REFRESH_INTERVAL_SECS, Widget, WidgetData, WidgetSnapshot};
use crate::error::DashboardError;
use chrono::{DateTime, Utc};
use hashlink::LinkedHashMap;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Per-widget outcome of one refresh pass, in widget order.
pub type RefreshResults = LinkedHashMap<String, WidgetData>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardConfig {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Rows of widget ids. Presentational only.
    pub layout: Vec<Vec<String>>,
    /// Informational; widgets keep their own intervals.
    pub refresh_interval: u64,
    pub metadata: Map<String, Value>,
}

impl DashboardConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            layout: Vec::new(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL_SECS,
            metadata: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub id: String,
    pub name: String,
    pub description: String,
    pub widgets: LinkedHashMap<String, WidgetSnapshot>,
    pub layout: Vec<Vec<String>>,
    pub timestamp: String,
}

#[derive(Debug)]
pub struct Dashboard {
    config: DashboardConfig,
    widgets: RwLock<LinkedHashMap<String, Arc<Widget>>>,
}

impl Dashboard {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            widgets: RwLock::new(LinkedHashMap::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Insert a widget. A widget with the same id is replaced in place,
    /// keeping its position.
    pub fn add_widget(&self, widget: Widget) {
        let id = widget.id().to_string();
        if self.widgets.write().replace(id.clone(), Arc::new(widget)).is_some() {
            tracing::debug!(dashboard = %self.config.id, widget = %id, "replaced widget");
        }
    }

    pub fn remove_widget(&self, widget_id: &str) -> bool {
        self.widgets.write().remove(widget_id).is_some()
    }

    pub fn widget(&self, widget_id: &str) -> Option<Arc<Widget>> {
        self.widgets.read().get(widget_id).cloned()
    }

    pub fn widget_ids(&self) -> Vec<String> {
        self.widgets.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.widgets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.read().is_empty()
    }

    // Copy taken under the lock so refresh passes never hold it across awaits.
    fn widget_list(&self) -> Vec<Arc<Widget>> {
        self.widgets.read().values().cloned().collect()
    }

    /// Refresh every widget, one after another.
    pub async fn refresh_all(&self) -> RefreshResults {
        let mut results = RefreshResults::new();
        for widget in self.widget_list() {
            results.insert(widget.id().to_string(), widget.refresh().await);
        }
        results
    }

    /// Refresh only the widgets that are due. Skipped widgets are absent
    /// from the result.
    pub async fn refresh_stale(&self) -> RefreshResults {
        let mut results = RefreshResults::new();
        for widget in self.widget_list() {
            if widget.needs_refresh() {
                results.insert(widget.id().to_string(), widget.refresh().await);
            }
        }
        if !results.is_empty() {
            tracing::debug!(
                dashboard = %self.config.id,
                refreshed = results.len(),
                "refreshed stale widgets"
            );
        }
        results
    }

    pub fn get_data(&self) -> DashboardSnapshot {
        let widgets = self
            .widget_list()
            .into_iter()
            .map(|w| (w.id().to_string(), w.snapshot()))
            .collect();

        DashboardSnapshot {
            id: self.config.id.clone(),
            name: self.config.name.clone(),
            description: self.config.description.clone(),
            widgets,
            layout: self.config.layout.clone(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Check that every id in the layout names a widget of this dashboard.
    pub fn validate(&self) -> Result<(), DashboardError> {
        let widgets = self.widgets.read();
        let missing = self
            .config
            .layout
            .iter()
            .flatten()
            .find(|id| !widgets.contains_key(id.as_str()));

        match missing {
            Some(id) => Err(DashboardError::UnknownLayoutWidget {
                dashboard: self.config.id.clone(),
                widget: id.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Latest refresh attempt across all widgets.
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.widget_list().iter().filter_map(|w| w.last_refresh()).max()
    }
}
