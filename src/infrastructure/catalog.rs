// Dashboard catalog - turns configured definitions into registered dashboards
use crate::application::builder::DashboardBuilder;
use crate::application::dashboard_manager::DashboardManager;
use crate::domain::dashboard::Dashboard;
use crate::domain::data_source::{DataSource, constant};
use crate::domain::widget::{RefreshMode, WidgetConfig, WidgetType};
use crate::infrastructure::config::{
    AppConfig, DashboardDefinition, RefreshSettings, SourceDefinition, WidgetDefinition,
};
use crate::infrastructure::sources::{ClockSource, UptimeSource};
use anyhow::Context;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub fn build_dashboard(
    definition: &DashboardDefinition,
    refresh: &RefreshSettings,
    started: Instant,
) -> anyhow::Result<Dashboard> {
    let mut builder = DashboardBuilder::new(&definition.id, &definition.name)
        .description(&definition.description);

    if let Some(interval) = definition.refresh_interval {
        builder = builder.refresh_interval(interval);
    }
    if let Some(timeout) = refresh.widget_timeout() {
        builder = builder.default_timeout(timeout);
    }

    for widget in &definition.widgets {
        let config = widget_config(widget, started)
            .with_context(|| format!("invalid widget {} in dashboard {}", widget.id, definition.id))?;
        builder = builder.widget(config);
    }

    for row in &definition.rows {
        builder = builder.row(row.iter().cloned());
    }

    Ok(builder.build()?)
}

fn widget_config(definition: &WidgetDefinition, started: Instant) -> anyhow::Result<WidgetConfig> {
    let kind: WidgetType = definition.kind.parse()?;
    let mut config = WidgetConfig::new(&definition.id, kind, &definition.title, source(&definition.source, started));

    if let Some(mode) = &definition.refresh_mode {
        config.refresh_mode = mode.parse::<RefreshMode>()?;
    }
    if let Some(interval) = definition.refresh_interval {
        config.refresh_interval = interval;
    }
    if let Some(timeout) = definition.timeout_ms {
        config.timeout = Some(Duration::from_millis(timeout));
    }
    config.options = definition.options.clone();
    config.style = definition.style.clone();

    Ok(config)
}

fn source(definition: &SourceDefinition, started: Instant) -> Arc<dyn DataSource> {
    match definition {
        SourceDefinition::Static { value } => constant(value.clone()),
        SourceDefinition::Uptime => Arc::new(UptimeSource::new(started)),
        SourceDefinition::Clock => Arc::new(ClockSource),
    }
}

/// Build and register every configured dashboard. Returns how many were registered.
pub fn register_all(manager: &DashboardManager, config: &AppConfig, started: Instant) -> anyhow::Result<usize> {
    for definition in &config.dashboards {
        let dashboard = build_dashboard(definition, &config.refresh, started)
            .with_context(|| format!("failed to build dashboard {}", definition.id))?;
        manager.register(dashboard);
    }
    Ok(config.dashboards.len())
}
