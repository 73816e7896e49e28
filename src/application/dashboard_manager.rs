// Dashboard manager - registry, on-demand refresh and the auto-refresh loop
use crate::application::builder::DashboardBuilder;
use crate::domain::dashboard::{Dashboard, DashboardSnapshot, RefreshResults};
use crate::error::DashboardError;
use hashlink::LinkedHashMap;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub id: String,
    pub name: String,
}

struct AutoRefresh {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
pub struct DashboardManager {
    dashboards: RwLock<LinkedHashMap<String, Arc<Dashboard>>>,
    auto_refresh: Mutex<Option<AutoRefresh>>,
}

impl DashboardManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start assembling a dashboard. Nothing is registered until
    /// [`Self::register`] is called with the built result.
    pub fn create(&self, dashboard_id: impl Into<String>, name: impl Into<String>) -> DashboardBuilder {
        DashboardBuilder::new(dashboard_id, name)
    }

    /// Add a dashboard. An existing id is replaced in place, keeping its
    /// position in the listing.
    pub fn register(&self, dashboard: Dashboard) -> Arc<Dashboard> {
        let dashboard = Arc::new(dashboard);
        let id = dashboard.id().to_string();
        tracing::info!(dashboard = %id, widgets = dashboard.len(), "registered dashboard");
        self.dashboards.write().replace(id, dashboard.clone());
        dashboard
    }

    pub fn unregister(&self, dashboard_id: &str) -> bool {
        self.dashboards.write().remove(dashboard_id).is_some()
    }

    pub fn get(&self, dashboard_id: &str) -> Option<Arc<Dashboard>> {
        self.dashboards.read().get(dashboard_id).cloned()
    }

    pub fn list_dashboards(&self) -> Vec<DashboardSummary> {
        self.dashboards
            .read()
            .values()
            .map(|d| DashboardSummary {
                id: d.id().to_string(),
                name: d.name().to_string(),
            })
            .collect()
    }

    /// Refresh every widget of one dashboard. `None` if the id is unknown.
    pub async fn refresh(&self, dashboard_id: &str) -> Option<RefreshResults> {
        let dashboard = self.get(dashboard_id)?;
        Some(dashboard.refresh_all().await)
    }

    pub fn get_data(&self, dashboard_id: &str) -> Option<DashboardSnapshot> {
        self.get(dashboard_id).map(|d| d.get_data())
    }

    fn dashboard_list(&self) -> Vec<Arc<Dashboard>> {
        self.dashboards.read().values().cloned().collect()
    }

    /// One auto-refresh pass: stale widgets of every dashboard, in
    /// registration order.
    pub async fn refresh_stale(&self) -> usize {
        let mut refreshed = 0;
        for dashboard in self.dashboard_list() {
            refreshed += dashboard.refresh_stale().await.len();
        }
        refreshed
    }

    /// Spawn the background loop. Each pass refreshes stale widgets, then
    /// waits `interval` before the next one.
    pub fn start_auto_refresh(self: &Arc<Self>, interval: Duration) -> Result<(), DashboardError> {
        let mut slot = self.auto_refresh.lock();
        if slot.as_ref().is_some_and(|running| !running.handle.is_finished()) {
            return Err(DashboardError::AlreadyRunning);
        }

        let (stop_tx, mut stop_rx) = oneshot::channel();
        let manager = Arc::clone(self);

        let handle = tokio::spawn(async move {
            tracing::info!(interval_ms = interval.as_millis() as u64, "auto-refresh started");
            loop {
                let refreshed = manager.refresh_stale().await;
                tracing::debug!(refreshed, "auto-refresh pass complete");

                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = &mut stop_rx => break,
                }
            }
            tracing::info!("auto-refresh stopped");
        });

        *slot = Some(AutoRefresh { stop_tx, handle });
        Ok(())
    }

    pub fn is_auto_refreshing(&self) -> bool {
        self.auto_refresh
            .lock()
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Signal the loop and wait for it to exit. A pass already in flight
    /// runs to completion first.
    pub async fn stop_auto_refresh(&self) {
        let Some(running) = self.auto_refresh.lock().take() else {
            return;
        };

        let _ = running.stop_tx.send(());
        if let Err(e) = running.handle.await {
            tracing::error!("auto-refresh task failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::data_source::{constant, from_async, from_fn};
    use crate::domain::widget::RefreshMode;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_source(counter: Arc<AtomicUsize>) -> Arc<dyn crate::domain::data_source::DataSource> {
        from_fn(move || Ok(counter.fetch_add(1, Ordering::SeqCst) + 1))
    }

    fn sample(manager: &DashboardManager) -> Dashboard {
        manager
            .create("main", "Main Dashboard")
            .metric("users", "Total Users", constant(1234))
            .metric("revenue", "Revenue", constant(98765))
            .chart("chart", "Sales", constant(json!({"values": [100, 150, 130]})))
            .row(["users", "revenue"])
            .row(["chart"])
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let manager = DashboardManager::new();
        manager.register(sample(&manager));
        manager.register(DashboardBuilder::new("ops", "Operations").build().unwrap());

        assert!(manager.get("main").is_some());
        assert_eq!(
            manager.list_dashboards(),
            vec![
                DashboardSummary { id: "main".to_string(), name: "Main Dashboard".to_string() },
                DashboardSummary { id: "ops".to_string(), name: "Operations".to_string() },
            ]
        );

        assert!(manager.unregister("ops"));
        assert_eq!(manager.list_dashboards().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_dashboard() {
        let manager = DashboardManager::new();
        assert!(manager.get("missing").is_none());
        assert!(manager.refresh("missing").await.is_none());
        assert!(manager.get_data("missing").is_none());
    }

    #[tokio::test]
    async fn test_refresh_and_snapshot() {
        let manager = DashboardManager::new();
        manager.register(sample(&manager));

        let results = manager.refresh("main").await.unwrap();
        assert_eq!(results.len(), 3);

        let snapshot = manager.get_data("main").unwrap();
        assert_eq!(snapshot.widgets["users"].data, Some(json!(1234)));
        assert_eq!(snapshot.layout, vec![vec!["users", "revenue"], vec!["chart"]]);
    }

    #[tokio::test]
    async fn test_register_replaces_existing() {
        let manager = DashboardManager::new();
        manager.register(sample(&manager));
        manager.register(DashboardBuilder::new("ops", "Operations").build().unwrap());
        manager.register(DashboardBuilder::new("main", "Replacement").build().unwrap());

        let ids: Vec<String> = manager.list_dashboards().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["main", "ops"]);
        assert_eq!(manager.get("main").unwrap().name(), "Replacement");
    }

    #[tokio::test]
    async fn test_auto_refresh_runs_passes() {
        let manager = Arc::new(DashboardManager::new());
        let calls = Arc::new(AtomicUsize::new(0));
        manager.register(
            manager
                .create("live", "Live")
                .metric("ticks", "Ticks", counting_source(calls.clone()))
                .refresh_mode(RefreshMode::Realtime)
                .build()
                .unwrap(),
        );

        manager.start_auto_refresh(Duration::from_millis(10)).unwrap();
        assert!(manager.is_auto_refreshing());
        tokio::time::sleep(Duration::from_millis(100)).await;
        manager.stop_auto_refresh().await;

        assert!(!manager.is_auto_refreshing());
        assert!(calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_auto_refresh_skips_fresh_widgets() {
        let manager = Arc::new(DashboardManager::new());
        let calls = Arc::new(AtomicUsize::new(0));
        manager.register(
            manager
                .create("slow", "Slow")
                .metric("hourly", "Hourly", counting_source(calls.clone()))
                .refresh_every(3600)
                .build()
                .unwrap(),
        );

        manager.start_auto_refresh(Duration::from_millis(10)).unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        manager.stop_auto_refresh().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_pass_after_stop() {
        let manager = Arc::new(DashboardManager::new());
        manager.register(
            manager
                .create("live", "Live")
                .metric("now", "Now", constant(1))
                .refresh_mode(RefreshMode::Realtime)
                .build()
                .unwrap(),
        );

        manager.start_auto_refresh(Duration::from_millis(10)).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        manager.stop_auto_refresh().await;

        let dashboard = manager.get("live").unwrap();
        let stopped_at = dashboard.last_refresh();
        assert!(stopped_at.is_some());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(dashboard.last_refresh(), stopped_at);
    }

    #[tokio::test]
    async fn test_in_flight_pass_completes_before_stop() {
        let manager = Arc::new(DashboardManager::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        manager.register(
            manager
                .create("slow", "Slow")
                .metric(
                    "report",
                    "Report",
                    from_async(move || {
                        let counter = counter.clone();
                        async move {
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok::<_, anyhow::Error>(counter.fetch_add(1, Ordering::SeqCst) + 1)
                        }
                    }),
                )
                .build()
                .unwrap(),
        );

        manager.start_auto_refresh(Duration::from_secs(60)).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        manager.stop_auto_refresh().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let data = manager.get("slow").unwrap().widget("report").unwrap().get_data().unwrap();
        assert_eq!(data.data, Some(json!(1)));
    }

    #[tokio::test]
    async fn test_start_twice_rejected() {
        let manager = Arc::new(DashboardManager::new());
        manager.start_auto_refresh(Duration::from_millis(10)).unwrap();
        assert_eq!(
            manager.start_auto_refresh(Duration::from_millis(10)),
            Err(DashboardError::AlreadyRunning)
        );

        manager.stop_auto_refresh().await;
        manager.start_auto_refresh(Duration::from_millis(10)).unwrap();
        manager.stop_auto_refresh().await;
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let manager = DashboardManager::new();
        manager.stop_auto_refresh().await;
        assert!(!manager.is_auto_refreshing());
    }
}
