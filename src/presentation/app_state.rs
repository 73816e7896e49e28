// Application state for HTTP handlers
use crate::application::dashboard_manager::DashboardManager;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<DashboardManager>,
}
