// HTTP request handlers
use crate::application::dashboard_manager::DashboardSummary;
use crate::domain::dashboard::{DashboardSnapshot, RefreshResults};
use crate::error::DashboardError;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match self {
            DashboardError::NotFound(_) => StatusCode::NOT_FOUND,
            DashboardError::AlreadyRunning => StatusCode::CONFLICT,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// List registered dashboards (id and name)
pub async fn list_dashboards(State(state): State<Arc<AppState>>) -> Json<Vec<DashboardSummary>> {
    Json(state.manager.list_dashboards())
}

/// Current snapshot of one dashboard
pub async fn get_dashboard(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardSnapshot>, DashboardError> {
    state
        .manager
        .get_data(&id)
        .map(Json)
        .ok_or(DashboardError::NotFound(id))
}

/// Refresh every widget of one dashboard and return the per-widget results
pub async fn refresh_dashboard(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<RefreshResults>, DashboardError> {
    match state.manager.refresh(&id).await {
        Some(results) => {
            let failed = results.values().filter(|r| !r.is_ok()).count();
            tracing::info!(dashboard = %id, widgets = results.len(), failed, "manual refresh");
            Ok(Json(results))
        }
        None => Err(DashboardError::NotFound(id)),
    }
}
