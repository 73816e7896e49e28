// Domain error type
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DashboardError {
    #[error("dashboard not found: {0}")]
    NotFound(String),

    #[error("dashboard {dashboard}: widget id {widget} is defined more than once")]
    DuplicateWidget { dashboard: String, widget: String },

    #[error("dashboard {dashboard}: layout references unknown widget {widget}")]
    UnknownLayoutWidget { dashboard: String, widget: String },

    #[error("auto-refresh is already running")]
    AlreadyRunning,

    #[error("unknown widget type: {0}")]
    UnknownWidgetType(String),

    #[error("unknown refresh mode: {0}")]
    UnknownRefreshMode(String),
}
