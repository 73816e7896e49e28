// Widget dashboards: pluggable data sources, staleness-driven refresh and JSON snapshots
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod presentation;

pub use application::builder::DashboardBuilder;
pub use application::dashboard_manager::{DashboardManager, DashboardSummary};
pub use domain::dashboard::{Dashboard, DashboardConfig, DashboardSnapshot, RefreshResults};
pub use domain::data_source::DataSource;
pub use domain::widget::{RefreshMode, Widget, WidgetConfig, WidgetData, WidgetSnapshot, WidgetType};
pub use error::DashboardError;
