// Domain layer - widgets, dashboards and their data sources
pub mod dashboard;
pub mod data_source;
pub mod metric;
pub mod widget;
