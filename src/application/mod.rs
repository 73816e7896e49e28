// Application layer - dashboard assembly and the process-wide registry
pub mod builder;
pub mod dashboard_manager;
