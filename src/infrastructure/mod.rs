// Infrastructure layer - configuration and built-in data sources
pub mod catalog;
pub mod config;
pub mod sources;
