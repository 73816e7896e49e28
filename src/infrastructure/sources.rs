// Built-in data sources for widgets declared in configuration
use crate::domain::data_source::DataSource;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct UptimeSource {
    started: Instant,
}

impl UptimeSource {
    pub fn new(started: Instant) -> Self {
        Self { started }
    }
}

#[async_trait]
impl DataSource for UptimeSource {
    async fn fetch(&self) -> anyhow::Result<Value> {
        Ok(json!(self.started.elapsed().as_secs()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClockSource;

#[async_trait]
impl DataSource for ClockSource {
    async fn fetch(&self) -> anyhow::Result<Value> {
        Ok(json!(Utc::now().to_rfc3339()))
    }
}
