// Metric value model - the usual payload of a metric widget
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueFormat {
    Number,
    Currency,
    Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub value: f64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub change: Option<f64>,
    #[serde(default)]
    pub change_period: String,
    #[serde(default)]
    pub trend: Option<Trend>,
    #[serde(default)]
    pub format: Option<ValueFormat>,
}

impl MetricValue {
    pub fn new(value: f64, label: impl Into<String>) -> Self {
        Self {
            value,
            label: label.into(),
            change: None,
            change_period: String::new(),
            trend: None,
            format: None,
        }
    }

    /// Record a relative change; the trend follows its sign.
    pub fn with_change(mut self, change: f64, period: impl Into<String>) -> Self {
        self.change = Some(change);
        self.change_period = period.into();
        self.trend = Some(if change > 0.0 {
            Trend::Up
        } else if change < 0.0 {
            Trend::Down
        } else {
            Trend::Flat
        });
        self
    }

    pub fn with_format(mut self, format: ValueFormat) -> Self {
        self.format = Some(format);
        self
    }
}
