//! Aggregate cost and efficiency metrics for one pipeline run.
//!
//! Compares the generated suite against the manual effort it would have taken
//! a QA engineer to write, using a fixed throughput and hourly rate.

use crate::config::MetricsConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Backend spend for one run, keyed by backend name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    #[serde(flatten)]
    pub backends: BTreeMap<String, f64>,
    pub total: f64,
}

impl CostBreakdown {
    pub fn add(&mut self, backend: &str, cost: f64) {
        let cost = cost.max(0.0);
        *self.backends.entry(backend.to_string()).or_insert(0.0) += cost;
        self.total += cost;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Savings {
    pub time_saved_hours: f64,
    pub cost_saved: f64,
    pub efficiency_gain_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMetrics {
    pub ai_cost: f64,
    pub traditional_cost: f64,
    pub traditional_hours: f64,
}

/// Derived per-run metrics. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub savings: Savings,
    pub raw: RawMetrics,
    pub cost_breakdown: CostBreakdown,
    pub time_taken_seconds: f64,
}

/// Computes [`AggregateMetrics`] from record count, spend and wall time.
#[derive(Debug, Clone, Copy)]
pub struct MetricsCalculator {
    hourly_rate: f64,
    tests_per_hour: f64,
}

impl Default for MetricsCalculator {
    fn default() -> Self {
        Self::from(&MetricsConfig::default())
    }
}

impl From<&MetricsConfig> for MetricsCalculator {
    fn from(config: &MetricsConfig) -> Self {
        Self::new(config.hourly_rate, config.tests_per_hour)
    }
}

impl MetricsCalculator {
    pub fn new(hourly_rate: f64, tests_per_hour: f64) -> Self {
        Self {
            hourly_rate,
            tests_per_hour,
        }
    }

    pub fn calculate(
        &self,
        record_count: usize,
        cost_breakdown: CostBreakdown,
        elapsed: Duration,
    ) -> AggregateMetrics {
        let traditional_hours = if self.tests_per_hour > 0.0 {
            record_count as f64 / self.tests_per_hour
        } else {
            0.0
        };
        let traditional_cost = traditional_hours * self.hourly_rate;

        let elapsed_secs = elapsed.as_secs_f64();
        let ai_hours = elapsed_secs / 3600.0;
        let ai_cost = cost_breakdown.total;

        let time_saved_hours = (traditional_hours - ai_hours).max(0.0);
        let cost_saved = (traditional_cost - ai_cost).max(0.0);
        let efficiency = if traditional_hours > 0.0 {
            time_saved_hours / traditional_hours * 100.0
        } else {
            0.0
        };

        AggregateMetrics {
            savings: Savings {
                time_saved_hours: round_to(time_saved_hours, 1),
                cost_saved: round_to(cost_saved, 2),
                efficiency_gain_percentage: round_to(efficiency, 1),
            },
            raw: RawMetrics {
                ai_cost: round_to(ai_cost, 4),
                traditional_cost: round_to(traditional_cost, 2),
                traditional_hours: round_to(traditional_hours, 2),
            },
            cost_breakdown,
            time_taken_seconds: round_to(elapsed_secs, 2),
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
