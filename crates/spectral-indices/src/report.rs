//! Per-item outcomes and the aggregated run report.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Result of one work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Succeeded { output: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOutcome {
    /// Identity of the work item, e.g. `/data/tileA :: ndvi`.
    pub item: String,
    #[serde(flatten)]
    pub status: ItemStatus,
    pub elapsed_ms: u64,
}

impl ItemOutcome {
    pub fn succeeded(item: impl Into<String>, output: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            item: item.into(),
            status: ItemStatus::Succeeded {
                output: output.into(),
            },
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn failed(item: impl Into<String>, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            item: item.into(),
            status: ItemStatus::Failed {
                error: error.into(),
            },
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, ItemStatus::Succeeded { .. })
    }
}

/// Aggregated outcome of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub pipeline: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<ItemOutcome>,
}

impl RunReport {
    /// Build a report; outcomes are sorted by item for stable output.
    pub fn new(
        pipeline: impl Into<String>,
        started_at: DateTime<Utc>,
        mut outcomes: Vec<ItemOutcome>,
    ) -> Self {
        outcomes.sort_by(|a, b| a.item.cmp(&b.item));
        Self {
            pipeline: pipeline.into(),
            started_at,
            finished_at: Utc::now(),
            outcomes,
        }
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failures(&self) -> Vec<&ItemOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success()).collect()
    }

    /// True only if every item succeeded.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(ItemOutcome::is_success)
    }

    pub fn elapsed(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Log the totals, then one line per failed item.
    pub fn log_summary(&self) {
        info!(
            pipeline = %self.pipeline,
            total = self.total(),
            succeeded = self.succeeded(),
            failed = self.total() - self.succeeded(),
            elapsed_ms = self.elapsed().as_millis() as u64,
            "Run complete"
        );
        for failure in self.failures() {
            if let ItemStatus::Failed { error } = &failure.status {
                error!(item = %failure.item, error = %error, "Item failed");
            }
        }
    }

    /// Plain-text failure list for the terminal.
    pub fn failure_listing(&self) -> String {
        self.failures()
            .iter()
            .filter_map(|o| match &o.status {
                ItemStatus::Failed { error } => Some(format!("  {}: {}", o.item, error)),
                ItemStatus::Succeeded { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
