//! Pipeline events: the stage log written by the engine.
//!
//! Every stage completion is recorded, with the row count it produced,
//! so a run can be audited from the store alone.

use crate::types::RunId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Population,
    Campaigns,
    Eligibility,
    Exposure,
    Transactions,
    Outcomes,
    Kpis,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Population => "population",
            Self::Campaigns => "campaigns",
            Self::Eligibility => "eligibility",
            Self::Exposure => "exposure",
            Self::Transactions => "transactions",
            Self::Outcomes => "outcomes",
            Self::Kpis => "kpis",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    RunInitialized {
        run_id: RunId,
        seed: u64,
    },
    StageCompleted {
        stage: Stage,
        rows: u64,
    },
    CampaignSkipped {
        campaign_id: String,
        reason: String,
    },
    RunCompleted {
        run_id: RunId,
        campaigns_reported: u64,
    },
}

impl PipelineEvent {
    /// Stable name for the `event_type` column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RunInitialized { .. } => "run_initialized",
            Self::StageCompleted { .. } => "stage_completed",
            Self::CampaignSkipped { .. } => "campaign_skipped",
            Self::RunCompleted { .. } => "run_completed",
        }
    }
}

/// A stage log row as persisted to SQLite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub stage: String,
    pub event_type: String,
    pub payload: String, // JSON-serialized PipelineEvent
}

impl StageLogEntry {
    pub fn new(run_id: &str, stage: &str, event: &PipelineEvent) -> serde_json::Result<Self> {
        Ok(Self {
            id: None,
            run_id: run_id.to_string(),
            stage: stage.to_string(),
            event_type: event.type_name().to_string(),
            payload: serde_json::to_string(event)?,
        })
    }

    pub fn event(&self) -> serde_json::Result<PipelineEvent> {
        serde_json::from_str(&self.payload)
    }
}
