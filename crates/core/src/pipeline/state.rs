use crate::domain::recommendation::RecommendationSet;
use crate::review::ReviewRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// The in-memory side of the pipeline. While `pending_approval` is set, `current` holds the
/// candidate rather than the last approved set.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineState {
    pub last_updated: DateTime<Utc>,
    pub pending_approval: bool,
    pub current: RecommendationSet,
    pub last_review: Option<ReviewRecord>,
}

impl PipelineState {
    pub fn initial(current: RecommendationSet) -> Self {
        Self {
            last_updated: Utc::now(),
            pending_approval: false,
            current,
            last_review: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsView {
    pub last_updated: DateTime<Utc>,
    pub pending_approval: bool,
    pub recommendations: RecommendationSet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub status: &'static str,
    pub last_updated: DateTime<Utc>,
    pub pending_approval: bool,
    /// Wire name kept for the existing dashboard.
    pub manus_api_enabled: bool,
    pub update_in_progress: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_review: Option<ReviewRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// Approved and persisted; the candidate is now served.
    Promoted,
    /// Held for manual approval.
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReport {
    pub run_id: Uuid,
    pub outcome: UpdateOutcome,
    pub review: ReviewRecord,
}

/// Body of a review decision reported by an out-of-process caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AiFeedback {
    pub approved: bool,
    pub feedback: Option<String>,
    pub updated_recommendations: Option<RecommendationSet>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackOutcome {
    Applied,
    Recorded { feedback: Option<String> },
}
