pub mod error;
pub mod http;

use crate::domain::recommendation::RecommendationSet;
use crate::error::PipelineResult;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const DISABLED_FEEDBACK: &str = "Manus API is disabled, auto-approving";
pub const SIMULATED_FEEDBACK: &str =
    "Recommendations look good based on historical performance analysis (simulated)";

/// Where a review decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewSource {
    /// Review switched off; the candidate is approved as-is.
    Disabled,
    Remote,
    /// Local stand-in used when the remote reviewer failed and fallback is opted in.
    Simulated,
    /// Reported by an out-of-process caller through the feedback endpoint.
    External,
    Human,
    /// The remote reviewer could not be reached; nothing was decided.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewVerdict {
    pub approved: bool,
    pub feedback: String,
    /// Reviewer-amended set to adopt instead of the candidate.
    pub recommendations: Option<RecommendationSet>,
}

impl ReviewVerdict {
    pub fn auto_approve(feedback: &str) -> Self {
        Self {
            approved: true,
            feedback: feedback.to_string(),
            recommendations: None,
        }
    }
}

/// Most recent review decision, kept for the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub source: ReviewSource,
    pub approved: bool,
    pub feedback: String,
    pub at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait ReviewClient: Send + Sync {
    async fn review(&self, candidate: &RecommendationSet) -> PipelineResult<ReviewVerdict>;
}
