use crate::domain::contract::ContractViolation;
use crate::review::error::RemoteReviewFailure;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("analysis failed: {0}")]
    Analysis(String),

    #[error("No pending recommendations to approve")]
    NoPendingApproval,

    #[error("failed to persist recommendations to {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    RemoteReview(#[from] RemoteReviewFailure),

    #[error("an update is already in progress")]
    UpdateInProgress,

    #[error("invalid recommendations: {0}")]
    InvalidRecommendations(#[from] ContractViolation),
}

impl PipelineError {
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
