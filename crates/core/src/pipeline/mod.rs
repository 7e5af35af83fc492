mod state;

pub use state::{
    AiFeedback, FeedbackOutcome, PipelineState, RecommendationsView, StatusView, UpdateOutcome,
    UpdateReport,
};

use crate::analysis::AnalysisRunner;
use crate::config::Settings;
use crate::domain::recommendation::RecommendationSet;
use crate::error::{PipelineError, PipelineResult};
use crate::review::http::HttpReviewClient;
use crate::review::{
    ReviewClient, ReviewRecord, ReviewSource, ReviewVerdict, DISABLED_FEEDBACK, SIMULATED_FEEDBACK,
};
use crate::storage::{RecommendationStore, UpdateGuard, UpdateLease};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub enum ReviewMode {
    Disabled,
    Remote {
        client: Arc<dyn ReviewClient>,
        /// Approve locally when the reviewer is unreachable instead of leaving the candidate pending.
        fallback_auto_approve: bool,
    },
}

impl ReviewMode {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        if !settings.review_enabled {
            return Ok(Self::Disabled);
        }
        Ok(Self::Remote {
            client: Arc::new(HttpReviewClient::from_settings(settings)?),
            fallback_auto_approve: settings.review_fallback_auto_approve,
        })
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

struct ReviewDecision {
    record: ReviewRecord,
    recommendations: Option<RecommendationSet>,
}

/// Owns the served dataset and drives trigger → review → promote.
///
/// Every mutating operation takes the single update slot first, so a trigger, an approval or
/// a feedback submission never interleaves with another one. The state lock is only held for
/// short in-memory edits, never across the analysis process, the review call or a file write.
pub struct Pipeline {
    state: RwLock<PipelineState>,
    store: RecommendationStore,
    analysis: Arc<dyn AnalysisRunner>,
    review: ReviewMode,
    guard: UpdateGuard,
}

impl Pipeline {
    pub fn new(
        initial: PipelineState,
        store: RecommendationStore,
        analysis: Arc<dyn AnalysisRunner>,
        review: ReviewMode,
    ) -> Self {
        Self {
            state: RwLock::new(initial),
            store,
            analysis,
            review,
            guard: UpdateGuard::new(),
        }
    }

    /// Starts from the persisted file, or the empty set if it is missing or unreadable.
    pub async fn load(
        store: RecommendationStore,
        analysis: Arc<dyn AnalysisRunner>,
        review: ReviewMode,
    ) -> Self {
        let current = store.load_or_default().await;
        Self::new(PipelineState::initial(current), store, analysis, review)
    }

    pub async fn recommendations(&self) -> RecommendationsView {
        let state = self.state.read().await;
        RecommendationsView {
            last_updated: state.last_updated,
            pending_approval: state.pending_approval,
            recommendations: state.current.clone(),
        }
    }

    pub async fn status(&self) -> StatusView {
        let state = self.state.read().await;
        StatusView {
            status: "online",
            last_updated: state.last_updated,
            pending_approval: state.pending_approval,
            manus_api_enabled: self.review.is_enabled(),
            update_in_progress: self.guard.is_held(),
            last_review: state.last_review.clone(),
        }
    }

    pub async fn snapshot(&self) -> PipelineState {
        self.state.read().await.clone()
    }

    fn lease(&self) -> PipelineResult<UpdateLease> {
        self.guard
            .try_acquire()
            .ok_or(PipelineError::UpdateInProgress)
    }

    /// Runs one update on its own task: dropping the caller (e.g. a disconnected HTTP client)
    /// does not cancel the analysis process or the review call once they have started.
    pub async fn trigger_update(self: &Arc<Self>) -> PipelineResult<UpdateReport> {
        let lease = self.lease()?;
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.run_update(lease).await })
            .await
            .map_err(|e| PipelineError::Analysis(format!("update task failed: {e}")))?
    }

    async fn run_update(&self, _lease: UpdateLease) -> PipelineResult<UpdateReport> {
        let run_id = Uuid::new_v4();
        tracing::info!(%run_id, "starting analysis update");

        let previous_pending = {
            let mut state = self.state.write().await;
            std::mem::replace(&mut state.pending_approval, true)
        };

        let candidate = match self.analysis.run().await {
            Ok(candidate) => candidate,
            Err(err) => {
                self.state.write().await.pending_approval = previous_pending;
                tracing::error!(%run_id, error = %err, "analysis update failed");
                return Err(err);
            }
        };

        self.state.write().await.current = candidate.clone();
        tracing::info!(%run_id, summary = ?candidate.summary(), "candidate staged as pending");

        let decision = self.review_candidate(run_id, &candidate).await;
        let record = decision.record.clone();

        if record.approved {
            let adopted = decision.recommendations.unwrap_or(candidate);
            self.promote(adopted, record.clone()).await?;
            tracing::info!(%run_id, source = ?record.source, "recommendations promoted");
            return Ok(UpdateReport {
                run_id,
                outcome: UpdateOutcome::Promoted,
                review: record,
            });
        }

        self.state.write().await.last_review = Some(record.clone());
        tracing::warn!(
            %run_id,
            source = ?record.source,
            feedback = %record.feedback,
            "recommendations not approved; kept pending for manual approval"
        );
        Ok(UpdateReport {
            run_id,
            outcome: UpdateOutcome::Pending,
            review: record,
        })
    }

    async fn review_candidate(&self, run_id: Uuid, candidate: &RecommendationSet) -> ReviewDecision {
        let (source, verdict) = match &self.review {
            ReviewMode::Disabled => {
                tracing::info!(%run_id, "AI review disabled; auto-approving");
                (ReviewSource::Disabled, ReviewVerdict::auto_approve(DISABLED_FEEDBACK))
            }
            ReviewMode::Remote {
                client,
                fallback_auto_approve,
            } => match client.review(candidate).await {
                Ok(verdict) => (ReviewSource::Remote, verdict),
                Err(err) if *fallback_auto_approve => {
                    // Not a real review: logged loudly and tagged `simulated` so it can't pass for one.
                    tracing::warn!(
                        %run_id,
                        error = %err,
                        "remote review failed; approving with local simulation (fallback enabled)"
                    );
                    (ReviewSource::Simulated, ReviewVerdict::auto_approve(SIMULATED_FEEDBACK))
                }
                Err(err) => {
                    tracing::error!(%run_id, error = %err, "remote review failed; candidate left pending");
                    (
                        ReviewSource::Unavailable,
                        ReviewVerdict {
                            approved: false,
                            feedback: err.to_string(),
                            recommendations: None,
                        },
                    )
                }
            },
        };

        ReviewDecision {
            record: ReviewRecord {
                source,
                approved: verdict.approved,
                feedback: verdict.feedback,
                at: Utc::now(),
            },
            recommendations: verdict.recommendations,
        }
    }

    /// Adopts `set` as the pending candidate, writes it, and only then clears the pending flag.
    /// Callers must hold the update lease.
    async fn promote(&self, set: RecommendationSet, record: ReviewRecord) -> PipelineResult<()> {
        {
            let mut state = self.state.write().await;
            state.current = set.clone();
            state.pending_approval = true;
            state.last_review = Some(record);
        }

        self.store.persist(&set).await?;

        let mut state = self.state.write().await;
        state.pending_approval = false;
        state.last_updated = Utc::now();
        Ok(())
    }

    pub async fn approve_recommendations(&self) -> PipelineResult<()> {
        let _lease = self.lease()?;

        let candidate = {
            let state = self.state.read().await;
            if !state.pending_approval {
                return Err(PipelineError::NoPendingApproval);
            }
            state.current.clone()
        };

        // The flag stays set until the file is written, so a failed write leaves it retryable.
        if let Err(err) = self.store.persist(&candidate).await {
            tracing::error!(error = %err, "failed to persist approved recommendations");
            return Err(err);
        }

        let now = Utc::now();
        let mut state = self.state.write().await;
        state.pending_approval = false;
        state.last_updated = now;
        state.last_review = Some(ReviewRecord {
            source: ReviewSource::Human,
            approved: true,
            feedback: "Recommendations approved and saved".to_string(),
            at: now,
        });
        tracing::info!(summary = ?candidate.summary(), "recommendations approved manually");
        Ok(())
    }

    pub async fn submit_ai_feedback(&self, feedback: AiFeedback) -> PipelineResult<FeedbackOutcome> {
        let updated = feedback
            .updated_recommendations
            .map(RecommendationSet::validate)
            .transpose()?;
        let _lease = self.lease()?;

        let record = ReviewRecord {
            source: ReviewSource::External,
            approved: feedback.approved,
            feedback: feedback.feedback.clone().unwrap_or_default(),
            at: Utc::now(),
        };

        match updated {
            Some(set) if feedback.approved => {
                tracing::info!(summary = ?set.summary(), "applying externally approved recommendations");
                self.promote(set, record).await?;
                Ok(FeedbackOutcome::Applied)
            }
            _ => {
                tracing::info!(
                    approved = feedback.approved,
                    feedback = %record.feedback,
                    "review feedback received; recommendations not updated"
                );
                self.state.write().await.last_review = Some(record);
                Ok(FeedbackOutcome::Recorded {
                    feedback: feedback.feedback,
                })
            }
        }
    }
}
