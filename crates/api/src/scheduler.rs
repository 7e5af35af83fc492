use advisor_core::error::PipelineError;
use advisor_core::pipeline::Pipeline;
use advisor_core::time::monthly;
use chrono::{FixedOffset, Utc};
use std::sync::Arc;

/// Spawn the monthly update task (1st of each month, 00:00 in `offset`). Call once at startup.
pub fn spawn(pipeline: Arc<Pipeline>, offset: FixedOffset) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let next = monthly::next_monthly_run(now, offset);
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::info!(%next, "next scheduled monthly update");
            tokio::time::sleep(wait).await;

            tracing::info!("running scheduled monthly update");
            match pipeline.trigger_update().await {
                Ok(report) => tracing::info!(
                    run_id = %report.run_id,
                    outcome = ?report.outcome,
                    "monthly update completed"
                ),
                Err(PipelineError::UpdateInProgress) => {
                    tracing::warn!("monthly update skipped; another update is in progress")
                }
                Err(err) => {
                    sentry::capture_error(&err);
                    tracing::error!(error = %err, "monthly update failed");
                }
            }
        }
    })
}
