use advisor_core::domain::recommendation::RecommendationSet;
use advisor_core::error::PipelineError;
use advisor_core::pipeline::{
    AiFeedback, FeedbackOutcome, Pipeline, RecommendationsView, StatusView,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/recommendations", get(get_recommendations))
        .route("/api/status", get(get_status))
        .route("/api/admin/trigger-update", post(trigger_update))
        .route(
            "/api/admin/approve-recommendations",
            post(approve_recommendations),
        )
        .route("/api/ai/review-analysis", post(review_analysis))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn get_recommendations(State(state): State<AppState>) -> Json<RecommendationsView> {
    Json(state.pipeline.recommendations().await)
}

async fn get_status(State(state): State<AppState>) -> Json<StatusView> {
    Json(state.pipeline.status().await)
}

// Admin routes carry no authentication; deploy behind something that does.
async fn trigger_update(State(state): State<AppState>) -> Result<Response, ApiError> {
    let report = state.pipeline.trigger_update().await?;
    Ok(Json(json!({
        "success": true,
        "message": "Update process triggered",
        "runId": report.run_id,
        "outcome": report.outcome,
        "feedback": report.review.feedback,
    }))
    .into_response())
}

async fn approve_recommendations(State(state): State<AppState>) -> Result<Response, ApiError> {
    state.pipeline.approve_recommendations().await?;
    Ok(Json(json!({
        "success": true,
        "message": "Recommendations approved and saved",
    }))
    .into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewAnalysisBody {
    #[serde(default)]
    approved: bool,
    #[serde(default)]
    feedback: Option<String>,
    #[serde(default)]
    updated_recommendations: Option<RecommendationSet>,
}

async fn review_analysis(
    State(state): State<AppState>,
    Json(body): Json<ReviewAnalysisBody>,
) -> Result<Response, ApiError> {
    let outcome = state
        .pipeline
        .submit_ai_feedback(AiFeedback {
            approved: body.approved,
            feedback: body.feedback,
            updated_recommendations: body.updated_recommendations,
        })
        .await?;

    let body = match outcome {
        FeedbackOutcome::Applied => json!({
            "success": true,
            "message": "AI-approved recommendations saved",
        }),
        FeedbackOutcome::Recorded { feedback } => json!({
            "success": true,
            "message": "Feedback received, recommendations not updated",
            "feedback": feedback,
        }),
    };
    Ok(Json(body).into_response())
}

pub struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = match &err {
            PipelineError::NoPendingApproval | PipelineError::InvalidRecommendations(_) => {
                StatusCode::BAD_REQUEST
            }
            PipelineError::UpdateInProgress => StatusCode::CONFLICT,
            // Remote review failures are settled inside the pipeline and never reach a handler.
            PipelineError::Analysis(_)
            | PipelineError::Persistence { .. }
            | PipelineError::RemoteReview(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            sentry::capture_error(&err);
            tracing::error!(error = %err, "request failed");
        }

        let body = match err {
            PipelineError::NoPendingApproval => json!({
                "success": false,
                "message": err.to_string(),
            }),
            _ => json!({
                "success": false,
                "error": err.to_string(),
            }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::analysis::AnalysisRunner;
    use advisor_core::error::PipelineResult;
    use advisor_core::pipeline::{PipelineState, ReviewMode};
    use advisor_core::review::error::RemoteReviewFailure;
    use advisor_core::storage::RecommendationStore;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tokio::sync::Notify;
    use tower::ServiceExt;

    struct StaticAnalysis(Option<RecommendationSet>);

    #[async_trait::async_trait]
    impl AnalysisRunner for StaticAnalysis {
        async fn run(&self) -> PipelineResult<RecommendationSet> {
            self.0
                .clone()
                .ok_or_else(|| PipelineError::Analysis("exit status: 1".to_string()))
        }
    }

    fn candidate() -> RecommendationSet {
        let mut set = RecommendationSet {
            top_stocks: vec!["RELIANCE.NS".into(), "INFY.NS".into()],
            top_mutual_funds: vec!["HDFC Index Fund".into()],
            ..Default::default()
        };
        set.monthly_mf_picks
            .insert("2025-05".into(), vec!["HDFC Index Fund".into()]);
        set
    }

    /// Holds the analysis run open until `release` is notified.
    struct GatedAnalysis {
        started: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait::async_trait]
    impl AnalysisRunner for GatedAnalysis {
        async fn run(&self) -> PipelineResult<RecommendationSet> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(candidate())
        }
    }

    fn app(dir: &tempfile::TempDir, analysis: Option<RecommendationSet>, pending: bool) -> Router {
        let store = RecommendationStore::new(dir.path().join("recommendations.json"));
        app_with(store, Arc::new(StaticAnalysis(analysis)), pending)
    }

    fn app_with(store: RecommendationStore, analysis: Arc<dyn AnalysisRunner>, pending: bool) -> Router {
        let mut initial = PipelineState::initial(candidate());
        initial.pending_approval = pending;
        let pipeline = Pipeline::new(initial, store, analysis, ReviewMode::Disabled);
        router(AppState {
            pipeline: Arc::new(pipeline),
        })
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let req = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(body) => req
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::String(
                String::from_utf8_lossy(&bytes).into_owned(),
            ))
        };
        (status, value)
    }

    #[tokio::test]
    async fn recommendations_endpoint_shape_and_idempotence() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, None, false);

        let (status, first) = call(&app, "GET", "/api/recommendations", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["pendingApproval"], false);
        assert!(first["lastUpdated"].is_string());
        assert_eq!(first["recommendations"]["top_stocks"][0], "RELIANCE.NS");
        assert_eq!(
            first["recommendations"]["monthly_mf_picks"]["2025-05"][0],
            "HDFC Index Fund"
        );

        let (_, second) = call(&app, "GET", "/api/recommendations", None).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn status_endpoint_reports_online() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, None, true);

        let (status, body) = call(&app, "GET", "/api/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "online");
        assert_eq!(body["pendingApproval"], true);
        assert_eq!(body["manusApiEnabled"], false);
        assert_eq!(body["updateInProgress"], false);
    }

    #[tokio::test]
    async fn approve_without_pending_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, None, false);

        let (status, body) = call(&app, "POST", "/api/admin/approve-recommendations", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "No pending recommendations to approve");
    }

    #[tokio::test]
    async fn approve_pending_persists() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, None, true);

        let (status, body) = call(&app, "POST", "/api/admin/approve-recommendations", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let persisted = RecommendationStore::new(dir.path().join("recommendations.json"))
            .load()
            .await
            .unwrap();
        assert_eq!(persisted, Some(candidate()));

        let (_, view) = call(&app, "GET", "/api/recommendations", None).await;
        assert_eq!(view["pendingApproval"], false);
    }

    #[tokio::test]
    async fn approve_persistence_failure_is_server_error_and_stays_pending() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = RecommendationStore::new(blocker.join("recommendations.json"));
        let app = app_with(store, Arc::new(StaticAnalysis(None)), true);

        let (status, body) = call(&app, "POST", "/api/admin/approve-recommendations", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("failed to persist"));

        let (_, view) = call(&app, "GET", "/api/recommendations", None).await;
        assert_eq!(view["pendingApproval"], true);
    }

    #[tokio::test]
    async fn mutations_conflict_while_update_runs() {
        let dir = tempfile::tempdir().unwrap();
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let store = RecommendationStore::new(dir.path().join("recommendations.json"));
        let analysis = GatedAnalysis {
            started: started.clone(),
            release: release.clone(),
        };
        let app = app_with(store, Arc::new(analysis), false);

        let first = tokio::spawn({
            let app = app.clone();
            async move { call(&app, "POST", "/api/admin/trigger-update", None).await }
        });
        started.notified().await;

        let feedback = json!({"approved": false, "feedback": "late"});
        for (uri, body) in [
            ("/api/admin/trigger-update", None),
            ("/api/admin/approve-recommendations", None),
            ("/api/ai/review-analysis", Some(feedback)),
        ] {
            let (status, body) = call(&app, "POST", uri, body).await;
            assert_eq!(status, StatusCode::CONFLICT, "{uri}");
            assert_eq!(body["success"], false, "{uri}");
        }

        let (_, status) = call(&app, "GET", "/api/status", None).await;
        assert_eq!(status["updateInProgress"], true);

        release.notify_one();
        let (status, body) = first.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "promoted");
    }

    #[test]
    fn remote_review_error_maps_to_server_error() {
        let failure = RemoteReviewFailure::new("send", "connection refused");
        let res = ApiError(PipelineError::RemoteReview(failure)).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn trigger_update_promotes_when_review_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut next = candidate();
        next.top_stocks = vec!["TATAMOTORS.NS".into()];
        let app = app(&dir, Some(next), false);

        let (status, body) = call(&app, "POST", "/api/admin/trigger-update", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["outcome"], "promoted");
        assert_eq!(body["feedback"], "Manus API is disabled, auto-approving");

        let (_, view) = call(&app, "GET", "/api/recommendations", None).await;
        assert_eq!(view["pendingApproval"], false);
        assert_eq!(view["recommendations"]["top_stocks"][0], "TATAMOTORS.NS");
    }

    #[tokio::test]
    async fn trigger_update_analysis_failure_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, None, false);

        let (status, body) = call(&app, "POST", "/api/admin/trigger-update", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("exit status: 1"));

        let (_, view) = call(&app, "GET", "/api/recommendations", None).await;
        assert_eq!(view["pendingApproval"], false);
    }

    #[tokio::test]
    async fn review_analysis_applies_approved_set() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, None, true);

        let (status, body) = call(
            &app,
            "POST",
            "/api/ai/review-analysis",
            Some(json!({
                "approved": true,
                "feedback": "Recommendations look good.",
                "updatedRecommendations": {"top_stocks": ["ADANIPORTS.NS"]},
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "AI-approved recommendations saved");

        let (_, view) = call(&app, "GET", "/api/recommendations", None).await;
        assert_eq!(view["pendingApproval"], false);
        assert_eq!(view["recommendations"]["top_stocks"][0], "ADANIPORTS.NS");
    }

    #[tokio::test]
    async fn review_analysis_rejection_echoes_feedback() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, None, true);

        let (status, body) = call(
            &app,
            "POST",
            "/api/ai/review-analysis",
            Some(json!({"approved": false, "feedback": "needs work"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["feedback"], "needs work");

        let (_, view) = call(&app, "GET", "/api/recommendations", None).await;
        assert_eq!(view["pendingApproval"], true);
    }

    #[tokio::test]
    async fn review_analysis_invalid_set_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, None, true);

        let (status, body) = call(
            &app,
            "POST",
            "/api/ai/review-analysis",
            Some(json!({
                "approved": true,
                "updatedRecommendations": {"top_stocks": ["A", "A"]},
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, None, false);
        let (status, body) = call(&app, "GET", "/healthz", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".into()));
    }
}
