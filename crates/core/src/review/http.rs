use crate::config::Settings;
use crate::domain::recommendation::RecommendationSet;
use crate::error::PipelineResult;
use crate::review::error::RemoteReviewFailure;
use crate::review::{ReviewClient, ReviewVerdict};
use anyhow::Context;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TYPE: &str = "investment_recommendations";
const SOURCE_TAG: &str = "indian-investment-advisor";
const VERSION_TAG: &str = "1.0.0";

/// Sends candidates to the external AI reviewer over HTTPS with a bearer credential.
#[derive(Debug, Clone)]
pub struct HttpReviewClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpReviewClient {
    pub fn new(endpoint: String, api_key: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build review http client")?;
        Ok(Self {
            http,
            endpoint,
            api_key,
        })
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_review_api_key()?.to_string();
        Self::new(
            settings.review_endpoint.clone(),
            api_key,
            settings.review_timeout,
        )
    }

    fn headers(&self) -> Result<HeaderMap, RemoteReviewFailure> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| RemoteReviewFailure::new("auth", format!("invalid api key header: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    async fn send(&self, req: &ReviewRequest<'_>) -> Result<ReviewVerdict, RemoteReviewFailure> {
        let res = self
            .http
            .post(&self.endpoint)
            .headers(self.headers()?)
            .json(req)
            .send()
            .await
            .map_err(|e| RemoteReviewFailure::new("http", e.to_string()))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| RemoteReviewFailure::new("body", e.to_string()))?;

        if !status.is_success() {
            return Err(RemoteReviewFailure::new("http", format!("status={status}")).with_body(text));
        }

        let parsed = match serde_json::from_str::<ReviewResponse>(&text) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Err(RemoteReviewFailure::new("decode", e.to_string()).with_body(text));
            }
        };

        let recommendations = match parsed.recommendations.map(RecommendationSet::validate) {
            None => None,
            Some(Ok(set)) => Some(set),
            Some(Err(e)) => {
                return Err(RemoteReviewFailure::new("validate", e.to_string()).with_body(text));
            }
        };

        Ok(ReviewVerdict {
            approved: parsed.approved,
            feedback: parsed.feedback,
            recommendations,
        })
    }
}

#[async_trait::async_trait]
impl ReviewClient for HttpReviewClient {
    async fn review(&self, candidate: &RecommendationSet) -> PipelineResult<ReviewVerdict> {
        tracing::info!(endpoint = %self.endpoint, "sending recommendations for AI review");
        let req = ReviewRequest {
            kind: REQUEST_TYPE,
            data: candidate,
            metadata: ReviewMetadata {
                timestamp: Utc::now(),
                source: SOURCE_TAG,
                version: VERSION_TAG,
            },
        };
        let verdict = self.send(&req).await?;
        tracing::info!(approved = verdict.approved, "received AI review");
        Ok(verdict)
    }
}

#[derive(Debug, Serialize)]
struct ReviewRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    data: &'a RecommendationSet,
    metadata: ReviewMetadata,
}

#[derive(Debug, Serialize)]
struct ReviewMetadata {
    timestamp: DateTime<Utc>,
    source: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
struct ReviewResponse {
    approved: bool,
    #[serde(default)]
    feedback: String,
    #[serde(default)]
    recommendations: Option<RecommendationSet>,
}
