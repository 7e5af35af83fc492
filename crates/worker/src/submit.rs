use advisor_core::domain::recommendation::RecommendationSet;
use anyhow::Context;
use serde_json::json;
use std::time::Duration;

const STATUS_TIMEOUT: Duration = Duration::from_secs(5);
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(10);
const SUBMIT_FEEDBACK: &str = "Recommendations look good.";

/// Hands a staged candidate to a running API through its review endpoint.
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build backend http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn ensure_online(&self) -> anyhow::Result<()> {
        let url = format!("{}/api/status", self.base_url);
        let res = self
            .http
            .get(&url)
            .timeout(STATUS_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("could not reach backend at {url}"))?;
        anyhow::ensure!(
            res.status().is_success(),
            "backend returned unexpected status {} from {url}",
            res.status()
        );
        Ok(())
    }

    pub async fn submit_for_review(&self, set: &RecommendationSet) -> anyhow::Result<String> {
        let url = format!("{}/api/ai/review-analysis", self.base_url);
        let res = self
            .http
            .post(&url)
            .timeout(SUBMIT_TIMEOUT)
            .json(&json!({
                "approved": true,
                "feedback": SUBMIT_FEEDBACK,
                "updatedRecommendations": set,
            }))
            .send()
            .await
            .with_context(|| format!("review submission to {url} failed"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read review submission response")?;
        anyhow::ensure!(
            status.is_success(),
            "review submission rejected (status={status}): {text}"
        );
        Ok(text)
    }
}
