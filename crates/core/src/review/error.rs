use std::fmt;

/// Failure talking to the remote reviewer, with enough context to debug the exchange.
#[derive(Debug, Clone)]
pub struct RemoteReviewFailure {
    pub stage: &'static str,
    pub detail: String,
    pub raw_body: Option<String>,
}

impl RemoteReviewFailure {
    pub fn new(stage: &'static str, detail: impl Into<String>) -> Self {
        Self {
            stage,
            detail: detail.into(),
            raw_body: None,
        }
    }

    pub fn with_body(mut self, body: String) -> Self {
        self.raw_body = Some(body);
        self
    }
}

impl fmt::Display for RemoteReviewFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "remote review failed (stage={}): {}", self.stage, self.detail)
    }
}

impl std::error::Error for RemoteReviewFailure {}
