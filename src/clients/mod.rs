pub mod ai;
pub mod core;

use async_trait::async_trait;

use crate::clients::core::{SubmitRequest, SubmitResponse};

/// Failure of an outbound call, split the way the retry policy needs it:
/// transport-level failures never produced a response, status failures did.
#[derive(Debug)]
pub enum ClientError {
    /// Connection refused, timeout, DNS failure.
    Network(String),
    /// The downstream answered with a non-success status.
    Status { code: u16, body: String },
    /// The downstream answered 2xx but the body was unusable.
    Invalid(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Network(msg) => write!(f, "network error: {msg}"),
            ClientError::Status { code, body } => write!(f, "status {code}: {body}"),
            ClientError::Invalid(msg) => write!(f, "invalid response: {msg}"),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}

/// AI backend that tailors a parsed CV to a specific job posting.
#[async_trait]
pub trait CvCustomizer: Send + Sync {
    async fn customize_cv(
        &self,
        cv: &serde_json::Value,
        job_description: &str,
    ) -> Result<serde_json::Value, ClientError>;

    async fn generate_cover_letter(
        &self,
        cv: &serde_json::Value,
        job_description: &str,
        company: &str,
    ) -> Result<String, ClientError>;
}

/// The Core service that performs the actual job-board submission.
#[async_trait]
pub trait CoreSubmitter: Send + Sync {
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, ClientError>;
}
