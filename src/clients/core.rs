use async_trait::async_trait;
use serde::Serialize;

use crate::config::CoreConfig;

use super::{ClientError, CoreSubmitter};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub job_external_id: String,
    pub customized_cv: serde_json::Value,
    pub cover_letter: String,
}

#[derive(Debug, Clone)]
pub struct SubmitResponse {
    pub resume_id: Option<String>,
    pub negotiation_id: Option<String>,
    /// Raw Core response, persisted verbatim on the application row.
    pub raw: serde_json::Value,
}

pub struct CoreClient {
    client: reqwest::Client,
    base_url: String,
    shared_secret: String,
}

impl CoreClient {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build reqwest client"),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            shared_secret: config.shared_secret.clone(),
        }
    }
}

#[async_trait]
impl CoreSubmitter for CoreClient {
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, ClientError> {
        let resp = self
            .client
            .post(format!("{}/applications/submit", self.base_url))
            .bearer_auth(&self.shared_secret)
            .json(request)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();

        if !(200..300).contains(&status) {
            return Err(ClientError::Status {
                code: status,
                body: body.chars().take(1024).collect(),
            });
        }

        let raw: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ClientError::Invalid(format!("core response is not JSON: {e}")))?;

        let resume_id = raw
            .get("resumeId")
            .and_then(|v| v.as_str())
            .map(String::from);
        let negotiation_id = raw
            .get("negotiationId")
            .and_then(|v| v.as_str())
            .map(String::from);

        Ok(SubmitResponse {
            resume_id,
            negotiation_id,
            raw,
        })
    }
}
