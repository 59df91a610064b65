use async_trait::async_trait;
use serde_json::json;

use crate::config::AiConfig;

use super::{ClientError, CvCustomizer};

pub struct AiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AiClient {
    pub fn new(config: &AiConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("Failed to build reqwest client"),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ClientError> {
        let resp = self
            .client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();

        if !(200..300).contains(&status) {
            return Err(ClientError::Status {
                code: status,
                body: text.chars().take(1024).collect(),
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| ClientError::Invalid(format!("ai response is not JSON: {e}")))
    }
}

#[async_trait]
impl CvCustomizer for AiClient {
    async fn customize_cv(
        &self,
        cv: &serde_json::Value,
        job_description: &str,
    ) -> Result<serde_json::Value, ClientError> {
        let body = json!({ "cv": cv, "job_description": job_description });
        let resp = self.post("/v1/customize", &body).await?;
        resp.get("customized_cv")
            .cloned()
            .ok_or_else(|| ClientError::Invalid("ai response missing customized_cv".to_string()))
    }

    async fn generate_cover_letter(
        &self,
        cv: &serde_json::Value,
        job_description: &str,
        company: &str,
    ) -> Result<String, ClientError> {
        let body = json!({
            "cv": cv,
            "job_description": job_description,
            "company": company,
        });
        let resp = self.post("/v1/cover-letter", &body).await?;
        resp.get("cover_letter")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| ClientError::Invalid("ai response missing cover_letter".to_string()))
    }
}
