//! Client for the external AI enrichment service and the ticket-level
//! priority aggregation driven by video analysis.

pub mod aggregate;

use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::Deserialize;
use thiserror::Error;

use beacon_types::models::PriorityReport;

/// Substituted when audio transcription produces no usable response.
pub const NO_TRANSCRIPT: &str = "no transcript available";
/// Substituted when image/video description produces no usable response.
pub const NO_DESCRIPTION: &str = "no description available";

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("enrichment request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("enrichment service returned {0}")]
    Status(reqwest::StatusCode),
}

/// The three enrichment endpoints, keyed by evidence kind. Absence of a
/// usable response is an `Err` the caller degrades to a placeholder —
/// never a hard failure of the evidence request.
pub trait EnrichmentApi: Send + Sync {
    /// audio -> transcript
    fn transcribe<'a>(&'a self, bucket_ref: &'a str) -> BoxFuture<'a, Result<String, EnrichError>>;
    /// image (or 11th-plus video) -> plain description
    fn describe<'a>(&'a self, bucket_ref: &'a str) -> BoxFuture<'a, Result<String, EnrichError>>;
    /// video -> full severity analysis
    fn analyze<'a>(&'a self, bucket_ref: &'a str)
    -> BoxFuture<'a, Result<PriorityReport, EnrichError>>;
}

#[derive(Debug, Clone)]
pub struct EnrichConfig {
    pub base_url: String,
    pub token: String,
    /// Media analysis is slow; bounded but generous. Timeout degrades to a
    /// placeholder, never to a request failure.
    pub timeout_secs: u64,
}

pub struct EnrichmentClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Deserialize)]
struct TranscribeResponse {
    transcript: String,
}

#[derive(Deserialize)]
struct DescribeResponse {
    description: String,
}

impl EnrichmentClient {
    pub fn new(config: &EnrichConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    async fn post(&self, endpoint: &str, bucket_ref: &str) -> Result<reqwest::Response, EnrichError> {
        let resp = self
            .http
            .post(format!("{}/{}", self.base_url, endpoint))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "bucket_ref": bucket_ref }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(EnrichError::Status(resp.status()));
        }
        Ok(resp)
    }
}

impl EnrichmentApi for EnrichmentClient {
    fn transcribe<'a>(&'a self, bucket_ref: &'a str) -> BoxFuture<'a, Result<String, EnrichError>> {
        Box::pin(async move {
            let resp = self.post("transcribe", bucket_ref).await?;
            let body: TranscribeResponse = resp.json().await?;
            Ok(body.transcript)
        })
    }

    fn describe<'a>(&'a self, bucket_ref: &'a str) -> BoxFuture<'a, Result<String, EnrichError>> {
        Box::pin(async move {
            let resp = self.post("describe", bucket_ref).await?;
            let body: DescribeResponse = resp.json().await?;
            Ok(body.description)
        })
    }

    fn analyze<'a>(
        &'a self,
        bucket_ref: &'a str,
    ) -> BoxFuture<'a, Result<PriorityReport, EnrichError>> {
        Box::pin(async move {
            let resp = self.post("analyze", bucket_ref).await?;
            let report: PriorityReport = resp.json().await?;
            Ok(report)
        })
    }
}
