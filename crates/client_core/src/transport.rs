//! Outbound calls to the report service.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use shared::{
    error::ReportParseError,
    protocol::{ErrorBody, ReportNode, SubmissionPayload},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{SubmitError, TransportConfigError};

pub fn generate_report_route() -> &'static str {
    "/generate-report"
}

pub fn health_route() -> &'static str {
    "/health"
}

#[async_trait]
pub trait ReportTransport: Send + Sync {
    /// Issues exactly one request; no retries.
    async fn generate_report(&self, payload: &SubmissionPayload)
        -> Result<ReportNode, SubmitError>;

    async fn check_health(&self) -> Result<String, SubmitError>;
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, TransportConfigError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, TransportConfigError> {
        let raw = base_url.trim();
        let parsed = Url::parse(raw).map_err(|source| TransportConfigError::Parse {
            url: raw.to_string(),
            source,
        })?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
            return Err(TransportConfigError::UnsupportedScheme(raw.to_string()));
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(TransportConfigError::QueryOrFragment(raw.to_string()));
        }

        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, route: &str) -> String {
        format!("{}{route}", self.base_url)
    }
}

#[async_trait]
impl ReportTransport for HttpTransport {
    async fn generate_report(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<ReportNode, SubmitError> {
        let url = self.endpoint(generate_report_route());
        debug!(%url, fields = payload.entries().len(), "posting report request");

        let response = self.http.post(&url).json(payload).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let detail = ErrorBody::detail_from_slice(&body);
            warn!(
                status = status.as_u16(),
                detail = detail.as_deref().unwrap_or("<none>"),
                "report service rejected request"
            );
            return Err(SubmitError::Service {
                status: status.as_u16(),
                detail,
            });
        }

        let report = ReportNode::from_slice(&body).map_err(|error| {
            warn!(status = status.as_u16(), %error, "report body could not be parsed");
            error
        })?;
        info!(status = status.as_u16(), bytes = body.len(), "report received");
        Ok(report)
    }

    async fn check_health(&self) -> Result<String, SubmitError> {
        let url = self.endpoint(health_route());
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(SubmitError::Service {
                status: status.as_u16(),
                detail: ErrorBody::detail_from_slice(&body),
            });
        }

        let health: HealthResponse = serde_json::from_slice(&body)
            .map_err(|error| SubmitError::MalformedResponse(ReportParseError::Json(error)))?;
        debug!(%url, status = %health.status, "health check answered");
        Ok(health.status)
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
