//! HTTP implementation of [`QcBackend`] against a running ghqc server.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::api::backend::QcBackend;
use crate::api::error::ApiError;
use crate::api::types::{
    ArchiveGenerateRequest, ArchiveGenerateResponse, CommitsQuery, IssueStatusResponse,
    PagedCommitsResponse, UnapprovalResponse, UnapproveRequest,
};
use crate::configuration::ClientConfiguration;
use crate::issue::{Issue, IssueStatus, Milestone};

/// ghqc server client.
///
/// Configured with the base URL and per-request timeout from
/// [`ClientConfiguration`]. Cheap to clone; clones share a connection pool.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(config: &ClientConfiguration) -> Result<Self, ApiError> {
        let base_url = config
            .base_url()
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("ghqc-review/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))
    }

    async fn handle_response<T: DeserializeOwned>(
        response: Response,
        endpoint: &str,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| ApiError::Decode(format!("{endpoint}: {e}")))
        } else {
            let body = response.text().await.unwrap_or_default();
            let err = ApiError::from_response(status, &body);
            log::debug!("{endpoint} failed with {status}: {err}");
            Err(err)
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        log::debug!("GET {url}");
        let response = self.client.get(url).send().await?;
        Self::handle_response(response, path).await
    }

    async fn post<B: serde::Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        log::debug!("POST {url}");
        let response = self.client.post(url).json(body).send().await?;
        Self::handle_response(response, path).await
    }
}

impl QcBackend for HttpBackend {
    async fn get_blocked_issues(&self, number: u64) -> Result<Vec<IssueStatus>, ApiError> {
        let blocked: Vec<IssueStatus> = self.get(&format!("api/issues/{number}/blocked")).await?;
        log::debug!("Issue #{number} blocks {} issue(s)", blocked.len());
        Ok(blocked)
    }

    async fn get_issue_statuses(&self, numbers: &[u64]) -> Result<Vec<IssueStatus>, ApiError> {
        let issues = numbers
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let responses: Vec<IssueStatusResponse> =
            self.get(&format!("api/issues/status?issues={issues}")).await?;
        Ok(responses.into_iter().map(IssueStatus::from).collect())
    }

    async fn unapprove_issue(
        &self,
        number: u64,
        reason: &str,
    ) -> Result<UnapprovalResponse, ApiError> {
        let request = UnapproveRequest {
            reason: reason.to_string(),
        };
        self.post(&format!("api/issues/{number}/unapprove"), &request)
            .await
    }

    async fn preview_unapprove(&self, number: u64, reason: &str) -> Result<String, ApiError> {
        let path = format!("api/preview/{number}/unapprove");
        let url = self.endpoint(&path)?;
        log::debug!("POST {url}");
        let request = UnapproveRequest {
            reason: reason.to_string(),
        };
        let response = self.client.post(url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(ApiError::from_response(status, &body))
        }
    }

    async fn get_milestones(&self) -> Result<Vec<Milestone>, ApiError> {
        self.get("api/milestones").await
    }

    async fn get_milestone_issues(&self, milestone: u64) -> Result<Vec<Issue>, ApiError> {
        self.get(&format!("api/milestones/{milestone}/issues")).await
    }

    async fn get_commits(&self, query: &CommitsQuery) -> Result<PagedCommitsResponse, ApiError> {
        let url = self.endpoint("api/commits")?;
        log::debug!("GET {url} (page {})", query.page);
        let response = self.client.get(url).query(query).send().await?;
        Self::handle_response(response, "api/commits").await
    }

    async fn generate_archive(
        &self,
        request: &ArchiveGenerateRequest,
    ) -> Result<ArchiveGenerateResponse, ApiError> {
        log::debug!(
            "Requesting archive of {} file(s) at {}",
            request.files.len(),
            request.output_path
        );
        self.post("api/archive/generate", request).await
    }
}
