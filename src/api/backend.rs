use std::future::Future;

use crate::api::error::ApiError;
use crate::api::types::{
    ArchiveGenerateRequest, ArchiveGenerateResponse, CommitsQuery, PagedCommitsResponse,
    UnapprovalResponse,
};
use crate::issue::{Issue, IssueStatus, Milestone};

/// Every ghqc server operation the review client consumes.
///
/// This trait enables dependency injection for testing by allowing both
/// `HttpBackend` (production) and in-memory fakes to be used interchangeably.
pub trait QcBackend: Send + Sync {
    /// Issues directly blocked by `number`, in server order.
    fn get_blocked_issues(
        &self,
        number: u64,
    ) -> impl Future<Output = Result<Vec<IssueStatus>, ApiError>> + Send;

    fn get_issue_statuses(
        &self,
        numbers: &[u64],
    ) -> impl Future<Output = Result<Vec<IssueStatus>, ApiError>> + Send;

    fn get_issue_status(
        &self,
        number: u64,
    ) -> impl Future<Output = Result<IssueStatus, ApiError>> + Send {
        async move {
            let numbers = [number];
            self.get_issue_statuses(&numbers)
                .await?
                .into_iter()
                .find(|s| s.number() == number)
                .ok_or_else(|| {
                    ApiError::NotFound(format!("No status returned for issue #{number}"))
                })
        }
    }

    fn unapprove_issue(
        &self,
        number: u64,
        reason: &str,
    ) -> impl Future<Output = Result<UnapprovalResponse, ApiError>> + Send;

    /// HTML rendering of the unapproval comment that would be posted.
    fn preview_unapprove(
        &self,
        number: u64,
        reason: &str,
    ) -> impl Future<Output = Result<String, ApiError>> + Send;

    fn get_milestones(&self) -> impl Future<Output = Result<Vec<Milestone>, ApiError>> + Send;

    fn get_milestone_issues(
        &self,
        milestone: u64,
    ) -> impl Future<Output = Result<Vec<Issue>, ApiError>> + Send;

    fn get_commits(
        &self,
        query: &CommitsQuery,
    ) -> impl Future<Output = Result<PagedCommitsResponse, ApiError>> + Send;

    fn generate_archive(
        &self,
        request: &ArchiveGenerateRequest,
    ) -> impl Future<Output = Result<ArchiveGenerateResponse, ApiError>> + Send;
}
