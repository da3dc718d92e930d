//! API response types.

use serde::{Deserialize, Serialize};

use crate::issue::{Issue, IssueStatus};
use crate::qc_status::QCStatus;

/// Response for issue unapproval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnapprovalResponse {
    pub unapproval_url: String,
    /// Whether posting the unapproval also reopened the issue
    pub opened: bool,
}

/// Full issue status response.
///
/// Only the fields the review client reads are modelled; the server sends
/// more (checklist summary, blocking QC status, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct IssueStatusResponse {
    pub issue: Issue,
    pub qc_status: QCStatus,
    #[serde(default)]
    pub dirty: bool,
    #[serde(default)]
    pub branch: String,
}

impl From<IssueStatusResponse> for IssueStatus {
    fn from(response: IssueStatusResponse) -> Self {
        Self {
            issue: response.issue,
            qc_status: response.qc_status,
        }
    }
}

/// Single commit on the current branch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BranchCommit {
    pub hash: String,
    pub message: String,
    pub file_changed: bool,
}

impl BranchCommit {
    pub fn short_hash(&self) -> &str {
        &self.hash[..self.hash.len().min(7)]
    }
}

/// A page of branch commits, newest first.
#[derive(Debug, Clone, Deserialize)]
pub struct PagedCommitsResponse {
    pub commits: Vec<BranchCommit>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

impl PagedCommitsResponse {
    pub fn page_count(&self) -> usize {
        if self.page_size == 0 {
            0
        } else {
            self.total.div_ceil(self.page_size)
        }
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.page_count()
    }
}

/// Response for archive generation.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveGenerateResponse {
    pub output_path: String,
}
