use serde::{Deserialize, Serialize};

use crate::qc_status::QCStatus;

/// Issue information as served by the ghqc API.
///
/// The title of a QC issue is the repository path of the file under review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub state: String,
    pub html_url: String,
    #[serde(default)]
    pub milestone: Option<String>,
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub branch: Option<String>,
}

impl Issue {
    pub fn is_open(&self) -> bool {
        self.state == "open"
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {}", self.number, self.title)
    }
}

/// An issue paired with its current QC status.
///
/// Snapshots are never patched: a fresh fetch replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStatus {
    pub issue: Issue,
    pub qc_status: QCStatus,
}

impl IssueStatus {
    pub fn number(&self) -> u64 {
        self.issue.number
    }

    pub fn is_approved(&self) -> bool {
        self.qc_status.is_approved()
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.issue, self.qc_status)
    }
}

/// Milestone information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub number: u64,
    pub title: String,
    pub state: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub open_issues: u64,
    #[serde(default)]
    pub closed_issues: u64,
}

impl std::fmt::Display for Milestone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} open, {} closed)",
            self.title, self.open_issues, self.closed_issues
        )
    }
}
