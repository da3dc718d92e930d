//! Shared test utilities: issue fixtures and an in-memory ghqc server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::api::types::{
    ArchiveGenerateRequest, ArchiveGenerateResponse, BranchCommit, CommitsQuery,
    PagedCommitsResponse, UnapprovalResponse,
};
use crate::api::{ApiError, QcBackend};
use crate::issue::{Issue, IssueStatus, Milestone};
use crate::qc_status::{QCStatus, QCStatusEnum};

/// Creates an issue snapshot in milestone `v1.0` whose title is `file_{n}.R`.
pub fn issue_status(number: u64, status: QCStatusEnum) -> IssueStatus {
    let approved_commit = status
        .is_approved()
        .then(|| format!("{number:0>7}aaaaaaaa"));
    IssueStatus {
        issue: Issue {
            number,
            title: format!("file_{number}.R"),
            state: if status.is_approved() { "closed" } else { "open" }.to_string(),
            html_url: format!("https://github.com/owner/repo/issues/{number}"),
            milestone: Some("v1.0".to_string()),
            assignees: Vec::new(),
            labels: vec!["ghqc".to_string()],
            branch: Some("main".to_string()),
        },
        qc_status: QCStatus {
            status,
            status_detail: String::new(),
            approved_commit,
            latest_commit: format!("{number:0>7}bbbbbbbb"),
        },
    }
}

pub fn milestone(number: u64, title: &str) -> Milestone {
    Milestone {
        number,
        title: title.to_string(),
        state: "open".to_string(),
        description: None,
        open_issues: 1,
        closed_issues: 2,
    }
}

/// In-memory [`QcBackend`] with call tracking.
///
/// Clones share state, so a test can keep a handle while a session owns
/// another.
#[derive(Clone)]
pub struct FakeBackend {
    statuses: Arc<Mutex<HashMap<u64, IssueStatus>>>,
    blocked: Arc<Mutex<HashMap<u64, Vec<u64>>>>,
    blocked_errors: Arc<Mutex<HashMap<u64, ApiError>>>,
    blocked_unavailable: bool,
    blocked_gate: Option<Arc<Notify>>,
    unapprove_errors: Arc<Mutex<HashMap<u64, ApiError>>>,
    milestones: Arc<Mutex<Vec<(Milestone, Vec<u64>)>>>,
    commits: Arc<Mutex<Vec<BranchCommit>>>,
    archives: Arc<Mutex<Vec<ArchiveGenerateRequest>>>,

    // Call tracking (for assertions)
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeBackend {
    pub fn builder() -> FakeBackendBuilder {
        FakeBackendBuilder::new()
    }

    /// Number of recorded calls whose name starts with `prefix`.
    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn archives(&self) -> Vec<ArchiveGenerateRequest> {
        self.archives.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn status_of(&self, number: u64) -> Result<IssueStatus, ApiError> {
        self.statuses
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Issue {number} not found")))
    }
}

/// Builder for FakeBackend.
#[derive(Default)]
pub struct FakeBackendBuilder {
    statuses: HashMap<u64, IssueStatus>,
    blocked: HashMap<u64, Vec<u64>>,
    blocked_errors: HashMap<u64, ApiError>,
    blocked_unavailable: bool,
    blocked_gate: Option<Arc<Notify>>,
    unapprove_errors: HashMap<u64, ApiError>,
    milestones: Vec<(Milestone, Vec<u64>)>,
    commits: Vec<BranchCommit>,
}

impl FakeBackendBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: IssueStatus) -> Self {
        self.statuses.insert(status.number(), status);
        self
    }

    /// `parent` blocks `children`, which must also be registered with
    /// [`Self::with_status`].
    pub fn with_blocked(mut self, parent: u64, children: &[u64]) -> Self {
        self.blocked.insert(parent, children.to_vec());
        self
    }

    pub fn with_blocked_error(mut self, parent: u64, error: ApiError) -> Self {
        self.blocked_errors.insert(parent, error);
        self
    }

    /// Every blocked issue lookup answers 501.
    pub fn with_blocked_unavailable(mut self) -> Self {
        self.blocked_unavailable = true;
        self
    }

    /// Blocked issue lookups wait for `gate` before answering and record
    /// `blocked_done:N` once they do.
    pub fn with_blocked_gate(mut self, gate: Arc<Notify>) -> Self {
        self.blocked_gate = Some(gate);
        self
    }

    pub fn with_unapprove_error(mut self, number: u64, error: ApiError) -> Self {
        self.unapprove_errors.insert(number, error);
        self
    }

    pub fn with_milestone(mut self, milestone: Milestone, issues: &[u64]) -> Self {
        self.milestones.push((milestone, issues.to_vec()));
        self
    }

    pub fn with_commit(mut self, hash: &str, message: &str, file_changed: bool) -> Self {
        self.commits.push(BranchCommit {
            hash: hash.to_string(),
            message: message.to_string(),
            file_changed,
        });
        self
    }

    pub fn build(self) -> FakeBackend {
        FakeBackend {
            statuses: Arc::new(Mutex::new(self.statuses)),
            blocked: Arc::new(Mutex::new(self.blocked)),
            blocked_errors: Arc::new(Mutex::new(self.blocked_errors)),
            blocked_unavailable: self.blocked_unavailable,
            blocked_gate: self.blocked_gate,
            unapprove_errors: Arc::new(Mutex::new(self.unapprove_errors)),
            milestones: Arc::new(Mutex::new(self.milestones)),
            commits: Arc::new(Mutex::new(self.commits)),
            archives: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl QcBackend for FakeBackend {
    async fn get_blocked_issues(&self, number: u64) -> Result<Vec<IssueStatus>, ApiError> {
        self.record(format!("blocked:{number}"));
        // let concurrently spawned lookups interleave
        tokio::task::yield_now().await;
        if let Some(gate) = &self.blocked_gate {
            gate.notified().await;
            self.record(format!("blocked_done:{number}"));
        }

        if self.blocked_unavailable {
            return Err(ApiError::FeatureUnavailable(
                "blocked issue lookup is not supported".to_string(),
            ));
        }
        if let Some(err) = self.blocked_errors.lock().unwrap().get(&number) {
            return Err(err.clone());
        }
        let children = self
            .blocked
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .unwrap_or_default();
        children.into_iter().map(|n| self.status_of(n)).collect()
    }

    async fn get_issue_statuses(&self, numbers: &[u64]) -> Result<Vec<IssueStatus>, ApiError> {
        self.record(format!(
            "status:{}",
            numbers
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(",")
        ));
        let statuses = self.statuses.lock().unwrap();
        Ok(numbers
            .iter()
            .filter_map(|n| statuses.get(n).cloned())
            .collect())
    }

    async fn unapprove_issue(
        &self,
        number: u64,
        reason: &str,
    ) -> Result<UnapprovalResponse, ApiError> {
        self.record(format!("unapprove:{number}:{reason}"));
        if let Some(err) = self.unapprove_errors.lock().unwrap().get(&number) {
            return Err(err.clone());
        }
        if let Some(status) = self.statuses.lock().unwrap().get_mut(&number) {
            status.qc_status.status = QCStatusEnum::InProgress;
            status.qc_status.approved_commit = None;
            status.issue.state = "open".to_string();
        }
        Ok(UnapprovalResponse {
            unapproval_url: format!("https://github.com/owner/repo/issues/{number}#unapproval"),
            opened: true,
        })
    }

    async fn preview_unapprove(&self, number: u64, reason: &str) -> Result<String, ApiError> {
        self.record(format!("preview:{number}"));
        Ok(format!(
            "<html><body><h1>QC Un-Approval</h1><p>{reason}</p><ul><li>issue #{number}</li></ul></body></html>"
        ))
    }

    async fn get_milestones(&self) -> Result<Vec<Milestone>, ApiError> {
        self.record("milestones".to_string());
        Ok(self
            .milestones
            .lock()
            .unwrap()
            .iter()
            .map(|(m, _)| m.clone())
            .collect())
    }

    async fn get_milestone_issues(&self, milestone: u64) -> Result<Vec<Issue>, ApiError> {
        self.record(format!("milestone_issues:{milestone}"));
        let numbers = self
            .milestones
            .lock()
            .unwrap()
            .iter()
            .find(|(m, _)| m.number == milestone)
            .map(|(_, issues)| issues.clone())
            .ok_or_else(|| ApiError::NotFound(format!("Milestone {milestone} not found")))?;
        numbers
            .into_iter()
            .map(|n| self.status_of(n).map(|s| s.issue))
            .collect()
    }

    async fn get_commits(&self, query: &CommitsQuery) -> Result<PagedCommitsResponse, ApiError> {
        self.record(format!("commits:{}", query.page));
        let commits = self.commits.lock().unwrap();
        let page_size = query.page_size.unwrap_or(25);
        let page = match &query.locate {
            Some(prefix) => commits
                .iter()
                .position(|c| c.hash.starts_with(prefix.as_str()))
                .map(|i| i / page_size)
                .unwrap_or(query.page),
            None => query.page,
        };
        Ok(PagedCommitsResponse {
            commits: commits
                .iter()
                .skip(page * page_size)
                .take(page_size)
                .cloned()
                .collect(),
            total: commits.len(),
            page,
            page_size,
        })
    }

    async fn generate_archive(
        &self,
        request: &ArchiveGenerateRequest,
    ) -> Result<ArchiveGenerateResponse, ApiError> {
        self.record(format!("archive:{}", request.output_path));
        self.archives.lock().unwrap().push(request.clone());
        Ok(ArchiveGenerateResponse {
            output_path: request.output_path.clone(),
        })
    }
}
