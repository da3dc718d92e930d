use std::fmt;

use futures::future::join_all;

use crate::api::{ApiError, QcBackend};
use crate::issue::IssueStatus;
use crate::unapprove::reducer::PlannerState;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("A reason is required for {}", format_issue_list(.0))]
    MissingReasons(Vec<u64>),
    #[error("No issues selected to unapprove")]
    NothingToSubmit,
}

fn format_issue_list(numbers: &[u64]) -> String {
    numbers
        .iter()
        .map(|n| format!("#{n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validated working set: every entry has a non-empty reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPlan {
    root: u64,
    entries: Vec<(u64, String)>,
    fallback: bool,
}

impl SubmissionPlan {
    /// Build the plan from the queued issues, or from the root alone when
    /// blocked issue lookup is unavailable.
    pub fn from_state(state: &PlannerState) -> Result<Self, SubmitError> {
        let fallback = state.is_blocked_unavailable();
        let working_set = if fallback {
            // empty once the root has been unapproved
            state
                .to_unapprove()
                .iter()
                .copied()
                .filter(|n| *n == state.root())
                .collect()
        } else {
            state.to_unapprove().to_vec()
        };

        if working_set.is_empty() {
            return Err(SubmitError::NothingToSubmit);
        }

        let missing = working_set
            .iter()
            .copied()
            .filter(|n| state.reason(*n).is_none_or(|r| r.trim().is_empty()))
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(SubmitError::MissingReasons(missing));
        }

        let entries = working_set
            .into_iter()
            .map(|n| (n, state.reason(n).unwrap_or_default().trim().to_string()))
            .collect();

        Ok(Self {
            root: state.root(),
            entries,
            fallback,
        })
    }

    pub fn root(&self) -> u64 {
        self.root
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub fn issues(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.iter().map(|(n, _)| *n)
    }

    pub fn entries(&self) -> &[(u64, String)] {
        &self.entries
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnapproveSuccess {
    pub issue_number: u64,
    pub url: String,
    pub reopened: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnapproveFailure {
    pub issue_number: u64,
    pub error: ApiError,
}

/// Per-issue results of one submission. Partial success is a normal outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub successes: Vec<UnapproveSuccess>,
    pub failures: Vec<UnapproveFailure>,
    /// Fresh root snapshot fetched after every request settled.
    pub root_status: Option<IssueStatus>,
    /// Fresh snapshots of the root and every successfully unapproved issue.
    pub refreshed: Vec<IssueStatus>,
}

impl SubmissionOutcome {
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for SubmissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for success in &self.successes {
            write!(f, "✅ #{} unapproved", success.issue_number)?;
            if success.reopened {
                write!(f, " and reopened")?;
            }
            writeln!(f, ": {}", success.url)?;
        }
        for failure in &self.failures {
            writeln!(
                f,
                "❌ #{} failed: {}",
                failure.issue_number,
                failure.error.user_message()
            )?;
        }
        if let Some(status) = &self.root_status {
            write!(f, "Root issue is now: {}", status.qc_status)?;
        }
        Ok(())
    }
}

/// Fire one unapprove request per planned issue, all concurrently, then
/// refresh the root's status.
///
/// A failing request never cancels its siblings and nothing is rolled back.
pub async fn submit(backend: &impl QcBackend, plan: &SubmissionPlan) -> SubmissionOutcome {
    log::debug!(
        "Submitting unapproval for {} issue(s){}",
        plan.entries.len(),
        if plan.fallback { " (fallback)" } else { "" }
    );

    let requests = plan.entries.iter().map(|(number, reason)| async move {
        (*number, backend.unapprove_issue(*number, reason).await)
    });

    let mut successes = Vec::new();
    let mut failures = Vec::new();
    for (issue_number, result) in join_all(requests).await {
        match result {
            Ok(response) => successes.push(UnapproveSuccess {
                issue_number,
                url: response.unapproval_url,
                reopened: response.opened,
            }),
            Err(error) => {
                log::warn!("Failed to unapprove #{issue_number}: {error}");
                failures.push(UnapproveFailure {
                    issue_number,
                    error,
                });
            }
        }
    }

    let mut numbers = vec![plan.root];
    numbers.extend(
        successes
            .iter()
            .map(|s| s.issue_number)
            .filter(|n| *n != plan.root),
    );
    let refreshed = match backend.get_issue_statuses(&numbers).await {
        Ok(statuses) => statuses,
        Err(e) => {
            log::warn!("Failed to refresh status of #{}: {e}", plan.root);
            Vec::new()
        }
    };
    let root_status = refreshed.iter().find(|s| s.number() == plan.root).cloned();
    if root_status.is_none() {
        log::warn!("No refreshed status returned for root #{}", plan.root);
    }

    SubmissionOutcome {
        successes,
        failures,
        root_status,
        refreshed,
    }
}
