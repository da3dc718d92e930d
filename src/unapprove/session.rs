//! Async driver that owns one planner state and the fetches feeding it.

use std::collections::HashMap;
use std::sync::Arc;

use scraper::Html;
use tokio::task::{Id, JoinSet};

use crate::api::{ApiError, QcBackend};
use crate::issue::IssueStatus;
use crate::unapprove::expansion::Expansion;
use crate::unapprove::partition::{self, Partitions};
use crate::unapprove::reducer::{Action, PlannerState};
use crate::unapprove::submit::{self, SubmissionOutcome, SubmissionPlan, SubmitError};

/// One open unapprove panel for a root issue.
///
/// Every change goes through [`Session::dispatch`]. Children fetches run as
/// tokio tasks and come back as [`Action`]s applied by
/// [`Session::next_completion`]. Dropping the session aborts every fetch
/// still in flight.
pub struct Session<B: QcBackend + 'static> {
    backend: Arc<B>,
    state: PlannerState,
    tasks: JoinSet<Action>,
    pending: HashMap<Id, u64>,
    on_status_update: Option<Arc<dyn Fn(&IssueStatus) + Send + Sync + 'static>>,
    on_blocked_unavailable: Option<Arc<dyn Fn(u64) + Send + Sync + 'static>>,
}

impl<B: QcBackend + 'static> Session<B> {
    pub fn new(backend: Arc<B>, root: u64) -> Self {
        Self {
            backend,
            state: PlannerState::new(root),
            tasks: JoinSet::new(),
            pending: HashMap::new(),
            on_status_update: None,
            on_blocked_unavailable: None,
        }
    }

    /// Called with the refreshed root after a submission settles.
    pub fn with_status_listener(
        mut self,
        listener: impl Fn(&IssueStatus) + Send + Sync + 'static,
    ) -> Self {
        self.on_status_update = Some(Arc::new(listener));
        self
    }

    /// Called once, with the parent being loaded, when the server turns out
    /// not to support blocked issue lookup.
    pub fn with_unavailable_listener(
        mut self,
        listener: impl Fn(u64) + Send + Sync + 'static,
    ) -> Self {
        self.on_blocked_unavailable = Some(Arc::new(listener));
        self
    }

    /// Fetch the root's status, seed the planner with it and start loading
    /// the issues it blocks.
    pub async fn open(&mut self) -> Result<(), ApiError> {
        let root = self.state.root();
        let status = self.backend.get_issue_status(root).await?;
        self.open_with(status);
        Ok(())
    }

    /// Seed the planner with an already fetched root snapshot.
    pub fn open_with(&mut self, status: IssueStatus) {
        log::debug!("Opening unapprove session for {status}");
        self.dispatch(Action::InitRoot(status));
        self.request_children(self.state.root());
    }

    pub fn state(&self) -> &PlannerState {
        &self.state
    }

    pub fn partitions(&self) -> Partitions {
        Partitions::compute(&self.state)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of children fetches not yet applied.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    pub fn dispatch(&mut self, action: Action) {
        let was_unavailable = self.state.is_blocked_unavailable();
        let trigger = match &action {
            Action::BlockedUnavailable(parent) => Some(*parent),
            _ => None,
        };

        let root = self.state.root();
        let state = std::mem::replace(&mut self.state, PlannerState::new(root));
        self.state = state.apply(action);

        if let (false, Some(parent), Some(listener)) =
            (was_unavailable, trigger, &self.on_blocked_unavailable)
        {
            listener(parent);
        }
    }

    /// Start fetching the children of `parent` unless they are cached, already
    /// in flight, or the session is in single-issue fallback. Returns whether
    /// a request was dispatched.
    pub fn request_children(&mut self, parent: u64) -> bool {
        if self.state.is_blocked_unavailable() || !self.state.children().needs_load(parent) {
            return false;
        }

        self.dispatch(Action::LoadStart(parent));
        let backend = Arc::clone(&self.backend);
        let handle = self
            .tasks
            .spawn(async move { fetch_children(backend.as_ref(), parent).await });
        self.pending.insert(handle.id(), parent);
        log::debug!("Requested issues blocked by #{parent}");
        true
    }

    /// Wait for the next fetch to finish and apply it. Returns the parent it
    /// belonged to, or `None` when nothing is in flight.
    pub async fn next_completion(&mut self) -> Option<u64> {
        let (action, parent) = match self.tasks.join_next_with_id().await? {
            Ok((id, action)) => {
                let parent = self.pending.remove(&id);
                (action, parent)
            }
            Err(e) => {
                let parent = self.pending.remove(&e.id())?;
                log::warn!("Fetch of issues blocked by #{parent} did not complete: {e}");
                let action = Action::LoadError {
                    parent,
                    error: ApiError::Network(e.to_string()),
                };
                (action, Some(parent))
            }
        };
        self.dispatch(action);
        parent
    }

    /// Apply completions until nothing is in flight.
    pub async fn settle(&mut self) {
        while self.next_completion().await.is_some() {}
    }

    /// Children of `parent`, fetching them at most once per session.
    ///
    /// A second call, or a call while an earlier request is still in flight,
    /// shares that request instead of issuing another.
    pub async fn load(&mut self, parent: u64) -> Result<Vec<IssueStatus>, ApiError> {
        self.request_children(parent);
        while self.state.children().is_loading(parent) {
            if self.next_completion().await.is_none() {
                break;
            }
        }

        if let Some(children) = self.state.children().get(parent) {
            return Ok(children
                .iter()
                .filter_map(|n| self.state.nodes().get(*n).cloned())
                .collect());
        }
        if self.state.is_blocked_unavailable() {
            return Err(ApiError::FeatureUnavailable(
                "blocked issue lookup is not supported by this server".to_string(),
            ));
        }
        Err(self.state.error(parent).cloned().unwrap_or_else(|| {
            ApiError::NotFound(format!("Blocked issues of #{parent} were not loaded"))
        }))
    }

    /// Expand `issue` under the first active parent listing it, or under its
    /// existing canonical parent. Returns `None` when neither exists.
    pub fn expand(&mut self, issue: u64) -> Option<Expansion> {
        let parent = partition::impacted_by(&self.state, issue)
            .first()
            .copied()
            .or_else(|| self.state.expansion().canonical_parent(issue))?;
        self.expand_under(issue, parent)
    }

    /// Expand `issue` as listed under `parent`. Canonical and repeated
    /// expansions load the issue's children; a duplicate never does.
    /// Returns `None` for an issue the session has never seen.
    pub fn expand_under(&mut self, issue: u64, parent: u64) -> Option<Expansion> {
        if !self.state.nodes().contains(issue) {
            return None;
        }
        let expansion = match self.state.expansion().canonical_parent(issue) {
            None => Expansion::Canonical,
            Some(canonical) if canonical == parent => Expansion::Reexpanded,
            Some(canonical_parent) => Expansion::Duplicate { canonical_parent },
        };
        self.dispatch(Action::ExpandChildren { issue, parent });
        if !matches!(expansion, Expansion::Duplicate { .. }) {
            self.request_children(issue);
        }
        Some(expansion)
    }

    /// Returns whether anything changed; collapsing a shared node does not.
    pub fn collapse(&mut self, issue: u64) -> bool {
        self.dispatch(Action::CollapseChildren(issue));
        self.state.expansion().is_collapsed(issue)
    }

    pub fn uncollapse(&mut self, issue: u64) -> bool {
        let was_collapsed = self.state.expansion().is_collapsed(issue);
        self.dispatch(Action::UncollapseChildren(issue));
        was_collapsed && !self.state.expansion().is_collapsed(issue)
    }

    pub fn add_to_unapprove(&mut self, issue: u64) -> bool {
        let can_add = self.state.can_add(issue);
        self.dispatch(Action::AddToUnapprove(issue));
        can_add
    }

    pub fn remove_from_unapprove(&mut self, issue: u64) -> bool {
        let can_remove = self.state.can_remove(issue);
        self.dispatch(Action::RemoveFromUnapprove(issue));
        can_remove
    }

    pub fn set_reason(&mut self, issue: u64, reason: impl Into<String>) {
        self.dispatch(Action::SetReason {
            issue,
            reason: reason.into(),
        });
    }

    /// Plain-text rendering of the comment that unapproving `issue` with its
    /// current reason would post.
    pub async fn preview(&self, issue: u64) -> Result<String, ApiError> {
        let reason = self.state.reason(issue).unwrap_or_default();
        let html = self.backend.preview_unapprove(issue, reason).await?;
        Ok(preview_text(&html))
    }

    pub fn submission_plan(&self) -> Result<SubmissionPlan, SubmitError> {
        SubmissionPlan::from_state(&self.state)
    }

    /// Unapprove every issue in the working set, dequeue the ones that
    /// succeeded, apply the refreshed snapshots and notify the status
    /// listener.
    pub async fn submit(&mut self) -> Result<SubmissionOutcome, SubmitError> {
        let plan = self.submission_plan()?;
        let outcome = submit::submit(self.backend.as_ref(), &plan).await;

        for success in &outcome.successes {
            self.dispatch(Action::Unapproved(success.issue_number));
        }
        for status in &outcome.refreshed {
            self.dispatch(Action::StatusRefreshed(status.clone()));
        }
        if let Some(status) = &outcome.root_status {
            if let Some(listener) = &self.on_status_update {
                listener(status);
            }
        }
        Ok(outcome)
    }

    /// Expand every issue reachable from the root, up to `max_depth` levels
    /// below it, loading children along the way.
    pub async fn expand_all(&mut self, max_depth: usize) {
        let mut frontier = vec![self.state.root()];
        for _ in 0..max_depth {
            for parent in &frontier {
                self.request_children(*parent);
            }
            self.settle().await;

            let mut next = Vec::new();
            for parent in frontier {
                let children = self
                    .state
                    .children()
                    .get(parent)
                    .map(<[u64]>::to_vec)
                    .unwrap_or_default();
                for child in children {
                    if self.expand_under(child, parent) == Some(Expansion::Canonical) {
                        next.push(child);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        self.settle().await;
    }

    /// Abort every outstanding fetch and discard the session.
    pub fn close(mut self) {
        if !self.tasks.is_empty() {
            log::debug!("Closing session with {} fetch(es) in flight", self.tasks.len());
        }
        self.tasks.abort_all();
    }
}

async fn fetch_children(backend: &impl QcBackend, parent: u64) -> Action {
    match backend.get_blocked_issues(parent).await {
        Ok(children) => Action::LoadSuccess { parent, children },
        Err(e) if e.is_feature_unavailable() => Action::BlockedUnavailable(parent),
        Err(error) => {
            log::warn!("Failed to load issues blocked by #{parent}: {error}");
            Action::LoadError { parent, error }
        }
    }
}

/// Text content of an HTML preview, one non-empty text run per line.
pub fn preview_text(html: &str) -> String {
    Html::parse_fragment(html)
        .root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QCStatusEnum::{Approved, ChangeRequested};
    use crate::test_utils::{FakeBackend, issue_status};
    use crate::unapprove::partition::Lane;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    fn graph() -> FakeBackend {
        // 42 -> {10, 11}, 10 -> {7}, 11 -> {7}
        FakeBackend::builder()
            .with_status(issue_status(42, Approved))
            .with_status(issue_status(10, Approved))
            .with_status(issue_status(11, Approved))
            .with_status(issue_status(7, Approved))
            .with_status(issue_status(8, ChangeRequested))
            .with_blocked(42, &[10, 11])
            .with_blocked(10, &[7])
            .with_blocked(11, &[7, 8])
            .build()
    }

    async fn opened(backend: &FakeBackend) -> Session<FakeBackend> {
        let mut session = Session::new(Arc::new(backend.clone()), 42);
        session.open().await.unwrap();
        session.settle().await;
        session
    }

    #[tokio::test]
    async fn test_open_seeds_root_and_loads_children() {
        let backend = graph();
        let session = opened(&backend).await;

        let p = session.partitions();
        assert_eq!(p.to_unapprove, vec![42]);
        assert_eq!(p.impacted_approvals, vec![10, 11]);
        assert_eq!(backend.calls(), vec!["status:42", "blocked:42"]);
    }

    #[tokio::test]
    async fn test_open_unknown_root_fails() {
        let backend = graph();
        let mut session = Session::new(Arc::new(backend), 99);
        let err = session.open().await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_fetch() {
        let backend = graph();
        let mut session = Session::new(Arc::new(backend.clone()), 42);
        session.open_with(issue_status(42, Approved));

        assert!(!session.request_children(42));
        assert_eq!(session.in_flight(), 1);

        let first = session.load(42).await.unwrap();
        let second = session.load(42).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first.iter().map(IssueStatus::number).collect::<Vec<_>>(),
            vec![10, 11]
        );
        assert_eq!(backend.call_count("blocked"), 1);
    }

    #[tokio::test]
    async fn test_duplicate_expansion_does_not_fetch() {
        let backend = graph();
        let mut session = opened(&backend).await;

        assert!(session.add_to_unapprove(10));
        assert!(session.add_to_unapprove(11));
        assert_eq!(session.expand(10), Some(Expansion::Canonical));
        assert_eq!(session.expand(11), Some(Expansion::Canonical));
        session.settle().await;

        assert_eq!(session.expand_under(7, 10), Some(Expansion::Canonical));
        assert_eq!(
            session.expand_under(7, 11),
            Some(Expansion::Duplicate {
                canonical_parent: 10
            })
        );
        session.settle().await;

        assert_eq!(session.state().expansion().canonical_parent(7), Some(10));
        assert!(session.state().is_duplicate_reference(11, 7));
        assert_eq!(backend.call_count("blocked:7"), 1);
        assert_eq!(session.partitions().impacted_by(7), &[10, 11]);
        assert!(!session.collapse(7));
    }

    #[tokio::test]
    async fn test_expand_unknown_issue() {
        let backend = graph();
        let mut session = opened(&backend).await;
        assert_eq!(session.expand(99), None);
        assert_eq!(session.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_load_error_is_attached_to_parent() {
        let backend = FakeBackend::builder()
            .with_status(issue_status(42, Approved))
            .with_status(issue_status(10, Approved))
            .with_blocked(42, &[10])
            .with_blocked_error(10, ApiError::Network("connection reset".to_string()))
            .build();
        let mut session = opened(&backend).await;
        session.add_to_unapprove(10);

        let err = session.load(10).await.unwrap_err();
        assert_eq!(err, ApiError::Network("connection reset".to_string()));
        assert_eq!(session.state().error(10), Some(&err));
        assert_eq!(session.state().error(42), None);

        // a failed load may be retried
        assert!(session.request_children(10));
        session.settle().await;
        assert_eq!(backend.call_count("blocked:10"), 2);
    }

    #[tokio::test]
    async fn test_blocked_unavailable_falls_back_to_root() {
        let backend = FakeBackend::builder()
            .with_status(issue_status(42, Approved))
            .with_blocked_unavailable()
            .build();
        let notified = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&notified);
        let mut session = Session::new(Arc::new(backend.clone()), 42)
            .with_unavailable_listener(move |parent| sink.lock().unwrap().push(parent));

        session.open().await.unwrap();
        session.settle().await;

        assert!(session.state().is_blocked_unavailable());
        assert_eq!(*notified.lock().unwrap(), vec![42]);
        assert!(!session.request_children(42));
        assert!(matches!(
            session.load(42).await,
            Err(ApiError::FeatureUnavailable(_))
        ));

        session.set_reason(42, "wrong dataset version");
        let outcome = session.submit().await.unwrap();
        assert_eq!(outcome.successes.len(), 1);
        assert_eq!(outcome.successes[0].issue_number, 42);
        assert_eq!(backend.call_count("unapprove"), 1);
        assert_eq!(backend.call_count("blocked"), 1);
        assert_eq!(*notified.lock().unwrap(), vec![42]);
    }

    #[tokio::test]
    async fn test_submit_refreshes_root_and_notifies() {
        let backend = graph();
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&updates);
        let mut session = Session::new(Arc::new(backend.clone()), 42)
            .with_status_listener(move |status| sink.lock().unwrap().push(status.clone()));
        session.open().await.unwrap();
        session.settle().await;

        assert_eq!(session.submit().await, Err(SubmitError::MissingReasons(vec![42])));

        session.set_reason(42, "bad input");
        let outcome = session.submit().await.unwrap();
        assert!(outcome.is_complete_success());
        assert!(!session.state().is_root_approved());

        let updates = updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert!(!updates[0].is_approved());
        assert_eq!(backend.calls().last().map(String::as_str), Some("status:42"));
    }

    #[tokio::test]
    async fn test_preview_renders_text() {
        let backend = graph();
        let mut session = opened(&backend).await;
        session.set_reason(42, "bad input");
        let text = session.preview(42).await.unwrap();
        insta::assert_snapshot!(text, @r"
        QC Un-Approval
        bad input
        issue #42
        ");
    }

    #[tokio::test]
    async fn test_expand_all_stops_at_duplicates() {
        let backend = graph();
        let mut session = opened(&backend).await;
        session.expand_all(10).await;

        assert_eq!(session.state().expansion().canonical_parent(7), Some(10));
        assert!(session.state().is_duplicate_reference(11, 7));
        assert_eq!(backend.call_count("blocked:7"), 1);
        assert_eq!(backend.call_count("blocked:8"), 1);
        assert_eq!(session.in_flight(), 0);
    }

    fn gated(gate: &Arc<Notify>) -> FakeBackend {
        FakeBackend::builder()
            .with_status(issue_status(42, Approved))
            .with_status(issue_status(10, Approved))
            .with_blocked(42, &[10])
            .with_blocked_gate(Arc::clone(gate))
            .build()
    }

    // Let spawned fetches run up to the gate.
    async fn run_pending() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_gated_fetch_completes_while_open() {
        let gate = Arc::new(Notify::new());
        let backend = gated(&gate);
        let mut session = Session::new(Arc::new(backend.clone()), 42);
        session.open_with(issue_status(42, Approved));
        run_pending().await;
        assert_eq!(backend.call_count("blocked_done"), 0);

        gate.notify_one();
        session.settle().await;
        assert_eq!(backend.call_count("blocked_done:42"), 1);
        assert_eq!(session.partitions().impacted_approvals, vec![10]);
    }

    #[tokio::test]
    async fn test_close_aborts_in_flight_fetches() {
        let gate = Arc::new(Notify::new());
        let backend = gated(&gate);
        let mut session = Session::new(Arc::new(backend.clone()), 42);
        session.open_with(issue_status(42, Approved));
        run_pending().await;
        assert_eq!(backend.call_count("blocked:42"), 1);
        assert_eq!(session.in_flight(), 1);

        session.close();
        gate.notify_one();
        run_pending().await;
        assert_eq!(backend.call_count("blocked_done"), 0);
    }

    #[tokio::test]
    async fn test_drop_aborts_in_flight_fetches() {
        let gate = Arc::new(Notify::new());
        let backend = gated(&gate);
        let mut session = Session::new(Arc::new(backend.clone()), 42);
        session.open_with(issue_status(42, Approved));
        run_pending().await;
        assert_eq!(backend.call_count("blocked:42"), 1);

        drop(session);
        gate.notify_one();
        run_pending().await;
        assert_eq!(backend.call_count("blocked_done"), 0);
    }

    fn assert_lanes_disjoint(session: &Session<FakeBackend>) {
        let p = session.partitions();
        let root = session.state().root();
        if p.root_not_approved == Some(root) {
            assert!(!p.to_unapprove.contains(&root));
        }
        for n in &p.to_unapprove {
            assert!(!p.impacted_approvals.contains(n));
            assert!(!p.not_approved.contains(n));
        }
        for n in &p.impacted_approvals {
            assert!(!p.not_approved.contains(n));
        }
    }

    #[tokio::test]
    async fn test_lanes_stay_disjoint_after_submit() {
        let backend = FakeBackend::builder()
            .with_status(issue_status(42, Approved))
            .build();
        let mut session = opened(&backend).await;
        session.set_reason(42, "bad input");

        let outcome = session.submit().await.unwrap();
        assert!(outcome.is_complete_success());
        assert_lanes_disjoint(&session);

        let p = session.partitions();
        assert!(p.to_unapprove.is_empty());
        assert_eq!(p.root_not_approved, Some(42));
        assert_eq!(p.lane_of(42), Some(Lane::NotApproved));
        assert_eq!(session.submit().await, Err(SubmitError::NothingToSubmit));
        assert_eq!(backend.call_count("unapprove"), 1);
    }

    #[tokio::test]
    async fn test_submitted_children_move_to_not_approved() {
        let backend = graph();
        let mut session = opened(&backend).await;
        session.add_to_unapprove(10);
        session.set_reason(42, "bad input");
        session.set_reason(10, "depends on #42");

        session.submit().await.unwrap();
        assert_lanes_disjoint(&session);

        let p = session.partitions();
        assert!(p.to_unapprove.is_empty());
        assert_eq!(p.impacted_approvals, vec![11]);
        assert_eq!(p.not_approved, vec![10]);
        assert_eq!(backend.calls().last().map(String::as_str), Some("status:42,10"));
    }

    #[tokio::test]
    async fn test_expand_without_parent_does_not_invent_edge() {
        // 42 -> {10}, 10 -> {20}
        let backend = FakeBackend::builder()
            .with_status(issue_status(42, Approved))
            .with_status(issue_status(10, Approved))
            .with_status(issue_status(20, Approved))
            .with_blocked(42, &[10])
            .with_blocked(10, &[20])
            .build();
        let mut session = opened(&backend).await;
        session.add_to_unapprove(10);
        session.expand(10);
        session.settle().await;
        assert!(session.add_to_unapprove(20));
        assert!(session.remove_from_unapprove(10));

        assert_eq!(session.expand(20), None);
        assert_eq!(session.state().expansion().canonical_parent(20), None);
        assert_eq!(backend.call_count("blocked:20"), 0);

        // once a real parent lists it again, expansion works
        session.add_to_unapprove(10);
        assert_eq!(session.expand(20), Some(Expansion::Canonical));
        assert_eq!(session.state().expansion().canonical_parent(20), Some(10));
    }
}
