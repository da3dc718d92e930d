//! The planner state value and the pure transition function over it.
//!
//! Every user gesture and every network completion becomes an [`Action`];
//! [`reduce`] consumes the previous [`PlannerState`] and returns the next.
//! Nothing else mutates planner state, so the transition table below is the
//! whole behavioral contract:
//!
//! | Action | Effect |
//! |---|---|
//! | `InitRoot` | seed the root snapshot, expand the root under itself, queue it when approved |
//! | `LoadStart` | mark the parent in flight (no-op when cached or already in flight) |
//! | `LoadSuccess` | record the edge, upsert children, clear the parent's error |
//! | `LoadError` | clear in flight, record the error against the parent only |
//! | `BlockedUnavailable` | switch to single-issue fallback for the rest of the session |
//! | `ExpandChildren` | canonical / re-expand / duplicate per the expansion tracker |
//! | `CollapseChildren`, `UncollapseChildren` | toggle visibility unless the node is shared |
//! | `AddToUnapprove`, `RemoveFromUnapprove` | idempotent, insertion order preserved |
//! | `SetReason` | per-node reason text |
//! | `Unapproved` | drop a successfully unapproved issue from the queue along with its reason |
//! | `StatusRefreshed` | replace a known snapshot; re-apply the root seeding rule, dequeue anything no longer approved |

use std::collections::{BTreeSet, HashMap};

use crate::api::ApiError;
use crate::issue::IssueStatus;
use crate::unapprove::children::ChildrenCache;
use crate::unapprove::expansion::{Expansion, ExpansionTracker};
use crate::unapprove::partition;
use crate::unapprove::store::NodeStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    InitRoot(IssueStatus),
    LoadStart(u64),
    LoadSuccess {
        parent: u64,
        children: Vec<IssueStatus>,
    },
    LoadError {
        parent: u64,
        error: ApiError,
    },
    BlockedUnavailable(u64),
    ExpandChildren {
        issue: u64,
        parent: u64,
    },
    CollapseChildren(u64),
    UncollapseChildren(u64),
    AddToUnapprove(u64),
    RemoveFromUnapprove(u64),
    SetReason {
        issue: u64,
        reason: String,
    },
    Unapproved(u64),
    StatusRefreshed(IssueStatus),
}

/// Everything the unapprove planner knows about one root issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerState {
    root: u64,
    nodes: NodeStore,
    children: ChildrenCache,
    expansion: ExpansionTracker,
    errors: HashMap<u64, ApiError>,
    to_unapprove: Vec<u64>,
    reasons: HashMap<u64, String>,
    // (parent, child) pairs where the child is shown as an inert reference
    duplicates: BTreeSet<(u64, u64)>,
    blocked_unavailable: bool,
}

impl PlannerState {
    pub fn new(root: u64) -> Self {
        Self {
            root,
            nodes: NodeStore::new(),
            children: ChildrenCache::new(),
            expansion: ExpansionTracker::new(),
            errors: HashMap::new(),
            to_unapprove: Vec::new(),
            reasons: HashMap::new(),
            duplicates: BTreeSet::new(),
            blocked_unavailable: false,
        }
    }

    pub fn root(&self) -> u64 {
        self.root
    }

    pub fn root_status(&self) -> Option<&IssueStatus> {
        self.nodes.get(self.root)
    }

    pub fn is_root_approved(&self) -> bool {
        self.nodes.is_approved(self.root).unwrap_or(false)
    }

    pub fn nodes(&self) -> &NodeStore {
        &self.nodes
    }

    pub fn children(&self) -> &ChildrenCache {
        &self.children
    }

    pub fn expansion(&self) -> &ExpansionTracker {
        &self.expansion
    }

    pub fn error(&self, parent: u64) -> Option<&ApiError> {
        self.errors.get(&parent)
    }

    pub fn errors(&self) -> &HashMap<u64, ApiError> {
        &self.errors
    }

    pub fn to_unapprove(&self) -> &[u64] {
        &self.to_unapprove
    }

    pub fn is_queued(&self, number: u64) -> bool {
        self.to_unapprove.contains(&number)
    }

    pub fn reason(&self, number: u64) -> Option<&str> {
        self.reasons.get(&number).map(String::as_str)
    }

    pub fn is_duplicate_reference(&self, parent: u64, child: u64) -> bool {
        self.duplicates.contains(&(parent, child))
    }

    /// Once set, the session never returns to graph mode.
    pub fn is_blocked_unavailable(&self) -> bool {
        self.blocked_unavailable
    }

    /// The root may only leave the queue when it carries no approval.
    pub fn can_remove(&self, number: u64) -> bool {
        self.is_queued(number) && !(number == self.root && self.is_root_approved())
    }

    pub fn can_add(&self, number: u64) -> bool {
        !self.is_queued(number) && self.nodes.is_approved(number) == Some(true)
    }

    pub fn apply(self, action: Action) -> Self {
        reduce(self, action)
    }
}

pub fn reduce(mut state: PlannerState, action: Action) -> PlannerState {
    match action {
        Action::InitRoot(status) => {
            if status.number() != state.root {
                log::warn!(
                    "Ignoring root #{} for a planner opened on #{}",
                    status.number(),
                    state.root
                );
                return state;
            }
            let approved = status.is_approved();
            state.nodes.put(status);
            state.expansion.expand(state.root, state.root);
            if approved && !state.is_queued(state.root) {
                state.to_unapprove.insert(0, state.root);
            }
        }
        Action::LoadStart(parent) => {
            if state.blocked_unavailable {
                return state;
            }
            state.children.begin_load(parent);
        }
        Action::LoadSuccess { parent, children } => {
            if state.blocked_unavailable {
                state.children.abandon(parent);
                return state;
            }
            let numbers = children.iter().map(IssueStatus::number).collect();
            for child in children {
                state.nodes.put(child);
            }
            state.children.record(parent, numbers);
            state.errors.remove(&parent);
        }
        Action::LoadError { parent, error } => {
            state.children.abandon(parent);
            state.errors.insert(parent, error);
        }
        Action::BlockedUnavailable(parent) => {
            state.children.abandon(parent);
            if !state.blocked_unavailable {
                log::info!(
                    "Blocked issue lookup unavailable (while loading #{parent}); falling back to single-issue unapproval"
                );
            }
            state.blocked_unavailable = true;
        }
        Action::ExpandChildren { issue, parent } => {
            if !state.nodes.contains(issue) {
                log::debug!("Cannot expand unknown issue #{issue}");
                return state;
            }
            if let Expansion::Duplicate { canonical_parent } = state.expansion.expand(issue, parent)
            {
                log::debug!(
                    "#{issue} already expanded under #{canonical_parent}; shown as a reference under #{parent}"
                );
                state.duplicates.insert((parent, issue));
            }
        }
        Action::CollapseChildren(issue) => {
            let live_parents = partition::impacted_by(&state, issue).len();
            state.expansion.collapse(issue, live_parents);
        }
        Action::UncollapseChildren(issue) => {
            let live_parents = partition::impacted_by(&state, issue).len();
            state.expansion.uncollapse(issue, live_parents);
        }
        Action::AddToUnapprove(issue) => {
            if state.can_add(issue) {
                state.to_unapprove.push(issue);
            }
        }
        Action::RemoveFromUnapprove(issue) => {
            if state.can_remove(issue) {
                state.to_unapprove.retain(|n| *n != issue);
            }
        }
        Action::SetReason { issue, reason } => {
            state.reasons.insert(issue, reason);
        }
        Action::Unapproved(issue) => {
            state.to_unapprove.retain(|n| *n != issue);
            state.reasons.remove(&issue);
        }
        Action::StatusRefreshed(status) => {
            let number = status.number();
            if !state.nodes.contains(number) {
                return state;
            }
            let approved = status.is_approved();
            state.nodes.put(status);
            if !approved {
                state.to_unapprove.retain(|n| *n != number);
            } else if number == state.root && !state.is_queued(number) {
                state.to_unapprove.insert(0, number);
            }
        }
    }
    state
}
