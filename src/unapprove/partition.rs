//! Projection of planner state into the three display lanes.

use std::collections::{HashMap, HashSet};

use crate::unapprove::reducer::PlannerState;

/// Which lane a node is displayed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    ToUnapprove,
    ImpactedApprovals,
    NotApproved,
}

/// Parents whose children currently count as impacted: the root and every
/// queued issue, in that order, that is expanded and not collapsed.
///
/// Only issues being unapproved impact the issues they block, so an
/// approved issue sitting in the impacted lane does not contribute its own
/// children until it is queued.
pub fn active_parents(state: &PlannerState) -> Vec<u64> {
    let root = state.root();
    std::iter::once(root)
        .chain(state.to_unapprove().iter().copied().filter(|n| *n != root))
        .filter(|n| state.expansion().is_visible(*n))
        .collect()
}

/// Every active parent whose cached children contain `number`.
pub fn impacted_by(state: &PlannerState, number: u64) -> Vec<u64> {
    active_parents(state)
        .into_iter()
        .filter(|p| {
            state
                .children()
                .get(*p)
                .is_some_and(|children| children.contains(&number))
        })
        .collect()
}

/// The lanes derived from one planner state. Recomputed, never patched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partitions {
    pub to_unapprove: Vec<u64>,
    pub impacted_approvals: Vec<u64>,
    pub not_approved: Vec<u64>,
    /// The root, when it carries no approval; always shown as not approved.
    pub root_not_approved: Option<u64>,
    /// Children of active parents, minus the root and queued issues.
    pub all_visible: Vec<u64>,
    impacted_by: HashMap<u64, Vec<u64>>,
}

impl Partitions {
    pub fn compute(state: &PlannerState) -> Self {
        let root = state.root();
        let queued = state.to_unapprove().iter().copied().collect::<HashSet<_>>();

        let mut impacted_by: HashMap<u64, Vec<u64>> = HashMap::new();
        let mut seen = HashSet::new();
        let mut all_visible = Vec::new();

        for parent in active_parents(state) {
            let Some(children) = state.children().get(parent) else {
                continue;
            };
            for &child in children {
                let parents = impacted_by.entry(child).or_default();
                if !parents.contains(&parent) {
                    parents.push(parent);
                }
                if child != root && !queued.contains(&child) && seen.insert(child) {
                    all_visible.push(child);
                }
            }
        }

        let (impacted_approvals, not_approved) = all_visible
            .iter()
            .partition::<Vec<u64>, _>(|n| state.nodes().is_approved(**n).unwrap_or(false));

        let root_not_approved = match state.root_status() {
            Some(status) if !status.is_approved() => Some(root),
            _ => None,
        };

        Self {
            to_unapprove: state.to_unapprove().to_vec(),
            impacted_approvals,
            not_approved,
            root_not_approved,
            all_visible,
            impacted_by,
        }
    }

    /// Active parents listing `number` among their children, in lane order.
    pub fn impacted_by(&self, number: u64) -> &[u64] {
        self.impacted_by
            .get(&number)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn lane_of(&self, number: u64) -> Option<Lane> {
        if self.to_unapprove.contains(&number) {
            Some(Lane::ToUnapprove)
        } else if self.root_not_approved == Some(number) || self.not_approved.contains(&number) {
            Some(Lane::NotApproved)
        } else if self.impacted_approvals.contains(&number) {
            Some(Lane::ImpactedApprovals)
        } else {
            None
        }
    }

    /// A collapse control is only offered while at most one visible parent
    /// references the node.
    pub fn can_collapse(&self, state: &PlannerState, number: u64) -> bool {
        state
            .expansion()
            .can_toggle(number, self.impacted_by(number).len())
    }
}
