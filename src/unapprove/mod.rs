//! Unapprove impact analysis: which approvals fall with a given issue.

mod children;
mod expansion;
mod partition;
mod reducer;
mod session;
mod store;
mod submit;
mod tree;

pub use children::ChildrenCache;
pub use expansion::{Expansion, ExpansionTracker};
pub use partition::{Lane, Partitions, active_parents, impacted_by};
pub use reducer::{Action, PlannerState, reduce};
pub use session::{Session, preview_text};
pub use store::NodeStore;
pub use submit::{
    SubmissionOutcome, SubmissionPlan, SubmitError, UnapproveFailure, UnapproveSuccess, submit,
};
pub use tree::{TreeNode, TreeNodeKind};
