//! Blocked-issue tree browser: the planner state seen as a tree rooted at
//! the root issue, each shared node rendered in full only under its
//! canonical parent.

use std::collections::HashSet;

use crate::unapprove::reducer::PlannerState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNodeKind {
    /// Children fetched and shown.
    Expanded,
    /// Children fetched but hidden.
    Collapsed,
    /// Never expanded, so its children are not shown.
    Unexpanded,
    Loading,
    /// The fetch for this node's children failed.
    Failed(String),
    /// Already shown under another parent; an inert reference.
    Reference { canonical_parent: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub number: u64,
    pub kind: TreeNodeKind,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn build(state: &PlannerState) -> Self {
        let mut rendered = HashSet::new();
        build_node(state, state.root(), &mut rendered)
    }

    /// Total number of nodes in this subtree, references included.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::count).sum::<usize>()
    }

    /// Box-drawing rendering, one issue per line with its QC status.
    pub fn render(&self, state: &PlannerState) -> String {
        let mut out = String::new();
        out.push_str(&node_label(self, state));
        out.push('\n');
        render_children(&self.children, state, "", &mut out);
        out
    }
}

fn node_kind(state: &PlannerState, number: u64) -> TreeNodeKind {
    let expansion = state.expansion();
    if let Some(error) = state.error(number) {
        TreeNodeKind::Failed(error.user_message())
    } else if state.children().is_loading(number) {
        TreeNodeKind::Loading
    } else if !expansion.is_expanded(number) || !state.children().has_loaded(number) {
        TreeNodeKind::Unexpanded
    } else if expansion.is_collapsed(number) {
        TreeNodeKind::Collapsed
    } else {
        TreeNodeKind::Expanded
    }
}

fn build_node(state: &PlannerState, number: u64, rendered: &mut HashSet<u64>) -> TreeNode {
    rendered.insert(number);
    let expansion = state.expansion();
    let kind = node_kind(state, number);

    let mut children = Vec::new();
    if kind == TreeNodeKind::Expanded {
        for &child in state.children().get(number).unwrap_or_default() {
            let canonical = expansion.canonical_parent(child);
            let node = if canonical == Some(number) && !rendered.contains(&child) {
                build_node(state, child, rendered)
            } else if let Some(canonical_parent) = canonical.filter(|p| *p != number) {
                TreeNode {
                    number: child,
                    kind: TreeNodeKind::Reference { canonical_parent },
                    children: Vec::new(),
                }
            } else if rendered.contains(&child) {
                // cycle back to an ancestor expanded under itself
                TreeNode {
                    number: child,
                    kind: TreeNodeKind::Reference {
                        canonical_parent: child,
                    },
                    children: Vec::new(),
                }
            } else {
                TreeNode {
                    number: child,
                    kind: node_kind(state, child),
                    children: Vec::new(),
                }
            };
            children.push(node);
        }
    }

    TreeNode {
        number,
        kind,
        children,
    }
}

fn node_label(node: &TreeNode, state: &PlannerState) -> String {
    let description = match state.nodes().get(node.number) {
        Some(status) => format!(
            "#{} {} [{}]",
            node.number, status.issue.title, status.qc_status.status
        ),
        None => format!("#{}", node.number),
    };
    match &node.kind {
        TreeNodeKind::Expanded | TreeNodeKind::Unexpanded => description,
        TreeNodeKind::Collapsed => format!("{description} (collapsed)"),
        TreeNodeKind::Loading => format!("{description} (loading...)"),
        TreeNodeKind::Failed(message) => format!("{description} (error: {message})"),
        TreeNodeKind::Reference { canonical_parent } if *canonical_parent == node.number => {
            format!("{description} ↺ cycle")
        }
        TreeNodeKind::Reference { canonical_parent } => {
            format!("{description} ↪ see under #{canonical_parent}")
        }
    }
}

fn render_children(children: &[TreeNode], state: &PlannerState, prefix: &str, out: &mut String) {
    for (i, child) in children.iter().enumerate() {
        let last = i + 1 == children.len();
        let (branch, indent) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        out.push_str(&format!("{prefix}{branch}{}\n", node_label(child, state)));
        render_children(&child.children, state, &format!("{prefix}{indent}"), out);
    }
}
