use std::collections::{HashMap, HashSet};

/// Outcome of asking to expand a node under a given parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expansion {
    /// First expansion of the node; `under` is now its canonical parent.
    Canonical,
    /// The node was already expanded under the same parent; it is visible again.
    Reexpanded,
    /// The node belongs to another parent. The caller must render it as an
    /// inert reference and must not fetch its children.
    Duplicate { canonical_parent: u64 },
}

/// Tracks, for every node ever expanded, the parent it was first expanded
/// under and whether its subtree is currently collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionTracker {
    canonical: HashMap<u64, u64>,
    collapsed: HashSet<u64>,
}

impl ExpansionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expand(&mut self, number: u64, under: u64) -> Expansion {
        match self.canonical.get(&number) {
            None => {
                self.canonical.insert(number, under);
                self.collapsed.remove(&number);
                Expansion::Canonical
            }
            Some(&parent) if parent == under => {
                self.collapsed.remove(&number);
                Expansion::Reexpanded
            }
            Some(&parent) => Expansion::Duplicate {
                canonical_parent: parent,
            },
        }
    }

    pub fn canonical_parent(&self, number: u64) -> Option<u64> {
        self.canonical.get(&number).copied()
    }

    pub fn is_expanded(&self, number: u64) -> bool {
        self.canonical.contains_key(&number)
    }

    pub fn is_collapsed(&self, number: u64) -> bool {
        self.collapsed.contains(&number)
    }

    /// Expanded and not collapsed.
    pub fn is_visible(&self, number: u64) -> bool {
        self.is_expanded(number) && !self.is_collapsed(number)
    }

    /// Whether the collapse control may be offered for a node referenced by
    /// `live_parents` visible parents. Hiding a shared subtree would leave
    /// the other references pointing at nothing.
    pub fn can_toggle(&self, number: u64, live_parents: usize) -> bool {
        self.is_expanded(number) && live_parents <= 1
    }

    /// Hide the node's subtree. Returns false when nothing changed.
    pub fn collapse(&mut self, number: u64, live_parents: usize) -> bool {
        if !self.can_toggle(number, live_parents) {
            return false;
        }
        self.collapsed.insert(number)
    }

    /// Show the node's subtree again. Returns false when nothing changed.
    pub fn uncollapse(&mut self, number: u64, live_parents: usize) -> bool {
        if !self.can_toggle(number, live_parents) {
            return false;
        }
        self.collapsed.remove(&number)
    }
}
