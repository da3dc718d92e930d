use std::collections::{HashMap, HashSet};

/// Memoized "parent blocks children" edges plus the set of parents whose
/// fetch is currently in flight.
///
/// Edges are monotonic: once recorded for a parent they are never replaced
/// within a session, so a parent is fetched at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildrenCache {
    edges: HashMap<u64, Vec<u64>>,
    in_flight: HashSet<u64>,
}

impl ChildrenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_loaded(&self, parent: u64) -> bool {
        self.edges.contains_key(&parent)
    }

    /// Ordered children of `parent`, if its edge has been fetched.
    pub fn get(&self, parent: u64) -> Option<&[u64]> {
        self.edges.get(&parent).map(Vec::as_slice)
    }

    pub fn is_loading(&self, parent: u64) -> bool {
        self.in_flight.contains(&parent)
    }

    /// Whether a fetch for `parent` should be dispatched now. False when the
    /// edge is already cached or another fetch for it is outstanding.
    pub fn needs_load(&self, parent: u64) -> bool {
        !self.has_loaded(parent) && !self.is_loading(parent)
    }

    /// Mark `parent` as in flight. Returns false (and changes nothing) when
    /// the fetch would be redundant.
    pub fn begin_load(&mut self, parent: u64) -> bool {
        if !self.needs_load(parent) {
            return false;
        }
        self.in_flight.insert(parent)
    }

    /// Record the fetched edge. A second completion for an already cached
    /// parent is ignored.
    pub fn record(&mut self, parent: u64, children: Vec<u64>) {
        self.in_flight.remove(&parent);
        self.edges.entry(parent).or_insert(children);
    }

    /// Clear the in-flight mark after a failed fetch so it can be retried.
    pub fn abandon(&mut self, parent: u64) {
        self.in_flight.remove(&parent);
    }

    pub fn loading(&self) -> impl Iterator<Item = u64> + '_ {
        self.in_flight.iter().copied()
    }

    /// Every parent whose cached edge contains `child`, sorted by number.
    pub fn parents_of(&self, child: u64) -> Vec<u64> {
        let mut parents = self
            .edges
            .iter()
            .filter(|(_, children)| children.contains(&child))
            .map(|(parent, _)| *parent)
            .collect::<Vec<_>>();
        parents.sort_unstable();
        parents
    }
}
