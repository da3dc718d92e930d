use std::collections::HashMap;

use crate::issue::IssueStatus;

/// Last-fetched status snapshot of every issue seen in a session, keyed by
/// issue number.
///
/// Entries are only ever inserted or replaced wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeStore {
    nodes: HashMap<u64, IssueStatus>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, number: u64) -> Option<&IssueStatus> {
        self.nodes.get(&number)
    }

    pub fn put(&mut self, status: IssueStatus) {
        self.nodes.insert(status.number(), status);
    }

    pub fn contains(&self, number: u64) -> bool {
        self.nodes.contains_key(&number)
    }

    /// Approval class of a stored node; `None` when the node is unknown.
    pub fn is_approved(&self, number: u64) -> Option<bool> {
        self.get(number).map(IssueStatus::is_approved)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QCStatusEnum;
    use crate::test_utils::issue_status;

    #[test]
    fn test_put_replaces_wholesale() {
        let mut store = NodeStore::new();
        store.put(issue_status(10, QCStatusEnum::Approved));
        store.put(issue_status(10, QCStatusEnum::InProgress));

        assert_eq!(store.len(), 1);
        assert_eq!(store.is_approved(10), Some(false));
        assert_eq!(store.is_approved(11), None);
    }

    #[test]
    fn test_put_is_idempotent() {
        let mut store = NodeStore::new();
        let status = issue_status(3, QCStatusEnum::ChangesAfterApproval);
        store.put(status.clone());
        let once = store.clone();
        store.put(status);
        assert_eq!(store, once);
    }
}
