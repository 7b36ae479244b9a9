//! Move operations and the log entries that record them.
//!
//! A single operation type covers every edit to the tree:
//! - Create: move a fresh id under its parent
//! - Rename: move an id under its current parent with new metadata
//! - Move: move an id under a different parent
//! - Delete: move an id under a trash id that is never a node itself
//!
//! The operation does not name the node's old location. Applying it
//! removes the node from wherever it currently is and attaches it to
//! `parent_id`, creating it if it did not exist.

use super::primitives::Timestamp;
use super::tree::TreeNode;

/// At `timestamp`, make `id` a child of `parent_id` carrying `metadata`.
///
/// Operations are immutable values and may be cloned freely between
/// replicas. Their wire format is left to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OpMove<Id, M, A> {
    /// The node being moved (the child).
    pub id: Id,
    /// Unique, totally ordered time of the operation.
    pub timestamp: Timestamp<A>,
    /// Metadata attached to the parent-child edge, e.g. a file name.
    pub metadata: M,
    /// The new parent.
    pub parent_id: Id,
}

impl<Id, M, A> OpMove<Id, M, A> {
    /// Create a move operation.
    pub fn new(id: Id, timestamp: Timestamp<A>, metadata: M, parent_id: Id) -> OpMove<Id, M, A> {
        return OpMove {
            id,
            timestamp,
            metadata,
            parent_id,
        };
    }
}

/// An applied operation together with the state it replaced.
///
/// `old_node` is the parent and metadata of `op.id` immediately before
/// the operation was applied, or `None` if the node did not exist. It is
/// recorded even when the operation turned out to be a no-op, and is
/// what `State` restores when undoing the operation.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogEntry<Id, M, A> {
    pub op: OpMove<Id, M, A>,
    pub old_node: Option<TreeNode<Id, M>>,
}

impl<Id, M, A> LogEntry<Id, M, A> {
    /// The timestamp of the logged operation.
    #[inline]
    pub fn timestamp(&self) -> &Timestamp<A> {
        return &self.op.timestamp;
    }
}
