//! Observing tree mutations as they happen.
//!
//! Applying an operation out of order undoes and redoes part of the log,
//! so the tree passes through intermediate states. Embedders that mirror
//! the tree elsewhere (a filesystem, a UI) pass a `TreeObserver` to
//! `apply_op_observed` and receive one `TreeEvent` per committed mutation,
//! in the order the mutations happen. Operations that turn out to be
//! no-ops produce no event.

use std::hash::Hash;

use super::op::OpMove;
use super::tree::Ancestors;
use super::tree::Tree;
use super::tree::TreeNode;

/// Why a mutation happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Step {
    /// An incoming operation was applied.
    Apply,
    /// A logged operation was reverted to make room for an earlier one.
    Undo,
    /// A reverted operation was applied again on top.
    Redo,
}

/// One committed change to a single node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeEvent<Id, M, A> {
    pub step: Step,
    /// The operation that was applied, undone or redone. The node that
    /// changed is `op.id`.
    pub op: OpMove<Id, M, A>,
    /// Its new parent and metadata, or `None` if the node was removed.
    pub node: Option<TreeNode<Id, M>>,
    /// Ancestors of the node after the change, nearest parent first.
    pub ancestors: Ancestors<Id>,
}

impl<Id: Clone + Eq + Hash, M: Clone, A: Clone> TreeEvent<Id, M, A> {
    /// Capture the current state of the node `op` touched.
    pub(crate) fn capture(step: Step, tree: &Tree<Id, M>, op: &OpMove<Id, M, A>) -> TreeEvent<Id, M, A> {
        return TreeEvent {
            step,
            op: op.clone(),
            node: tree.get(&op.id).cloned(),
            ancestors: tree.ancestors(&op.id),
        };
    }
}

/// Receives tree mutations synchronously.
pub trait TreeObserver<Id, M, A> {
    /// Set to false to skip building events entirely.
    const ENABLED: bool = true;

    fn observe(&mut self, event: TreeEvent<Id, M, A>);
}

/// The unit observer ignores everything.
impl<Id, M, A> TreeObserver<Id, M, A> for () {
    const ENABLED: bool = false;

    #[inline]
    fn observe(&mut self, _event: TreeEvent<Id, M, A>) {}
}

/// Records every event it observes.
#[derive(Clone, Debug)]
pub struct EventLog<Id, M, A> {
    pub events: Vec<TreeEvent<Id, M, A>>,
}

impl<Id, M, A> Default for EventLog<Id, M, A> {
    fn default() -> Self {
        return EventLog { events: Vec::new() };
    }
}

impl<Id, M, A> EventLog<Id, M, A> {
    pub fn new() -> EventLog<Id, M, A> {
        return EventLog::default();
    }

    /// Take the recorded events, leaving the log empty.
    pub fn drain(&mut self) -> Vec<TreeEvent<Id, M, A>> {
        return std::mem::take(&mut self.events);
    }
}

impl<Id, M, A> TreeObserver<Id, M, A> for EventLog<Id, M, A> {
    fn observe(&mut self, event: TreeEvent<Id, M, A>) {
        self.events.push(event);
    }
}
