//! Tree CRDT state and the move operation replay algorithm.
//!
//! `State` is not tied to any actor. Two states that have applied the
//! same set of operations, in any order, hold equal trees and equal logs.
//! `Replica` wraps a state with a clock for generating operations.
//!
//! # Algorithm
//!
//! The state keeps the live tree plus a log of every applied operation,
//! sorted by timestamp. Each entry records the node's parent and metadata
//! from just before the operation, which is enough to undo it exactly.
//!
//! Applying an operation:
//! 1. Undo every logged operation with a later timestamp, newest first.
//! 2. Apply the operation, unless its timestamp is already in the log.
//! 3. Redo the undone operations, oldest first, recomputing their entries
//!    against the new tree.
//!
//! An operation whose parent is the node itself, or a descendant of it,
//! would create a cycle. It is logged but leaves the tree untouched, so
//! the tree stays acyclic no matter what order operations arrive in.
//!
//! Complexity:
//! - apply in timestamp order: O(depth)
//! - apply k positions back in the log: O(k * depth)

use std::fmt;
use std::hash::Hash;

use tracing::trace;
use tracing::warn;

use super::Crdt;
use super::observer::Step;
use super::observer::TreeEvent;
use super::observer::TreeObserver;
use super::op::LogEntry;
use super::op::OpMove;
use super::tree::Tree;

/// Vetoes operations for domain reasons, e.g. duplicate file names.
///
/// Returning true discards the operation as a logged no-op. The handler
/// runs before every application, including redo passes, and must be a
/// pure function of the operation and the tree or replicas will diverge.
pub trait ConflictHandler<Id, M, A> {
    fn is_conflict(&self, op: &OpMove<Id, M, A>, tree: &Tree<Id, M>) -> bool;
}

/// Accepts every operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoConflict;

impl<Id, M, A> ConflictHandler<Id, M, A> for NoConflict {
    #[inline]
    fn is_conflict(&self, _op: &OpMove<Id, M, A>, _tree: &Tree<Id, M>) -> bool {
        return false;
    }
}

impl<Id, M, A, F> ConflictHandler<Id, M, A> for F
where
    F: Fn(&OpMove<Id, M, A>, &Tree<Id, M>) -> bool,
{
    #[inline]
    fn is_conflict(&self, op: &OpMove<Id, M, A>, tree: &Tree<Id, M>) -> bool {
        return self(op, tree);
    }
}

/// A tree plus the log of operations that produced it.
#[derive(Clone)]
pub struct State<Id, M, A, H = NoConflict> {
    /// Applied operations in ascending timestamp order. The last entry is
    /// the head, the most recent operation.
    log: Vec<LogEntry<Id, M, A>>,
    tree: Tree<Id, M>,
    conflict_handler: H,
}

impl<Id, M, A> State<Id, M, A> {
    /// Create an empty state that accepts every operation.
    pub fn new() -> State<Id, M, A> {
        return State::with_conflict_handler(NoConflict);
    }
}

impl<Id, M, A> Default for State<Id, M, A> {
    fn default() -> Self {
        return State::new();
    }
}

impl<Id, M, A, H> State<Id, M, A, H> {
    /// Create an empty state that consults `conflict_handler` before
    /// every application.
    pub fn with_conflict_handler(conflict_handler: H) -> State<Id, M, A, H> {
        return State {
            log: Vec::new(),
            tree: Tree::new(),
            conflict_handler,
        };
    }

    #[inline]
    pub fn tree(&self) -> &Tree<Id, M> {
        return &self.tree;
    }

    /// The operation log, most recent first.
    pub fn log(&self) -> impl DoubleEndedIterator<Item = &LogEntry<Id, M, A>> + ExactSizeIterator {
        return self.log.iter().rev();
    }

    #[inline]
    pub fn log_len(&self) -> usize {
        return self.log.len();
    }

    #[inline]
    pub fn conflict_handler(&self) -> &H {
        return &self.conflict_handler;
    }
}

impl<Id, M, A, H> State<Id, M, A, H>
where
    Id: Clone + Eq + Hash,
    M: Clone + PartialEq,
    A: Clone + Ord,
    H: ConflictHandler<Id, M, A>,
{
    /// Apply an operation at its place in timestamp order.
    pub fn apply_op(&mut self, op: OpMove<Id, M, A>) {
        self.apply_op_observed(op, &mut ());
    }

    /// Apply an operation, reporting every intermediate mutation.
    pub fn apply_op_observed<O: TreeObserver<Id, M, A>>(&mut self, op: OpMove<Id, M, A>, observer: &mut O) {
        // Peel off everything newer than `op`
        let mut undone = Vec::new();
        while let Some(entry) = self.log.pop() {
            if entry.op.timestamp <= op.timestamp {
                self.log.push(entry);
                break;
            }
            undone.push(self.undo_op(entry, observer));
        }

        if !undone.is_empty() {
            trace!(undone = undone.len(), "replaying operations newer than incoming op");
        }

        let duplicate = self
            .log
            .last()
            .is_some_and(|head| head.op.timestamp == op.timestamp);
        if duplicate {
            // Timestamps must be unique, but this is not enforced
            warn!(
                counter = op.timestamp.counter,
                "op with timestamp equal to a logged op ignored, every op must have a unique timestamp"
            );
        } else {
            let entry = self.do_operation(op, Step::Apply, observer);
            self.log.push(entry);
        }

        // Oldest first
        for op in undone.into_iter().rev() {
            self.redo_op(op, observer);
        }
    }

    /// Apply each operation in the given order.
    pub fn apply_ops<I: IntoIterator<Item = OpMove<Id, M, A>>>(&mut self, ops: I) {
        self.apply_ops_observed(ops, &mut ());
    }

    pub fn apply_ops_observed<I, O>(&mut self, ops: I, observer: &mut O)
    where
        I: IntoIterator<Item = OpMove<Id, M, A>>,
        O: TreeObserver<Id, M, A>,
    {
        for op in ops {
            self.apply_op_observed(op, observer);
        }
    }

    /// Perform a move against the current tree, returning its log entry.
    pub(crate) fn do_operation<O: TreeObserver<Id, M, A>>(
        &mut self,
        op: OpMove<Id, M, A>,
        step: Step,
        observer: &mut O,
    ) -> LogEntry<Id, M, A> {
        // Capture the pre-image before anything changes
        let old_node = self.tree.get(&op.id).cloned();

        // Moving a node under itself or its own subtree would form a cycle
        if op.id == op.parent_id || self.tree.is_ancestor(&op.parent_id, &op.id) {
            return LogEntry { op, old_node };
        }

        if self.conflict_handler.is_conflict(&op, &self.tree) {
            return LogEntry { op, old_node };
        }

        self.tree.remove(&op.id);
        self.tree.add(op.id.clone(), op.parent_id.clone(), op.metadata.clone());
        if O::ENABLED {
            observer.observe(TreeEvent::capture(step, &self.tree, &op));
        }

        return LogEntry { op, old_node };
    }

    /// Restore the pre-image recorded in `entry`.
    ///
    /// Returns the undone operation so it can be redone.
    pub(crate) fn undo_op<O: TreeObserver<Id, M, A>>(
        &mut self,
        entry: LogEntry<Id, M, A>,
        observer: &mut O,
    ) -> OpMove<Id, M, A> {
        let LogEntry { op, old_node } = entry;

        let current = self.tree.remove(&op.id);
        let changed = current != old_node;
        if let Some(old) = old_node {
            self.tree.add(op.id.clone(), old.parent_id, old.metadata);
        }

        if O::ENABLED && changed {
            observer.observe(TreeEvent::capture(Step::Undo, &self.tree, &op));
        }

        return op;
    }

    /// Apply an undone operation again and log it.
    ///
    /// The new entry's pre-image may differ from the original one, since
    /// an earlier operation may have been inserted underneath it.
    pub(crate) fn redo_op<O: TreeObserver<Id, M, A>>(&mut self, op: OpMove<Id, M, A>, observer: &mut O) {
        let entry = self.do_operation(op, Step::Redo, observer);
        self.log.push(entry);
    }
}

impl<Id, M, A, H> Crdt for State<Id, M, A, H>
where
    Id: Clone + Eq + Hash,
    M: Clone + PartialEq,
    A: Clone + Ord,
    H: ConflictHandler<Id, M, A>,
{
    /// Apply every operation in `other`'s log.
    ///
    /// Operations already present are dropped by the duplicate timestamp
    /// rule, so merging is idempotent.
    fn merge(&mut self, other: &Self) {
        for entry in &other.log {
            self.apply_op(entry.op.clone());
        }
    }
}

impl<Id: Eq + Hash, M: PartialEq, A: PartialEq, H> PartialEq for State<Id, M, A, H> {
    fn eq(&self, other: &Self) -> bool {
        return self.tree == other.tree && self.log == other.log;
    }
}

impl<Id: fmt::Debug, M: fmt::Debug, A: fmt::Debug, H> fmt::Debug for State<Id, M, A, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("State")
            .field("tree", &self.tree)
            .field("log", &self.log)
            .finish_non_exhaustive();
    }
}
