//! A replicated tree CRDT built on a single move operation.
//!
//! Replicas create, rename, move, and delete nodes concurrently and
//! without coordination. Once two replicas have applied the same set of
//! operations they hold the same tree, whatever order the operations
//! arrived in, and the tree never contains a cycle.
//!
//! The algorithm follows "A highly-available move operation for replicated
//! trees" by Kleppmann et al.

pub mod observer;
pub mod op;
pub mod primitives;
pub mod replica;
pub mod state;
pub mod tree;

pub use observer::EventLog;
pub use observer::Step;
pub use observer::TreeEvent;
pub use observer::TreeObserver;
pub use op::LogEntry;
pub use op::OpMove;
pub use primitives::Clock;
pub use primitives::ClockOverflow;
pub use primitives::Timestamp;
pub use replica::Replica;
pub use state::ConflictHandler;
pub use state::NoConflict;
pub use state::State;
pub use tree::Tree;
pub use tree::TreeNode;

/// A CRDT is a data type with a merge operator that is commutative,
/// associative, and idempotent.
pub trait Crdt {
    /// Merge another instance into this one.
    fn merge(&mut self, other: &Self);
}
