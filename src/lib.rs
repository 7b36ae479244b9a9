//! Movetree - a replicated tree using the move operation CRDT.
//!
//! # Quick Start
//!
//! ```
//! use movetree::crdt::Crdt;
//! use movetree::crdt::Replica;
//!
//! // Each replica is identified by its actor
//! let mut alice: Replica<&str, &str, &str> = Replica::new("alice");
//! let mut bob: Replica<&str, &str, &str> = Replica::new("bob");
//!
//! // Create a small tree on alice's side
//! let ops = alice.op_moves([("root", "root", "none"), ("docs", "docs", "root"), ("pics", "pics", "root")]).unwrap();
//! alice.apply_ops(ops);
//! bob.merge(&alice);
//!
//! // Concurrently move docs under pics, and pics under docs
//! let a = alice.op_move("docs", "docs", "pics").unwrap();
//! let b = bob.op_move("pics", "pics", "docs").unwrap();
//! alice.apply_op(a.clone());
//! bob.apply_op(b.clone());
//!
//! // Exchange operations: both replicas converge without a cycle
//! alice.apply_op(b);
//! bob.apply_op(a);
//! assert_eq!(alice.state(), bob.state());
//! assert!(bob.tree().is_ancestor(&"docs", &"pics"));
//! assert!(!bob.tree().is_ancestor(&"pics", &"docs"));
//! ```

pub mod crdt;
