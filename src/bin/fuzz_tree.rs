//! AFL fuzz harness for the tree CRDT
//!
//! This harness tests the critical CRDT properties:
//! 1. Convergence: replicas that see the same operations converge to the same state
//! 2. Acyclicity: no node ever becomes its own ancestor
//! 3. Merge idempotency: merging the same thing twice is a no-op
//!
//! Model: Each user has their own replica. They move nodes locally and
//! periodically broadcast their state to other users.

use afl::fuzz;
use movetree::crdt::Crdt;
use movetree::crdt::Replica;
use movetree::crdt::Tree;

const NUM_USERS: usize = 3;
const NUM_NODES: u8 = 16;
const TRASH: u8 = u8::MAX;

type FuzzReplica = Replica<u8, u8, u8>;

/// Operation types the fuzzer can generate
#[derive(Debug, Clone, Copy)]
enum FuzzOp {
    /// User moves (or creates) a node under a parent
    Move { user: u8, id: u8, parent_id: u8, name: u8 },
    /// User deletes a node by moving it to the trash
    Delete { user: u8, id: u8 },
    /// User A receives broadcast from user B (merges B into A)
    Broadcast { from: u8, to: u8 },
    /// All users sync (full mesh broadcast)
    FullSync,
}

impl FuzzOp {
    fn from_bytes(bytes: &[u8]) -> Option<(FuzzOp, &[u8])> {
        if bytes.is_empty() {
            return None;
        }

        let op_type = bytes[0] % 4;
        let rest = &bytes[1..];

        match op_type {
            0 if rest.len() >= 4 => {
                let op = FuzzOp::Move {
                    user: rest[0] % NUM_USERS as u8,
                    id: rest[1] % NUM_NODES,
                    parent_id: rest[2] % NUM_NODES,
                    name: rest[3] % 4,
                };
                Some((op, &rest[4..]))
            }
            1 if rest.len() >= 2 => {
                let op = FuzzOp::Delete {
                    user: rest[0] % NUM_USERS as u8,
                    id: rest[1] % NUM_NODES,
                };
                Some((op, &rest[2..]))
            }
            2 if rest.len() >= 2 => {
                let op = FuzzOp::Broadcast {
                    from: rest[0] % NUM_USERS as u8,
                    to: rest[1] % NUM_USERS as u8,
                };
                Some((op, &rest[2..]))
            }
            3 => Some((FuzzOp::FullSync, rest)),
            _ => None,
        }
    }
}

fn assert_acyclic(tree: &Tree<u8, u8>) {
    for (id, _) in tree.iter() {
        assert!(!tree.is_ancestor(id, id), "Cycle through node {}", id);
    }
}

fn full_sync(replicas: &mut [FuzzReplica]) {
    for i in 0..replicas.len() {
        for j in 0..replicas.len() {
            if i != j {
                let source = replicas[j].clone();
                replicas[i].merge(&source);
            }
        }
    }
}

fn main() {
    fuzz!(|data: &[u8]| {
        // Each user has their own replica
        let mut replicas: Vec<FuzzReplica> = (0..NUM_USERS as u8).map(Replica::new).collect();
        let mut remaining = data;

        // Parse and execute operations
        while let Some((op, rest)) = FuzzOp::from_bytes(remaining) {
            remaining = rest;

            match op {
                FuzzOp::Move { user, id, parent_id, name } => {
                    let r = &mut replicas[user as usize];
                    if let Ok(op) = r.op_move(id, name, parent_id) {
                        r.apply_op(op);
                    }
                    assert_acyclic(r.tree());
                }

                FuzzOp::Delete { user, id } => {
                    let r = &mut replicas[user as usize];
                    let name = r.tree().get(&id).map(|n| n.metadata).unwrap_or(0);
                    if let Ok(op) = r.op_move(id, name, TRASH) {
                        r.apply_op(op);
                    }
                }

                FuzzOp::Broadcast { from, to } => {
                    if from != to {
                        let source = replicas[from as usize].clone();
                        replicas[to as usize].merge(&source);
                        assert_acyclic(replicas[to as usize].tree());
                    }
                }

                FuzzOp::FullSync => {
                    full_sync(&mut replicas);

                    // CRITICAL INVARIANT: All replicas must converge!
                    for (i, r) in replicas.iter().enumerate().skip(1) {
                        assert_eq!(
                            r.state(), replicas[0].state(),
                            "Convergence failure! User {} != User 0 after full sync",
                            i
                        );
                    }
                }
            }
        }

        // Final full sync and convergence check
        full_sync(&mut replicas);
        for (i, r) in replicas.iter().enumerate().skip(1) {
            assert_eq!(
                r.state(), replicas[0].state(),
                "Final convergence failure! User {} != User 0",
                i
            );
        }

        // Merging again must not change anything
        let before = replicas[0].state().clone();
        let source = replicas[1].clone();
        replicas[0].merge(&source);
        assert_eq!(replicas[0].state(), &before, "Merge is not idempotent");

        for r in &replicas {
            assert_acyclic(r.tree());
        }
    });
}
