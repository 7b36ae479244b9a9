//! Concurrent editing scenarios between two replicas.
//!
//! Each test sets up a shared tree, lets two replicas make conflicting
//! edits without seeing each other's, then exchanges operations in both
//! directions and checks that the replicas converge.

use movetree::crdt::Crdt;
use movetree::crdt::EventLog;
use movetree::crdt::OpMove;
use movetree::crdt::Replica;
use movetree::crdt::Step;
use movetree::crdt::Tree;
use movetree::crdt::TreeNode;

type Id = u32;
type FileName = &'static str;

const NULL: Id = 0;
const ROOT: Id = 1;
const A: Id = 2;
const B: Id = 3;
const C: Id = 4;
const TRASH: Id = 99;

/// Project events onto `(step, id, new parent)` for comparison.
fn moves(events: &mut EventLog<Id, FileName, &'static str>) -> Vec<(Step, Id, Option<Id>)> {
    return events
        .drain()
        .into_iter()
        .map(|e| (e.step, e.op.id, e.node.map(|n| n.parent_id)))
        .collect();
}

/// Project events onto the timestamp of the op behind each step.
fn stamps(events: &EventLog<Id, FileName, &'static str>) -> Vec<(Step, String)> {
    return events
        .events
        .iter()
        .map(|e| (e.step, e.op.timestamp.to_string()))
        .collect();
}

// =============================================================================
// Convergence
// =============================================================================

#[test]
fn concurrent_moves_converge_to_later_timestamp() {
    let mut r1: Replica<Id, FileName, &str> = Replica::new("a");
    let mut r2: Replica<Id, FileName, &str> = Replica::new("b");

    let ops = r1.op_moves([(ROOT, "root", NULL), (A, "a", ROOT), (B, "b", ROOT), (C, "c", ROOT)]).unwrap();
    r1.apply_ops(ops.clone());
    r2.apply_ops(ops);

    // Replica 1 moves /root/a to /root/b, replica 2 moves it to /root/c
    let repl1_ops = vec![r1.op_move(A, "a", B).unwrap()];
    let repl2_ops = vec![r2.op_move(A, "a", C).unwrap()];

    let mut r1_events = EventLog::new();
    let mut r2_events = EventLog::new();

    r1.apply_ops_observed(repl1_ops.clone(), &mut r1_events);
    r1.apply_ops_observed(repl2_ops.clone(), &mut r1_events);

    r2.apply_ops_observed(repl2_ops, &mut r2_events);
    r2.apply_ops_observed(repl1_ops, &mut r2_events);

    // Both ops are at counter 5, and actor b wins the tie
    assert_eq!(r1.state(), r2.state());
    assert_eq!(r1.tree().get(&A), Some(&TreeNode::new(C, "a")));

    // The undo and redo both belong to b's op, which a's op slid under
    assert_eq!(
        stamps(&r2_events),
        vec![
            (Step::Apply, "000000000000005:b".to_string()),
            (Step::Undo, "000000000000005:b".to_string()),
            (Step::Apply, "000000000000005:a".to_string()),
            (Step::Redo, "000000000000005:b".to_string()),
        ]
    );

    assert_eq!(
        moves(&mut r1_events),
        vec![(Step::Apply, A, Some(B)), (Step::Apply, A, Some(C))]
    );
    assert_eq!(
        moves(&mut r2_events),
        vec![
            (Step::Apply, A, Some(C)),
            // Undo: /root/c/a goes back to /root/a
            (Step::Undo, A, Some(ROOT)),
            (Step::Apply, A, Some(B)),
            (Step::Redo, A, Some(C)),
        ]
    );
}

#[test]
fn concurrent_moves_avoid_cycles() {
    let mut r1: Replica<Id, FileName, &str> = Replica::new("a");
    let mut r2: Replica<Id, FileName, &str> = Replica::new("b");

    let ops = r1.op_moves([(ROOT, "root", NULL), (A, "a", ROOT), (B, "b", ROOT), (C, "c", A)]).unwrap();
    r1.apply_ops(ops.clone());
    r2.apply_ops(ops);

    let mut r1_events = EventLog::new();
    let mut r2_events = EventLog::new();

    // Replica 1 moves /root/b under a while replica 2 moves /root/a under b
    let repl1_ops = vec![r1.op_move(B, "b", A).unwrap()];
    let repl2_ops = vec![r2.op_move(A, "a", B).unwrap()];

    r1.apply_ops_observed(repl1_ops.clone(), &mut r1_events);
    r1.apply_ops_observed(repl2_ops.clone(), &mut r1_events);

    r2.apply_ops_observed(repl2_ops, &mut r2_events);
    r2.apply_ops_observed(repl1_ops, &mut r2_events);

    // Replica 2's op is later, but it would form a cycle and is skipped
    assert_eq!(r1.state(), r2.state());
    assert_eq!(r1.tree().get(&B), Some(&TreeNode::new(A, "b")));
    assert_eq!(r1.tree().get(&A), Some(&TreeNode::new(ROOT, "a")));
    for id in [ROOT, A, B, C] {
        assert!(!r1.tree().is_ancestor(&id, &id));
    }

    assert_eq!(moves(&mut r1_events), vec![(Step::Apply, B, Some(A))]);
    assert_eq!(
        moves(&mut r2_events),
        vec![
            (Step::Apply, A, Some(B)),
            (Step::Undo, A, Some(ROOT)),
            (Step::Apply, B, Some(A)),
        ]
    );
}

#[test]
fn event_carries_ancestor_chain() {
    let mut replica: Replica<Id, FileName, &str> = Replica::new("a");
    let ops = replica.op_moves([(ROOT, "root", NULL), (A, "a", ROOT), (B, "b", A)]).unwrap();
    replica.apply_ops(ops);

    let mut events = EventLog::new();
    let op = replica.op_move(C, "c", B).unwrap();
    let op_sent = op.clone();
    replica.apply_op_observed(op, &mut events);

    let event = &events.events[0];
    assert_eq!(event.op, op_sent);
    assert_eq!(event.op.id, C);
    assert_eq!(event.ancestors.as_slice(), &[B, A, ROOT, NULL]);
}

#[test]
fn undoing_a_create_reports_removal() {
    let mut replica: Replica<Id, FileName, &str> = Replica::new("b");
    replica.apply_op(OpMove::new(A, movetree::crdt::Clock::with_counter("b", 2), "a", ROOT));

    let mut events = EventLog::new();
    replica.apply_op_observed(
        OpMove::new(B, movetree::crdt::Clock::with_counter("a", 1), "b", ROOT),
        &mut events,
    );

    let steps: Vec<(Step, Id, bool)> = events
        .drain()
        .into_iter()
        .map(|e| (e.step, e.op.id, e.node.is_some()))
        .collect();
    assert_eq!(
        steps,
        vec![(Step::Undo, A, false), (Step::Apply, B, true), (Step::Redo, A, true)]
    );
}

#[test]
fn delete_by_moving_to_trash() {
    let mut r1: Replica<Id, FileName, &str> = Replica::new("a");
    let mut r2: Replica<Id, FileName, &str> = Replica::new("b");

    let ops = r1.op_moves([(ROOT, "root", NULL), (A, "a", ROOT), (B, "b", A)]).unwrap();
    r1.apply_ops(ops.clone());
    r2.apply_ops(ops);

    // r1 deletes a while r2 renames its child b
    let delete = r1.op_move(A, "a", TRASH).unwrap();
    let rename = r2.op_move(B, "b2", A).unwrap();
    r1.apply_op(delete.clone());
    r2.apply_op(rename.clone());
    r1.apply_op(rename);
    r2.apply_op(delete);

    assert_eq!(r1.state(), r2.state());
    // The renamed child moves to the trash along with its parent
    assert!(r1.tree().is_ancestor(&B, &TRASH));
    assert_eq!(r1.tree().get(&B), Some(&TreeNode::new(A, "b2")));
}

#[test]
fn merge_in_either_direction() {
    let mut r1: Replica<Id, FileName, &str> = Replica::new("a");
    let mut r2: Replica<Id, FileName, &str> = Replica::new("b");

    let ops = r1.op_moves([(ROOT, "root", NULL), (A, "a", ROOT), (B, "b", ROOT)]).unwrap();
    r1.apply_ops(ops);
    r2.merge(&r1);

    let ops = r1.op_moves([(B, "b", A), (C, "c", B)]).unwrap();
    r1.apply_ops(ops);
    let ops = r2.op_moves([(A, "a", B), (C, "c2", ROOT)]).unwrap();
    r2.apply_ops(ops);

    let mut left = r1.clone();
    left.merge(&r2);
    let mut right = r2.clone();
    right.merge(&r1);

    assert_eq!(left.state(), right.state());
    // Merging again changes nothing
    let before = left.state().clone();
    left.merge(&right);
    assert_eq!(left.state(), &before);
}

// =============================================================================
// Conflict handler
// =============================================================================

/// Rejects an op if a sibling already carries the same name.
fn duplicate_name(op: &OpMove<Id, FileName, &'static str>, tree: &Tree<Id, FileName>) -> bool {
    return tree.children(&op.parent_id).any(|sibling| {
        let is_sibling = *sibling != op.id;
        let same_name = tree.get(sibling).is_some_and(|node| node.metadata == op.metadata);
        return is_sibling && same_name;
    });
}

#[test]
fn conflict_handler_rejects_duplicate_names() {
    let mut r1: Replica<Id, FileName, &str, _> = Replica::with_conflict_handler("a", duplicate_name);
    let mut r2: Replica<Id, FileName, &str, _> = Replica::with_conflict_handler("b", duplicate_name);

    let ops = r1.op_moves([(ROOT, "root", NULL), (A, "a", ROOT), (B, "b", ROOT)]).unwrap();
    r1.apply_ops(ops.clone());
    r2.apply_ops(ops);

    // Replica 1 renames /root/a to /root/b
    let repl1_ops = vec![r1.op_move(A, "b", ROOT).unwrap()];
    r1.apply_ops(repl1_ops.clone());
    r2.apply_ops(repl1_ops);

    assert_eq!(r1.state(), r2.state());
    assert_eq!(r1.tree().get(&A).map(|n| n.metadata), Some("a"));
}

#[test]
fn conflict_verdict_is_recomputed_on_redo() {
    let mut r1: Replica<Id, FileName, &str, _> = Replica::with_conflict_handler("a", duplicate_name);
    let mut r2: Replica<Id, FileName, &str, _> = Replica::with_conflict_handler("b", duplicate_name);

    let ops = r1.op_moves([(ROOT, "root", NULL), (A, "a", ROOT), (B, "b", ROOT)]).unwrap();
    r1.apply_ops(ops.clone());
    r2.apply_ops(ops);

    // r1 renames b to "x" at (4, a), r2 renames a to "x" at (4, b)
    let rename_b = r1.op_move(B, "x", ROOT).unwrap();
    let rename_a = r2.op_move(A, "x", ROOT).unwrap();
    r1.apply_op(rename_b.clone());
    r2.apply_op(rename_a.clone());

    // On r2, rename_a was accepted first, then is redone after rename_b
    // and rejected because b already took the name
    r1.apply_op(rename_a);
    r2.apply_op(rename_b);

    assert_eq!(r1.state(), r2.state());
    assert_eq!(r2.tree().get(&B).map(|n| n.metadata), Some("x"));
    assert_eq!(r2.tree().get(&A).map(|n| n.metadata), Some("a"));
}
