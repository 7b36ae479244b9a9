//! A tree CRDT replica bound to one actor.
//!
//! `Replica` owns a `State`, a Lamport clock for minting operations, and
//! the latest timestamp seen from every actor. The latter is what a caller
//! needs to work out causal stability before truncating the log; the
//! replica itself never truncates.

use std::collections::hash_map::Entry;
use std::hash::Hash;

use rustc_hash::FxHashMap;
use tracing::debug;

use super::Crdt;
use super::observer::TreeObserver;
use super::op::OpMove;
use super::primitives::Clock;
use super::primitives::ClockOverflow;
use super::primitives::Timestamp;
use super::state::ConflictHandler;
use super::state::NoConflict;
use super::state::State;
use super::tree::Tree;

#[derive(Clone, Debug)]
pub struct Replica<Id, M, A, H = NoConflict> {
    state: State<Id, M, A, H>,
    /// Local clock, merged with every timestamp applied.
    time: Clock<A>,
    /// Latest timestamp applied from each actor.
    latest_time_by_replica: FxHashMap<A, Timestamp<A>>,
}

impl<Id, M, A> Replica<Id, M, A> {
    /// Create an empty replica for `actor`.
    pub fn new(actor: A) -> Replica<Id, M, A> {
        return Replica::with_conflict_handler(actor, NoConflict);
    }
}

impl<Id, M, A, H> Replica<Id, M, A, H> {
    /// Create an empty replica for `actor` whose state consults
    /// `conflict_handler` before every application.
    pub fn with_conflict_handler(actor: A, conflict_handler: H) -> Replica<Id, M, A, H> {
        return Replica {
            state: State::with_conflict_handler(conflict_handler),
            time: Clock::new(actor),
            latest_time_by_replica: FxHashMap::default(),
        };
    }

    #[inline]
    pub fn state(&self) -> &State<Id, M, A, H> {
        return &self.state;
    }

    #[inline]
    pub fn tree(&self) -> &Tree<Id, M> {
        return self.state.tree();
    }

    /// The current value of the local clock.
    #[inline]
    pub fn time(&self) -> &Clock<A> {
        return &self.time;
    }

    #[inline]
    pub fn actor(&self) -> &A {
        return &self.time.actor;
    }

    /// Latest timestamp applied from each actor, this one included.
    #[inline]
    pub fn latest_time_by_replica(&self) -> &FxHashMap<A, Timestamp<A>> {
        return &self.latest_time_by_replica;
    }
}

impl<Id, M, A: Eq + Hash, H> Replica<Id, M, A, H> {
    pub fn latest_time(&self, actor: &A) -> Option<&Timestamp<A>> {
        return self.latest_time_by_replica.get(actor);
    }
}

impl<Id, M, A: Ord, H> Replica<Id, M, A, H> {
    /// The oldest of the latest timestamps seen per actor.
    ///
    /// Once every actor that can still send operations is tracked, no
    /// operation at or below this timestamp can arrive anymore, so log
    /// entries older than it are causally stable. Returns `None` before
    /// anything has been applied.
    pub fn causally_stable_threshold(&self) -> Option<&Timestamp<A>> {
        return self.latest_time_by_replica.values().min();
    }
}

impl<Id, M, A, H> Replica<Id, M, A, H>
where
    Id: Clone + Eq + Hash,
    M: Clone + PartialEq,
    A: Clone + Ord + Hash,
    H: ConflictHandler<Id, M, A>,
{
    /// Mint one operation stamped with the next clock value.
    ///
    /// The clock is not advanced until the operation is applied, so
    /// several operations minted this way share a timestamp and only the
    /// first one applied takes effect. Use `op_moves` for batches.
    ///
    /// Fails once the clock has caught up with a timestamp at `u64::MAX`.
    pub fn op_move(&self, id: Id, metadata: M, parent_id: Id) -> Result<OpMove<Id, M, A>, ClockOverflow> {
        return Ok(OpMove::new(id, self.time.inc()?, metadata, parent_id));
    }

    /// Mint a batch of `(id, metadata, parent_id)` operations with strictly
    /// increasing timestamps, advancing the clock for each.
    ///
    /// If the clock runs out partway, no operations are returned and the
    /// clock is left at `u64::MAX`.
    pub fn op_moves<I>(&mut self, ops: I) -> Result<Vec<OpMove<Id, M, A>>, ClockOverflow>
    where
        I: IntoIterator<Item = (Id, M, Id)>,
    {
        return ops
            .into_iter()
            .map(|(id, metadata, parent_id)| {
                return Ok(OpMove::new(id, self.time.tick()?, metadata, parent_id));
            })
            .collect();
    }

    /// Apply a local or remote operation.
    pub fn apply_op(&mut self, op: OpMove<Id, M, A>) {
        self.apply_op_observed(op, &mut ());
    }

    pub fn apply_op_observed<O: TreeObserver<Id, M, A>>(&mut self, op: OpMove<Id, M, A>, observer: &mut O) {
        self.time = self.time.merge(&op.timestamp);

        match self.latest_time_by_replica.entry(op.timestamp.actor.clone()) {
            Entry::Occupied(mut latest) => {
                if op.timestamp > *latest.get() {
                    latest.insert(op.timestamp.clone());
                } else {
                    // Out of the sender's own order; still valid to apply
                    debug!(
                        latest = latest.get().counter,
                        provided = op.timestamp.counter,
                        "clock not increased for actor"
                    );
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(op.timestamp.clone());
            }
        }

        self.state.apply_op_observed(op, observer);
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
}

impl<Id, M, A, H> Crdt for Replica<Id, M, A, H>
where
    Id: Clone + Eq + Hash,
    M: Clone + PartialEq,
    A: Clone + Ord + Hash,
    H: ConflictHandler<Id, M, A>,
{
    /// Apply every operation `other` has applied, in timestamp order.
    fn merge(&mut self, other: &Self) {
        for entry in other.state.log().rev() {
            self.apply_op(entry.op.clone());
        }
    }
}
