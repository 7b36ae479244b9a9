//! Logical clocks for totally ordering tree operations.
//!
//! # Lamport Clock
//!
//! Each replica owns a `Clock` bound to its actor identifier. The counter
//! increases on every local operation and is merged with every remote
//! timestamp observed, so a replica never issues a timestamp that another
//! replica has already used.
//!
//! A clock value doubles as the timestamp of an operation. Timestamps are
//! totally ordered: the higher counter wins, and equal counters are broken
//! by the actor identifier. The log insertion in `State` relies on this
//! exact order, so replicas exchanging operations must agree on it.
//!
//! Complexity:
//! - tick: O(1)
//! - inc: O(1)
//! - merge: O(1)
//! - compare: O(1) plus one actor comparison on ties

use std::cmp::Ordering;
use std::error::Error;
use std::fmt;
use std::str::FromStr;

/// A Lamport clock paired with the actor that owns it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Clock<A> {
    /// The replica this clock belongs to.
    pub actor: A,
    /// Logical time, starting at 0 for a fresh clock.
    pub counter: u64,
}

/// The timestamp of an operation is the clock value it was minted with.
pub type Timestamp<A> = Clock<A>;

impl<A> Clock<A> {
    /// Create a new clock for `actor`, starting at 0.
    pub fn new(actor: A) -> Clock<A> {
        return Clock { actor, counter: 0 };
    }

    /// Create a clock with a specific starting counter.
    pub fn with_counter(actor: A, counter: u64) -> Clock<A> {
        return Clock { actor, counter };
    }
}

impl<A: Clone> Clock<A> {
    /// Increment the clock and return the new value.
    ///
    /// Fails once the counter has reached `u64::MAX`, leaving the clock
    /// unchanged. Wrapping around would mint a timestamp older than every
    /// logged operation.
    #[inline]
    pub fn tick(&mut self) -> Result<Clock<A>, ClockOverflow> {
        self.counter = self.counter.checked_add(1).ok_or(ClockOverflow)?;
        return Ok(self.clone());
    }

    /// The value `tick` would return, without advancing the clock.
    #[inline]
    pub fn inc(&self) -> Result<Clock<A>, ClockOverflow> {
        return Ok(Clock {
            actor: self.actor.clone(),
            counter: self.counter.checked_add(1).ok_or(ClockOverflow)?,
        });
    }

    /// A clock for the same actor whose counter is the larger of the two.
    #[inline]
    pub fn merge(&self, other: &Clock<A>) -> Clock<A> {
        return Clock {
            actor: self.actor.clone(),
            counter: self.counter.max(other.counter),
        };
    }
}

impl<A: Ord> PartialOrd for Clock<A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl<A: Ord> Ord for Clock<A> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Counter first, actor breaks ties
        return self
            .counter
            .cmp(&other.counter)
            .then_with(|| self.actor.cmp(&other.actor));
    }
}

/// Error returned when a clock has no counter values left to mint.
///
/// Reached after applying an operation stamped with `u64::MAX`. The clock
/// can still merge and compare, it just cannot issue new timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockOverflow;

impl fmt::Display for ClockOverflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str("clock counter exhausted");
    }
}

impl Error for ClockOverflow {}

/// Width of the zero-padded counter in the textual form.
const COUNTER_WIDTH: usize = 15;

/// Renders as `<counter padded to 15 digits>:<actor>`, e.g. `000000000000042:alice`.
impl<A: fmt::Display> fmt::Display for Clock<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{:0width$}:{}", self.counter, self.actor, width = COUNTER_WIDTH);
    }
}

/// Error returned when parsing the textual form of a clock fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseClockError {
    /// There is no `:` between the counter and the actor.
    MissingSeparator,
    /// The counter is not a valid unsigned integer.
    InvalidCounter,
    /// The actor could not be parsed.
    InvalidActor,
}

impl fmt::Display for ParseClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            ParseClockError::MissingSeparator => "missing ':' between counter and actor",
            ParseClockError::InvalidCounter => "counter is not an unsigned integer",
            ParseClockError::InvalidActor => "actor could not be parsed",
        };
        return f.write_str(message);
    }
}

impl Error for ParseClockError {}

impl<A: FromStr> FromStr for Clock<A> {
    type Err = ParseClockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (counter, actor) = s.split_once(':').ok_or(ParseClockError::MissingSeparator)?;
        let counter = counter
            .parse::<u64>()
            .map_err(|_| ParseClockError::InvalidCounter)?;
        let actor = actor.parse::<A>().map_err(|_| ParseClockError::InvalidActor)?;
        return Ok(Clock { actor, counter });
    }
}
