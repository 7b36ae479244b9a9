//! Shared primitives for the tree CRDT.
//!
//! # Primitives
//!
//! ## Clocks
//! - `Clock`: Lamport counter bound to an actor, totally ordered
//! - `Timestamp`: the clock value an operation is stamped with

pub mod clock;

// Re-exports for convenience
pub use clock::Clock;
pub use clock::ClockOverflow;
pub use clock::ParseClockError;
pub use clock::Timestamp;
