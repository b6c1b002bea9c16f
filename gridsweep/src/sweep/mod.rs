//! Two-phase network traversal
//!
//! 1. [`energization`]: one depth-first sweep per circuit from its breaker,
//!    building the protection hierarchy and collecting open tie candidates.
//! 2. [`ring`]: once every circuit is swept, a search behind each tie
//!    candidate for the equipment it would connect to if closed.
//!
//! [`aggregate`] then merges the per-circuit buffers into flat tables.

pub mod aggregate;
pub mod energization;
pub mod ring;

pub use aggregate::aggregate;
pub use energization::{sweep_circuit, CircuitSweep, SweepError, TieCandidate};
pub use ring::{
    annotate_ring_closures, search_ring_closure, EnergizedIndex, RingPassStats, RingSearch,
    DEFAULT_MAX_RING_STEPS,
};
