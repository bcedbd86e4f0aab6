//! Developer capacity and allocation consistency engine.
//!
//! # Responsibility
//! - Decide admissibility of a proposed hour commitment.
//! - Derive allocation percentages and admissible-developer sets.
//!
//! # Invariants
//! - Every function is a pure computation over a caller-supplied snapshot.
//! - Orphaned commitments never contribute to capacity math.
//! - Percentages stay within `0.0..=100.0`.
//!
//! Callers that persist results must run the check and the write inside one
//! atomic storage operation; see `repo::allocation_repo`.

pub mod capacity;
