//! Goal-vector preferability.
//!
//! Objective values better than their goal are not rewarded beyond it:
//! each component is clipped to `max(value, goal)` before dominance is
//! applied. A goal component of `f64::NEG_INFINITY` leaves that objective
//! unclipped.

use super::dominance::{Dominance, DominanceRelation};

/// Clips `objectives` at `goals`.
pub fn clip_to_goals(objectives: &[f64], goals: &[f64]) -> Vec<f64> {
    objectives
        .iter()
        .enumerate()
        .map(|(i, v)| match goals.get(i) {
            Some(g) if *g != f64::NEG_INFINITY => v.max(*g),
            _ => *v,
        })
        .collect()
}

/// Dominance of `a` over `b` with respect to `goals`.
pub fn preferability(
    a: &[f64],
    b: &[f64],
    goals: &[f64],
    relation: DominanceRelation,
) -> Dominance {
    relation.compare(&clip_to_goals(a, goals), &clip_to_goals(b, goals))
}
