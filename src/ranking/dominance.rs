//! Pareto dominance relations (minimisation).
//!
//! All relations return a tri-state [`Dominance`] describing `a` relative
//! to `b`. Vectors of different length are always
//! [`Dominance::Incomparable`].

/// Result of comparing `a` against `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dominance {
    /// `a` dominates `b`.
    Dominates,
    /// `b` dominates `a`.
    Dominated,
    /// Neither dominates the other.
    Incomparable,
}

impl Dominance {
    /// The same comparison seen from `b`.
    pub fn flip(self) -> Self {
        match self {
            Dominance::Dominates => Dominance::Dominated,
            Dominance::Dominated => Dominance::Dominates,
            Dominance::Incomparable => Dominance::Incomparable,
        }
    }
}

/// Which dominance relation a ranking uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DominanceRelation {
    /// No worse everywhere and strictly better somewhere.
    #[default]
    Weak,
    /// Strictly better in every component.
    Strong,
}

impl DominanceRelation {
    pub fn compare(&self, a: &[f64], b: &[f64]) -> Dominance {
        match self {
            DominanceRelation::Weak => weak_dominance(a, b),
            DominanceRelation::Strong => strong_dominance(a, b),
        }
    }
}

/// Weak (standard Pareto) dominance.
///
/// `a` dominates `b` iff `a[i] <= b[i]` for every `i` and `a != b`.
///
/// ```
/// use u_moea::ranking::{weak_dominance, Dominance};
///
/// assert_eq!(weak_dominance(&[1.0, 2.0], &[1.0, 3.0]), Dominance::Dominates);
/// assert_eq!(weak_dominance(&[1.0, 4.0], &[2.0, 2.0]), Dominance::Incomparable);
/// ```
pub fn weak_dominance(a: &[f64], b: &[f64]) -> Dominance {
    epsilon_dominance(a, b, 0.0)
}

/// Strong dominance: strictly better in every component.
///
/// Any tied component makes the pair incomparable.
pub fn strong_dominance(a: &[f64], b: &[f64]) -> Dominance {
    if a.len() != b.len() || a.is_empty() {
        return Dominance::Incomparable;
    }
    if a.iter().zip(b).all(|(x, y)| x < y) {
        Dominance::Dominates
    } else if a.iter().zip(b).all(|(x, y)| y < x) {
        Dominance::Dominated
    } else {
        Dominance::Incomparable
    }
}

/// Weak dominance where differences of at most `epsilon` count as ties.
pub fn epsilon_dominance(a: &[f64], b: &[f64], epsilon: f64) -> Dominance {
    if a.len() != b.len() {
        return Dominance::Incomparable;
    }

    let mut a_better = false;
    let mut b_better = false;
    for (&va, &vb) in a.iter().zip(b) {
        if va + epsilon < vb {
            if b_better {
                return Dominance::Incomparable;
            }
            a_better = true;
        } else if vb + epsilon < va {
            if a_better {
                return Dominance::Incomparable;
            }
            b_better = true;
        }
    }

    match (a_better, b_better) {
        (true, false) => Dominance::Dominates,
        (false, true) => Dominance::Dominated,
        _ => Dominance::Incomparable,
    }
}
