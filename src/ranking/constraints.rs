//! Feasibility and constraint-violation scores.

/// `true` iff every constraint is at or below its threshold.
///
/// Constraints without a threshold are compared against `0`.
pub fn is_feasible(constraints: &[f64], thresholds: &[f64]) -> bool {
    constraints
        .iter()
        .enumerate()
        .all(|(k, c)| *c <= threshold(thresholds, k))
}

/// Normalised violation score of every item, relative to the others.
///
/// For each constraint, an item's excess over the threshold is divided by
/// the largest excess any item shows for that constraint. The normalised
/// excesses are summed and divided by the number of constraints. A
/// constraint nobody violates contributes nothing. Feasible items score 0.
///
/// ```
/// use u_moea::ranking::violation_scores;
///
/// let scores = violation_scores(&[vec![3.0], vec![1.0], vec![2.0]], &[0.0]);
/// assert!((scores[0] - 1.0).abs() < 1e-12);
/// assert!(scores[1] < scores[2] && scores[2] < scores[0]);
/// ```
pub fn violation_scores(constraints: &[Vec<f64>], thresholds: &[f64]) -> Vec<f64> {
    let k_count = constraints.iter().map(Vec::len).max().unwrap_or(0);
    if k_count == 0 {
        return vec![0.0; constraints.len()];
    }

    let excess = |c: &[f64], k: usize| -> f64 {
        c.get(k)
            .map_or(0.0, |v| (v - threshold(thresholds, k)).max(0.0))
    };

    let max_excess: Vec<f64> = (0..k_count)
        .map(|k| {
            constraints
                .iter()
                .map(|c| excess(c, k))
                .fold(0.0, f64::max)
        })
        .collect();

    constraints
        .iter()
        .map(|c| {
            let total: f64 = max_excess
                .iter()
                .enumerate()
                .filter(|(_, m)| **m > 0.0)
                .map(|(k, m)| excess(c, k) / m)
                .sum();
            total / k_count as f64
        })
        .collect()
}

fn threshold(thresholds: &[f64], k: usize) -> f64 {
    thresholds.get(k).copied().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feasibility() {
        assert!(is_feasible(&[0.0, -1.0], &[0.0, 0.0]));
        assert!(!is_feasible(&[0.1, -1.0], &[0.0, 0.0]));
        assert!(is_feasible(&[0.5], &[1.0]));
        assert!(is_feasible(&[], &[]));
    }

    #[test]
    fn test_scores_normalise_per_constraint() {
        // constraint 0 excesses: 2, 1 ; constraint 1 excesses: 0, 10
        let c = vec![vec![2.0, 0.0], vec![1.0, 10.0]];
        let s = violation_scores(&c, &[0.0, 0.0]);
        assert!((s[0] - 0.5).abs() < 1e-12);
        assert!((s[1] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_unviolated_constraint_contributes_nothing() {
        let c = vec![vec![1.0, -5.0], vec![2.0, -3.0]];
        let s = violation_scores(&c, &[0.0, 0.0]);
        assert!((s[0] - 0.25).abs() < 1e-12);
        assert!((s[1] - 0.5).abs() < 1e-12);
        assert!(s.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_thresholds_shift_excess() {
        let c = vec![vec![3.0], vec![5.0]];
        let s = violation_scores(&c, &[2.0]);
        assert!((s[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((s[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_constraints() {
        assert_eq!(violation_scores(&[vec![], vec![]], &[]), vec![0.0, 0.0]);
    }
}
