//! Crowding distance (Deb et al., 2002).
//!
//! Measures how isolated each member of a front is in objective space.
//! Used by NSGA-II elite selection to break ties inside the last front
//! that only partially fits.

use std::cmp::Ordering;

/// Crowding distance of each objective vector.
///
/// Extreme members on any objective get `f64::INFINITY`. Interior members
/// accumulate the normalised gap between their neighbours per objective.
/// Fronts of two or fewer members are all extreme.
///
/// ```
/// use u_moea::ranking::crowding_distance;
///
/// let d = crowding_distance(&[vec![1.0, 5.0], vec![3.0, 3.0], vec![5.0, 1.0]]);
/// assert!(d[0].is_infinite() && d[2].is_infinite());
/// assert!((d[1] - 2.0).abs() < 1e-12);
/// ```
pub fn crowding_distance(objectives: &[Vec<f64>]) -> Vec<f64> {
    let n = objectives.len();
    if n <= 2 {
        return vec![f64::INFINITY; n];
    }

    let m = objectives.iter().map(Vec::len).min().unwrap_or(0);
    let mut distances = vec![0.0f64; n];
    let mut order: Vec<usize> = (0..n).collect();

    for obj in 0..m {
        order.sort_by(|&a, &b| objectives[a][obj].total_cmp(&objectives[b][obj]));

        let first = order[0];
        let last = order[n - 1];
        distances[first] = f64::INFINITY;
        distances[last] = f64::INFINITY;

        let span = objectives[last][obj] - objectives[first][obj];
        if span <= 0.0 {
            continue;
        }
        for w in order.windows(3) {
            let gap = objectives[w[2]][obj] - objectives[w[0]][obj];
            distances[w[1]] += gap / span;
        }
    }

    distances
}

/// Indices ordered by decreasing crowding distance; ties keep index order.
pub fn crowding_order(objectives: &[Vec<f64>]) -> Vec<usize> {
    let d = crowding_distance(objectives);
    let mut idx: Vec<usize> = (0..objectives.len()).collect();
    idx.sort_by(|&a, &b| d[b].partial_cmp(&d[a]).unwrap_or(Ordering::Equal));
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_fronts_are_extreme() {
        assert!(crowding_distance(&[]).is_empty());
        assert!(crowding_distance(&[vec![1.0, 2.0]])[0].is_infinite());
        let d = crowding_distance(&[vec![1.0, 3.0], vec![3.0, 1.0]]);
        assert!(d.iter().all(|v| v.is_infinite()));
    }

    #[test]
    fn test_evenly_spaced_interior_equal() {
        let objs: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64, 4.0 - i as f64]).collect();
        let d = crowding_distance(&objs);
        assert!(d[0].is_infinite() && d[4].is_infinite());
        assert!((d[1] - d[2]).abs() < 1e-12);
        assert!((d[2] - d[3]).abs() < 1e-12);
        assert!((d[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_objective_is_skipped() {
        let objs = vec![vec![0.0, 1.0], vec![1.0, 1.0], vec![2.0, 1.0]];
        let d = crowding_distance(&objs);
        assert!((d[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_order_prefers_isolated() {
        let objs = vec![
            vec![0.0, 10.0],
            vec![1.0, 9.0],
            vec![1.1, 8.9],
            vec![5.0, 5.0],
            vec![10.0, 0.0],
        ];
        let order = crowding_order(&objs);
        assert_eq!(&order[..2], &[0, 4]);
        assert_eq!(order[2], 3);
    }
}
