//! Parametric cells.
//!
//! Solutions evaluated under different external parameter values are not
//! comparable. The parameter space is cut into `bins` equal bins per
//! dimension; the bin-index tuple is folded into one integer cell id.
//! Ranking then only compares solutions in the same cell.

/// Cell id of a parameter vector already normalised to `[0, 1]`.
///
/// Values outside `[0, 1]` are clamped. A value of exactly `1` falls in the
/// last bin. `bins` below 1 is treated as 1.
///
/// ```
/// use u_moea::ranking::cell_id;
///
/// assert_eq!(cell_id(&[0.1, 0.1], 4), 0);
/// assert_eq!(cell_id(&[0.3, 0.1], 4), 1);
/// assert_eq!(cell_id(&[0.1, 0.3], 4), 4);
/// assert_eq!(cell_id(&[1.0, 1.0], 4), 15);
/// ```
pub fn cell_id(normalised: &[f64], bins: usize) -> u64 {
    let bins = bins.max(1) as u64;
    normalised.iter().rev().fold(0u64, |acc, &x| {
        let bin = ((x.clamp(0.0, 1.0) * bins as f64).floor() as u64).min(bins - 1);
        acc.wrapping_mul(bins).wrapping_add(bin)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_vector_is_cell_zero() {
        assert_eq!(cell_id(&[], 5), 0);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(cell_id(&[-0.5], 3), 0);
        assert_eq!(cell_id(&[2.0], 3), 2);
    }

    #[test]
    fn test_distinct_tuples_distinct_ids() {
        let mut ids = Vec::new();
        for a in 0..3 {
            for b in 0..3 {
                ids.push(cell_id(&[a as f64 / 3.0 + 0.01, b as f64 / 3.0 + 0.01], 3));
            }
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 9);
    }

    #[test]
    fn test_zero_bins_is_single_cell() {
        assert_eq!(cell_id(&[0.2, 0.9], 0), 0);
    }
}
