//! Run-wide state shared by operators: evaluation budget and the
//! ideal / anti-ideal bookkeeping.

/// Counts objective-function evaluations against an optional limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Budget {
    used: usize,
    limit: Option<usize>,
}

impl Budget {
    pub fn new(limit: Option<usize>) -> Self {
        Self { used: 0, limit }
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Evaluations left, or `None` when unlimited.
    pub fn remaining(&self) -> Option<usize> {
        self.limit.map(|l| l.saturating_sub(self.used))
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == Some(0)
    }

    pub fn consume(&mut self, n: usize) {
        self.used = self.used.saturating_add(n);
    }
}

/// Best and worst objective values seen so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bookkeeping {
    ideal: Vec<f64>,
    anti_ideal: Vec<f64>,
}

impl Bookkeeping {
    pub fn ideal(&self) -> &[f64] {
        &self.ideal
    }

    pub fn anti_ideal(&self) -> &[f64] {
        &self.anti_ideal
    }

    /// Widens the ideal and anti-ideal vectors to cover `objectives`.
    ///
    /// Non-finite values are ignored.
    pub fn update(&mut self, objectives: &[f64]) {
        if self.ideal.len() < objectives.len() {
            self.ideal.resize(objectives.len(), f64::INFINITY);
            self.anti_ideal.resize(objectives.len(), f64::NEG_INFINITY);
        }
        for (i, &v) in objectives.iter().enumerate() {
            if !v.is_finite() {
                continue;
            }
            self.ideal[i] = self.ideal[i].min(v);
            self.anti_ideal[i] = self.anti_ideal[i].max(v);
        }
    }

    /// Maps `objectives` onto `[0, 1]` using the current bounds.
    ///
    /// Components with no spread, or no bound yet, are shifted by the ideal
    /// only (or returned unchanged).
    pub fn normalise(&self, objectives: &[f64]) -> Vec<f64> {
        objectives
            .iter()
            .enumerate()
            .map(|(i, &v)| match (self.ideal.get(i), self.anti_ideal.get(i)) {
                (Some(&lo), Some(&hi)) if lo.is_finite() && hi.is_finite() => {
                    let range = hi - lo;
                    if range > 0.0 {
                        (v - lo) / range
                    } else {
                        v - lo
                    }
                }
                _ => v,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_accounting() {
        let mut b = Budget::new(Some(10));
        assert_eq!(b.remaining(), Some(10));
        b.consume(7);
        assert_eq!(b.remaining(), Some(3));
        b.consume(5);
        assert_eq!(b.remaining(), Some(0));
        assert!(b.is_exhausted());
        assert_eq!(b.used(), 12);
    }

    #[test]
    fn test_unlimited_budget() {
        let mut b = Budget::new(None);
        b.consume(1_000);
        assert_eq!(b.remaining(), None);
        assert!(!b.is_exhausted());
    }

    #[test]
    fn test_bookkeeping_bounds() {
        let mut k = Bookkeeping::default();
        k.update(&[1.0, 5.0]);
        k.update(&[3.0, 2.0]);
        k.update(&[f64::INFINITY, 1.0]);
        assert_eq!(k.ideal(), &[1.0, 1.0]);
        assert_eq!(k.anti_ideal(), &[3.0, 5.0]);
    }

    #[test]
    fn test_normalise() {
        let mut k = Bookkeeping::default();
        k.update(&[0.0, 2.0]);
        k.update(&[4.0, 2.0]);
        let n = k.normalise(&[2.0, 3.0]);
        assert!((n[0] - 0.5).abs() < 1e-12);
        assert!((n[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_normalise_without_bounds_is_identity() {
        let k = Bookkeeping::default();
        assert_eq!(k.normalise(&[2.0, 3.0]), vec![2.0, 3.0]);
    }
}
