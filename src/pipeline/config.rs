//! Pipeline configuration.
//!
//! [`PipelineConfig`] holds the run-wide settings shared by every node:
//! termination, the random seed and the evaluation pool size.

use crate::error::{ConfigErrorKind, PipelineError};

/// When a run stops.
///
/// At least one criterion must be set; a run is terminated as soon as any
/// set criterion is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Termination {
    /// Maximum number of iterations (generations).
    pub max_iterations: Option<u64>,
    /// Maximum number of objective-function evaluations.
    pub max_evaluations: Option<usize>,
}

impl Termination {
    pub fn iterations(n: u64) -> Self {
        Self {
            max_iterations: Some(n),
            max_evaluations: None,
        }
    }

    pub fn evaluations(n: usize) -> Self {
        Self {
            max_iterations: None,
            max_evaluations: Some(n),
        }
    }

    /// `true` once any configured limit is reached.
    ///
    /// With no limit configured this returns `true`, so an unbounded run is
    /// impossible even if validation was skipped.
    pub fn is_reached(&self, iteration: u64, used_evaluations: usize) -> bool {
        match (self.max_iterations, self.max_evaluations) {
            (None, None) => true,
            (iters, evals) => {
                iters.is_some_and(|m| iteration >= m) || evals.is_some_and(|m| used_evaluations >= m)
            }
        }
    }

    /// `true` when the budget, not the iteration limit, stopped the run.
    pub fn budget_exhausted(&self, used_evaluations: usize) -> bool {
        self.max_evaluations.is_some_and(|m| used_evaluations >= m)
    }
}

/// Run-wide pipeline settings.
///
/// # Builder Pattern
///
/// ```
/// use u_moea::pipeline::PipelineConfig;
///
/// let config = PipelineConfig::default()
///     .with_max_iterations(100)
///     .with_max_evaluations(10_000)
///     .with_seed(42)
///     .with_evaluation_threads(4);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub termination: Termination,

    /// Random seed for reproducibility. `None` uses a random seed.
    pub seed: Option<u64>,

    /// Size of the evaluation worker pool.
    ///
    /// `1` evaluates on the pipeline thread. Larger values only take effect
    /// with the `parallel` feature.
    pub evaluation_threads: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            termination: Termination::iterations(100),
            seed: None,
            evaluation_threads: 1,
        }
    }
}

impl PipelineConfig {
    pub fn with_max_iterations(mut self, n: u64) -> Self {
        self.termination.max_iterations = Some(n);
        self
    }

    pub fn with_max_evaluations(mut self, n: usize) -> Self {
        self.termination.max_evaluations = Some(n);
        self
    }

    pub fn with_termination(mut self, termination: Termination) -> Self {
        self.termination = termination;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the evaluation pool size (at least 1).
    pub fn with_evaluation_threads(mut self, n: usize) -> Self {
        self.evaluation_threads = n.max(1);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let fail = |kind| Err(PipelineError::config("PipelineConfig", kind));
        match self.termination {
            Termination {
                max_iterations: None,
                max_evaluations: None,
            } => return fail(ConfigErrorKind::NoTermination),
            Termination {
                max_iterations: Some(0),
                ..
            } => {
                return fail(ConfigErrorKind::InvalidParameter {
                    name: "max_iterations",
                    reason: "must be at least 1".into(),
                })
            }
            Termination {
                max_evaluations: Some(0),
                ..
            } => {
                return fail(ConfigErrorKind::InvalidParameter {
                    name: "max_evaluations",
                    reason: "must be at least 1".into(),
                })
            }
            _ => {}
        }
        if self.evaluation_threads == 0 {
            return fail(ConfigErrorKind::InvalidParameter {
                name: "evaluation_threads",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.termination.max_iterations, Some(100));
        assert!(config.seed.is_none());
        assert_eq!(config.evaluation_threads, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_no_termination() {
        let config = PipelineConfig::default().with_termination(Termination::default());
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Configuration {
                kind: ConfigErrorKind::NoTermination,
                ..
            })
        ));
    }

    #[test]
    fn test_validate_zero_limits() {
        assert!(PipelineConfig::default().with_max_iterations(0).validate().is_err());
        let config = PipelineConfig::default()
            .with_termination(Termination::evaluations(0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_threads_clamped() {
        assert_eq!(PipelineConfig::default().with_evaluation_threads(0).evaluation_threads, 1);
    }

    // ---- Termination ----

    #[test]
    fn test_termination_by_iterations() {
        let t = Termination::iterations(3);
        assert!(!t.is_reached(2, 1_000_000));
        assert!(t.is_reached(3, 0));
    }

    #[test]
    fn test_termination_by_budget() {
        let t = Termination::evaluations(50);
        assert!(!t.is_reached(1_000, 49));
        assert!(t.is_reached(0, 50));
        assert!(t.budget_exhausted(50));
    }

    #[test]
    fn test_termination_either_limit() {
        let t = Termination {
            max_iterations: Some(10),
            max_evaluations: Some(100),
        };
        assert!(t.is_reached(10, 0));
        assert!(t.is_reached(0, 100));
        assert!(!t.is_reached(9, 99));
    }

    #[test]
    fn test_unset_termination_is_immediately_reached() {
        assert!(Termination::default().is_reached(0, 0));
    }
}
