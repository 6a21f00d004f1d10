//! Problem definition: what is being optimised.
//!
//! A [`ProblemDefinition`] is supplied once, before the pipeline is built,
//! and shared read-only by every operator.
//!
//! # Example
//!
//! ```
//! use u_moea::model::{ElementSpec, ProblemDefinition};
//!
//! // Schaffer's two-objective problem on one real variable.
//! let problem = ProblemDefinition::new(2)
//!     .with_decision(vec![ElementSpec::real(-10.0, 10.0)])
//!     .with_real_function(|x| vec![x[0] * x[0], (x[0] - 2.0).powi(2)]);
//! assert!(problem.validate().is_ok());
//! ```

use std::fmt;
use std::sync::Arc;

use rand::RngCore;

use super::element::{Element, ElementSpec};
use crate::error::{ConfigErrorKind, PipelineError};

/// Objective and constraint values produced by one evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub objectives: Vec<f64>,
    pub constraints: Vec<f64>,
}

/// The function under optimisation. All objectives are minimised.
///
/// Implementations must be thread-safe: the evaluator may call
/// `evaluate` from several worker threads at once.
pub trait ObjectiveFunction: Send + Sync {
    /// Evaluates a decision vector under the given parameter values.
    fn evaluate(&self, decision: &[Element], parameters: &[f64], rng: &mut dyn RngCore)
        -> Evaluation;
}

/// Adapts a closure over real-valued decision vectors.
struct RealFunction<F>(F);

impl<F> ObjectiveFunction for RealFunction<F>
where
    F: Fn(&[f64]) -> Vec<f64> + Send + Sync,
{
    fn evaluate(&self, decision: &[Element], _: &[f64], _: &mut dyn RngCore) -> Evaluation {
        let x: Vec<f64> = decision.iter().map(Element::as_f64).collect();
        Evaluation {
            objectives: (self.0)(&x),
            constraints: Vec::new(),
        }
    }
}

/// Bounds of an auxiliary parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSpec {
    pub lower: f64,
    pub upper: f64,
    /// External parameters split the population into cells for parametric
    /// ranking.
    pub external: bool,
}

impl ParameterSpec {
    /// An internal parameter in `[lower, upper]`.
    pub fn new(lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper,
            external: false,
        }
    }

    /// An external parameter in `[lower, upper]`.
    pub fn external(lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper,
            external: true,
        }
    }

    /// Maps `value` linearly onto `[0, 1]`, clamped.
    pub fn normalise(&self, value: f64) -> f64 {
        let range = self.upper - self.lower;
        if range <= 0.0 {
            return 0.0;
        }
        ((value - self.lower) / range).clamp(0.0, 1.0)
    }
}

/// Description of an optimisation problem.
#[derive(Clone)]
pub struct ProblemDefinition {
    pub objective_count: usize,
    pub decision: Vec<ElementSpec>,
    /// A constraint value `c[i]` is satisfied iff `c[i] <= thresholds[i]`.
    pub constraint_thresholds: Vec<f64>,
    /// Optional goal per objective; `f64::NEG_INFINITY` means "no goal".
    pub goals: Option<Vec<f64>>,
    pub parameters: Vec<ParameterSpec>,
    function: Option<Arc<dyn ObjectiveFunction>>,
}

impl fmt::Debug for ProblemDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProblemDefinition")
            .field("objective_count", &self.objective_count)
            .field("decision", &self.decision)
            .field("constraint_thresholds", &self.constraint_thresholds)
            .field("goals", &self.goals)
            .field("parameters", &self.parameters)
            .field("has_function", &self.function.is_some())
            .finish()
    }
}

impl ProblemDefinition {
    /// Starts a definition with `objective_count` objectives.
    pub fn new(objective_count: usize) -> Self {
        Self {
            objective_count,
            decision: Vec::new(),
            constraint_thresholds: Vec::new(),
            goals: None,
            parameters: Vec::new(),
            function: None,
        }
    }

    /// Sets the decision variables.
    pub fn with_decision(mut self, decision: Vec<ElementSpec>) -> Self {
        self.decision = decision;
        self
    }

    /// Sets the constraint thresholds.
    pub fn with_constraints(mut self, thresholds: Vec<f64>) -> Self {
        self.constraint_thresholds = thresholds;
        self
    }

    /// Sets the goal vector.
    pub fn with_goals(mut self, goals: Vec<f64>) -> Self {
        self.goals = Some(goals);
        self
    }

    /// Sets the auxiliary parameters.
    pub fn with_parameters(mut self, parameters: Vec<ParameterSpec>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Sets the objective function.
    pub fn with_function(mut self, function: Arc<dyn ObjectiveFunction>) -> Self {
        self.function = Some(function);
        self
    }

    /// Sets the objective function from a closure over real values.
    pub fn with_real_function<F>(self, f: F) -> Self
    where
        F: Fn(&[f64]) -> Vec<f64> + Send + Sync + 'static,
    {
        self.with_function(Arc::new(RealFunction(f)))
    }

    /// The objective function, if set.
    pub fn function(&self) -> Option<&Arc<dyn ObjectiveFunction>> {
        self.function.as_ref()
    }

    pub fn decision_count(&self) -> usize {
        self.decision.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraint_thresholds.len()
    }

    /// Goal vector if at least one component is set.
    pub fn active_goals(&self) -> Option<&[f64]> {
        self.goals
            .as_deref()
            .filter(|g| g.iter().any(|v| *v != f64::NEG_INFINITY))
    }

    /// Indices of the external parameters.
    pub fn external_parameters(&self) -> Vec<usize> {
        self.parameters
            .iter()
            .enumerate()
            .filter(|(_, p)| p.external)
            .map(|(i, _)| i)
            .collect()
    }

    /// Validates the definition.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let fail = |msg: &str| {
            Err(PipelineError::config(
                "ProblemDefinition",
                ConfigErrorKind::InvalidProblem(msg.into()),
            ))
        };
        if self.objective_count == 0 {
            return fail("at least one objective is required");
        }
        if self.decision.is_empty() {
            return fail("at least one decision variable is required");
        }
        if self
            .decision
            .iter()
            .any(|d| !d.lower.is_finite() || !d.upper.is_finite())
        {
            return fail("decision bounds must be finite");
        }
        if self
            .parameters
            .iter()
            .any(|p| !p.lower.is_finite() || !p.upper.is_finite())
        {
            return fail("parameter bounds must be finite");
        }
        if self.decision.iter().any(|d| d.lower > d.upper) {
            return fail("decision bounds are inverted");
        }
        if self.parameters.iter().any(|p| p.lower > p.upper) {
            return fail("parameter bounds are inverted");
        }
        if let Some(goals) = &self.goals {
            if goals.len() != self.objective_count {
                return fail("goal vector length differs from objective count");
            }
        }
        if self.function.is_none() {
            return fail("no objective function");
        }
        Ok(())
    }
}
