//! Candidate solutions and shared handles to them.
//!
//! A [`Solution`] is one point of the search space together with its
//! evaluated objectives, constraints, cost and status flags. Sets never own
//! solutions directly; they hold [`SolutionHandle`]s, so the same solution
//! may appear in several sets and a write through one handle is seen by all.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::element::Element;
use super::problem::ProblemDefinition;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identity of a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolutionId(u64);

impl SolutionId {
    fn fresh() -> Self {
        SolutionId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Sample-based cost distribution.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Distribution {
    samples: Vec<f64>,
}

impl Distribution {
    pub fn new(samples: Vec<f64>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Sample mean; `NaN` for an empty distribution.
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return f64::NAN;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }
}

/// Scalar cost assigned by fitness and ranking operators. Lower is better.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Cost {
    Exact(f64),
    Uncertain(Distribution),
}

impl Cost {
    /// The value used for comparisons.
    pub fn value(&self) -> f64 {
        match self {
            Cost::Exact(v) => *v,
            Cost::Uncertain(d) => d.mean(),
        }
    }
}

/// One candidate solution.
#[derive(Debug)]
pub struct Solution {
    id: SolutionId,
    decision: Vec<Element>,
    objectives: Vec<f64>,
    constraints: Vec<f64>,
    parameters: Vec<f64>,
    weights: Vec<f64>,
    cost: Option<Cost>,
    evaluated: bool,
    objectives_evaluated: bool,
    constraints_evaluated: bool,
    validated: bool,
    scalarised: bool,
}

impl Solution {
    /// Creates an unevaluated solution shaped after `problem`.
    ///
    /// Decision components start at their lower bounds; parameters at
    /// their lower bounds; objectives at `+inf`; constraints at `0`.
    pub fn new(problem: &ProblemDefinition) -> Self {
        Self::from_parts(
            problem.decision.iter().map(|d| d.lower_element()).collect(),
            problem.objective_count,
            problem.constraint_count(),
            problem.parameters.iter().map(|p| p.lower).collect(),
        )
    }

    /// Creates a solution with an explicit decision vector.
    pub fn from_parts(
        decision: Vec<Element>,
        objective_count: usize,
        constraint_count: usize,
        parameters: Vec<f64>,
    ) -> Self {
        Self {
            id: SolutionId::fresh(),
            decision,
            objectives: vec![f64::INFINITY; objective_count],
            constraints: vec![0.0; constraint_count],
            parameters,
            weights: Vec::new(),
            cost: None,
            evaluated: false,
            objectives_evaluated: false,
            constraints_evaluated: false,
            validated: false,
            scalarised: false,
        }
    }

    /// A solution with the given objective vector already evaluated.
    pub fn with_objectives(objectives: Vec<f64>) -> Self {
        let mut s = Self::from_parts(Vec::new(), objectives.len(), 0, Vec::new());
        s.objectives = objectives;
        s.objectives_evaluated = true;
        s.constraints_evaluated = true;
        s.evaluated = true;
        s
    }

    /// Deep copy with a fresh identity.
    pub fn duplicate(&self) -> Self {
        Self {
            id: SolutionId::fresh(),
            decision: self.decision.clone(),
            objectives: self.objectives.clone(),
            constraints: self.constraints.clone(),
            parameters: self.parameters.clone(),
            weights: self.weights.clone(),
            cost: self.cost.clone(),
            evaluated: self.evaluated,
            objectives_evaluated: self.objectives_evaluated,
            constraints_evaluated: self.constraints_evaluated,
            validated: self.validated,
            scalarised: self.scalarised,
        }
    }

    pub fn id(&self) -> SolutionId {
        self.id
    }

    // ---- Vectors ----

    pub fn decision(&self) -> &[Element] {
        &self.decision
    }

    pub fn objectives(&self) -> &[f64] {
        &self.objectives
    }

    pub fn constraints(&self) -> &[f64] {
        &self.constraints
    }

    pub fn parameters(&self) -> &[f64] {
        &self.parameters
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Decision component `idx`, or `None` when out of range.
    pub fn decision_at(&self, idx: usize) -> Option<Element> {
        self.decision.get(idx).copied()
    }

    pub fn objective_at(&self, idx: usize) -> Option<f64> {
        self.objectives.get(idx).copied()
    }

    pub fn constraint_at(&self, idx: usize) -> Option<f64> {
        self.constraints.get(idx).copied()
    }

    pub fn parameter_at(&self, idx: usize) -> Option<f64> {
        self.parameters.get(idx).copied()
    }

    pub fn weight_at(&self, idx: usize) -> Option<f64> {
        self.weights.get(idx).copied()
    }

    /// Writes decision component `idx`.
    ///
    /// Returns `false` when `idx` is out of range or `value` has a
    /// different kind than the current component. Marks the solution as
    /// unevaluated on success.
    pub fn define_decision_at(&mut self, idx: usize, value: Element) -> bool {
        match self.decision.get_mut(idx) {
            Some(slot) if slot.kind() == value.kind() => {
                *slot = value;
                self.invalidate();
                true
            }
            _ => false,
        }
    }

    /// Replaces the whole decision vector if lengths and kinds agree.
    pub fn define_decision(&mut self, decision: &[Element]) -> bool {
        let compatible = decision.len() == self.decision.len()
            && self
                .decision
                .iter()
                .zip(decision)
                .all(|(a, b)| a.kind() == b.kind());
        if compatible {
            self.decision.copy_from_slice(decision);
            self.invalidate();
        }
        compatible
    }

    pub fn define_objective_at(&mut self, idx: usize, value: f64) -> bool {
        set_at(&mut self.objectives, idx, value)
    }

    pub fn define_constraint_at(&mut self, idx: usize, value: f64) -> bool {
        set_at(&mut self.constraints, idx, value)
    }

    pub fn define_parameter_at(&mut self, idx: usize, value: f64) -> bool {
        set_at(&mut self.parameters, idx, value)
    }

    /// Replaces the objective vector; rejected if the length differs.
    pub fn define_objectives(&mut self, values: &[f64]) -> bool {
        let ok = set_all(&mut self.objectives, values);
        if ok {
            self.objectives_evaluated = true;
        }
        ok
    }

    /// Replaces the constraint vector; rejected if the length differs.
    pub fn define_constraints(&mut self, values: &[f64]) -> bool {
        let ok = set_all(&mut self.constraints, values);
        if ok {
            self.constraints_evaluated = true;
        }
        ok
    }

    /// Sets the weighting vector. Its length is free.
    pub fn define_weights(&mut self, weights: Vec<f64>) {
        self.weights = weights;
    }

    // ---- Cost ----

    pub fn cost(&self) -> Option<&Cost> {
        self.cost.as_ref()
    }

    /// Cost value, `+inf` while undefined.
    pub fn cost_value(&self) -> f64 {
        self.cost.as_ref().map_or(f64::INFINITY, Cost::value)
    }

    pub fn define_cost(&mut self, cost: Cost) {
        self.cost = Some(cost);
    }

    pub fn clear_cost(&mut self) {
        self.cost = None;
    }

    // ---- Status ----

    pub fn is_evaluated(&self) -> bool {
        self.evaluated
    }

    pub fn is_objectives_evaluated(&self) -> bool {
        self.objectives_evaluated
    }

    pub fn is_constraints_evaluated(&self) -> bool {
        self.constraints_evaluated
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }

    pub fn is_scalarised(&self) -> bool {
        self.scalarised
    }

    pub fn define_evaluated(&mut self, evaluated: bool) {
        self.evaluated = evaluated;
        self.objectives_evaluated = evaluated;
        self.constraints_evaluated = evaluated;
    }

    pub fn define_validated(&mut self, validated: bool) {
        self.validated = validated;
    }

    pub fn define_scalarised(&mut self, scalarised: bool) {
        self.scalarised = scalarised;
    }

    /// Every constraint is at or below its threshold.
    ///
    /// Missing thresholds count as `0`.
    pub fn is_feasible(&self, thresholds: &[f64]) -> bool {
        crate::ranking::constraints::is_feasible(&self.constraints, thresholds)
    }

    /// Plain value copy for external consumers.
    pub fn snapshot(&self) -> SolutionSnapshot {
        SolutionSnapshot {
            id: self.id,
            decision: self.decision.clone(),
            objectives: self.objectives.clone(),
            constraints: self.constraints.clone(),
            parameters: self.parameters.clone(),
            weights: self.weights.clone(),
            cost: self.cost.as_ref().map(Cost::value),
            evaluated: self.evaluated,
            validated: self.validated,
        }
    }

    fn invalidate(&mut self) {
        self.evaluated = false;
        self.objectives_evaluated = false;
        self.constraints_evaluated = false;
        self.validated = false;
        self.scalarised = false;
    }
}

fn set_at(v: &mut [f64], idx: usize, value: f64) -> bool {
    match v.get_mut(idx) {
        Some(slot) => {
            *slot = value;
            true
        }
        None => false,
    }
}

fn set_all(v: &mut [f64], values: &[f64]) -> bool {
    if v.len() != values.len() {
        return false;
    }
    v.copy_from_slice(values);
    true
}

/// Read-only value copy of a solution.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolutionSnapshot {
    pub id: SolutionId,
    pub decision: Vec<Element>,
    pub objectives: Vec<f64>,
    pub constraints: Vec<f64>,
    pub parameters: Vec<f64>,
    pub weights: Vec<f64>,
    pub cost: Option<f64>,
    pub evaluated: bool,
    pub validated: bool,
}

/// Shared, mutable reference to a [`Solution`].
///
/// Cloning a handle shares the solution; use [`SolutionHandle::duplicate`]
/// for an independent copy.
#[derive(Debug, Clone)]
pub struct SolutionHandle(Arc<RwLock<Solution>>);

impl SolutionHandle {
    pub fn new(solution: Solution) -> Self {
        SolutionHandle(Arc::new(RwLock::new(solution)))
    }

    /// Read access. A poisoned lock still yields the data.
    pub fn read(&self) -> RwLockReadGuard<'_, Solution> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access. A poisoned lock still yields the data.
    pub fn write(&self) -> RwLockWriteGuard<'_, Solution> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// New handle to a deep copy with a fresh identity.
    pub fn duplicate(&self) -> Self {
        SolutionHandle::new(self.read().duplicate())
    }

    /// `true` when both handles refer to the same solution.
    pub fn ptr_eq(&self, other: &SolutionHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn id(&self) -> SolutionId {
        self.read().id()
    }

    pub fn snapshot(&self) -> SolutionSnapshot {
        self.read().snapshot()
    }
}

impl From<Solution> for SolutionHandle {
    fn from(s: Solution) -> Self {
        SolutionHandle::new(s)
    }
}
