//! Filtration: operators that regroup solutions without changing them.
//!
//! They select members of their input sets into new output sets (shared
//! handles, no copies), or shrink adopted sets in place.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use tracing::debug;

use super::scalarising::DistanceMeasure;
use super::{collect_inputs, require_input, require_output, Operator};
use crate::error::{ConfigErrorKind, Mismatch, NodeStatus, PipelineError, PipelineResult};
use crate::model::{ProblemDefinition, SolutionHandle, SolutionSet, Tag};
use crate::pipeline::{NodeContext, OperatorTags};
use crate::ranking::crowding_order;

fn invalid(operator: &str, name: &'static str, reason: &str) -> PipelineError {
    PipelineError::config(
        operator,
        ConfigErrorKind::InvalidParameter {
            name,
            reason: reason.into(),
        },
    )
}

// ============================================================================
// NeighbourhoodFiltration
// ============================================================================

/// How a neighbourhood is delimited.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NeighbourhoodCriterion {
    /// The `T` nearest solutions by weight-vector distance.
    Size(usize),
    /// Every solution whose normalised decision vector lies closer than
    /// `r · √d`, with `d` the number of decision variables.
    Radius(f64),
}

impl Default for NeighbourhoodCriterion {
    fn default() -> Self {
        NeighbourhoodCriterion::Size(5)
    }
}

impl FromStr for NeighbourhoodCriterion {
    type Err = ConfigErrorKind;

    /// Parses a criterion name with its default parameter.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Size" | "NeighbourhoodSize" => Ok(NeighbourhoodCriterion::Size(5)),
            "Radius" | "NeighbourhoodRadius" => Ok(NeighbourhoodCriterion::Radius(0.1)),
            other => Err(ConfigErrorKind::UnrecognisedCriterion(other.to_string())),
        }
    }
}

impl fmt::Display for NeighbourhoodCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NeighbourhoodCriterion::Size(t) => write!(f, "Size({t})"),
            NeighbourhoodCriterion::Radius(r) => write!(f, "Radius({r})"),
        }
    }
}

/// Builds one output set per input solution: the solution itself followed
/// by its neighbours, nearest first.
///
/// Neighbourhoods are computed on the first evaluation and kept as
/// persistent sets. With `clear_output_sets` they are rebuilt on every
/// evaluation instead.
#[derive(Debug, Clone, Default)]
pub struct NeighbourhoodFiltration {
    criterion: NeighbourhoodCriterion,
    distance: DistanceMeasure,
    clear_output_sets: bool,
    max_solutions: Option<usize>,
}

impl NeighbourhoodFiltration {
    pub fn new(criterion: NeighbourhoodCriterion) -> Self {
        Self {
            criterion,
            ..Self::default()
        }
    }

    pub fn with_distance(mut self, distance: DistanceMeasure) -> Self {
        self.distance = distance;
        self
    }

    /// Rebuilds the neighbourhoods on every evaluation.
    pub fn with_clear_output_sets(mut self, clear: bool) -> Self {
        self.clear_output_sets = clear;
        self
    }

    /// Caps every neighbourhood, the solution itself included.
    pub fn with_max_solutions(mut self, max: usize) -> Self {
        self.max_solutions = Some(max);
        self
    }

    pub fn criterion(&self) -> NeighbourhoodCriterion {
        self.criterion
    }

    /// Neighbour indices of every point, nearest first, excluding itself.
    fn neighbours(&self, points: &[Vec<f64>], dims: usize) -> Vec<Vec<usize>> {
        let n = points.len();
        (0..n)
            .map(|i| {
                let mut others: Vec<(usize, f64)> = (0..n)
                    .filter(|&j| j != i)
                    .map(|j| (j, self.distance.distance(&points[i], &points[j])))
                    .collect();
                others.sort_by(|a, b| a.1.total_cmp(&b.1));
                match self.criterion {
                    NeighbourhoodCriterion::Size(t) => {
                        others.into_iter().take(t).map(|(j, _)| j).collect()
                    }
                    NeighbourhoodCriterion::Radius(r) => {
                        let limit = r * (dims as f64).sqrt();
                        others
                            .into_iter()
                            .take_while(|(_, d)| *d < limit)
                            .map(|(j, _)| j)
                            .collect()
                    }
                }
            })
            .collect()
    }
}

/// Decision vectors mapped onto `[0, 1]` with the problem bounds.
fn normalised_decisions(problem: &ProblemDefinition, members: &[SolutionHandle]) -> Vec<Vec<f64>> {
    members
        .iter()
        .map(|h| {
            let s = h.read();
            s.decision()
                .iter()
                .zip(&problem.decision)
                .map(|(x, spec)| {
                    let range = spec.range();
                    if range > 0.0 {
                        (x.as_f64() - spec.lower) / range
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}

impl Operator for NeighbourhoodFiltration {
    fn name(&self) -> &str {
        "NeighbourhoodFiltration"
    }

    fn default_tags(&self) -> OperatorTags {
        OperatorTags::new(&[Tag::FOR_NEIGHBOURHOODS], &[Tag::NEIGHBOURHOODS])
    }

    fn validate(&self, _problem: &ProblemDefinition) -> PipelineResult<()> {
        if let NeighbourhoodCriterion::Radius(r) = self.criterion {
            if !(r > 0.0) {
                return Err(invalid(self.name(), "radius", "must be positive"));
            }
        }
        if self.max_solutions == Some(0) {
            return Err(invalid(self.name(), "max_solutions", "must be at least 1"));
        }
        Ok(())
    }

    fn evaluate_node(&mut self, ctx: &mut NodeContext<'_>) -> PipelineResult<NodeStatus> {
        skip_unless!(require_input(ctx));
        if !self.clear_output_sets && !ctx.owned_sets().is_empty() {
            return Ok(NodeStatus::Completed);
        }

        let members = collect_inputs(ctx);
        let points = match self.criterion {
            NeighbourhoodCriterion::Size(_) if members.iter().all(|h| !h.read().weights().is_empty()) => {
                members.iter().map(|h| h.read().weights().to_vec()).collect()
            }
            _ => normalised_decisions(ctx.problem(), &members),
        };
        let neighbours = self.neighbours(&points, ctx.problem().decision_count());

        ctx.clear_output_sets();
        for (i, near) in neighbours.iter().enumerate() {
            let mut set = SolutionSet::new();
            set.append(members[i].clone());
            for &j in near {
                set.append(members[j].clone());
            }
            if let Some(max) = self.max_solutions {
                set.truncate(max);
            }
            let id = ctx.append_existing_output_set(set);
            if !self.clear_output_sets {
                ctx.mark_persistent(id);
            }
        }
        debug!(count = members.len(), criterion = %self.criterion, "neighbourhoods built");
        Ok(NodeStatus::Completed)
    }
}

// ============================================================================
// RandFiltrationForDirection
// ============================================================================

/// For every input set, draws up to `set_size` distinct members at random
/// into a new output set.
#[derive(Debug, Clone)]
pub struct RandFiltrationForDirection {
    set_size: usize,
}

impl Default for RandFiltrationForDirection {
    fn default() -> Self {
        Self { set_size: 2 }
    }
}

impl RandFiltrationForDirection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_set_size(mut self, size: usize) -> Self {
        self.set_size = size.max(1);
        self
    }
}

impl Operator for RandFiltrationForDirection {
    fn name(&self) -> &str {
        "RandFiltrationForDirection"
    }

    fn default_tags(&self) -> OperatorTags {
        OperatorTags::new(&[Tag::NEIGHBOURHOODS], &[Tag::FOR_DIRECTION])
    }

    fn evaluate_node(&mut self, ctx: &mut NodeContext<'_>) -> PipelineResult<NodeStatus> {
        skip_unless!(require_input(ctx));
        ctx.clear_output_sets();
        for id in ctx.input_sets() {
            let members: Vec<SolutionHandle> = ctx
                .set(id)
                .map(|s| s.iter().cloned().collect())
                .unwrap_or_default();
            let order = ctx.random().permutation(members.len());
            let picked: SolutionSet = order
                .into_iter()
                .take(self.set_size)
                .map(|k| members[k].clone())
                .collect();
            ctx.append_existing_output_set(picked);
        }
        Ok(NodeStatus::Completed)
    }
}

// ============================================================================
// TournamentFiltrationForDirection
// ============================================================================

/// Fills output sets of `set_size` parents, each the winner of a tournament
/// of `tournament_size` random draws from the union of the inputs. Lower
/// cost wins.
///
/// The number of output sets defaults to `ceil(n / set_size)` for an input
/// of `n` solutions.
#[derive(Debug, Clone)]
pub struct TournamentFiltrationForDirection {
    tournament_size: usize,
    set_size: usize,
    set_count: Option<usize>,
}

impl Default for TournamentFiltrationForDirection {
    fn default() -> Self {
        Self {
            tournament_size: 2,
            set_size: 2,
            set_count: None,
        }
    }
}

impl TournamentFiltrationForDirection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tournament_size(mut self, k: usize) -> Self {
        self.tournament_size = k.max(1);
        self
    }

    pub fn with_set_size(mut self, size: usize) -> Self {
        self.set_size = size.max(1);
        self
    }

    pub fn with_set_count(mut self, count: usize) -> Self {
        self.set_count = Some(count);
        self
    }
}

fn tournament<R: Rng>(costs: &[f64], k: usize, rng: &mut R) -> usize {
    let n = costs.len();
    let mut best = rng.random_range(0..n);
    for _ in 1..k {
        let idx = rng.random_range(0..n);
        if costs[idx] < costs[best] {
            best = idx;
        }
    }
    best
}

impl Operator for TournamentFiltrationForDirection {
    fn name(&self) -> &str {
        "TournamentFiltrationForDirection"
    }

    fn default_tags(&self) -> OperatorTags {
        OperatorTags::new(&[Tag::MAIN_OPTIMIZATION_SET], &[Tag::FOR_DIRECTION])
    }

    fn evaluate_node(&mut self, ctx: &mut NodeContext<'_>) -> PipelineResult<NodeStatus> {
        skip_unless!(require_input(ctx));
        let pool = collect_inputs(ctx);
        let costs: Vec<f64> = pool.iter().map(|h| h.read().cost_value()).collect();
        let count = self
            .set_count
            .unwrap_or_else(|| pool.len().div_ceil(self.set_size));

        ctx.clear_output_sets();
        for _ in 0..count {
            let rng = ctx.rng();
            let parents: SolutionSet = (0..self.set_size)
                .map(|_| pool[tournament(&costs, self.tournament_size, rng)].clone())
                .collect();
            ctx.append_existing_output_set(parents);
        }
        Ok(NodeStatus::Completed)
    }
}

// ============================================================================
// TruncateSets
// ============================================================================

/// Shrinks every adopted set to at most `set_size` members, in place.
#[derive(Debug, Clone)]
pub struct TruncateSets {
    set_size: usize,
}

impl Default for TruncateSets {
    fn default() -> Self {
        Self { set_size: 1 }
    }
}

impl TruncateSets {
    pub fn new(set_size: usize) -> Self {
        Self { set_size }
    }
}

impl Operator for TruncateSets {
    fn name(&self) -> &str {
        "TruncateSets"
    }

    fn default_tags(&self) -> OperatorTags {
        OperatorTags::adopting(&[], &[Tag::FOR_RESIZE])
    }

    fn validate(&self, _problem: &ProblemDefinition) -> PipelineResult<()> {
        if self.set_size == 0 {
            return Err(invalid(self.name(), "set_size", "must be at least 1"));
        }
        Ok(())
    }

    fn evaluate_node(&mut self, ctx: &mut NodeContext<'_>) -> PipelineResult<NodeStatus> {
        skip_unless!(require_output(ctx));
        for id in ctx.output_sets() {
            if let Some(set) = ctx.set_mut(id) {
                set.truncate(self.set_size);
            }
        }
        Ok(NodeStatus::Completed)
    }
}

// ============================================================================
// MergeSets
// ============================================================================

/// Merges every input set into one output set; each solution appears once.
#[derive(Debug, Clone, Default)]
pub struct MergeSets;

impl MergeSets {
    pub fn new() -> Self {
        Self
    }
}

impl Operator for MergeSets {
    fn name(&self) -> &str {
        "MergeSets"
    }

    fn default_tags(&self) -> OperatorTags {
        OperatorTags::new(&[Tag::MAIN_OPTIMIZATION_SET, Tag::OFFSPRING], &[Tag::FOR_FITNESS])
    }

    fn evaluate_node(&mut self, ctx: &mut NodeContext<'_>) -> PipelineResult<NodeStatus> {
        skip_unless!(require_input(ctx));
        let merged = SolutionSet::from_handles(collect_inputs(ctx));
        ctx.clear_output_sets();
        ctx.append_existing_output_set(merged);
        Ok(NodeStatus::Completed)
    }
}

// ============================================================================
// NsgaIIEliteSelection
// ============================================================================

/// Refills the adopted population from ranked fronts.
///
/// Input sets are taken as fronts, best first. Whole fronts are copied
/// while they fit; the first front that does not fit contributes its least
/// crowded members. The target size is the configured population size or,
/// by default, the adopted set's current size.
#[derive(Debug, Clone, Default)]
pub struct NsgaIIEliteSelection {
    population_size: Option<usize>,
}

impl NsgaIIEliteSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = Some(size);
        self
    }
}

impl Operator for NsgaIIEliteSelection {
    fn name(&self) -> &str {
        "NsgaIIEliteSelection"
    }

    fn default_tags(&self) -> OperatorTags {
        OperatorTags::adopting(&[Tag::RANKED], &[Tag::MAIN_OPTIMIZATION_SET])
    }

    fn evaluate_node(&mut self, ctx: &mut NodeContext<'_>) -> PipelineResult<NodeStatus> {
        skip_unless!(require_input(ctx));
        let Some(target_id) = ctx.output_sets().first().copied() else {
            return Ok(NodeStatus::Skipped(Mismatch::UnresolvedTags));
        };
        let target = self
            .population_size
            .or_else(|| ctx.set(target_id).map(SolutionSet::len))
            .unwrap_or(0);

        let mut selected: Vec<SolutionHandle> = Vec::with_capacity(target);
        for id in ctx.input_sets() {
            let Some(front) = ctx.set(id) else { continue };
            let room = target - selected.len();
            if room == 0 {
                break;
            }
            if front.len() <= room {
                selected.extend(front.iter().cloned());
            } else {
                let order = crowding_order(&front.objective_matrix());
                selected.extend(order.into_iter().take(room).filter_map(|k| front.get(k).cloned()));
            }
        }

        if let Some(population) = ctx.set_mut(target_id) {
            population.clear();
            for h in selected {
                population.append(h);
            }
        }
        debug!(size = target, "elite population selected");
        Ok(NodeStatus::Completed)
    }
}
