//! Combined ranking policy: constraints, goals and parametric cells.
//!
//! Ordering:
//!
//! 1. Split items into feasible and infeasible.
//! 2. Rank feasible items by non-dominance sort, on goal-clipped
//!    objectives when a goal vector is active.
//! 3. Rank infeasible items by violation score, after every feasible rank.
//!    Equal scores share a rank.
//!
//! With parametric cells enabled, items in different cells are never
//! compared, so every cell is ranked independently and ranks are the union
//! across cells.

use super::constraints::{is_feasible, violation_scores};
use super::dominance::{Dominance, DominanceRelation};
use super::parametric::cell_id;
use super::preferability::clip_to_goals;
use super::sort::{sort_by_relation, NondominatedSortResult};
use crate::model::{ParameterSpec, ProblemDefinition, SolutionSet};

/// Input of one item to the ranking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankItem {
    pub objectives: Vec<f64>,
    pub constraints: Vec<f64>,
    /// Parametric cell; `None` puts the item in the shared default cell.
    pub cell: Option<u64>,
}

impl RankItem {
    pub fn new(objectives: Vec<f64>) -> Self {
        Self {
            objectives,
            ..Self::default()
        }
    }

    pub fn with_constraints(mut self, constraints: Vec<f64>) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_cell(mut self, cell: u64) -> Self {
        self.cell = Some(cell);
        self
    }
}

/// Parametric cell configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ParametricCells {
    /// Bins per external parameter dimension.
    pub bins: usize,
    /// Indices into the solution's parameter vector.
    pub external: Vec<usize>,
    /// Bounds used to normalise each external parameter.
    pub specs: Vec<ParameterSpec>,
}

impl ParametricCells {
    /// Cell id of a full parameter vector.
    pub fn cell_of(&self, parameters: &[f64]) -> u64 {
        let normalised: Vec<f64> = self
            .external
            .iter()
            .zip(&self.specs)
            .map(|(&i, spec)| spec.normalise(parameters.get(i).copied().unwrap_or(spec.lower)))
            .collect();
        cell_id(&normalised, self.bins)
    }
}

/// Ranking configuration.
///
/// ```
/// use u_moea::ranking::{RankItem, RankingPolicy};
///
/// let items = vec![
///     RankItem::new(vec![1.0, 4.0]),
///     RankItem::new(vec![2.0, 2.0]),
///     RankItem::new(vec![3.0, 1.0]),
///     RankItem::new(vec![4.0, 5.0]),
/// ];
/// let result = RankingPolicy::default().rank(&items);
/// assert_eq!(result.fronts, vec![vec![0, 1, 2], vec![3]]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankingPolicy {
    pub relation: DominanceRelation,
    /// A constraint value is satisfied iff it is at or below its threshold.
    pub thresholds: Vec<f64>,
    pub goals: Option<Vec<f64>>,
    pub parametric: Option<ParametricCells>,
}

impl RankingPolicy {
    pub fn new(relation: DominanceRelation) -> Self {
        Self {
            relation,
            ..Self::default()
        }
    }

    /// Thresholds and active goals of `problem`.
    pub fn from_problem(problem: &ProblemDefinition, relation: DominanceRelation) -> Self {
        Self {
            relation,
            thresholds: problem.constraint_thresholds.clone(),
            goals: problem.active_goals().map(<[f64]>::to_vec),
            parametric: None,
        }
    }

    pub fn with_thresholds(mut self, thresholds: Vec<f64>) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_goals(mut self, goals: Vec<f64>) -> Self {
        self.goals = Some(goals);
        self
    }

    /// Enables parametric cells over the external parameters of `problem`.
    pub fn with_parametric(mut self, problem: &ProblemDefinition, bins: usize) -> Self {
        let external = problem.external_parameters();
        let specs = external.iter().map(|&i| problem.parameters[i]).collect();
        self.parametric = Some(ParametricCells {
            bins: bins.max(1),
            external,
            specs,
        });
        self
    }

    /// Ranks `items`. Fronts hold item indices in insertion order.
    pub fn rank(&self, items: &[RankItem]) -> NondominatedSortResult {
        let (feasible, infeasible): (Vec<usize>, Vec<usize>) = (0..items.len())
            .partition(|&i| is_feasible(&items[i].constraints, &self.thresholds));

        let same_cell = |a: usize, b: usize| items[a].cell == items[b].cell;

        let views: Vec<Vec<f64>> = feasible
            .iter()
            .map(|&i| match &self.goals {
                Some(g) => clip_to_goals(&items[i].objectives, g),
                None => items[i].objectives.clone(),
            })
            .collect();
        let feasible_sort = sort_by_relation(feasible.len(), |a, b| {
            if !same_cell(feasible[a], feasible[b]) {
                return Dominance::Incomparable;
            }
            self.relation.compare(&views[a], &views[b])
        });

        let constraints: Vec<Vec<f64>> = infeasible
            .iter()
            .map(|&i| items[i].constraints.clone())
            .collect();
        let scores = violation_scores(&constraints, &self.thresholds);
        let infeasible_sort = sort_by_relation(infeasible.len(), |a, b| {
            if !same_cell(infeasible[a], infeasible[b]) {
                return Dominance::Incomparable;
            }
            match scores[a].total_cmp(&scores[b]) {
                std::cmp::Ordering::Less => Dominance::Dominates,
                std::cmp::Ordering::Greater => Dominance::Dominated,
                std::cmp::Ordering::Equal => Dominance::Incomparable,
            }
        });

        let mut ranks = vec![0usize; items.len()];
        let mut fronts = Vec::with_capacity(feasible_sort.fronts.len() + infeasible_sort.fronts.len());
        for front in feasible_sort.fronts {
            fronts.push(front.into_iter().map(|k| feasible[k]).collect::<Vec<_>>());
        }
        for front in infeasible_sort.fronts {
            fronts.push(front.into_iter().map(|k| infeasible[k]).collect::<Vec<_>>());
        }
        for (r, front) in fronts.iter().enumerate() {
            for &i in front {
                ranks[i] = r;
            }
        }
        NondominatedSortResult { ranks, fronts }
    }

    /// Ranks the members of `set`; one set per rank, sharing handles.
    pub fn rank_set(&self, set: &SolutionSet) -> Vec<SolutionSet> {
        let items: Vec<RankItem> = set
            .iter()
            .map(|h| {
                let s = h.read();
                RankItem {
                    objectives: s.objectives().to_vec(),
                    constraints: s.constraints().to_vec(),
                    cell: self.parametric.as_ref().map(|p| p.cell_of(s.parameters())),
                }
            })
            .collect();

        self.rank(&items)
            .fronts
            .into_iter()
            .map(|front| front.into_iter().filter_map(|i| set.get(i).cloned()).collect())
            .collect()
    }
}
