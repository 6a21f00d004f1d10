//! Error and status types shared by every pipeline stage.
//!
//! Two failure classes exist:
//!
//! - [`PipelineError`]: fatal. Invalid operator configuration or misuse of
//!   the pipeline API. The run aborts.
//! - [`NodeStatus::Skipped`]: recoverable. An operator found its bound data
//!   in the wrong shape (no set for a tag, an empty set, mismatched counts),
//!   left its outputs untouched and let the run continue.

use std::fmt;

use crate::pipeline::NodeId;

/// Convenience alias used throughout the crate.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Fatal pipeline errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    /// An operator was configured with values it cannot work with.
    #[error("operator `{operator}` is misconfigured: {kind}")]
    Configuration {
        /// Name of the operator that rejected its configuration.
        operator: String,
        /// What was wrong.
        kind: ConfigErrorKind,
    },

    /// Tags were modified after the chain started evaluating.
    #[error("tags of operator `{operator}` are locked once the pipeline has been evaluated")]
    TagsLocked {
        /// Name of the operator whose tags were touched.
        operator: String,
    },

    /// A node id that does not belong to this pipeline.
    #[error("unknown pipeline node {0}")]
    UnknownNode(NodeId),

    /// The pipeline has no nodes to evaluate.
    #[error("pipeline has no nodes")]
    EmptyPipeline,
}

impl PipelineError {
    /// Shorthand for a [`PipelineError::Configuration`].
    pub fn config(operator: impl Into<String>, kind: ConfigErrorKind) -> Self {
        Self::Configuration {
            operator: operator.into(),
            kind,
        }
    }
}

/// Kinds of configuration failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigErrorKind {
    /// A scalarising function name that is not known.
    #[error("unrecognised scalarising function `{0}`")]
    UnrecognisedScalarisation(String),

    /// A distance measure name that is not known.
    #[error("unrecognised distance measure `{0}`")]
    UnrecognisedDistance(String),

    /// A neighbourhood criterion name that is not known.
    #[error("unrecognised neighbourhood criterion `{0}`")]
    UnrecognisedCriterion(String),

    /// A numeric parameter outside its admissible range.
    #[error("invalid value for `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human readable constraint that was violated.
        reason: String,
    },

    /// The problem definition is incomplete or inconsistent.
    #[error("invalid problem definition: {0}")]
    InvalidProblem(String),

    /// Neither an iteration limit nor an evaluation budget was configured.
    #[error("no termination criterion: set max_iterations or max_evaluations")]
    NoTermination,
}

/// Outcome of a single node evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// The operator ran and produced its outputs.
    Completed,
    /// The node was already evaluated in the current iteration.
    Memoized,
    /// The operator could not run on the bound data; outputs are unchanged.
    Skipped(Mismatch),
}

impl NodeStatus {
    /// Returns `true` for [`NodeStatus::Skipped`].
    pub fn is_skipped(&self) -> bool {
        matches!(self, NodeStatus::Skipped(_))
    }
}

/// Data-shape problems that make an operator skip its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mismatch {
    /// No upstream set carries one of the required input tags.
    UnresolvedTags,
    /// A required input set exists but holds no solutions.
    EmptyInput,
    /// Paired input and output lists have incompatible lengths.
    SizeMismatch,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mismatch::UnresolvedTags => "no input set matches the required tags",
            Mismatch::EmptyInput => "input set is empty",
            Mismatch::SizeMismatch => "input and output sets do not line up",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_message_names_operator() {
        let err = PipelineError::config(
            "MoeadNeighbourhoodUpdate",
            ConfigErrorKind::UnrecognisedScalarisation("Foo".into()),
        );
        let msg = err.to_string();
        assert!(msg.contains("MoeadNeighbourhoodUpdate"));
        assert!(msg.contains("Foo"));
    }

    #[test]
    fn test_skipped_status() {
        assert!(NodeStatus::Skipped(Mismatch::EmptyInput).is_skipped());
        assert!(!NodeStatus::Completed.is_skipped());
        assert!(!NodeStatus::Memoized.is_skipped());
    }

    #[test]
    fn test_mismatch_display() {
        assert_eq!(Mismatch::EmptyInput.to_string(), "input set is empty");
    }
}
