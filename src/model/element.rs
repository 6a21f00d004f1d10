//! Typed decision-vector components.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One component of a decision vector.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Element {
    /// Continuous value.
    Real(f64),
    /// Integer value.
    Integer(i64),
    /// Ordered category index.
    Ordinal(i64),
    /// Unordered category index.
    Nominal(i64),
}

/// The variant of an [`Element`], without its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ElementKind {
    Real,
    Integer,
    Ordinal,
    Nominal,
}

impl Element {
    /// The kind of this element.
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Real(_) => ElementKind::Real,
            Element::Integer(_) => ElementKind::Integer,
            Element::Ordinal(_) => ElementKind::Ordinal,
            Element::Nominal(_) => ElementKind::Nominal,
        }
    }

    /// Numeric view of the value.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Element::Real(v) => v,
            Element::Integer(v) | Element::Ordinal(v) | Element::Nominal(v) => v as f64,
        }
    }

    /// Builds an element of `kind` from a numeric value. Integer kinds round.
    pub fn from_f64(kind: ElementKind, value: f64) -> Self {
        match kind {
            ElementKind::Real => Element::Real(value),
            ElementKind::Integer => Element::Integer(value.round() as i64),
            ElementKind::Ordinal => Element::Ordinal(value.round() as i64),
            ElementKind::Nominal => Element::Nominal(value.round() as i64),
        }
    }
}

/// Kind and inclusive bounds of one decision variable.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElementSpec {
    pub kind: ElementKind,
    pub lower: f64,
    pub upper: f64,
}

impl ElementSpec {
    /// A continuous variable in `[lower, upper]`.
    pub fn real(lower: f64, upper: f64) -> Self {
        Self {
            kind: ElementKind::Real,
            lower,
            upper,
        }
    }

    /// An integer variable in `[lower, upper]`.
    pub fn integer(lower: i64, upper: i64) -> Self {
        Self {
            kind: ElementKind::Integer,
            lower: lower as f64,
            upper: upper as f64,
        }
    }

    /// An ordinal variable with `categories` ordered levels.
    pub fn ordinal(categories: usize) -> Self {
        Self {
            kind: ElementKind::Ordinal,
            lower: 0.0,
            upper: categories.saturating_sub(1) as f64,
        }
    }

    /// A nominal variable with `categories` unordered levels.
    pub fn nominal(categories: usize) -> Self {
        Self {
            kind: ElementKind::Nominal,
            lower: 0.0,
            upper: categories.saturating_sub(1) as f64,
        }
    }

    /// Width of the admissible range.
    pub fn range(&self) -> f64 {
        self.upper - self.lower
    }

    /// Clamps a numeric value into bounds and converts it to this kind.
    pub fn clamp(&self, value: f64) -> Element {
        Element::from_f64(self.kind, value.clamp(self.lower, self.upper))
    }

    /// The lower bound as an element of this kind.
    pub fn lower_element(&self) -> Element {
        Element::from_f64(self.kind, self.lower)
    }
}
