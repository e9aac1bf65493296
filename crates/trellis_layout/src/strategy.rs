//! Resolution strategies
//!
//! A length cell resolves its value through exactly one [`Strategy`]. The
//! strategy also decides which other cells the length depends on; see
//! `LayoutGraph::dependencies`.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::graph::LengthId;

/// Combinator applied to the current values of an expression's inputs
pub type Combine = Rc<dyn Fn(&[f32]) -> f32>;

/// Which automatic sizing rule a cell follows
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutoStrategy {
    /// Size derived from the node's content or children
    Content,
    /// Size derived from leftover space in the parent
    #[serde(alias = "fill")]
    Container,
}

/// Active resolution strategy of a length cell
#[derive(Clone)]
pub enum Strategy {
    Unresolved,
    Fixed(f32),
    Percentage(f32),
    AutoContent,
    AutoContainer,
    Expression(Expression),
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Unresolved => StrategyKind::Unresolved,
            Strategy::Fixed(_) => StrategyKind::Fixed,
            Strategy::Percentage(_) => StrategyKind::Percentage,
            Strategy::AutoContent => StrategyKind::AutoContent,
            Strategy::AutoContainer => StrategyKind::AutoContainer,
            Strategy::Expression(_) => StrategyKind::Expression,
        }
    }

    pub(crate) fn auto(auto: AutoStrategy) -> Self {
        match auto {
            AutoStrategy::Content => Strategy::AutoContent,
            AutoStrategy::Container => Strategy::AutoContainer,
        }
    }

    /// Whether the dependencies of this strategy follow the node tree
    pub(crate) fn is_structural(&self) -> bool {
        matches!(
            self,
            Strategy::Percentage(_) | Strategy::AutoContent | Strategy::AutoContainer
        )
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Unresolved => f.write_str("Unresolved"),
            Strategy::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            Strategy::Percentage(percent) => f.debug_tuple("Percentage").field(percent).finish(),
            Strategy::AutoContent => f.write_str("AutoContent"),
            Strategy::AutoContainer => f.write_str("AutoContainer"),
            Strategy::Expression(expr) => f.debug_tuple("Expression").field(expr).finish(),
        }
    }
}

/// Data-free tag of a [`Strategy`], one per state of a cell
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Unresolved,
    Fixed,
    Percentage,
    AutoContent,
    AutoContainer,
    Expression,
}

/// Value computed from other cells
#[derive(Clone)]
pub struct Expression {
    pub(crate) inputs: SmallVec<[LengthId; 5]>,
    pub(crate) combine: Combine,
}

impl Expression {
    pub fn new(inputs: impl IntoIterator<Item = LengthId>, combine: Combine) -> Self {
        Self {
            inputs: inputs.into_iter().collect(),
            combine,
        }
    }

    /// Sum of every input
    pub fn sum(inputs: impl IntoIterator<Item = LengthId>) -> Self {
        Self::new(inputs, sum())
    }

    pub fn inputs(&self) -> &[LengthId] {
        &self.inputs
    }

    pub(crate) fn evaluate(&self, values: &[f32]) -> f32 {
        (self.combine)(values)
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}

/// Combinator adding every input
pub fn sum() -> Combine {
    Rc::new(|values: &[f32]| values.iter().sum())
}

/// Combinator returning the first input minus every following one
pub fn difference() -> Combine {
    Rc::new(|values: &[f32]| match values.split_first() {
        Some((first, rest)) => rest.iter().fold(*first, |acc, value| acc - value),
        None => 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_and_difference() {
        assert_eq!(sum()(&[1.0, 2.0, 3.5]), 6.5);
        assert_eq!(sum()(&[]), 0.0);
        assert_eq!(difference()(&[10.0, 2.0, 3.0]), 5.0);
        assert_eq!(difference()(&[]), 0.0);
    }

    #[test]
    fn test_kind_and_structural() {
        assert_eq!(Strategy::Fixed(1.0).kind(), StrategyKind::Fixed);
        assert_eq!(
            Strategy::auto(AutoStrategy::Container).kind(),
            StrategyKind::AutoContainer
        );
        assert!(Strategy::Percentage(50.0).is_structural());
        assert!(!Strategy::Fixed(0.0).is_structural());
        assert!(!Strategy::Unresolved.is_structural());
    }
}
