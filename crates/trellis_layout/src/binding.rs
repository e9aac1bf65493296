//! Binding requests
//!
//! A [`LengthRequest`] is a validated description of how a cell should
//! resolve. It can be built ahead of time, parsed from a literal and applied
//! to any number of cells.

use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::axis::Axis;
use crate::error::{LayoutError, Result};
use crate::graph::{LayoutGraph, LengthId, NodeId};
use crate::parse::{parse_literal, Literal};
use crate::strategy::{AutoStrategy, Combine, StrategyKind};

/// Combinator plus one to five input cells
#[derive(Clone)]
pub struct ExpressionRequest {
    inputs: SmallVec<[LengthId; 5]>,
    combine: Combine,
}

impl ExpressionRequest {
    pub const MAX_INPUTS: usize = 5;

    pub fn new(inputs: &[LengthId], combine: Combine) -> Result<Self> {
        if inputs.is_empty() || inputs.len() > Self::MAX_INPUTS {
            return Err(LayoutError::ExpressionArity(inputs.len()));
        }
        Ok(Self {
            inputs: inputs.iter().copied().collect(),
            combine,
        })
    }

    pub fn sum(inputs: &[LengthId]) -> Result<Self> {
        Self::new(inputs, crate::strategy::sum())
    }

    pub fn inputs(&self) -> &[LengthId] {
        &self.inputs
    }
}

impl fmt::Debug for ExpressionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionRequest")
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}

/// How a length should resolve
#[derive(Clone, Debug)]
pub enum LengthRequest {
    Fixed(f32),
    Percent(f32),
    Auto(AutoStrategy),
    Expression(ExpressionRequest),
}

impl LengthRequest {
    pub fn fixed(value: f32) -> Result<Self> {
        finite(value).map(LengthRequest::Fixed)
    }

    pub fn percent(percent: f32) -> Result<Self> {
        finite(percent).map(LengthRequest::Percent)
    }

    pub fn content() -> Self {
        LengthRequest::Auto(AutoStrategy::Content)
    }

    pub fn fill() -> Self {
        LengthRequest::Auto(AutoStrategy::Container)
    }

    pub fn expression(inputs: &[LengthId], combine: Combine) -> Result<Self> {
        ExpressionRequest::new(inputs, combine).map(LengthRequest::Expression)
    }

    pub fn sum(inputs: &[LengthId]) -> Result<Self> {
        ExpressionRequest::sum(inputs).map(LengthRequest::Expression)
    }

    /// Parse a literal such as `12px`, `50%`, `auto` or `fill`
    pub fn parse(input: &str) -> Result<Self> {
        Ok(match parse_literal(input)? {
            Literal::Points(value) => LengthRequest::Fixed(value),
            Literal::Percent(percent) => LengthRequest::Percent(percent),
            Literal::Auto(auto) => LengthRequest::Auto(auto),
        })
    }

    /// Strategy the request installs
    pub fn kind(&self) -> StrategyKind {
        match self {
            LengthRequest::Fixed(_) => StrategyKind::Fixed,
            LengthRequest::Percent(_) => StrategyKind::Percentage,
            LengthRequest::Auto(AutoStrategy::Content) => StrategyKind::AutoContent,
            LengthRequest::Auto(AutoStrategy::Container) => StrategyKind::AutoContainer,
            LengthRequest::Expression(_) => StrategyKind::Expression,
        }
    }
}

impl FromStr for LengthRequest {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<AutoStrategy> for LengthRequest {
    fn from(auto: AutoStrategy) -> Self {
        LengthRequest::Auto(auto)
    }
}

fn finite(value: f32) -> Result<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(LayoutError::NonFinite(value))
    }
}

impl LayoutGraph {
    /// Install a request on a cell
    pub fn apply(&mut self, target: LengthId, request: &LengthRequest) -> Result<()> {
        match request {
            LengthRequest::Fixed(value) => self.set_fixed(target, *value),
            LengthRequest::Percent(percent) => self.set_percentage(target, *percent),
            LengthRequest::Auto(auto) => self.set_auto(target, *auto),
            LengthRequest::Expression(expr) => {
                self.bind_to(target, &expr.inputs, expr.combine.clone())
            }
        }
    }

    /// Install a request on `node`'s cell for `axis`
    pub fn apply_to(&mut self, node: NodeId, axis: Axis, request: &LengthRequest) -> Result<()> {
        let target = self.try_cell(node, axis)?;
        self.apply(target, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_constructors_validate() {
        assert!(matches!(
            LengthRequest::fixed(f32::NAN),
            Err(LayoutError::NonFinite(_))
        ));
        assert!(LengthRequest::percent(f32::NEG_INFINITY).is_err());
        assert_eq!(LengthRequest::fixed(3.0).unwrap().kind(), StrategyKind::Fixed);
        assert_eq!(LengthRequest::fill().kind(), StrategyKind::AutoContainer);
    }

    #[test]
    fn test_expression_arity() {
        let mut graph = LayoutGraph::new();
        let node = graph.create_node();
        let cells: Vec<_> = Axis::ALL.iter().map(|axis| graph.cell(node, *axis)).collect();

        assert_eq!(
            LengthRequest::sum(&[]).unwrap_err(),
            LayoutError::ExpressionArity(0)
        );
        assert_eq!(
            LengthRequest::sum(&cells[..6]).unwrap_err(),
            LayoutError::ExpressionArity(6)
        );
        let request = LengthRequest::sum(&cells[..5]).unwrap();
        assert_eq!(request.kind(), StrategyKind::Expression);
    }

    #[test]
    fn test_apply_dispatches_and_replaces() {
        let mut graph = LayoutGraph::new();
        let parent = graph.create_node();
        graph.set_fixed(graph.cell(parent, Axis::Width), 400.0).unwrap();
        let child = graph.create_node();
        graph.append_child(parent, child).unwrap();

        let width = graph.cell(child, Axis::Width);
        graph.apply(width, &"25%".parse().unwrap()).unwrap();
        assert_eq!(graph.value(width), 100.0);

        graph.apply(width, &LengthRequest::fixed(40.0).unwrap()).unwrap();
        assert_eq!(graph.value(width), 40.0);
        assert!(graph.dependencies(width).is_empty());

        let x = graph.cell(child, Axis::X);
        let double = LengthRequest::expression(&[width], Rc::new(|v: &[f32]| v[0] * 2.0)).unwrap();
        graph.apply(x, &double).unwrap();
        assert_eq!(graph.value(x), 80.0);
        assert_eq!(graph.dependencies(x), &[width]);
    }

    #[test]
    fn test_apply_surfaces_setter_errors() {
        let mut graph = LayoutGraph::new();
        let node = graph.create_node();
        let x = graph.cell(node, Axis::X);

        assert!(matches!(
            graph.apply_to(node, Axis::X, &LengthRequest::sum(&[x]).unwrap()),
            Err(LayoutError::SelfBinding(_))
        ));
        assert!(matches!(
            graph.apply_to(node, Axis::Y, &LengthRequest::content()),
            Err(LayoutError::UnsupportedStrategy { axis: Axis::Y, .. })
        ));

        graph.dispose_node(node);
        assert_eq!(
            graph.apply_to(node, Axis::Width, &LengthRequest::fill()),
            Err(LayoutError::UnknownNode(node))
        );
    }

    #[test]
    fn test_parse_and_from() {
        assert!(matches!(
            LengthRequest::parse("12px"),
            Ok(LengthRequest::Fixed(v)) if v == 12.0
        ));
        assert!(matches!(
            "auto".parse::<LengthRequest>(),
            Ok(LengthRequest::Auto(AutoStrategy::Content))
        ));
        assert!(matches!(
            LengthRequest::from(AutoStrategy::Container),
            LengthRequest::Auto(AutoStrategy::Container)
        ));
        assert!(LengthRequest::parse("wide").is_err());
    }
}
