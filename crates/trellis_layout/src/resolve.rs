//! Strategy evaluation
//!
//! [`LayoutGraph::evaluate`] computes the value a cell's strategy yields
//! right now, and [`LayoutGraph::implied_dependencies`] lists the cells that
//! evaluation reads. The two are kept side by side so that reading a cell in
//! one always means depending on it in the other.
//!
//! Positions are relative to the parent's border box, so a child's leading
//! edge already includes the parent's leading padding and border.

use smallvec::SmallVec;

use crate::axis::{Axis, Orientation};
use crate::graph::{LayoutGraph, LengthId, NodeId};
use crate::stack::{HorizontalAlignment, StackDirection};
use crate::strategy::Strategy;

pub(crate) type Dependencies = SmallVec<[LengthId; 8]>;

impl LayoutGraph {
    /// Value the cell's strategy resolves to, before clamping
    pub(crate) fn evaluate(&mut self, id: LengthId) -> f32 {
        let cell = &self.cells[id];
        let axis = cell.axis;
        let owner = cell.owner;

        // Content measurement may fill the cache, so it needs `&mut self`.
        if matches!(cell.strategy, Strategy::AutoContent) {
            return self.resolve_content(owner, axis.orientation());
        }

        let cell = &self.cells[id];
        match &cell.strategy {
            Strategy::Unresolved | Strategy::AutoContent => cell.value,
            Strategy::Fixed(value) => *value,
            Strategy::Percentage(percent) => self.resolve_percentage(owner, axis, *percent),
            Strategy::AutoContainer => self.resolve_container(owner, axis.orientation()),
            Strategy::Expression(expr) => {
                let values: SmallVec<[f32; 8]> =
                    expr.inputs.iter().map(|input| self.value(*input)).collect();
                expr.evaluate(&values)
            }
        }
    }

    /// Cells read by the cell's current strategy
    pub(crate) fn implied_dependencies(&self, id: LengthId) -> Dependencies {
        let cell = &self.cells[id];
        let owner = cell.owner;
        let orientation = cell.axis.orientation();

        match &cell.strategy {
            Strategy::Unresolved | Strategy::Fixed(_) => Dependencies::new(),
            Strategy::Percentage(_) => match self.parent(owner) {
                Some(parent) => {
                    let mut deps = Dependencies::new();
                    deps.push(self.cell(parent, orientation.size()));
                    deps.extend(self.inset_cells(parent, orientation));
                    deps
                }
                None => Dependencies::new(),
            },
            Strategy::AutoContent => self.content_dependencies(owner, orientation),
            Strategy::AutoContainer => self.container_dependencies(owner, orientation),
            Strategy::Expression(expr) => expr.inputs.iter().copied().collect(),
        }
    }

    fn resolve_percentage(&self, owner: NodeId, axis: Axis, percent: f32) -> f32 {
        let Some(parent) = self.parent(owner) else {
            return 0.0;
        };
        let orientation = axis.orientation();
        let size = self.cell_value(parent, orientation.size());
        let inset = self.inset(parent, orientation);

        // Full size with no inset reads the parent unmultiplied.
        if percent == 100.0 && inset == 0.0 {
            return size;
        }
        ((size - inset) * percent / 100.0).max(0.0)
    }

    fn resolve_content(&mut self, owner: NodeId, orientation: Orientation) -> f32 {
        let inset = self.inset(owner, orientation);
        if self.providers.contains_key(owner) {
            return self.measure(owner, orientation) + inset;
        }

        let children = self.managed_children(owner);
        if children.is_empty() {
            return inset;
        }

        let trailing = self.cell_value(owner, orientation.trailing_padding())
            + self.cell_value(owner, orientation.trailing_border());

        match self.content_rule(owner, orientation) {
            ContentRule::Sum => {
                let total: f32 = children
                    .iter()
                    .map(|child| self.total_extent(*child, orientation))
                    .sum();
                total + inset
            }
            ContentRule::LastEdge => {
                let last = children[children.len() - 1];
                self.far_edge(last, orientation) + trailing
            }
            ContentRule::MaxEdge => {
                let furthest = children
                    .iter()
                    .map(|child| self.far_edge(*child, orientation))
                    .fold(0.0_f32, f32::max);
                furthest + trailing
            }
        }
    }

    fn content_dependencies(&self, owner: NodeId, orientation: Orientation) -> Dependencies {
        let mut deps: Dependencies = self.inset_cells(owner, orientation).into_iter().collect();
        let children = self.managed_children(owner);

        if let Some(provider) = self.providers.get(owner) {
            if provider.depends_on_children() {
                for child in &children {
                    deps.extend(self.extent_cells(*child, orientation, true));
                }
            }
            return deps;
        }

        match self.content_rule(owner, orientation) {
            ContentRule::Sum => {
                for child in &children {
                    deps.extend(self.extent_cells(*child, orientation, false));
                }
            }
            ContentRule::LastEdge => {
                if let Some(last) = children.last() {
                    deps.extend(self.edge_cells(*last, orientation));
                }
            }
            ContentRule::MaxEdge => {
                for child in &children {
                    deps.extend(self.edge_cells(*child, orientation));
                }
            }
        }
        deps
    }

    fn content_rule(&self, owner: NodeId, orientation: Orientation) -> ContentRule {
        match self.stack(owner) {
            Some(stack) if stack.direction.orientation() == orientation => {
                match stack.direction {
                    StackDirection::Horizontal => ContentRule::Sum,
                    StackDirection::Vertical => ContentRule::LastEdge,
                }
            }
            _ => ContentRule::MaxEdge,
        }
    }

    fn resolve_container(&self, owner: NodeId, orientation: Orientation) -> f32 {
        let Some(parent) = self.parent(owner) else {
            return 0.0;
        };
        let parent_size = self.cell_value(parent, orientation.size());
        let inset = self.inset(parent, orientation);

        match self.share_context(owner, parent, orientation) {
            Some((siblings, centered)) => {
                let mut used = 0.0;
                let mut shares = 0_u32;
                for sibling in &siblings {
                    used += self.cell_value(*sibling, orientation.leading_margin())
                        + self.cell_value(*sibling, orientation.trailing_margin());
                    if self.shares_leftover(*sibling, orientation) {
                        shares += 1;
                    } else {
                        used += self.cell_value(*sibling, orientation.size());
                    }
                }
                if centered {
                    shares += 2;
                }
                if shares == 0 {
                    return 0.0;
                }
                ((parent_size - used - inset) / shares as f32).max(0.0)
            }
            None => {
                let margins = self.cell_value(owner, orientation.leading_margin())
                    + self.cell_value(owner, orientation.trailing_margin());
                (parent_size - inset - margins).max(0.0)
            }
        }
    }

    fn container_dependencies(&self, owner: NodeId, orientation: Orientation) -> Dependencies {
        let Some(parent) = self.parent(owner) else {
            return Dependencies::new();
        };
        let mut deps = Dependencies::new();
        deps.push(self.cell(parent, orientation.size()));
        deps.extend(self.inset_cells(parent, orientation));

        match self.share_context(owner, parent, orientation) {
            Some((siblings, _)) => {
                for sibling in siblings {
                    deps.push(self.cell(sibling, orientation.leading_margin()));
                    deps.push(self.cell(sibling, orientation.trailing_margin()));
                    if !self.shares_leftover(sibling, orientation) {
                        deps.push(self.cell(sibling, orientation.size()));
                    }
                }
            }
            None => {
                deps.push(self.cell(owner, orientation.leading_margin()));
                deps.push(self.cell(owner, orientation.trailing_margin()));
            }
        }
        deps
    }

    /// Siblings splitting the parent's primary axis with `owner`, if any
    ///
    /// Returns `None` on the cross axis, under a non-stack parent, or when
    /// `owner` itself is not managed.
    fn share_context(
        &self,
        owner: NodeId,
        parent: NodeId,
        orientation: Orientation,
    ) -> Option<(Vec<NodeId>, bool)> {
        let stack = self.stack(parent)?;
        if stack.direction.orientation() != orientation {
            return None;
        }
        let siblings = self.managed_children(parent);
        if !siblings.contains(&owner) {
            return None;
        }
        let centered = stack.direction == StackDirection::Horizontal
            && stack.alignment == HorizontalAlignment::Center;
        Some((siblings, centered))
    }

    fn shares_leftover(&self, node: NodeId, orientation: Orientation) -> bool {
        let id = self.cell(node, orientation.size());
        matches!(self.cells[id].strategy, Strategy::AutoContainer)
    }

    /// Leading margin + size + trailing margin
    pub(crate) fn total_extent(&self, node: NodeId, orientation: Orientation) -> f32 {
        self.cell_value(node, orientation.leading_margin())
            + self.cell_value(node, orientation.size())
            + self.cell_value(node, orientation.trailing_margin())
    }

    /// Position + size + trailing margin
    fn far_edge(&self, node: NodeId, orientation: Orientation) -> f32 {
        self.cell_value(node, orientation.position())
            + self.cell_value(node, orientation.size())
            + self.cell_value(node, orientation.trailing_margin())
    }

    fn extent_cells(&self, node: NodeId, orientation: Orientation, with_position: bool) -> Dependencies {
        let mut deps = Dependencies::new();
        if with_position {
            deps.push(self.cell(node, orientation.position()));
        }
        deps.push(self.cell(node, orientation.leading_margin()));
        deps.push(self.cell(node, orientation.size()));
        deps.push(self.cell(node, orientation.trailing_margin()));
        deps
    }

    fn edge_cells(&self, node: NodeId, orientation: Orientation) -> [LengthId; 3] {
        [
            self.cell(node, orientation.position()),
            self.cell(node, orientation.size()),
            self.cell(node, orientation.trailing_margin()),
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ContentRule {
    /// Children laid end to end along a horizontal stack
    Sum,
    /// Bottom edge of a vertical stack's last child
    LastEdge,
    /// Furthest far edge of any child
    MaxEdge,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Flow;
    use crate::strategy::{AutoStrategy, StrategyKind};
    use std::cell::Cell;
    use std::rc::Rc;

    fn sized(graph: &mut LayoutGraph, width: f32, height: f32) -> NodeId {
        let node = graph.create_node();
        graph.set_fixed(graph.cell(node, Axis::Width), width).unwrap();
        graph.set_fixed(graph.cell(node, Axis::Height), height).unwrap();
        node
    }

    #[test]
    fn test_percentage_of_parent_inner_size() {
        let mut graph = LayoutGraph::new();
        let parent = sized(&mut graph, 300.0, 100.0);
        graph.set_fixed(graph.cell(parent, Axis::PaddingLeft), 10.0).unwrap();
        graph.set_fixed(graph.cell(parent, Axis::BorderRight), 10.0).unwrap();

        let child = graph.create_node();
        let width = graph.cell(child, Axis::Width);
        graph.set_percentage(width, 50.0).unwrap();
        assert_eq!(graph.value(width), 0.0);

        graph.append_child(parent, child).unwrap();
        assert_eq!(graph.value(width), 140.0);

        graph.set_fixed(graph.cell(parent, Axis::Width), 420.0).unwrap();
        assert_eq!(graph.value(width), 200.0);

        graph.set_fixed(graph.cell(parent, Axis::PaddingLeft), 0.0).unwrap();
        assert_eq!(graph.value(width), 205.0);
    }

    #[test]
    fn test_full_percentage_reads_parent_directly() {
        let mut graph = LayoutGraph::new();
        let parent = sized(&mut graph, 333.3, 10.0);
        let child = graph.create_node();
        let height = graph.cell(child, Axis::Height);
        graph.set_percentage(height, 100.0).unwrap();
        graph.append_child(parent, child).unwrap();
        assert_eq!(graph.value(height), 10.0);

        let width = graph.cell(child, Axis::Width);
        graph.set_percentage(width, 100.0).unwrap();
        assert_eq!(graph.value(width), graph.get(parent, Axis::Width));
    }

    #[test]
    fn test_percentage_never_negative() {
        let mut graph = LayoutGraph::new();
        let parent = sized(&mut graph, 10.0, 10.0);
        graph.set_fixed(graph.cell(parent, Axis::PaddingLeft), 30.0).unwrap();
        let child = graph.create_node();
        graph.append_child(parent, child).unwrap();
        let width = graph.cell(child, Axis::Width);
        graph.set_percentage(width, 50.0).unwrap();
        assert_eq!(graph.value(width), 0.0);
    }

    #[test]
    fn test_percentage_to_fixed_stops_listening_to_parent() {
        let mut graph = LayoutGraph::new();
        let parent = sized(&mut graph, 200.0, 50.0);
        let child = graph.create_node();
        graph.append_child(parent, child).unwrap();
        let width = graph.cell(child, Axis::Width);
        let parent_width = graph.cell(parent, Axis::Width);

        graph.set_percentage(width, 25.0).unwrap();
        assert!(graph.dependents(parent_width).contains(&width));

        graph.set_fixed(width, 10.0).unwrap();
        assert!(!graph.dependents(parent_width).contains(&width));

        let recomputed = Rc::new(Cell::new(0));
        let sink = Rc::clone(&recomputed);
        graph
            .subscribe(width, move |_| sink.set(sink.get() + 1))
            .unwrap();
        graph.set_fixed(parent_width, 800.0).unwrap();
        assert_eq!(recomputed.get(), 0);
        assert_eq!(graph.value(width), 10.0);
    }

    #[test]
    fn test_auto_content_plain_container_tracks_furthest_child() {
        let mut graph = LayoutGraph::new();
        let parent = graph.create_node();
        graph.set_fixed(graph.cell(parent, Axis::PaddingBottom), 4.0).unwrap();

        let a = sized(&mut graph, 10.0, 20.0);
        let b = sized(&mut graph, 10.0, 15.0);
        graph.append_child(parent, a).unwrap();
        graph.append_child(parent, b).unwrap();
        graph.set_fixed(graph.cell(b, Axis::Y), 30.0).unwrap();

        let height = graph.cell(parent, Axis::Height);
        assert_eq!(graph.strategy_kind(height), Some(StrategyKind::AutoContent));
        assert_eq!(graph.value(height), 49.0);

        graph.set_fixed(graph.cell(a, Axis::Height), 100.0).unwrap();
        assert_eq!(graph.value(height), 104.0);
    }

    #[test]
    fn test_auto_content_without_children_is_inset() {
        let mut graph = LayoutGraph::new();
        let node = graph.create_node();
        graph.set_fixed(graph.cell(node, Axis::PaddingTop), 3.0).unwrap();
        graph.set_fixed(graph.cell(node, Axis::BorderBottom), 1.0).unwrap();
        assert_eq!(graph.get(node, Axis::Height), 4.0);
    }

    #[test]
    fn test_auto_content_ignores_unmanaged_children() {
        let mut graph = LayoutGraph::new();
        let parent = graph.create_node();
        let child = sized(&mut graph, 10.0, 40.0);
        graph.append_child(parent, child).unwrap();
        assert_eq!(graph.get(parent, Axis::Height), 40.0);

        graph.set_flow(child, Flow::Absolute).unwrap();
        assert_eq!(graph.get(parent, Axis::Height), 0.0);
    }

    #[test]
    fn test_auto_container_fills_non_stack_parent() {
        let mut graph = LayoutGraph::new();
        let parent = sized(&mut graph, 300.0, 100.0);
        graph.set_fixed(graph.cell(parent, Axis::PaddingLeft), 20.0).unwrap();
        let child = graph.create_node();
        graph.set_fixed(graph.cell(child, Axis::MarginRight), 30.0).unwrap();
        graph.append_child(parent, child).unwrap();

        let width = graph.cell(child, Axis::Width);
        assert_eq!(graph.strategy_kind(width), Some(StrategyKind::AutoContainer));
        assert_eq!(graph.value(width), 250.0);

        graph.set_auto(graph.cell(child, Axis::Height), AutoStrategy::Container).unwrap();
        assert_eq!(graph.get(child, Axis::Height), 100.0);
    }

    #[test]
    fn test_dependencies_match_strategy() {
        let mut graph = LayoutGraph::new();
        let parent = sized(&mut graph, 100.0, 100.0);
        let child = graph.create_node();
        graph.append_child(parent, child).unwrap();
        let width = graph.cell(child, Axis::Width);

        graph.set_percentage(width, 10.0).unwrap();
        let mut expected = vec![graph.cell(parent, Axis::Width)];
        expected.extend(graph.inset_cells(parent, Orientation::Horizontal));
        assert_eq!(graph.dependencies(width), expected.as_slice());

        graph.set_fixed(width, 1.0).unwrap();
        assert!(graph.dependencies(width).is_empty());
    }
}
