//! Stack arrangement
//!
//! A stack container positions its managed children one after another along
//! its primary axis. Every position is an expression binding over other
//! cells, so once a child is placed the engine keeps it in place as
//! siblings resize:
//!
//! - Vertical: `Y[i] = Y[i-1] + Height[i-1] + MarginBottom[i-1] + MarginTop[i]`
//! - Horizontal, Left: the same chain along X
//! - Horizontal, Right: the chain built backwards from the container's right edge
//! - Horizontal, Center: every child offset by half the unused width
//!
//! Appending a child to a Vertical or Left stack with no excluded children
//! only binds the new child. Anything else rebinds every managed child.

use std::rc::Rc;

use crate::axis::{Axis, Orientation};
use crate::error::Result;
use crate::graph::{Flow, LayoutGraph, LengthId, NodeId};
use crate::strategy::{difference, sum, Combine, Expression, Strategy};

/// Primary axis of a stack
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StackDirection {
    #[default]
    Vertical,
    Horizontal,
}

impl StackDirection {
    pub fn orientation(self) -> Orientation {
        match self {
            StackDirection::Vertical => Orientation::Vertical,
            StackDirection::Horizontal => Orientation::Horizontal,
        }
    }
}

/// Placement of a horizontal stack's row
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HorizontalAlignment {
    #[default]
    Left,
    Right,
    Center,
}

/// Stack settings of a container node
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StackLayout {
    pub direction: StackDirection,
    /// Only meaningful for horizontal stacks
    pub alignment: HorizontalAlignment,
}

impl StackLayout {
    pub fn vertical() -> Self {
        Self {
            direction: StackDirection::Vertical,
            alignment: HorizontalAlignment::Left,
        }
    }

    pub fn horizontal(alignment: HorizontalAlignment) -> Self {
        Self {
            direction: StackDirection::Horizontal,
            alignment,
        }
    }

    /// Whether appending can extend the existing chain
    fn chains_forward(&self) -> bool {
        match self.direction {
            StackDirection::Vertical => true,
            StackDirection::Horizontal => self.alignment == HorizontalAlignment::Left,
        }
    }
}

/// Kind of arrangement pass a stack ran
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arrangement {
    /// Only the appended child was bound
    Incremental { container: NodeId, child: NodeId },
    /// Every managed child was rebound
    Full { container: NodeId, children: usize },
}

impl LayoutGraph {
    /// Turn `node` into a stack container, or back into a plain one
    ///
    /// Children are detached and re-attached in order so every chain binding
    /// is rebuilt from scratch.
    pub fn set_stack(&mut self, node: NodeId, stack: Option<StackLayout>) -> Result<()> {
        self.require_node(node)?;
        if self.nodes[node].stack == stack {
            return Ok(());
        }
        self.rebuild_children(node, |graph| graph.nodes[node].stack = stack);
        Ok(())
    }

    /// Change a stack's direction, making `node` a stack if it was not one
    pub fn set_direction(&mut self, node: NodeId, direction: StackDirection) -> Result<()> {
        self.require_node(node)?;
        let current = self.nodes[node].stack.unwrap_or_default();
        self.set_stack(node, Some(StackLayout { direction, ..current }))
    }

    /// Change a stack's horizontal alignment, making `node` a stack if needed
    pub fn set_alignment(&mut self, node: NodeId, alignment: HorizontalAlignment) -> Result<()> {
        self.require_node(node)?;
        let current = self.nodes[node].stack.unwrap_or_default();
        self.set_stack(node, Some(StackLayout { alignment, ..current }))
    }

    /// Detach every child, run `change`, then re-attach them in order
    fn rebuild_children(&mut self, node: NodeId, change: impl FnOnce(&mut Self)) {
        let children = self.nodes[node].children.clone();
        let container = self.container_cells(node);

        self.with_suspended(&container, |graph| {
            for child in children.iter().rev() {
                graph.detach_deferred(node, *child);
            }
            change(graph);
            for (index, child) in children.iter().enumerate() {
                graph.attach_deferred(node, *child, index);
            }
            graph.arrange_full(node);
            graph.refresh_container(node);
        });
    }

    pub(crate) fn container_cells(&self, node: NodeId) -> [LengthId; 2] {
        [self.cell(node, Axis::Width), self.cell(node, Axis::Height)]
    }

    /// Position a newly attached child, taking the chain fast path if allowed
    pub(crate) fn arrange_after_insert(&mut self, container: NodeId, child: NodeId) {
        let Some(stack) = self.nodes[container].stack else {
            return;
        };
        if self.flow(child) != Flow::InFlow {
            return;
        }

        let children = &self.nodes[container].children;
        let appended = children.last() == Some(&child);
        let any_excluded = children
            .iter()
            .any(|sibling| self.flow(*sibling) == Flow::Excluded);

        if appended && !any_excluded && stack.chains_forward() {
            let managed = self.managed_children(container);
            let index = managed.len() - 1;
            self.place_child(container, stack, &managed, index);
            self.last_arrangement = Some(Arrangement::Incremental { container, child });
            tracing::debug!(?container, ?child, "stack chain extended");
        } else {
            self.arrange_full(container);
        }
    }

    /// Rebind every managed child of a stack
    pub(crate) fn arrange_full(&mut self, container: NodeId) {
        let Some(stack) = self.nodes.get(container).and_then(|n| n.stack) else {
            return;
        };
        let managed = self.managed_children(container);

        // Anchors are placed first so each position fires at most once.
        let order: Vec<usize> = if stack.direction == StackDirection::Horizontal
            && stack.alignment == HorizontalAlignment::Right
        {
            (0..managed.len()).rev().collect()
        } else {
            (0..managed.len()).collect()
        };

        let mut suspended = Vec::with_capacity(managed.len() * 2);
        for index in &order {
            suspended.push(self.cell(managed[*index], Axis::X));
            suspended.push(self.cell(managed[*index], Axis::Y));
        }

        self.with_suspended(&suspended, |graph| {
            for index in &order {
                graph.place_child(container, stack, &managed, *index);
            }
        });

        self.last_arrangement = Some(Arrangement::Full {
            container,
            children: managed.len(),
        });
        tracing::debug!(
            ?container,
            children = managed.len(),
            direction = ?stack.direction,
            alignment = ?stack.alignment,
            "stack fully arranged"
        );
    }

    /// Reset the arranger's position bindings of a child leaving the flow
    pub(crate) fn release_child(&mut self, child: NodeId) {
        let Some(node) = self.nodes.get_mut(child) else {
            return;
        };
        if !node.stack_positioned {
            return;
        }
        node.stack_positioned = false;
        for axis in [Axis::X, Axis::Y] {
            let id = self.cell(child, axis);
            self.install(id, Strategy::Fixed(0.0));
        }
    }

    fn place_child(
        &mut self,
        container: NodeId,
        stack: StackLayout,
        managed: &[NodeId],
        index: usize,
    ) {
        let child = managed[index];
        let primary = stack.direction.orientation();
        let cross = primary.cross();

        let cross_binding = self.leading_binding(container, child, cross);
        self.install(self.cell(child, cross.position()), cross_binding);

        let primary_binding = match (stack.direction, stack.alignment) {
            (StackDirection::Vertical, _) | (StackDirection::Horizontal, HorizontalAlignment::Left) => {
                match index.checked_sub(1) {
                    Some(previous) => self.chain_after(managed[previous], child, primary),
                    None => self.leading_binding(container, child, primary),
                }
            }
            (StackDirection::Horizontal, HorizontalAlignment::Right) => match managed.get(index + 1) {
                Some(next) => self.chain_before(*next, child),
                None => self.trailing_binding(container, child),
            },
            (StackDirection::Horizontal, HorizontalAlignment::Center) => {
                self.centered_binding(container, managed, index)
            }
        };
        self.install(self.cell(child, primary.position()), primary_binding);
        self.nodes[child].stack_positioned = true;
    }

    /// `padding + border + margin` on the leading side
    fn leading_binding(&self, container: NodeId, child: NodeId, orientation: Orientation) -> Strategy {
        Strategy::Expression(Expression::new(
            [
                self.cell(container, orientation.leading_padding()),
                self.cell(container, orientation.leading_border()),
                self.cell(child, orientation.leading_margin()),
            ],
            sum(),
        ))
    }

    /// Previous sibling's far edge plus this child's leading margin
    fn chain_after(&self, previous: NodeId, child: NodeId, orientation: Orientation) -> Strategy {
        Strategy::Expression(Expression::new(
            [
                self.cell(previous, orientation.position()),
                self.cell(previous, orientation.size()),
                self.cell(previous, orientation.trailing_margin()),
                self.cell(child, orientation.leading_margin()),
            ],
            sum(),
        ))
    }

    /// Next sibling's left edge minus this child's width and right margin
    fn chain_before(&self, next: NodeId, child: NodeId) -> Strategy {
        Strategy::Expression(Expression::new(
            [
                self.cell(next, Axis::X),
                self.cell(next, Axis::MarginLeft),
                self.cell(child, Axis::MarginRight),
                self.cell(child, Axis::Width),
            ],
            difference(),
        ))
    }

    /// Container's inner right edge minus this child's width and right margin
    fn trailing_binding(&self, container: NodeId, child: NodeId) -> Strategy {
        Strategy::Expression(Expression::new(
            [
                self.cell(container, Axis::Width),
                self.cell(container, Axis::PaddingRight),
                self.cell(container, Axis::BorderRight),
                self.cell(child, Axis::MarginRight),
                self.cell(child, Axis::Width),
            ],
            difference(),
        ))
    }

    /// Offset by half the unused width plus every preceding sibling
    fn centered_binding(&self, container: NodeId, managed: &[NodeId], index: usize) -> Strategy {
        let mut inputs = Vec::with_capacity(CENTER_HEADER + managed.len() * CENTER_STRIDE);
        inputs.extend([
            self.cell(container, Axis::Width),
            self.cell(container, Axis::PaddingLeft),
            self.cell(container, Axis::PaddingRight),
            self.cell(container, Axis::BorderLeft),
            self.cell(container, Axis::BorderRight),
        ]);
        for sibling in managed {
            inputs.extend([
                self.cell(*sibling, Axis::MarginLeft),
                self.cell(*sibling, Axis::Width),
                self.cell(*sibling, Axis::MarginRight),
            ]);
        }
        Strategy::Expression(Expression::new(inputs, centered(index)))
    }
}

const CENTER_HEADER: usize = 5;
const CENTER_STRIDE: usize = 3;

/// Combinator for the `index`th child of a centered row
///
/// Inputs: container width, padding left/right, border left/right, then
/// margin-left, width, margin-right of every managed child.
fn centered(index: usize) -> Combine {
    Rc::new(move |values: &[f32]| {
        let (header, row) = values.split_at(CENTER_HEADER.min(values.len()));
        let [width, padding_left, padding_right, border_left, border_right] = match header {
            [a, b, c, d, e] => [*a, *b, *c, *d, *e],
            _ => return 0.0,
        };
        let totals = row
            .chunks_exact(CENTER_STRIDE)
            .map(|child| child[0] + child[1] + child[2]);
        let row_width: f32 = totals.clone().sum();
        let before: f32 = totals.take(index).sum();
        let margin_left = row.get(index * CENTER_STRIDE).copied().unwrap_or(0.0);

        let inset = padding_left + padding_right + border_left + border_right;
        let push_right = (width - inset - row_width) / 2.0;
        padding_left + border_left + push_right + before + margin_left
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(graph: &mut LayoutGraph, width: f32, height: f32) -> NodeId {
        let node = graph.create_node();
        graph.set_fixed(graph.cell(node, Axis::Width), width).unwrap();
        graph.set_fixed(graph.cell(node, Axis::Height), height).unwrap();
        node
    }

    #[test]
    fn test_centered_combinator() {
        // width 100, no inset, children totals 20 and 30
        let values = [
            100.0, 0.0, 0.0, 0.0, 0.0, //
            0.0, 20.0, 0.0, //
            5.0, 20.0, 5.0,
        ];
        assert_eq!(centered(0)(&values), 25.0);
        assert_eq!(centered(1)(&values), 50.0);
        assert_eq!(centered(0)(&[]), 0.0);
    }

    #[test]
    fn test_vertical_chain() {
        let mut graph = LayoutGraph::new();
        let stack = graph.create_stack(StackLayout::vertical());
        let a = child(&mut graph, 10.0, 20.0);
        let b = child(&mut graph, 10.0, 30.0);
        graph.append_child(stack, a).unwrap();
        graph.append_child(stack, b).unwrap();

        assert_eq!(graph.get(a, Axis::Y), 0.0);
        assert_eq!(graph.get(b, Axis::Y), 20.0);
        assert_eq!(graph.get(stack, Axis::Height), 50.0);

        graph.set_fixed(graph.cell(a, Axis::Height), 25.0).unwrap();
        assert_eq!(graph.get(b, Axis::Y), 25.0);
        assert_eq!(graph.get(stack, Axis::Height), 55.0);
    }

    #[test]
    fn test_append_uses_fast_path_only_when_chaining_forward() {
        let mut graph = LayoutGraph::new();
        let stack = graph.create_stack(StackLayout::horizontal(HorizontalAlignment::Left));
        let a = child(&mut graph, 10.0, 10.0);
        let b = child(&mut graph, 10.0, 10.0);
        graph.append_child(stack, a).unwrap();
        graph.append_child(stack, b).unwrap();
        assert_eq!(
            graph.last_arrangement(),
            Some(Arrangement::Incremental { container: stack, child: b })
        );

        let right = graph.create_stack(StackLayout::horizontal(HorizontalAlignment::Right));
        let c = child(&mut graph, 10.0, 10.0);
        graph.append_child(right, c).unwrap();
        assert_eq!(
            graph.last_arrangement(),
            Some(Arrangement::Full { container: right, children: 1 })
        );
    }

    #[test]
    fn test_right_alignment_anchors_to_right_edge() {
        let mut graph = LayoutGraph::new();
        let stack = graph.create_stack(StackLayout::horizontal(HorizontalAlignment::Right));
        graph.set_fixed(graph.cell(stack, Axis::Width), 200.0).unwrap();
        graph.set_fixed(graph.cell(stack, Axis::PaddingRight), 10.0).unwrap();

        let a = child(&mut graph, 30.0, 10.0);
        let b = child(&mut graph, 40.0, 10.0);
        graph.set_fixed(graph.cell(b, Axis::MarginLeft), 5.0).unwrap();
        graph.append_children(stack, &[a, b]).unwrap();

        assert_eq!(graph.get(b, Axis::X), 150.0);
        assert_eq!(graph.get(a, Axis::X), 115.0);

        graph.set_fixed(graph.cell(stack, Axis::Width), 300.0).unwrap();
        assert_eq!(graph.get(b, Axis::X), 250.0);
        assert_eq!(graph.get(a, Axis::X), 215.0);
    }

    #[test]
    fn test_direction_switch_rebuilds_chain() {
        let mut graph = LayoutGraph::new();
        let stack = graph.create_stack(StackLayout::vertical());
        let a = child(&mut graph, 10.0, 20.0);
        let b = child(&mut graph, 15.0, 30.0);
        graph.append_children(stack, &[a, b]).unwrap();
        assert_eq!(graph.get(b, Axis::Y), 20.0);

        graph.set_direction(stack, StackDirection::Horizontal).unwrap();
        assert_eq!(graph.children(stack), &[a, b]);
        assert_eq!(graph.get(b, Axis::Y), 0.0);
        assert_eq!(graph.get(b, Axis::X), 10.0);

        // The old vertical chain no longer drives b's Y.
        graph.set_fixed(graph.cell(a, Axis::Height), 99.0).unwrap();
        assert_eq!(graph.get(b, Axis::Y), 0.0);
        assert!(!graph
            .dependents(graph.cell(a, Axis::Height))
            .contains(&graph.cell(b, Axis::Y)));
    }

    #[test]
    fn test_set_stack_none_releases_children() {
        let mut graph = LayoutGraph::new();
        let stack = graph.create_stack(StackLayout::vertical());
        let a = child(&mut graph, 10.0, 20.0);
        let b = child(&mut graph, 10.0, 20.0);
        graph.append_children(stack, &[a, b]).unwrap();
        assert_eq!(graph.get(b, Axis::Y), 20.0);

        graph.set_stack(stack, None).unwrap();
        assert_eq!(graph.get(b, Axis::Y), 0.0);
        assert_eq!(
            graph.strategy_kind(graph.cell(b, Axis::Y)),
            Some(crate::StrategyKind::Fixed)
        );
    }
}
