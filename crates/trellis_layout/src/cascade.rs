//! Update and cascade machinery
//!
//! Every strategy switch goes through [`LayoutGraph::clear`], which drops all
//! upstream edges and resets the cell to `Unresolved`, before the new
//! strategy is installed and wired. Updating a cell re-evaluates it, clamps
//! to its limits and, when the value moved by at least `epsilon`, notifies
//! dependents depth-first before the cell's external listeners.
//!
//! Suspended cells keep re-evaluating but hold back notifications; resuming
//! releases at most one cascade for the net change.

use smallvec::SmallVec;

use crate::axis::Axis;
use crate::error::{LayoutError, Result};
use crate::graph::{LayoutGraph, LengthChange, LengthId, NodeId, Suspension};
use crate::strategy::{AutoStrategy, Combine, Expression, Strategy, StrategyKind};

impl LayoutGraph {
    /// Pin a cell to a fixed value
    pub fn set_fixed(&mut self, id: LengthId, value: f32) -> Result<()> {
        self.require_cell(id)?;
        if !value.is_finite() {
            return Err(LayoutError::NonFinite(value));
        }
        self.install(id, Strategy::Fixed(value));
        Ok(())
    }

    /// Resolve a cell as a percentage of its parent's inner size
    pub fn set_percentage(&mut self, id: LengthId, percent: f32) -> Result<()> {
        self.require_cell(id)?;
        if !percent.is_finite() {
            return Err(LayoutError::NonFinite(percent));
        }
        self.install(id, Strategy::Percentage(percent));
        Ok(())
    }

    /// Size a cell from its content or from leftover parent space
    pub fn set_auto(&mut self, id: LengthId, auto: AutoStrategy) -> Result<()> {
        let axis = self.axis_of(id).ok_or(LayoutError::UnknownCell(id))?;
        let strategy = Strategy::auto(auto);
        if !axis.is_size() {
            return Err(LayoutError::UnsupportedStrategy {
                axis,
                strategy: strategy.kind(),
            });
        }

        if auto == AutoStrategy::Content {
            if let Some(owner) = self.owner_of(id) {
                if !self.providers.contains_key(owner) && self.children(owner).is_empty() {
                    tracing::warn!(
                        ?owner,
                        ?axis,
                        "auto content requested on a node without content provider or children, \
                         falling back to its children's extents"
                    );
                }
            }
        }

        self.install(id, strategy);
        Ok(())
    }

    /// Compute a cell from other cells
    pub fn bind_to(&mut self, id: LengthId, inputs: &[LengthId], combine: Combine) -> Result<()> {
        self.require_cell(id)?;
        if inputs.contains(&id) {
            tracing::warn!(cell = ?id, "rejected binding a length to itself");
            return Err(LayoutError::SelfBinding(id));
        }
        if let Some(missing) = inputs.iter().find(|input| !self.cells.contains_key(**input)) {
            return Err(LayoutError::UnknownCell(*missing));
        }
        self.install(id, Strategy::Expression(Expression::new(inputs.iter().copied(), combine)));
        Ok(())
    }

    /// Bind a cell to the sum of `inputs`
    pub fn bind_sum(&mut self, id: LengthId, inputs: &[LengthId]) -> Result<()> {
        self.bind_to(id, inputs, crate::strategy::sum())
    }

    /// Clamp a cell's resolved value
    pub fn set_limits(&mut self, id: LengthId, min: Option<f32>, max: Option<f32>) -> Result<()> {
        self.require_cell(id)?;
        for bound in [min, max].into_iter().flatten() {
            if !bound.is_finite() {
                return Err(LayoutError::NonFinite(bound));
            }
        }
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(LayoutError::InvalidLimits { min, max });
            }
        }

        let cell = &mut self.cells[id];
        cell.min = min;
        cell.max = max;
        self.update_cell(id);
        Ok(())
    }

    /// Drop every dependency of a cell and reset it to `Unresolved`
    ///
    /// The current value is kept until a new strategy resolves.
    pub fn clear(&mut self, id: LengthId) {
        let Some(cell) = self.cells.get(id) else {
            return;
        };
        let (axis, owner) = (cell.axis, cell.owner);
        let was_shared = matches!(cell.strategy, Strategy::AutoContainer);
        self.reset(id);
        if was_shared {
            self.refresh_sibling_shares(owner, axis);
        }
    }

    /// Re-evaluate a cell and cascade if its value changed
    pub fn update(&mut self, id: LengthId) {
        self.update_cell(id);
    }

    /// Hold back notifications from a cell
    ///
    /// Nested calls need a matching number of [`resume`](Self::resume) calls.
    pub fn suspend(&mut self, id: LengthId) {
        let Some(cell) = self.cells.get_mut(id) else {
            return;
        };
        match cell.suspension.as_mut() {
            Some(suspension) => suspension.depth += 1,
            None => {
                cell.suspension = Some(Suspension {
                    depth: 1,
                    value_at_suspend: cell.value,
                });
            }
        }
    }

    /// Release a suspension, cascading once if the value moved meanwhile
    pub fn resume(&mut self, id: LengthId) {
        let epsilon = self.config.epsilon;
        let Some(cell) = self.cells.get_mut(id) else {
            return;
        };
        let Some(suspension) = cell.suspension.as_mut() else {
            tracing::warn!(cell = ?id, "resume without matching suspend");
            return;
        };
        if suspension.depth > 1 {
            suspension.depth -= 1;
            return;
        }

        let before = suspension.value_at_suspend;
        cell.suspension = None;
        let now = cell.value;
        if (now - before).abs() >= epsilon {
            self.cascade(id, before, now);
        }
    }

    pub fn is_suspended(&self, id: LengthId) -> bool {
        self.cells
            .get(id)
            .is_some_and(|cell| cell.suspension.is_some())
    }

    /// Run `f` with `cells` suspended, resuming them in order afterwards
    pub fn with_suspended<R>(&mut self, cells: &[LengthId], f: impl FnOnce(&mut Self) -> R) -> R {
        for id in cells {
            self.suspend(*id);
        }
        let result = f(self);
        for id in cells {
            self.resume(*id);
        }
        result
    }

    /// Replace a cell's strategy, rewire it and resolve
    pub(crate) fn install(&mut self, id: LengthId, strategy: Strategy) {
        let Some(previous_kind) = self.strategy_kind(id) else {
            return;
        };
        self.reset(id);
        let cell = &mut self.cells[id];
        let axis = cell.axis;
        let owner = cell.owner;
        let kind = strategy.kind();
        cell.strategy = strategy;

        self.wire(id);
        self.update_cell(id);

        // Siblings sharing leftover space care whether this size is explicit.
        let was_shared = previous_kind == StrategyKind::AutoContainer;
        if axis.is_size() && (kind == StrategyKind::AutoContainer) != was_shared {
            self.refresh_sibling_shares(owner, axis);
        }
    }

    /// Recompute the edges implied by the current strategy and resolve
    pub(crate) fn rewire(&mut self, id: LengthId) {
        self.unwire(id);
        self.wire(id);
        self.update_cell(id);
    }

    /// Rewire a node's cells whose dependencies follow the tree shape
    pub(crate) fn rewire_structural(&mut self, node: NodeId) {
        let Some(n) = self.nodes.get(node) else {
            return;
        };
        let cells = n.cells;
        for id in cells {
            if self.cells[id].strategy.is_structural() {
                self.rewire(id);
            }
        }
    }

    /// Rewire the leftover-space cells of `node`'s siblings on `axis`
    pub(crate) fn refresh_sibling_shares(&mut self, node: NodeId, axis: Axis) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        for sibling in self.managed_children(parent) {
            if sibling == node {
                continue;
            }
            let id = self.cell(sibling, axis);
            if matches!(self.cells[id].strategy, Strategy::AutoContainer) {
                self.rewire(id);
            }
        }
    }

    fn reset(&mut self, id: LengthId) {
        if let Some(cell) = self.cells.get_mut(id) {
            cell.strategy = Strategy::Unresolved;
        }
        self.unwire(id);
    }

    fn wire(&mut self, id: LengthId) {
        let upstream = self.implied_dependencies(id);
        for dependency in upstream {
            self.link(dependency, id);
        }
    }

    /// Record that `id` reads `dependency`
    pub(crate) fn link(&mut self, dependency: LengthId, id: LengthId) {
        if dependency == id {
            tracing::warn!(cell = ?id, "skipped self dependency");
            return;
        }
        let Some(source) = self.cells.get_mut(dependency) else {
            return;
        };
        source.dependents.insert(id);
        if let Some(cell) = self.cells.get_mut(id) {
            cell.dependencies.insert(dependency);
        }
    }

    fn unwire(&mut self, id: LengthId) {
        let Some(cell) = self.cells.get_mut(id) else {
            return;
        };
        let upstream = cell.dependencies.take();
        for dependency in upstream {
            if let Some(source) = self.cells.get_mut(dependency) {
                source.dependents.remove(id);
            }
        }
    }

    pub(crate) fn update_cell(&mut self, id: LengthId) {
        if let Some((old, new)) = self.settle(id, 0) {
            self.cascade(id, old, new);
        }
    }

    /// Re-evaluate one cell and store the result
    ///
    /// Returns the change when dependents have to hear about it. `depth` is
    /// the number of cascades currently open above this cell.
    fn settle(&mut self, id: LengthId, depth: usize) -> Option<(f32, f32)> {
        if !self.cells.contains_key(id) {
            return None;
        }
        if self.in_flight.contains(&id) {
            tracing::warn!(cell = ?id, "dependency cycle detected, update skipped");
            return None;
        }
        // Open cascades are distinct in-flight cells, so an acyclic graph
        // never reaches this bound.
        let limit = self.config.max_cascade_depth.max(self.cells.len());
        if depth >= limit {
            tracing::warn!(cell = ?id, depth, "cascade depth limit reached, update skipped");
            return None;
        }

        let resolved = self.evaluate(id);
        let epsilon = self.config.epsilon;
        let strict = self.config.strict_non_finite;
        let cell = &mut self.cells[id];

        if !resolved.is_finite() {
            if strict {
                panic!(
                    "length {:?} ({:?}) resolved to non-finite value {}",
                    id, cell.axis, resolved
                );
            }
            tracing::error!(
                cell = ?id,
                axis = ?cell.axis,
                value = resolved,
                "ignoring non-finite resolved length"
            );
            return None;
        }

        let clamped = clamp(resolved, cell.min, cell.max);
        let old = cell.value;
        if (clamped - old).abs() < epsilon {
            return None;
        }
        cell.value = clamped;

        if cell.suspension.is_some() {
            tracing::trace!(cell = ?id, old, new = clamped, "suspended, cascade deferred");
            return None;
        }
        Some((old, clamped))
    }

    /// Propagate a change of `id` to everything downstream
    ///
    /// Runs on an explicit stack of open cascades rather than recursing, so
    /// chains of any length settle. Dependents are visited in order and each
    /// one's own cascade completes before the next sibling starts. A cell's
    /// listeners fire once all of its dependents have settled.
    fn cascade(&mut self, id: LengthId, old: f32, new: f32) {
        let mut open = Vec::new();
        self.open_cascade(&mut open, id, old, new);

        loop {
            let Some(top) = open.last_mut() else {
                break;
            };
            let next = top.dependents.get(top.next).copied();
            if let Some(dependent) = next {
                top.next += 1;
                let depth = open.len();
                if let Some((old, new)) = self.settle(dependent, depth) {
                    self.open_cascade(&mut open, dependent, old, new);
                }
                continue;
            }

            let Some(done) = open.pop() else {
                break;
            };
            self.in_flight.remove(&done.change.cell);
            if let Some(cell) = self.cells.get(done.change.cell) {
                cell.signal.fire(&done.change);
            }

            if matches!(done.change.axis, Axis::Height | Axis::Y) {
                if let Some(height) = self.parent_content_height(done.change.owner) {
                    let depth = open.len();
                    if let Some((old, new)) = self.settle(height, depth) {
                        self.open_cascade(&mut open, height, old, new);
                    }
                }
            }
        }
    }

    fn open_cascade(&mut self, open: &mut Vec<OpenCascade>, id: LengthId, old: f32, new: f32) {
        let Some(cell) = self.cells.get(id) else {
            return;
        };
        let dependents: SmallVec<[LengthId; 4]> = cell.dependents.snapshot();
        let (axis, owner) = (cell.axis, cell.owner);
        tracing::trace!(cell = ?id, ?axis, old, new, dependents = dependents.len(), "cascade");

        self.in_flight.insert(id);
        open.push(OpenCascade {
            change: LengthChange {
                cell: id,
                owner,
                axis,
                old,
                new,
            },
            dependents,
            next: 0,
        });
    }

    /// Content height of a non-stack parent, which reads its children's extents
    fn parent_content_height(&self, owner: NodeId) -> Option<LengthId> {
        let parent = self.parent(owner)?;
        if self.nodes[parent].stack.is_some() {
            return None;
        }
        let height = self.cell(parent, Axis::Height);
        matches!(self.cells[height].strategy, Strategy::AutoContent).then_some(height)
    }
}

/// A cell whose dependents are still being visited
struct OpenCascade {
    change: LengthChange,
    dependents: SmallVec<[LengthId; 4]>,
    next: usize,
}

fn clamp(value: f32, min: Option<f32>, max: Option<f32>) -> f32 {
    let mut value = value;
    if let Some(max) = max {
        value = value.min(max);
    }
    if let Some(min) = min {
        value = value.max(min);
    }
    value
}
