//! Node tree mutations
//!
//! Attaching or detaching a child changes which cells the structural
//! strategies read, so every mutation ends by rewiring the child, the
//! container and any siblings sharing leftover space. A single attach only
//! extends those siblings' inputs with the new child's cells.

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::error::{LayoutError, Result};
use crate::graph::{Flow, LayoutGraph, LengthId, NodeId};
use crate::strategy::Strategy;

impl LayoutGraph {
    /// Attach `child` as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_attach(parent, child)?;
        let index = self.nodes[parent].children.len();
        self.attach(parent, child, index);
        Ok(())
    }

    /// Attach `child` before position `index` of `parent`'s children
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        self.check_attach(parent, child)?;
        let len = self.nodes[parent].children.len();
        if index > len {
            return Err(LayoutError::IndexOutOfBounds { index, len });
        }
        self.attach(parent, child, index);
        Ok(())
    }

    /// Attach several children with a single arrangement pass
    ///
    /// Either every child is attached or none is.
    pub fn append_children(&mut self, parent: NodeId, children: &[NodeId]) -> Result<()> {
        let mut seen = FxHashSet::default();
        for child in children {
            self.check_attach(parent, *child)?;
            if !seen.insert(*child) {
                return Err(LayoutError::AlreadyAttached(*child));
            }
        }
        if children.is_empty() {
            return Ok(());
        }

        let container = self.container_cells(parent);
        self.with_suspended(&container, |graph| {
            for child in children {
                let index = graph.nodes[parent].children.len();
                graph.attach_deferred(parent, *child, index);
            }
            graph.arrange_full(parent);
            graph.refresh_container(parent);
        });
        tracing::debug!(?parent, count = children.len(), "children appended");
        Ok(())
    }

    /// Detach `child` from `parent`, keeping the child alive
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.require_node(parent)?;
        self.require_node(child)?;
        if self.parent(child) != Some(parent) {
            return Err(LayoutError::NotAChild { parent, child });
        }

        let container = self.container_cells(parent);
        self.with_suspended(&container, |graph| {
            graph.detach_deferred(parent, child);
            graph.arrange_full(parent);
            graph.refresh_container(parent);
        });
        tracing::trace!(?parent, ?child, "child removed");
        Ok(())
    }

    /// Change whether `node` takes part in its container's positioning
    pub fn set_flow(&mut self, node: NodeId, flow: Flow) -> Result<()> {
        self.require_node(node)?;
        let previous = self.nodes[node].flow;
        if previous == flow {
            return Ok(());
        }
        self.nodes[node].flow = flow;
        if flow != Flow::InFlow {
            self.release_child(node);
        }
        self.rewire_structural(node);

        if let Some(parent) = self.parent(node) {
            let container = self.container_cells(parent);
            self.with_suspended(&container, |graph| {
                graph.arrange_full(parent);
                graph.refresh_container(parent);
            });
        }
        tracing::trace!(?node, ?previous, ?flow, "flow changed");
        Ok(())
    }

    /// Destroy `node` and its whole subtree
    ///
    /// Cells outside the subtree that read a disposed cell lose that edge
    /// and re-resolve with the input treated as 0. Returns `false` for an
    /// unknown node.
    pub fn dispose_node(&mut self, node: NodeId) -> bool {
        if !self.nodes.contains_key(node) {
            return false;
        }
        if let Some(parent) = self.parent(node) {
            // Cannot fail: the parent link was just read.
            let _ = self.remove_child(parent, node);
        }

        let mut subtree = vec![node];
        let mut cursor = 0;
        while cursor < subtree.len() {
            subtree.extend_from_slice(&self.nodes[subtree[cursor]].children);
            cursor += 1;
        }

        let doomed: FxHashSet<LengthId> = subtree
            .iter()
            .flat_map(|id| self.nodes[*id].cells)
            .collect();

        let mut orphaned = Vec::new();
        for id in &doomed {
            let cell = &mut self.cells[*id];
            let upstream = cell.dependencies.take();
            let downstream = cell.dependents.take();
            for dependency in upstream {
                if let Some(source) = self.cells.get_mut(dependency) {
                    source.dependents.remove(*id);
                }
            }
            for dependent in downstream {
                if doomed.contains(&dependent) {
                    continue;
                }
                if let Some(target) = self.cells.get_mut(dependent) {
                    target.dependencies.remove(*id);
                    orphaned.push(dependent);
                }
            }
        }

        for id in &doomed {
            self.cells.remove(*id);
        }
        for id in &subtree {
            self.nodes.remove(*id);
            self.providers.remove(*id);
            self.measure_cache.invalidate(*id);
        }

        for dependent in orphaned {
            self.update_cell(dependent);
        }
        tracing::debug!(?node, nodes = subtree.len(), cells = doomed.len(), "node disposed");
        true
    }

    fn check_attach(&self, parent: NodeId, child: NodeId) -> Result<()> {
        self.require_node(parent)?;
        self.require_node(child)?;
        if self.parent(child).is_some() {
            return Err(LayoutError::AlreadyAttached(child));
        }
        if self.is_ancestor(child, parent) {
            return Err(LayoutError::TreeCycle { parent, child });
        }
        Ok(())
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, index: usize) {
        let container = self.container_cells(parent);
        self.with_suspended(&container, |graph| {
            graph.attach_deferred(parent, child, index);
            graph.arrange_after_insert(parent, child);
            graph.extend_shares(parent, child);
            graph.rewire_structural(parent);
        });
        tracing::trace!(?parent, ?child, index, "child attached");
    }

    /// Link `child` under `parent` without positioning it
    pub(crate) fn attach_deferred(&mut self, parent: NodeId, child: NodeId, index: usize) {
        self.nodes[parent].children.insert(index, child);
        self.nodes[child].parent = Some(parent);
        self.rewire_structural(child);
    }

    /// Unlink `child` from `parent` and drop its stack positions
    pub(crate) fn detach_deferred(&mut self, parent: NodeId, child: NodeId) {
        let children = &mut self.nodes[parent].children;
        if let Some(position) = children.iter().position(|id| *id == child) {
            children.remove(position);
        }
        self.nodes[child].parent = None;
        self.release_child(child);
        self.rewire_structural(child);
    }

    /// Make the leftover-space siblings of a newly attached `child` read it
    ///
    /// Only the new child's margins, and its size when explicit, join each
    /// sibling's inputs, so an append costs one edge set per filling sibling.
    fn extend_shares(&mut self, parent: NodeId, child: NodeId) {
        let Some(stack) = self.nodes[parent].stack else {
            return;
        };
        if self.flow(child) != Flow::InFlow {
            return;
        }
        let orientation = stack.direction.orientation();
        let size = orientation.size();

        let mut added: SmallVec<[LengthId; 3]> = SmallVec::new();
        added.push(self.cell(child, orientation.leading_margin()));
        added.push(self.cell(child, orientation.trailing_margin()));
        let child_size = self.cell(child, size);
        if !matches!(self.cells[child_size].strategy, Strategy::AutoContainer) {
            added.push(child_size);
        }

        // Every filling sibling reads the container's size.
        let container_size = self.cell(parent, size);
        let candidates: SmallVec<[LengthId; 4]> = self.cells[container_size].dependents.snapshot();
        for id in candidates {
            let Some(cell) = self.cells.get(id) else {
                continue;
            };
            let owner = cell.owner;
            let sharing = cell.axis == size
                && owner != child
                && matches!(cell.strategy, Strategy::AutoContainer)
                && self.parent(owner) == Some(parent)
                && self.flow(owner) == Flow::InFlow;
            if !sharing {
                continue;
            }
            for dependency in &added {
                self.link(*dependency, id);
            }
            self.update_cell(id);
        }
    }

    /// Rewire the container's and its children's tree-shaped dependencies
    pub(crate) fn refresh_container(&mut self, parent: NodeId) {
        if let Some(stack) = self.nodes[parent].stack {
            let axis = stack.direction.orientation().size();
            for child in self.managed_children(parent) {
                let id = self.cell(child, axis);
                if matches!(self.cells[id].strategy, Strategy::AutoContainer) {
                    self.rewire(id);
                }
            }
        }
        self.rewire_structural(parent);
    }
}
