//! Layout graph
//!
//! [`LayoutGraph`] owns every layout node and every length cell. Nodes form a
//! tree through `NodeId` handles: only the parent's child list owns, the
//! child's `parent` link is a plain handle. Cells are addressed by
//! `LengthId` and point back at their owning node the same way.
//!
//! Cell-to-cell edges live in two mirrored [`Subscribers`] sets per cell,
//! `dependencies` (upstream) and `dependents` (downstream). They are only
//! changed through `wire`/`unwire` in the cascade module so the two sides
//! always agree.

use rustc_hash::FxHashSet;
use slotmap::{new_key_type, SecondaryMap, SlotMap};
use trellis_core::{ChangeSignal, SubscriptionId, Subscribers};

use crate::axis::{Axis, Orientation};
use crate::config::LayoutConfig;
use crate::error::{LayoutError, Result};
use crate::measure::{ContentSizeProvider, MeasureCache};
use crate::stack::{Arrangement, StackLayout};
use crate::strategy::{Strategy, StrategyKind};

new_key_type! {
    /// Handle of a layout node
    pub struct NodeId;
    /// Handle of a length cell
    pub struct LengthId;
}

/// Whether a child takes part in its container's automatic positioning
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Flow {
    /// Positioned by the container
    #[default]
    InFlow,
    /// Positioned explicitly; ignored by the container
    Absolute,
    /// Temporarily out of flow (collapsed, hidden)
    Excluded,
}

/// Notification delivered to a cell's external listeners
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LengthChange {
    pub cell: LengthId,
    pub owner: NodeId,
    pub axis: Axis,
    pub old: f32,
    pub new: f32,
}

/// Resolved box of a node, relative to its parent's border box
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Frame {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Frame {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Suspension {
    pub(crate) depth: u32,
    pub(crate) value_at_suspend: f32,
}

/// A single scalar layout cell
pub(crate) struct LengthCell {
    pub(crate) axis: Axis,
    pub(crate) owner: NodeId,
    pub(crate) strategy: Strategy,
    pub(crate) value: f32,
    pub(crate) min: Option<f32>,
    pub(crate) max: Option<f32>,
    pub(crate) dependencies: Subscribers<LengthId>,
    pub(crate) dependents: Subscribers<LengthId>,
    pub(crate) signal: ChangeSignal<LengthChange>,
    pub(crate) suspension: Option<Suspension>,
}

impl LengthCell {
    fn new(axis: Axis, owner: NodeId) -> Self {
        Self {
            axis,
            owner,
            strategy: Strategy::Unresolved,
            value: 0.0,
            min: None,
            max: None,
            dependencies: Subscribers::new(),
            dependents: Subscribers::new(),
            signal: ChangeSignal::new(),
            suspension: None,
        }
    }
}

pub(crate) struct LayoutNode {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) cells: [LengthId; Axis::COUNT],
    pub(crate) flow: Flow,
    pub(crate) stack: Option<StackLayout>,
    /// X/Y currently bound by the parent's stack arranger
    pub(crate) stack_positioned: bool,
}

/// Reactive layout graph: node tree plus length cells
pub struct LayoutGraph {
    pub(crate) nodes: SlotMap<NodeId, LayoutNode>,
    pub(crate) cells: SlotMap<LengthId, LengthCell>,
    pub(crate) providers: SecondaryMap<NodeId, Box<dyn ContentSizeProvider>>,
    pub(crate) measure_cache: MeasureCache,
    pub(crate) config: LayoutConfig,
    /// Cells whose cascade is currently on the stack
    pub(crate) in_flight: FxHashSet<LengthId>,
    pub(crate) last_arrangement: Option<Arrangement>,
}

impl LayoutGraph {
    pub fn new() -> Self {
        Self::with_config(LayoutConfig::default())
    }

    /// Build a graph from `config`
    ///
    /// A config that fails [`LayoutConfig::validate`] is replaced by the
    /// defaults.
    pub fn with_config(config: LayoutConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(err) => {
                tracing::error!(%err, "invalid layout config, falling back to defaults");
                LayoutConfig::default()
            }
        };
        Self {
            nodes: SlotMap::with_key(),
            cells: SlotMap::with_key(),
            providers: SecondaryMap::new(),
            measure_cache: MeasureCache::new(config.measure_cache_capacity),
            config,
            in_flight: FxHashSet::default(),
            last_arrangement: None,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Create a detached node with default strategies on every axis
    pub fn create_node(&mut self) -> NodeId {
        let cells = &mut self.cells;
        let node = self.nodes.insert_with_key(|node| LayoutNode {
            parent: None,
            children: Vec::new(),
            cells: Axis::ALL.map(|axis| cells.insert(LengthCell::new(axis, node))),
            flow: Flow::InFlow,
            stack: None,
            stack_positioned: false,
        });

        let default_width = Strategy::auto(self.config.default_width);
        let default_height = Strategy::auto(self.config.default_height);
        for axis in Axis::ALL {
            let id = self.cell(node, axis);
            let strategy = match axis {
                Axis::Width => default_width.clone(),
                Axis::Height => default_height.clone(),
                _ => Strategy::Fixed(0.0),
            };
            self.install(id, strategy);
        }
        node
    }

    /// Create a node whose layout is arranged as a stack
    pub fn create_stack(&mut self, stack: StackLayout) -> NodeId {
        let node = self.create_node();
        self.nodes[node].stack = Some(stack);
        node
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    pub fn contains_cell(&self, id: LengthId) -> bool {
        self.cells.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Cell of `node` on `axis`
    ///
    /// # Panics
    ///
    /// Panics if `node` is not part of this graph; use
    /// [`try_cell`](Self::try_cell) for untrusted handles.
    pub fn cell(&self, node: NodeId, axis: Axis) -> LengthId {
        self.nodes[node].cells[axis.index()]
    }

    pub fn try_cell(&self, node: NodeId, axis: Axis) -> Result<LengthId> {
        self.nodes
            .get(node)
            .map(|n| n.cells[axis.index()])
            .ok_or(LayoutError::UnknownNode(node))
    }

    /// Resolved value of a cell, 0 for unknown handles
    pub fn value(&self, id: LengthId) -> f32 {
        self.cells.get(id).map_or(0.0, |cell| cell.value)
    }

    /// Resolved value of `node` on `axis`, 0 for unknown nodes
    pub fn get(&self, node: NodeId, axis: Axis) -> f32 {
        self.nodes
            .get(node)
            .map_or(0.0, |n| self.value(n.cells[axis.index()]))
    }

    /// Resolved position and size of `node`
    pub fn frame(&self, node: NodeId) -> Frame {
        Frame {
            x: self.get(node, Axis::X),
            y: self.get(node, Axis::Y),
            width: self.get(node, Axis::Width),
            height: self.get(node, Axis::Height),
        }
    }

    pub fn axis_of(&self, id: LengthId) -> Option<Axis> {
        self.cells.get(id).map(|cell| cell.axis)
    }

    pub fn owner_of(&self, id: LengthId) -> Option<NodeId> {
        self.cells.get(id).map(|cell| cell.owner)
    }

    pub fn strategy(&self, id: LengthId) -> Option<&Strategy> {
        self.cells.get(id).map(|cell| &cell.strategy)
    }

    pub fn strategy_kind(&self, id: LengthId) -> Option<StrategyKind> {
        self.strategy(id).map(Strategy::kind)
    }

    /// Upstream cells `id` currently listens to
    pub fn dependencies(&self, id: LengthId) -> &[LengthId] {
        self.cells
            .get(id)
            .map_or(&[], |cell| cell.dependencies.as_slice())
    }

    /// Downstream cells notified when `id` changes
    pub fn dependents(&self, id: LengthId) -> &[LengthId] {
        self.cells
            .get(id)
            .map_or(&[], |cell| cell.dependents.as_slice())
    }

    pub fn limits(&self, id: LengthId) -> (Option<f32>, Option<f32>) {
        self.cells
            .get(id)
            .map_or((None, None), |cell| (cell.min, cell.max))
    }

    /// Listen to a cell's changes
    pub fn subscribe<F>(&mut self, id: LengthId, callback: F) -> Result<SubscriptionId>
    where
        F: Fn(&LengthChange) + 'static,
    {
        let cell = self.cells.get_mut(id).ok_or(LayoutError::UnknownCell(id))?;
        Ok(cell.signal.subscribe(callback))
    }

    pub fn unsubscribe(&mut self, id: LengthId, subscription: SubscriptionId) -> bool {
        self.cells
            .get_mut(id)
            .is_some_and(|cell| cell.signal.unsubscribe(subscription))
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes.get(node).map_or(&[], |n| n.children.as_slice())
    }

    pub fn flow(&self, node: NodeId) -> Flow {
        self.nodes.get(node).map_or(Flow::InFlow, |n| n.flow)
    }

    pub fn stack(&self, node: NodeId) -> Option<StackLayout> {
        self.nodes.get(node).and_then(|n| n.stack)
    }

    /// Children in order that are neither absolute nor excluded
    pub fn managed_children(&self, node: NodeId) -> Vec<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .filter(|child| self.flow(*child) == Flow::InFlow)
            .collect()
    }

    /// Kind of the most recent stack arrangement pass
    pub fn last_arrangement(&self) -> Option<Arrangement> {
        self.last_arrangement
    }

    pub(crate) fn cell_value(&self, node: NodeId, axis: Axis) -> f32 {
        self.get(node, axis)
    }

    /// Padding plus border on both sides of `orientation`
    pub(crate) fn inset(&self, node: NodeId, orientation: Orientation) -> f32 {
        orientation
            .inset_axes()
            .iter()
            .map(|axis| self.cell_value(node, *axis))
            .sum()
    }

    pub(crate) fn inset_cells(&self, node: NodeId, orientation: Orientation) -> [LengthId; 4] {
        orientation.inset_axes().map(|axis| self.cell(node, axis))
    }

    pub(crate) fn require_node(&self, node: NodeId) -> Result<()> {
        if self.nodes.contains_key(node) {
            Ok(())
        } else {
            Err(LayoutError::UnknownNode(node))
        }
    }

    pub(crate) fn require_cell(&self, id: LengthId) -> Result<()> {
        if self.cells.contains_key(id) {
            Ok(())
        } else {
            Err(LayoutError::UnknownCell(id))
        }
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub(crate) fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }
}

impl Default for LayoutGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LayoutGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutGraph")
            .field("nodes", &self.nodes.len())
            .field("cells", &self.cells.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
