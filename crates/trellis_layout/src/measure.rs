//! Content measurement
//!
//! Nodes that know their own content size (text, images, custom widgets)
//! register a [`ContentSizeProvider`]. Auto-content cells of such nodes ask
//! the provider instead of summing their children.
//!
//! Provider results are memoized in a [`MeasureCache`] owned by the graph.
//! Keys are content hashes built from the node, the axis, the provider's own
//! content key and, for providers that depend on children, the children's
//! current extents. Entries are dropped explicitly through
//! [`LayoutGraph::invalidate_content`].

use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;

use lru::LruCache;
use rustc_hash::{FxHashMap, FxHasher};
use smallvec::SmallVec;

use crate::axis::{Axis, Orientation};
use crate::error::Result;
use crate::graph::{Frame, LayoutGraph, NodeId};

/// Capability of a node that can measure its own content
pub trait ContentSizeProvider {
    /// Content width, excluding the node's padding and border
    fn compute_width(&self, ctx: &ContentContext<'_>) -> f32;

    /// Content height, excluding the node's padding and border
    fn compute_height(&self, ctx: &ContentContext<'_>) -> f32;

    /// Whether results change when the node's children move or resize
    fn depends_on_children(&self) -> bool {
        false
    }

    /// Hash of the provider's own content; `None` disables caching
    fn content_key(&self) -> Option<u64> {
        None
    }
}

/// Read-only view of the graph handed to a provider
pub struct ContentContext<'a> {
    graph: &'a LayoutGraph,
    node: NodeId,
}

impl<'a> ContentContext<'a> {
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Managed children of the measured node, in order
    pub fn children(&self) -> Vec<NodeId> {
        self.graph.managed_children(self.node)
    }

    pub fn frame(&self, node: NodeId) -> Frame {
        self.graph.frame(node)
    }

    pub fn value(&self, node: NodeId, axis: Axis) -> f32 {
        self.graph.get(node, axis)
    }
}

/// Provider for content with a known intrinsic size
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntrinsicSize {
    pub width: f32,
    pub height: f32,
}

impl IntrinsicSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl ContentSizeProvider for IntrinsicSize {
    fn compute_width(&self, _ctx: &ContentContext<'_>) -> f32 {
        self.width
    }

    fn compute_height(&self, _ctx: &ContentContext<'_>) -> f32 {
        self.height
    }

    fn content_key(&self) -> Option<u64> {
        let mut hasher = FxHasher::default();
        self.width.to_bits().hash(&mut hasher);
        self.height.to_bits().hash(&mut hasher);
        Some(hasher.finish())
    }
}

/// Memoized provider results keyed by content hash
pub struct MeasureCache {
    entries: LruCache<u64, f32>,
    by_node: FxHashMap<NodeId, SmallVec<[u64; 4]>>,
    hits: u64,
    misses: u64,
}

impl MeasureCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            by_node: FxHashMap::default(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&mut self, key: u64) -> Option<f32> {
        let found = self.entries.get(&key).copied();
        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    pub fn insert(&mut self, node: NodeId, key: u64, value: f32) {
        self.entries.put(key, value);
        let keys = self.by_node.entry(node).or_default();
        keys.retain(|k| self.entries.contains(k));
        if !keys.contains(&key) {
            keys.push(key);
        }
    }

    /// Drop every entry recorded for `node`
    pub fn invalidate(&mut self, node: NodeId) {
        if let Some(keys) = self.by_node.remove(&node) {
            for key in keys {
                self.entries.pop(&key);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_node.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since creation
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

impl std::fmt::Debug for MeasureCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasureCache")
            .field("len", &self.entries.len())
            .field("cap", &self.entries.cap())
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .finish()
    }
}

impl LayoutGraph {
    /// Attach a content-size provider and re-resolve auto-content cells
    pub fn set_content_provider(
        &mut self,
        node: NodeId,
        provider: impl ContentSizeProvider + 'static,
    ) -> Result<()> {
        self.require_node(node)?;
        self.providers.insert(node, Box::new(provider));
        self.invalidate_content(node);
        Ok(())
    }

    /// Detach a node's provider, falling back to its children's extents
    pub fn remove_content_provider(&mut self, node: NodeId) -> bool {
        let removed = self.providers.remove(node).is_some();
        if removed {
            self.invalidate_content(node);
        }
        removed
    }

    /// Forget cached measurements of `node` and re-resolve its content size
    ///
    /// Call after the provider's content changed.
    pub fn invalidate_content(&mut self, node: NodeId) {
        self.measure_cache.invalidate(node);
        let Some(n) = self.nodes.get(node) else {
            return;
        };
        let cells = [n.cells[Axis::Width.index()], n.cells[Axis::Height.index()]];
        for id in cells {
            if matches!(self.cells[id].strategy, crate::strategy::Strategy::AutoContent) {
                self.rewire(id);
            }
        }
    }

    pub fn measure_cache(&self) -> &MeasureCache {
        &self.measure_cache
    }

    /// Ask `node`'s provider for its content size along `orientation`
    pub(crate) fn measure(&mut self, node: NodeId, orientation: Orientation) -> f32 {
        let Some(provider) = self.providers.get(node) else {
            return 0.0;
        };
        let key = provider
            .content_key()
            .map(|content| self.measure_key(node, orientation, content, provider.depends_on_children()));

        if let Some(key) = key {
            if let Some(value) = self.measure_cache.get(key) {
                return value;
            }
        }

        let value = {
            let Some(provider) = self.providers.get(node) else {
                return 0.0;
            };
            let ctx = ContentContext { graph: &*self, node };
            match orientation {
                Orientation::Horizontal => provider.compute_width(&ctx),
                Orientation::Vertical => provider.compute_height(&ctx),
            }
        };
        tracing::debug!(?node, ?orientation, value, "measured content");

        if let Some(key) = key {
            self.measure_cache.insert(node, key, value);
        }
        value
    }

    fn measure_key(
        &self,
        node: NodeId,
        orientation: Orientation,
        content: u64,
        with_children: bool,
    ) -> u64 {
        let mut hasher = FxHasher::default();
        node.hash(&mut hasher);
        orientation.hash(&mut hasher);
        content.hash(&mut hasher);
        if with_children {
            for child in self.managed_children(node) {
                let frame = self.frame(child);
                for value in [frame.x, frame.y, frame.width, frame.height] {
                    value.to_bits().hash(&mut hasher);
                }
                self.cell_value(child, orientation.leading_margin())
                    .to_bits()
                    .hash(&mut hasher);
                self.cell_value(child, orientation.trailing_margin())
                    .to_bits()
                    .hash(&mut hasher);
            }
        }
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingText {
        width: Rc<Cell<f32>>,
        calls: Rc<Cell<u32>>,
        revision: Rc<Cell<u64>>,
    }

    impl ContentSizeProvider for CountingText {
        fn compute_width(&self, _ctx: &ContentContext<'_>) -> f32 {
            self.calls.set(self.calls.get() + 1);
            self.width.get()
        }

        fn compute_height(&self, _ctx: &ContentContext<'_>) -> f32 {
            self.calls.set(self.calls.get() + 1);
            12.0
        }

        fn content_key(&self) -> Option<u64> {
            Some(self.revision.get())
        }
    }

    struct ChildCount;

    impl ContentSizeProvider for ChildCount {
        fn compute_width(&self, ctx: &ContentContext<'_>) -> f32 {
            ctx.children().len() as f32 * 10.0
        }

        fn compute_height(&self, ctx: &ContentContext<'_>) -> f32 {
            ctx.children()
                .iter()
                .map(|child| ctx.value(*child, Axis::Height))
                .sum()
        }

        fn depends_on_children(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_intrinsic_size_plus_inset() {
        let mut graph = LayoutGraph::new();
        let image = graph.create_node();
        graph
            .set_auto(graph.cell(image, Axis::Width), crate::AutoStrategy::Content)
            .unwrap();
        graph.set_fixed(graph.cell(image, Axis::PaddingLeft), 2.0).unwrap();
        graph.set_fixed(graph.cell(image, Axis::PaddingRight), 2.0).unwrap();

        graph.set_content_provider(image, IntrinsicSize::new(64.0, 48.0)).unwrap();
        assert_eq!(graph.get(image, Axis::Width), 68.0);
        assert_eq!(graph.get(image, Axis::Height), 48.0);

        assert!(graph.remove_content_provider(image));
        assert_eq!(graph.get(image, Axis::Width), 4.0);
    }

    #[test]
    fn test_results_are_cached_until_invalidated() {
        let mut graph = LayoutGraph::new();
        let node = graph.create_node();
        let width = graph.cell(node, Axis::Width);
        graph.set_auto(width, crate::AutoStrategy::Content).unwrap();

        let text_width = Rc::new(Cell::new(30.0));
        let calls = Rc::new(Cell::new(0));
        let revision = Rc::new(Cell::new(1));
        graph
            .set_content_provider(
                node,
                CountingText {
                    width: Rc::clone(&text_width),
                    calls: Rc::clone(&calls),
                    revision: Rc::clone(&revision),
                },
            )
            .unwrap();
        assert_eq!(graph.value(width), 30.0);
        let after_attach = calls.get();

        graph.update(width);
        graph.set_fixed(graph.cell(node, Axis::PaddingLeft), 1.0).unwrap();
        assert_eq!(graph.value(width), 31.0);
        assert_eq!(calls.get(), after_attach);

        text_width.set(50.0);
        revision.set(2);
        graph.invalidate_content(node);
        assert_eq!(graph.value(width), 51.0);
        assert!(calls.get() > after_attach);
    }

    #[test]
    fn test_provider_depending_on_children() {
        let mut graph = LayoutGraph::new();
        let list = graph.create_node();
        graph.set_content_provider(list, ChildCount).unwrap();
        graph
            .set_auto(graph.cell(list, Axis::Width), crate::AutoStrategy::Content)
            .unwrap();

        let a = graph.create_node();
        let b = graph.create_node();
        graph.set_fixed(graph.cell(a, Axis::Height), 5.0).unwrap();
        graph.set_fixed(graph.cell(b, Axis::Height), 7.0).unwrap();
        graph.append_children(list, &[a, b]).unwrap();

        assert_eq!(graph.get(list, Axis::Width), 20.0);
        assert_eq!(graph.get(list, Axis::Height), 12.0);

        graph.set_fixed(graph.cell(b, Axis::Height), 10.0).unwrap();
        assert_eq!(graph.get(list, Axis::Height), 15.0);
    }

    #[test]
    fn test_cache_invalidate_and_capacity() {
        let mut graph = LayoutGraph::new();
        let a = graph.create_node();
        let b = graph.create_node();

        let mut cache = MeasureCache::new(2);
        cache.insert(a, 1, 10.0);
        cache.insert(a, 2, 20.0);
        cache.insert(b, 3, 30.0);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(1), None);
        assert_eq!(cache.get(3), Some(30.0));

        cache.invalidate(a);
        assert_eq!(cache.get(2), None);
        assert_eq!(cache.get(3), Some(30.0));
        assert_eq!(cache.stats(), (2, 2));

        let zero = MeasureCache::new(0);
        assert!(zero.is_empty());
    }
}
