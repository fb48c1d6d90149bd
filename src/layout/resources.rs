//! Side tables filled during layout and read by the renderer.
//!
//! [`ResourceRegistry`] deduplicates embedded sub-documents (canvases) by
//! source node so each is laid out and rendered once. [`ArrangementTracker`]
//! keeps, per source node, every concrete placement the pass produced.

use std::collections::HashMap;
use std::ops::Range;

use serde::Serialize;

use super::tree::BlockId;
use crate::geometry::Rect;
use crate::model::NodeId;

/// Handle to a shared resource. Also names the coordinate frame of the
/// resource's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ResourceHandle(pub usize);

/// One deduplicated embedded resource.
#[derive(Debug, Clone)]
pub struct SharedResource {
    pub owner: NodeId,
    pub handle: ResourceHandle,
    /// Resolved box of the resource in its own frame.
    pub bounding_box: Rect,
    /// True once the resource's content has been laid out.
    pub registered: bool,
    /// Root block of the laid-out content, in the resource's frame.
    pub content: Option<BlockId>,
    /// Opaque slot the renderer fills with its own object reference.
    pub render_reference: Option<u64>,
}

/// Registry of shared resources, keyed by source node identity.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    entries: Vec<SharedResource>,
    by_owner: HashMap<NodeId, ResourceHandle>,
}

impl ResourceRegistry {
    /// Register `owner`, or return its existing handle. A repeated call
    /// never creates a second entry and leaves the first bounding box.
    pub fn register(&mut self, owner: NodeId, bounding_box: Rect) -> ResourceHandle {
        if let Some(handle) = self.by_owner.get(&owner) {
            return *handle;
        }
        let handle = ResourceHandle(self.entries.len());
        self.entries.push(SharedResource {
            owner,
            handle,
            bounding_box,
            registered: false,
            content: None,
            render_reference: None,
        });
        self.by_owner.insert(owner, handle);
        handle
    }

    /// Record the laid-out content of a resource and flag it registered.
    pub fn mark_registered(&mut self, handle: ResourceHandle, content: BlockId, bounding_box: Rect) {
        if let Some(entry) = self.entries.get_mut(handle.0) {
            entry.registered = true;
            entry.content = Some(content);
            entry.bounding_box = bounding_box;
        }
    }

    pub fn is_registered(&self, handle: ResourceHandle) -> bool {
        self.get(handle).is_some_and(|e| e.registered)
    }

    pub fn get(&self, handle: ResourceHandle) -> Option<&SharedResource> {
        self.entries.get(handle.0)
    }

    pub fn lookup(&self, owner: NodeId) -> Option<ResourceHandle> {
        self.by_owner.get(&owner).copied()
    }

    pub fn set_render_reference(&mut self, handle: ResourceHandle, reference: u64) {
        if let Some(entry) = self.entries.get_mut(handle.0) {
            entry.render_reference = Some(reference);
        }
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &SharedResource> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One concrete placement of a source node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Arrangement {
    pub node: NodeId,
    pub page_index: usize,
    /// Painted border box. Page coordinates, or resource-frame coordinates
    /// when `frame` is set.
    pub render_bounds: Rect,
    pub frame: Option<ResourceHandle>,
    /// Position of this arrangement in its node's chain.
    pub index: usize,
    /// Global recording order across all nodes.
    pub sequence: usize,
}

/// Append-only arrangement chains, one per source node.
#[derive(Debug, Default)]
pub struct ArrangementTracker {
    chains: HashMap<NodeId, Vec<Arrangement>>,
    recorded: usize,
}

impl ArrangementTracker {
    pub fn record(
        &mut self,
        node: NodeId,
        page_index: usize,
        render_bounds: Rect,
        frame: Option<ResourceHandle>,
    ) {
        let chain = self.chains.entry(node).or_default();
        chain.push(Arrangement {
            node,
            page_index,
            render_bounds,
            frame,
            index: chain.len(),
            sequence: self.recorded,
        });
        self.recorded += 1;
    }

    /// Head of a node's chain.
    pub fn first(&self, node: NodeId) -> Option<&Arrangement> {
        self.chains.get(&node).and_then(|c| c.first())
    }

    /// The placement after `arrangement` in the same chain.
    pub fn next(&self, arrangement: &Arrangement) -> Option<&Arrangement> {
        self.chains
            .get(&arrangement.node)
            .and_then(|c| c.get(arrangement.index + 1))
    }

    pub fn chain(&self, node: NodeId) -> &[Arrangement] {
        self.chains.get(&node).map(|c| c.as_slice()).unwrap_or(&[])
    }

    /// Number of arrangements recorded so far, across all nodes.
    pub fn len(&self) -> usize {
        self.recorded
    }

    pub fn is_empty(&self) -> bool {
        self.recorded == 0
    }

    /// Shift arrangements whose recording order falls in `range` and that
    /// live in `frame`. Used when a detached box is moved to its final
    /// position after its content was laid out at a provisional one.
    pub(crate) fn translate_range(
        &mut self,
        range: Range<usize>,
        frame: Option<ResourceHandle>,
        dx: f64,
        dy: f64,
    ) {
        for arrangement in self.chains.values_mut().flat_map(|c| c.iter_mut()) {
            if range.contains(&arrangement.sequence) && arrangement.frame == frame {
                arrangement.render_bounds = arrangement.render_bounds.translate(dx, dy);
            }
        }
    }

    /// Latest placement of `node`.
    pub(crate) fn last_mut(&mut self, node: NodeId) -> Option<&mut Arrangement> {
        self.chains.get_mut(&node).and_then(|c| c.last_mut())
    }
}
