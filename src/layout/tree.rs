//! The finalized geometry tree.
//!
//! Every page, block, region, line, run and positioned region lives in a
//! per-document arena and is addressed by a typed index. Parent and owner
//! links are plain indices, so the tree has no ownership cycles.
//!
//! Coordinates are stored relative to the enclosing box:
//!
//! - a block's `total_bounds` is relative to its container (the region's
//!   origin, the page, or its positioned region);
//! - its `available_bounds` is relative to its own `total_bounds` origin;
//! - a region's `total_bounds` is relative to its block's available origin;
//! - a line sits at `offset_y` in its region and its runs are line-relative.
//!
//! The `*_rect` helpers resolve these to page coordinates (or to the frame
//! of the shared resource the content belongs to).

use std::collections::HashMap;

use super::resources::{ArrangementTracker, ResourceHandle, ResourceRegistry};
use crate::font::StandardFont;
use crate::geometry::{Point, Rect, Size};
use crate::model::{Edges, NodeId};
use crate::style::{OverflowAction, Position, TextAlign, VerticalAlign};

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
        pub struct $name(pub usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

arena_id!(
    /// Index into [`LayoutDocument::blocks`].
    BlockId
);
arena_id!(
    /// Index into [`LayoutDocument::regions`].
    RegionId
);
arena_id!(
    /// Index into [`LayoutDocument::lines`].
    LineId
);
arena_id!(
    /// Index into [`LayoutDocument::runs`].
    RunId
);
arena_id!(
    /// Index into [`LayoutDocument::positioned`].
    PositionedId
);

/// What a block is placed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Container {
    /// Page body, header or footer. Coordinates are page coordinates.
    Page(usize),
    Region(RegionId),
    Positioned(PositionedId),
    /// Root content of a shared resource, in the resource's own frame.
    Resource(ResourceHandle),
}

/// An item in a region's flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionItem {
    Block(BlockId),
    Line(LineId),
}

#[derive(Debug, Clone)]
pub struct LayoutPage {
    pub index: usize,
    pub width: f64,
    pub height: f64,
    pub margin: Edges,
    /// The Page node of this sequence, or the document root for content
    /// flowing into default pages.
    pub node: NodeId,
    /// The content block. Its regions are the page's columns.
    pub body: BlockId,
    pub headers: Vec<BlockId>,
    pub footers: Vec<BlockId>,
}

impl LayoutPage {
    /// The page box inside the margins.
    pub fn content_rect(&self) -> Rect {
        Rect::new(
            self.margin.left,
            self.margin.top,
            (self.width - self.margin.horizontal()).max(0.0),
            (self.height - self.margin.vertical()).max(0.0),
        )
    }
}

/// A box: margin, border, padding and content.
#[derive(Debug, Clone)]
pub struct LayoutBlock {
    pub owner: NodeId,
    pub parent: Container,
    pub page_index: usize,
    /// Outer rectangle allotted to the box, margins included.
    pub total_bounds: Rect,
    /// Content rectangle after margin, border and padding, relative to
    /// `total_bounds`. Children are laid out against it.
    pub available_bounds: Rect,
    pub margin: Edges,
    pub border: Edges,
    pub padding: Edges,
    /// Used width, margins included.
    pub width: f64,
    /// Used height, margins included.
    pub height: f64,
    /// Column regions, left to right, across every column this fragment used.
    pub regions: Vec<RegionId>,
    pub columns: usize,
    pub column_gap: f64,
    pub position: Position,
    pub relative_offset: Point,
    pub overflow: OverflowAction,
    /// Establishes its own coordinate frame.
    pub explicit_layout: bool,
    /// Content outside the border box must not be painted.
    pub clip: bool,
    /// Content needed more room than the box was given.
    pub overflowed: bool,
    pub positioned_regions: Vec<PositionedId>,
    /// Continues a fragment from a previous column or page. Top margin,
    /// border and padding are not repeated.
    pub continuation: bool,
    /// Continues in a later column or page. Bottom margin, border and
    /// padding are deferred to the last fragment.
    pub continues: bool,
}

impl LayoutBlock {
    pub fn has_positioned_regions(&self) -> bool {
        !self.positioned_regions.is_empty()
    }

    /// Border box size. A fragment that continues elsewhere has not applied
    /// its bottom margin yet.
    pub fn border_size(&self) -> Size {
        let bottom = if self.continues { 0.0 } else { self.margin.bottom };
        Size::new(
            (self.width - self.margin.horizontal()).max(0.0),
            (self.height - self.margin.top - bottom).max(0.0),
        )
    }
}

/// A column of a block.
#[derive(Debug, Clone)]
pub struct LayoutRegion {
    pub block: BlockId,
    pub column_index: usize,
    /// Position within the block's content box. The size is the used size
    /// once the region is finalized.
    pub total_bounds: Rect,
    pub used_size: Size,
    /// Height the region was allowed to fill. Infinite for growing boxes.
    pub capacity: f64,
    pub items: Vec<RegionItem>,
    pub positioned: Vec<PositionedId>,
}

impl LayoutRegion {
    pub fn available_height(&self) -> f64 {
        (self.capacity - self.used_size.height).max(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct LayoutLine {
    pub region: RegionId,
    pub offset_y: f64,
    pub width: f64,
    pub used_width: f64,
    pub height: f64,
    pub baseline_offset: f64,
    pub runs: Vec<RunId>,
    pub align: TextAlign,
    /// Extra space added to each inter-word space when justified.
    pub extra_space: f64,
}

impl LayoutLine {
    /// Unused inline space.
    pub fn available_width(&self) -> f64 {
        (self.width - self.used_width).max(0.0)
    }
}

/// Measured font of a text run.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub weight: u32,
    pub italic: bool,
    pub size: f64,
    pub letter_spacing: f64,
    /// Set when the family resolved to a built-in face.
    pub standard: Option<StandardFont>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunKind {
    Text {
        text: String,
        font: FontSpec,
        ascent: f64,
        descent: f64,
        /// Inter-word spaces that receive justification space.
        spaces: usize,
    },
    /// Reserves inline room for a positioned region (an inline canvas).
    PositionedRegion {
        region: PositionedId,
        vertical_align: VerticalAlign,
    },
    /// Zero-size anchor for out-of-flow content.
    Component { region: Option<PositionedId> },
}

#[derive(Debug, Clone)]
pub struct LayoutRun {
    pub line: LineId,
    pub owner: NodeId,
    /// Line-relative box.
    pub bounds: Rect,
    pub relative_offset: Point,
    pub kind: RunKind,
}

/// Off-flow geometry for relative, absolute and fixed content.
#[derive(Debug, Clone)]
pub struct PositionedRegion {
    pub owner: NodeId,
    pub mode: Position,
    pub page_index: usize,
    /// Border box, in the coordinate space of `frame`.
    pub total_bounds: Rect,
    /// Resource whose frame the coordinates are in; `None` for the page.
    pub frame: Option<ResourceHandle>,
    /// Region the node was encountered in.
    pub anchor: Option<RegionId>,
    /// Run reserving its inline slot, if any.
    pub associated_run: Option<RunId>,
    /// Padding box the offsets were resolved against.
    pub containing_block: Rect,
    /// Laid-out content. Absent for repeat placements of a shared resource.
    pub content: Option<BlockId>,
    pub resource: Option<ResourceHandle>,
}

/// Output of one layout pass.
#[derive(Debug, Default)]
pub struct LayoutDocument {
    pub pages: Vec<LayoutPage>,
    pub blocks: Vec<LayoutBlock>,
    pub regions: Vec<LayoutRegion>,
    pub lines: Vec<LayoutLine>,
    pub runs: Vec<LayoutRun>,
    pub positioned: Vec<PositionedRegion>,
    pub resources: ResourceRegistry,
    pub arrangements: ArrangementTracker,
    pub(crate) names: HashMap<String, NodeId>,
    pub(crate) node_types: Vec<&'static str>,
}

impl LayoutDocument {
    pub fn block(&self, id: BlockId) -> &LayoutBlock {
        &self.blocks[id.0]
    }

    pub fn region(&self, id: RegionId) -> &LayoutRegion {
        &self.regions[id.0]
    }

    pub fn line(&self, id: LineId) -> &LayoutLine {
        &self.lines[id.0]
    }

    pub fn run(&self, id: RunId) -> &LayoutRun {
        &self.runs[id.0]
    }

    pub fn positioned_region(&self, id: PositionedId) -> &PositionedRegion {
        &self.positioned[id.0]
    }

    /// Node id for a node's `id` attribute.
    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// Kind name of a source node ("Panel", "Text", ...).
    pub fn node_type(&self, node: NodeId) -> &'static str {
        self.node_types.get(node.0).copied().unwrap_or("Document")
    }

    /// Blocks owned by a node, in creation order (one per fragment).
    pub fn blocks_of(&self, node: NodeId) -> Vec<BlockId> {
        self.blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.owner == node)
            .map(|(i, _)| BlockId(i))
            .collect()
    }

    pub fn runs_of(&self, node: NodeId) -> Vec<RunId> {
        self.runs
            .iter()
            .enumerate()
            .filter(|(_, r)| r.owner == node)
            .map(|(i, _)| RunId(i))
            .collect()
    }

    pub fn positioned_of(&self, node: NodeId) -> Vec<PositionedId> {
        self.positioned
            .iter()
            .enumerate()
            .filter(|(_, p)| p.owner == node)
            .map(|(i, _)| PositionedId(i))
            .collect()
    }

    /// Lines and blocks of a region, in flow order.
    pub fn lines_of(&self, region: RegionId) -> Vec<LineId> {
        self.regions[region.0]
            .items
            .iter()
            .filter_map(|item| match item {
                RegionItem::Line(id) => Some(*id),
                RegionItem::Block(_) => None,
            })
            .collect()
    }

    // ── Absolute coordinates ────────────────────────────────────

    pub fn container_origin(&self, container: Container) -> Point {
        match container {
            Container::Page(_) | Container::Resource(_) => Point::ZERO,
            Container::Region(id) => self.region_origin(id),
            Container::Positioned(id) => self.positioned[id.0].total_bounds.origin(),
        }
    }

    /// Top-left of a block's outer rectangle, relative offset applied.
    pub fn block_origin(&self, id: BlockId) -> Point {
        let block = &self.blocks[id.0];
        self.container_origin(block.parent)
            .add(block.total_bounds.origin())
            .add(block.relative_offset)
    }

    /// Painted border box of a block.
    pub fn block_border_rect(&self, id: BlockId) -> Rect {
        let block = &self.blocks[id.0];
        let origin = self
            .block_origin(id)
            .offset(block.margin.left, block.margin.top);
        Rect::from_origin(origin, block.border_size())
    }

    /// Content rectangle of a block.
    pub fn block_content_rect(&self, id: BlockId) -> Rect {
        let block = &self.blocks[id.0];
        let b = block.available_bounds;
        Rect::from_origin(self.block_origin(id).add(b.origin()), b.size())
    }

    pub fn region_origin(&self, id: RegionId) -> Point {
        let region = &self.regions[id.0];
        let block = &self.blocks[region.block.0];
        self.block_origin(region.block)
            .add(block.available_bounds.origin())
            .add(region.total_bounds.origin())
    }

    pub fn region_rect(&self, id: RegionId) -> Rect {
        Rect::from_origin(self.region_origin(id), self.regions[id.0].total_bounds.size())
    }

    pub fn line_rect(&self, id: LineId) -> Rect {
        let line = &self.lines[id.0];
        let origin = self.region_origin(line.region).offset(0.0, line.offset_y);
        Rect::from_origin(origin, Size::new(line.width, line.height))
    }

    /// Painted box of a run.
    pub fn run_rect(&self, id: RunId) -> Rect {
        let run = &self.runs[id.0];
        let line = self.line_rect(run.line);
        run.bounds
            .translate(line.x + run.relative_offset.x, line.y + run.relative_offset.y)
    }

    /// Text of all text runs of a line, joined.
    pub fn line_text(&self, id: LineId) -> String {
        self.lines[id.0]
            .runs
            .iter()
            .filter_map(|r| match &self.runs[r.0].kind {
                RunKind::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}
