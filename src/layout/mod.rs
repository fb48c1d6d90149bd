//! # Page-Aware Layout Engine
//!
//! The page is the fundamental unit of layout. Content never lands on an
//! infinite canvas that gets sliced afterwards; it flows *into* pages:
//!
//! 1. Open a page with known dimensions, lay out its headers and footers,
//!    and give the rest to the page's body block.
//! 2. Place each child. Before placing, ask: "does this fit?"
//! 3. If it fits: place it and advance the cursor of the current column.
//! 4. If it doesn't: finish the current fragment of every open box, move to
//!    the next free column (innermost multi-column box first) or to a new
//!    page, reopen the boxes as continuations and place it there.
//!
//! Positioned content (relative, absolute, fixed) and embedded canvases are
//! laid out when they are encountered, by re-entering the same flow code
//! with a fresh, detached [`FlowContext`].
//!
//! The output is a [`LayoutDocument`]: arenas of pages, blocks, regions,
//! lines, runs and positioned regions plus the shared-resource registry and
//! the arrangement chains.

pub mod box_model;
pub mod info;
pub mod page_break;
pub mod resources;
pub mod tree;

mod flow;
mod line;
mod positioned;

use std::collections::HashSet;
use std::ops::Range;
use std::rc::Rc;

use log::{debug, warn};

pub use info::{ElementInfo, LayoutInfo, PageInfo, ResourceInfo};
pub use page_break::FlowMode;
pub use resources::{Arrangement, ArrangementTracker, ResourceHandle, ResourceRegistry, SharedResource};
pub use tree::*;

use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::font::FontContext;
use crate::geometry::{Point, Rect, Size};
use crate::model::{Document, Node, NodeId, NodeKind, NodeTree, PageConfig};
use crate::style::ResolvedStyle;
use box_model::BoxBounds;

/// The main layout engine.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Main entry point: lay out a document into pages.
    pub fn layout(
        &self,
        document: &Document,
        font_context: &FontContext,
    ) -> Result<LayoutDocument, LayoutError> {
        let tree = NodeTree::new(document);
        let mut pass = LayoutPass {
            tree: &tree,
            fonts: font_context,
            config: &self.config,
            doc: LayoutDocument::default(),
            warned_fonts: HashSet::new(),
            deferred: Vec::new(),
        };
        pass.run(document)?;
        pass.doc.names = tree.names().clone();
        pass.doc.node_types = (0..tree.len())
            .map(|i| tree.node(NodeId(i)).map_or("Document", |n| n.kind.name()))
            .collect();
        debug!(
            "layout finished: {} pages, {} blocks, {} lines, {} positioned regions",
            pass.doc.pages.len(),
            pass.doc.blocks.len(),
            pass.doc.lines.len(),
            pass.doc.positioned.len()
        );
        Ok(pass.doc)
    }
}

/// State of one layout run.
pub(crate) struct LayoutPass<'a> {
    tree: &'a NodeTree<'a>,
    fonts: &'a FontContext,
    config: &'a LayoutConfig,
    doc: LayoutDocument,
    warned_fonts: HashSet<String>,
    /// Out-of-flow boxes waiting for a containing block to close.
    deferred: Vec<positioned::DeferredOffset>,
}

/// A run of pages sharing one configuration, headers and footers.
#[derive(Debug)]
pub(crate) struct PageSequence {
    node: NodeId,
    config: PageConfig,
    style: Rc<ResolvedStyle>,
    headers: Vec<NodeId>,
    footers: Vec<NodeId>,
}

/// A positioning context inherited from an enclosing flow.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Frame {
    /// Padding box, in the coordinates of the flow that inherits it.
    rect: Rect,
    explicit: bool,
}

/// A box that is still receiving content.
#[derive(Debug, Clone)]
pub(crate) struct OpenBlock {
    node: NodeId,
    block: BlockId,
    style: Rc<ResolvedStyle>,
    bounds: BoxBounds,
    /// Region (column) currently being filled.
    region: RegionId,
    column: usize,
    columns: usize,
    column_width: f64,
    gutter: f64,
    /// Height content may use in this fragment. Infinite unless splitting.
    limit: f64,
    /// `limit` comes from the box's own explicit or max height rather than
    /// the space left on the page.
    capped: bool,
    mode: FlowMode,
    /// Outer top-left in the flow's coordinates, relative offsets applied.
    outer: Point,
    explicit_layout: bool,
    /// Border-box height already used by earlier fragments.
    consumed: f64,
}

impl OpenBlock {
    fn content_origin(&self) -> Point {
        self.outer.add(self.bounds.available.origin())
    }

    fn column_origin(&self) -> Point {
        self.content_origin()
            .offset(self.column as f64 * (self.column_width + self.gutter), 0.0)
    }

    fn padding_box(&self) -> Rect {
        self.bounds
            .border_box
            .translate(self.outer.x, self.outer.y)
            .inset(&self.bounds.border)
    }

    fn establishes_context(&self) -> bool {
        self.explicit_layout || self.style.position.establishes_context()
    }
}

/// The available-space context of one flow: the stack of open boxes plus
/// where that flow lives. The page flow can paginate; detached flows
/// (positioned content, canvases, headers, footers) only grow.
#[derive(Debug)]
pub(crate) struct FlowContext {
    stack: Vec<OpenBlock>,
    frames: Vec<Frame>,
    sequence: Option<Rc<PageSequence>>,
    page_index: usize,
    resource: Option<ResourceHandle>,
    page_box: Rect,
    page_content: Rect,
}

impl FlowContext {
    fn paginated(sequence: Rc<PageSequence>) -> Self {
        Self {
            stack: Vec::new(),
            frames: Vec::new(),
            sequence: Some(sequence),
            page_index: 0,
            resource: None,
            page_box: Rect::default(),
            page_content: Rect::default(),
        }
    }

    /// A nested flow on the same page.
    fn detached(&self, frames: Vec<Frame>, resource: Option<ResourceHandle>) -> Self {
        Self {
            stack: Vec::new(),
            frames,
            sequence: None,
            page_index: self.page_index,
            resource,
            page_box: self.page_box,
            page_content: self.page_content,
        }
    }

    fn top(&self) -> Result<&OpenBlock, LayoutError> {
        self.stack
            .last()
            .ok_or(LayoutError::FlowState("no open block to place content in"))
    }

    /// Positioning contexts visible to a flow nested in this one, outermost
    /// first.
    fn nested_frames(&self) -> Vec<Frame> {
        let mut frames = self.frames.clone();
        frames.extend(
            self.stack
                .iter()
                .filter(|ob| ob.establishes_context())
                .map(|ob| Frame {
                    rect: ob.padding_box(),
                    explicit: ob.explicit_layout,
                }),
        );
        frames
    }
}

/// Everything needed to lay out a box as the root of a detached flow.
pub(crate) struct Detached {
    node: NodeId,
    style: Rc<ResolvedStyle>,
    container: Container,
    /// Outer top-left relative to the container.
    position: Point,
    /// Outer top-left in flow coordinates.
    outer: Point,
    width: f64,
    explicit_layout: bool,
    frames: Vec<Frame>,
    resource: Option<ResourceHandle>,
}

impl<'a> LayoutPass<'a> {
    fn node(&self, id: NodeId) -> Result<&'a Node, LayoutError> {
        self.tree
            .node(id)
            .ok_or(LayoutError::FlowState("node id outside the document"))
    }

    fn note_font(&mut self, family: &str) {
        if !self.fonts.registry().contains_family(family) && self.warned_fonts.insert(family.to_string()) {
            warn!("font family '{}' is not registered; using Helvetica metrics", family);
        }
    }

    /// Split the document into page sequences and lay each one out.
    fn run(&mut self, document: &Document) -> Result<(), LayoutError> {
        let tree = self.tree;
        let mut loose: Vec<NodeId> = Vec::new();
        for &id in tree.children(NodeId::ROOT) {
            let node = self.node(id)?;
            match &node.kind {
                NodeKind::Page { config } => {
                    self.flush_default_sequence(document, &mut loose)?;
                    self.layout_sequence(id, config.clone(), &node.style, tree.children(id))?;
                }
                _ => loose.push(id),
            }
        }
        self.flush_default_sequence(document, &mut loose)
    }

    fn flush_default_sequence(
        &mut self,
        document: &Document,
        loose: &mut Vec<NodeId>,
    ) -> Result<(), LayoutError> {
        let has_content = loose.iter().any(|&id| {
            self.tree.node(id).is_some_and(|n| {
                !matches!(
                    n.kind,
                    NodeKind::PageHeader | NodeKind::PageFooter | NodeKind::PageBreak
                )
            })
        });
        if has_content {
            let ids = std::mem::take(loose);
            let style = crate::style::Style::default();
            self.layout_sequence(NodeId::ROOT, document.default_page.clone(), &style, &ids)?;
        }
        loose.clear();
        Ok(())
    }

    fn layout_sequence(
        &mut self,
        node: NodeId,
        config: PageConfig,
        style: &crate::style::Style,
        children: &[NodeId],
    ) -> Result<(), LayoutError> {
        let (width, height) = config.size.dimensions();
        let page = Size::new(width, height);
        let root_style = self.config.root_style(page);
        let resolved = Rc::new(style.resolve(Some(&root_style), page));

        let mut headers = Vec::new();
        let mut footers = Vec::new();
        let mut body = Vec::new();
        for &id in children {
            match self.node(id)?.kind {
                NodeKind::PageHeader => headers.push(id),
                NodeKind::PageFooter => footers.push(id),
                _ => body.push(id),
            }
        }

        let sequence = Rc::new(PageSequence {
            node,
            config,
            style: resolved,
            headers,
            footers,
        });
        let mut cx = FlowContext::paginated(sequence);
        self.open_page(&mut cx)?;
        self.layout_nodes(&mut cx, &body)?;
        self.close_page(&mut cx)
    }

    /// Start a page: headers at the top of the content box, footers at the
    /// bottom, and the body block in between.
    fn open_page(&mut self, cx: &mut FlowContext) -> Result<(), LayoutError> {
        let sequence = cx
            .sequence
            .clone()
            .ok_or(LayoutError::FlowState("pages can only be opened by a page flow"))?;
        let (width, height) = sequence.config.size.dimensions();
        let margin = sequence.config.margin;
        let content = Rect::new(
            margin.left,
            margin.top,
            width - margin.horizontal(),
            height - margin.vertical(),
        );
        if content.width <= 0.0 || content.height <= 0.0 {
            return Err(LayoutError::InvalidPage {
                width: content.width,
                height: content.height,
            });
        }

        let index = self.doc.pages.len();
        self.doc.pages.push(LayoutPage {
            index,
            width,
            height,
            margin,
            node: sequence.node,
            body: BlockId(usize::MAX),
            headers: Vec::new(),
            footers: Vec::new(),
        });
        cx.page_index = index;
        cx.page_box = Rect::new(0.0, 0.0, width, height);
        cx.page_content = content;
        debug!("page {} opened ({:.2}x{:.2})", index + 1, width, height);

        let mut top = content.y;
        for &header in &sequence.headers {
            let block = self.layout_furniture(cx, &sequence, header, Point::new(content.x, top), content.width)?;
            top += self.doc.blocks[block.0].height;
            self.doc.pages[index].headers.push(block);
        }

        // Footers are laid out below the page, then moved up by their height.
        let positioned_mark = self.doc.positioned.len();
        let arrangement_mark = self.doc.arrangements.len();
        let mut footer_height = 0.0;
        let mut footers = Vec::new();
        for &footer in &sequence.footers {
            let origin = Point::new(content.x, content.bottom() + footer_height);
            let block = self.layout_furniture(cx, &sequence, footer, origin, content.width)?;
            footer_height += self.doc.blocks[block.0].height;
            footers.push(block);
        }
        if !footers.is_empty() {
            for &block in &footers {
                self.doc.blocks[block.0].total_bounds.y -= footer_height;
            }
            let positioned = positioned_mark..self.doc.positioned.len();
            let arrangements = arrangement_mark..self.doc.arrangements.len();
            self.translate_positioned(positioned, None, 0.0, -footer_height);
            self.doc
                .arrangements
                .translate_range(arrangements, None, 0.0, -footer_height);
        }
        self.doc.pages[index].footers = footers;

        let body = Rect::new(content.x, top, content.width, content.bottom() - footer_height - top);
        if body.height <= 0.0 {
            return Err(LayoutError::InvalidPage {
                width: body.width,
                height: body.height,
            });
        }

        let mode = if sequence.config.wrap {
            FlowMode::Split
        } else {
            FlowMode::Clip
        };
        let style = sequence.style.clone();
        let bounds = box_model::resolve(&style, body.size(), false);
        let block = self.push_block(
            cx,
            sequence.node,
            style,
            bounds,
            mode,
            Container::Page(index),
            body.origin(),
            body.origin(),
            false,
            false,
            0.0,
        )?;
        self.doc.pages[index].body = block;
        Ok(())
    }

    /// Close every open box of the page flow, body last.
    fn close_page(&mut self, cx: &mut FlowContext) -> Result<(), LayoutError> {
        while !cx.stack.is_empty() {
            self.close_block(cx, true)?;
        }
        debug!("page {} closed", cx.page_index + 1);
        Ok(())
    }

    fn layout_furniture(
        &mut self,
        cx: &FlowContext,
        sequence: &PageSequence,
        id: NodeId,
        origin: Point,
        width: f64,
    ) -> Result<BlockId, LayoutError> {
        let node = self.node(id)?;
        let style = Rc::new(
            node.style
                .resolve(Some(&sequence.style), Size::new(width, f64::INFINITY)),
        );
        let outer = origin.add(style.relative_offset());
        self.layout_detached(
            cx,
            Detached {
                node: id,
                style,
                container: Container::Page(cx.page_index),
                position: origin,
                outer,
                width,
                explicit_layout: false,
                frames: Vec::new(),
                resource: None,
            },
        )
    }

    /// Lay out a box as the root of a new flow that grows to fit.
    fn layout_detached(&mut self, cx: &FlowContext, detached: Detached) -> Result<BlockId, LayoutError> {
        let mut sub = cx.detached(detached.frames, detached.resource);
        let bounds = box_model::resolve(&detached.style, Size::new(detached.width, f64::INFINITY), false);
        self.push_block(
            &mut sub,
            detached.node,
            detached.style,
            bounds,
            FlowMode::Grow,
            detached.container,
            detached.position,
            detached.outer,
            detached.explicit_layout,
            false,
            0.0,
        )?;
        self.layout_contents(&mut sub, detached.node)?;
        self.close_block(&mut sub, true)
    }

    /// Shift positioned regions with an index in `range` that live in
    /// `frame`.
    fn translate_positioned(
        &mut self,
        range: Range<usize>,
        frame: Option<ResourceHandle>,
        dx: f64,
        dy: f64,
    ) {
        let end = range.end.min(self.doc.positioned.len());
        let start = range.start.min(end);
        for region in &mut self.doc.positioned[start..end] {
            if region.frame == frame {
                region.total_bounds = region.total_bounds.translate(dx, dy);
                region.containing_block = region.containing_block.translate(dx, dy);
            }
        }
    }
}
