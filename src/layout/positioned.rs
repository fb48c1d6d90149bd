//! # Positioning
//!
//! Absolute and fixed boxes leave the flow: an anchor run marks where they
//! appeared, and their content is laid out in a detached flow against
//! their containing block. Canvases are inline replaced boxes whose
//! content lives in its own coordinate frame and is laid out once per
//! source node, however often the canvas is placed.

use std::ops::Range;
use std::rc::Rc;

use log::{debug, trace};

use super::box_model;
use super::resources::ResourceHandle;
use super::tree::{BlockId, Container, PositionedId, PositionedRegion, RegionId, RunId};
use super::{Detached, FlowContext, LayoutPass};
use crate::canvas;
use crate::error::LayoutError;
use crate::geometry::{Point, Rect, Size};
use crate::model::{Edges, Node, NodeId, NodeKind};
use crate::style::{Position, ResolvedStyle, SizeConstraint};

impl<'a> LayoutPass<'a> {
    /// Border box size of a canvas: node attributes, then style, then the
    /// markup, then the configured default. Min/max clamps apply.
    pub(super) fn canvas_box(&self, node: &Node, style: &ResolvedStyle) -> Size {
        let NodeKind::Canvas {
            width,
            height,
            view_box,
            content,
        } = &node.kind
        else {
            return Size::default();
        };
        let intrinsic = canvas::intrinsic_size(
            width.or(style.width.fixed()),
            height.or(style.height.fixed()),
            view_box.as_deref(),
            content.as_deref(),
            self.config.default_canvas,
        );
        Size::new(
            box_model::clamp(intrinsic.width, style.min_width, style.max_width),
            box_model::clamp(intrinsic.height, style.min_height, style.max_height),
        )
    }

    /// Padding box an out-of-flow box resolves its offsets against.
    ///
    /// Absolute: the nearest enclosing box that is positioned or has an
    /// explicit layout, else the page content box. Fixed: the nearest
    /// explicit-layout box, else the page box. The block id is set when the
    /// containing block is still open and its height is not known yet.
    fn containing_block(&self, cx: &FlowContext, mode: Position) -> (Rect, Option<BlockId>) {
        let explicit_only = mode == Position::Fixed;
        let from_stack = cx
            .stack
            .iter()
            .rev()
            .find(|ob| {
                if explicit_only {
                    ob.explicit_layout
                } else {
                    ob.establishes_context()
                }
            })
            .map(|ob| {
                let open = ob.bounds.fixed_height.is_none().then_some(ob.block);
                (ob.padding_box(), open)
            });
        let from_frames = || {
            cx.frames
                .iter()
                .rev()
                .find(|f| !explicit_only || f.explicit)
                .map(|f| (f.rect, None))
        };
        from_stack.or_else(from_frames).unwrap_or(if explicit_only {
            (cx.page_box, None)
        } else {
            (cx.page_content, None)
        })
    }

    /// Lay out an absolute or fixed node. `static_position` is where it
    /// would have been in the flow.
    pub(super) fn place_out_of_flow(
        &mut self,
        cx: &FlowContext,
        id: NodeId,
        style: &ResolvedStyle,
        static_position: Point,
        run: Option<RunId>,
        anchor: Option<RegionId>,
    ) -> Result<PositionedId, LayoutError> {
        let node = self.node(id)?;
        let mode = style.position;
        let (final_cb, open) = self.containing_block(cx, mode);
        let parent_style = cx.top()?.style.clone();
        // Percentages resolve against the containing block.
        let style = node.style.resolve(Some(&parent_style), final_cb.size());
        let m = style.margin;
        let is_canvas = matches!(node.kind, NodeKind::Canvas { .. });

        // Offsets from the far edges of a box that is still open wait for
        // its final size; until then the box is laid out from the top.
        let right = match (style.left, style.right) {
            (None, Some(r)) => Some(r + m.right),
            _ => None,
        };
        let vertical = match (style.top, style.bottom, style.height) {
            (None, Some(b), _) => Some(VerticalOffset::Bottom(b + m.bottom)),
            (Some(t), Some(b), SizeConstraint::Auto) if !is_canvas => {
                Some(VerticalOffset::Stretch(t + b + m.vertical()))
            }
            _ => None,
        };
        let deferred = open.filter(|_| right.is_some() || vertical.is_some());
        let cb = if deferred.is_some() && vertical.is_some() {
            Rect::new(final_cb.x, final_cb.y, final_cb.width, f64::INFINITY)
        } else {
            final_cb
        };
        trace!("{} {:?} against {:?}", id, mode, cb);
        let positioned_start = self.doc.positioned.len();
        let arrangement_start = self.doc.arrangements.len();

        let stretched_width = match (style.left, style.right, style.width) {
            (Some(l), Some(r), SizeConstraint::Auto) => Some((cb.width - l - r - m.horizontal()).max(0.0)),
            _ => None,
        };
        let stretched_height = match (style.top, style.bottom, style.height) {
            (Some(t), Some(b), SizeConstraint::Auto) if cb.height.is_finite() => {
                Some((cb.height - t - b - m.vertical()).max(0.0))
            }
            _ => None,
        };

        if is_canvas {
            let intrinsic = self.canvas_box(node, &style);
            let size = Size::new(
                stretched_width.unwrap_or(intrinsic.width),
                stretched_height.unwrap_or(intrinsic.height),
            );
            let origin = resolve_origin(&style, cb, static_position, size);
            let region = self.layout_canvas(
                cx,
                id,
                &style,
                Rect::from_origin(origin, size),
                run,
                anchor,
                cb,
            )?;
            if let Some(containing) = deferred {
                let pending = Pending { right, vertical };
                self.defer(cx, containing, region, pending, positioned_start, arrangement_start);
            }
            return Ok(region);
        }

        let available = match (style.left, style.right) {
            (Some(l), Some(r)) => cb.width - l - r,
            (Some(l), None) => cb.width - l,
            (None, Some(r)) => cb.width - r,
            (None, None) => cb.right() - static_position.x,
        } - m.horizontal();
        let available = stretched_width.unwrap_or(available.max(0.0));

        let provisional = Point::new(
            style
                .left
                .map(|l| cb.x + l + m.left)
                .unwrap_or(static_position.x + m.left),
            style
                .top
                .map(|t| cb.y + t + m.top)
                .unwrap_or(static_position.y + m.top),
        );

        let mut content_style = style.clone();
        content_style.margin = Edges::default();
        if let Some(w) = stretched_width {
            content_style.width = SizeConstraint::Fixed(w);
        }
        if let Some(h) = stretched_height {
            content_style.height = SizeConstraint::Fixed(h);
        }

        let region = self.push_positioned(PositionedRegion {
            owner: id,
            mode,
            page_index: cx.page_index,
            total_bounds: Rect::from_origin(provisional, Size::new(available, 0.0)),
            frame: cx.resource,
            anchor,
            associated_run: run,
            containing_block: cb,
            content: None,
            resource: None,
        });
        let positioned_mark = self.doc.positioned.len();

        let block = self.layout_detached(
            cx,
            Detached {
                node: id,
                style: Rc::new(content_style),
                container: Container::Positioned(region),
                position: Point::ZERO,
                outer: provisional,
                width: available,
                explicit_layout: false,
                frames: cx.nested_frames(),
                resource: cx.resource,
            },
        )?;

        let size = self.doc.blocks[block.0].border_size();
        let origin = resolve_origin(&style, cb, static_position, size);
        let (dx, dy) = (origin.x - provisional.x, origin.y - provisional.y);
        if dx != 0.0 || dy != 0.0 {
            let nested = positioned_mark..self.doc.positioned.len();
            let arranged = arrangement_start..self.doc.arrangements.len();
            self.translate_positioned(nested, cx.resource, dx, dy);
            self.doc
                .arrangements
                .translate_range(arranged, cx.resource, dx, dy);
        }

        let entry = &mut self.doc.positioned[region.0];
        entry.total_bounds = Rect::from_origin(origin, size);
        entry.content = Some(block);
        if let Some(containing) = deferred {
            let pending = Pending { right, vertical };
            self.defer(cx, containing, region, pending, positioned_start, arrangement_start);
        }
        debug!(
            "{} positioned at ({:.2}, {:.2}) size {:.2}x{:.2}",
            id, origin.x, origin.y, size.width, size.height
        );
        Ok(region)
    }

    /// Place an in-flow canvas whose border box is already known.
    pub(super) fn place_canvas(
        &mut self,
        cx: &FlowContext,
        id: NodeId,
        style: &ResolvedStyle,
        border_box: Rect,
        run: RunId,
        anchor: RegionId,
    ) -> Result<PositionedId, LayoutError> {
        let offset = style.relative_offset();
        let bounds = border_box.translate(offset.x, offset.y);
        self.layout_canvas(cx, id, style, bounds, Some(run), Some(anchor), border_box)
    }

    /// Record one placement of a canvas. Its content is laid out in the
    /// canvas's own frame the first time the node is placed; later
    /// placements reuse the registered resource.
    #[allow(clippy::too_many_arguments)]
    fn layout_canvas(
        &mut self,
        cx: &FlowContext,
        id: NodeId,
        style: &ResolvedStyle,
        bounds: Rect,
        run: Option<RunId>,
        anchor: Option<RegionId>,
        containing_block: Rect,
    ) -> Result<PositionedId, LayoutError> {
        let frame = Rect::new(0.0, 0.0, bounds.width, bounds.height);
        let handle = self.doc.resources.register(id, frame);
        let region = self.push_positioned(PositionedRegion {
            owner: id,
            mode: style.position,
            page_index: cx.page_index,
            total_bounds: bounds,
            frame: cx.resource,
            anchor,
            associated_run: run,
            containing_block,
            content: None,
            resource: Some(handle),
        });

        if !self.doc.resources.is_registered(handle) {
            let mut content_style = style.clone();
            content_style.margin = Edges::default();
            content_style.width = SizeConstraint::Fixed(bounds.width);
            content_style.height = SizeConstraint::Fixed(bounds.height);
            content_style.min_width = 0.0;
            content_style.min_height = 0.0;
            content_style.max_width = f64::INFINITY;
            content_style.max_height = f64::INFINITY;
            content_style.position = Position::Static;

            let block = self.layout_detached(
                cx,
                Detached {
                    node: id,
                    style: Rc::new(content_style),
                    container: Container::Resource(handle),
                    position: Point::ZERO,
                    outer: Point::ZERO,
                    width: bounds.width,
                    explicit_layout: true,
                    frames: Vec::new(),
                    resource: Some(handle),
                },
            )?;
            self.doc.resources.mark_registered(handle, block, frame);
            self.doc.positioned[region.0].content = Some(block);
            debug!(
                "canvas {} registered as resource {} ({:.2}x{:.2})",
                id, handle.0, bounds.width, bounds.height
            );
        } else {
            trace!("canvas {} reuses resource {}", id, handle.0);
        }

        self.doc
            .arrangements
            .record(id, cx.page_index, bounds, cx.resource);
        Ok(region)
    }

    fn defer(
        &mut self,
        cx: &FlowContext,
        containing: BlockId,
        region: PositionedId,
        pending: Pending,
        positioned_start: usize,
        arrangement_start: usize,
    ) {
        trace!("{} waits for block {} to close", region.0, containing.0);
        self.deferred.push(DeferredOffset {
            containing,
            region,
            pending,
            frame: cx.resource,
            positioned: positioned_start..self.doc.positioned.len(),
            arrangements: arrangement_start..self.doc.arrangements.len(),
        });
    }

    /// Finish the out-of-flow boxes waiting for `block`, now that its
    /// padding box `cb` is final.
    pub(super) fn resolve_deferred(&mut self, block: BlockId, cb: Rect) {
        if self.deferred.is_empty() {
            return;
        }
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.deferred)
            .into_iter()
            .partition(|d| d.containing == block);
        self.deferred = waiting;

        for d in ready {
            let bounds = self.doc.positioned[d.region.0].total_bounds;
            let dx = d
                .pending
                .right
                .map_or(0.0, |edge| cb.right() - edge - bounds.width - bounds.x);
            let mut dy = 0.0;
            match d.pending.vertical {
                Some(VerticalOffset::Bottom(edge)) => {
                    dy = cb.bottom() - edge - bounds.height - bounds.y;
                }
                Some(VerticalOffset::Stretch(spacing)) => self.stretch_height(d.region, cb.height - spacing),
                None => {}
            }
            if dx != 0.0 || dy != 0.0 {
                self.translate_positioned(d.positioned.clone(), d.frame, dx, dy);
                self.doc
                    .arrangements
                    .translate_range(d.arrangements.clone(), d.frame, dx, dy);
            }
            let entry = &mut self.doc.positioned[d.region.0];
            entry.containing_block = cb;
            debug!(
                "{} resolved against the final padding box of block {} ({:.2}x{:.2})",
                entry.owner, block.0, cb.width, cb.height
            );
        }
    }

    /// Give a top-and-bottom positioned box the height between its offsets.
    fn stretch_height(&mut self, region: PositionedId, height: f64) {
        let height = height.max(0.0);
        let entry = &mut self.doc.positioned[region.0];
        entry.total_bounds.height = height;
        let (owner, content) = (entry.owner, entry.content);
        if let Some(content) = content {
            let b = &mut self.doc.blocks[content.0];
            let inner = b.border.vertical() + b.padding.vertical();
            b.height = height;
            b.total_bounds.height = height;
            b.available_bounds.height = (height - inner).max(0.0);
        }
        if let Some(arrangement) = self.doc.arrangements.last_mut(owner) {
            arrangement.render_bounds.height = height;
        }
    }

    /// Add a positioned region and attach it to its anchor region and that
    /// region's block.
    fn push_positioned(&mut self, region: PositionedRegion) -> PositionedId {
        let id = PositionedId(self.doc.positioned.len());
        let anchor = region.anchor;
        self.doc.positioned.push(region);
        if let Some(anchor) = anchor {
            let r = &mut self.doc.regions[anchor.0];
            r.positioned.push(id);
            let block = r.block;
            self.doc.blocks[block.0].positioned_regions.push(id);
        }
        id
    }
}

/// Vertical placement that needs the final height of the containing block.
#[derive(Debug, Clone, Copy, PartialEq)]
enum VerticalOffset {
    /// Distance from the containing block's bottom edge to the margin box.
    Bottom(f64),
    /// Both offsets set on an auto-height box: total offsets and margins.
    Stretch(f64),
}

/// Offsets of an out-of-flow box that need the final size of its
/// containing block.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Pending {
    /// Distance from the right edge to the margin box, when `left` is unset.
    right: Option<f64>,
    vertical: Option<VerticalOffset>,
}

/// An out-of-flow box whose position waits for its containing block to
/// close.
#[derive(Debug)]
pub(crate) struct DeferredOffset {
    containing: BlockId,
    region: PositionedId,
    pending: Pending,
    frame: Option<ResourceHandle>,
    /// Positioned regions to move with it, the box's own included.
    positioned: Range<usize>,
    /// Arrangements recorded while it was laid out.
    arrangements: Range<usize>,
}

/// Border-box origin of an out-of-flow box of `size`: `left`/`top` win,
/// then `right`/`bottom`, then the static position. A bottom offset is
/// ignored when the containing block has no height.
fn resolve_origin(style: &ResolvedStyle, cb: Rect, static_position: Point, size: Size) -> Point {
    let m = style.margin;
    let x = match (style.left, style.right) {
        (Some(l), _) => cb.x + l + m.left,
        (None, Some(r)) => cb.right() - r - m.right - size.width,
        (None, None) => static_position.x + m.left,
    };
    let y = match (style.top, style.bottom) {
        (Some(t), _) => cb.y + t + m.top,
        (None, Some(b)) if cb.height.is_finite() => cb.bottom() - b - m.bottom - size.height,
        _ => static_position.y + m.top,
    };
    Point::new(x, y)
}
