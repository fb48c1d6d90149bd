//! Block flow: opening and closing boxes, the fit check, and moving to the
//! next column or page when content doesn't fit.

use std::rc::Rc;

use log::{debug, trace, warn};

use super::box_model::{self, BoxBounds};
use super::page_break::{decide_break, flow_mode, BreakDecision, FlowMode, EPSILON};
use super::tree::{BlockId, Container, LayoutBlock, LayoutRegion, RegionId, RegionItem};
use super::{FlowContext, LayoutPass, OpenBlock};
use crate::error::LayoutError;
use crate::geometry::{Point, Rect, Size};
use crate::model::{NodeId, NodeKind};
use crate::style::ResolvedStyle;

/// A box whose fragment was closed by a column or page advance and that
/// must be reopened as a continuation.
struct Suspended {
    node: NodeId,
    style: Rc<ResolvedStyle>,
    mode: FlowMode,
    consumed: f64,
}

impl<'a> LayoutPass<'a> {
    /// Lay out a list of sibling nodes into the innermost open box.
    ///
    /// Consecutive inline nodes (text, canvases) and out-of-flow nodes are
    /// gathered and composed into lines together.
    pub(super) fn layout_nodes(
        &mut self,
        cx: &mut FlowContext,
        ids: &[NodeId],
    ) -> Result<(), LayoutError> {
        let mut inline: Vec<NodeId> = Vec::new();
        for &id in ids {
            let node = self.node(id)?;
            let out_of_flow = node.style.position.is_some_and(|p| p.is_out_of_flow());
            if node.is_inline() || out_of_flow {
                inline.push(id);
                continue;
            }
            if !inline.is_empty() {
                self.layout_inline(cx, &inline, None)?;
                inline.clear();
            }
            match node.kind {
                NodeKind::PageBreak => self.page_break(cx)?,
                NodeKind::PageHeader | NodeKind::PageFooter => {
                    warn!(
                        "{} {} is not a direct child of a page; skipped",
                        node.kind.name(),
                        id
                    );
                }
                NodeKind::Page { .. } => {
                    warn!("nested Page {} is laid out as a panel", id);
                    self.layout_block(cx, id)?;
                }
                _ => self.layout_block(cx, id)?,
            }
        }
        if !inline.is_empty() {
            self.layout_inline(cx, &inline, None)?;
        }
        Ok(())
    }

    /// Lay out what goes inside a node's box. The box is already open.
    pub(super) fn layout_contents(
        &mut self,
        cx: &mut FlowContext,
        id: NodeId,
    ) -> Result<(), LayoutError> {
        let node = self.node(id)?;
        match node.kind {
            NodeKind::Text { .. } => self.layout_inline(cx, &[id], Some(id)),
            NodeKind::PageBreak => Ok(()),
            _ => {
                let tree = self.tree;
                self.layout_nodes(cx, tree.children(id))
            }
        }
    }

    fn layout_block(&mut self, cx: &mut FlowContext, id: NodeId) -> Result<(), LayoutError> {
        let node = self.node(id)?;
        let (parent_style, parent_mode, space) = {
            let top = cx.top()?;
            (
                top.style.clone(),
                top.mode,
                Size::new(top.column_width, top.bounds.available.height),
            )
        };
        let style = Rc::new(node.style.resolve(Some(&parent_style), space));

        if style.break_before && cx.sequence.is_some() && !self.at_page_top(cx) {
            debug!("break before {}", id);
            self.advance_page(cx)?;
        }

        let mode = flow_mode(style.overflow, false, parent_mode);
        let declared = box_model::resolve(&style, Size::new(space.width, f64::INFINITY), false);
        let needed = declared.margin.vertical()
            + declared
                .fixed_height
                .unwrap_or_else(|| declared.spacing().vertical());
        self.ensure_space(cx, needed)?;

        self.open_block(cx, id, style, mode, false, 0.0)?;
        self.layout_contents(cx, id)?;
        self.close_block(cx, true)?;
        Ok(())
    }

    /// Advance columns or pages until `needed` fits below the cursor, or
    /// until nothing precedes the cursor.
    pub(super) fn ensure_space(
        &mut self,
        cx: &mut FlowContext,
        needed: f64,
    ) -> Result<(), LayoutError> {
        loop {
            let (remaining, mode) = {
                let top = cx.top()?;
                let used = self.doc.regions[top.region.0].used_size.height;
                (top.limit - used, top.mode)
            };
            match decide_break(needed, remaining, self.column_is_fresh(cx), mode) {
                BreakDecision::Place => return Ok(()),
                BreakDecision::Overflow => {
                    debug!(
                        "{:.2}pt does not fit in {:.2}pt on a fresh column; overflowing",
                        needed, remaining
                    );
                    return Ok(());
                }
                BreakDecision::Advance if self.held_by_height(cx) => {
                    debug!(
                        "{:.2}pt does not fit in the {:.2}pt left of a box's declared height; overflowing",
                        needed, remaining
                    );
                    return Ok(());
                }
                BreakDecision::Advance => self.advance(cx)?,
            }
        }
    }

    /// Nothing has been placed on this page by any open box.
    pub(super) fn at_page_top(&self, cx: &FlowContext) -> bool {
        self.regions_empty(cx, 0)
    }

    /// Nothing has been placed in the current column. A column reached by
    /// a column advance starts below whatever earlier siblings used, so
    /// only the boxes from the innermost advanced multi-column box inward
    /// count.
    fn column_is_fresh(&self, cx: &FlowContext) -> bool {
        let from = cx.stack.iter().rposition(|ob| ob.column > 0).unwrap_or(0);
        self.regions_empty(cx, from)
    }

    fn regions_empty(&self, cx: &FlowContext, from: usize) -> bool {
        cx.stack[from.min(cx.stack.len())..]
            .iter()
            .all(|ob| self.doc.regions[ob.region.0].used_size.height <= EPSILON)
    }

    /// The content is bounded by the declared height of an open box that a
    /// column or page advance would not enlarge.
    fn held_by_height(&self, cx: &FlowContext) -> bool {
        let column = cx
            .stack
            .iter()
            .rposition(|ob| ob.mode == FlowMode::Split && ob.column + 1 < ob.columns);
        cx.stack
            .iter()
            .enumerate()
            .any(|(level, ob)| ob.capped && column.map_or(true, |c| level > c))
    }

    /// Open a child box of the innermost open box, at its cursor.
    fn open_block(
        &mut self,
        cx: &mut FlowContext,
        id: NodeId,
        style: Rc<ResolvedStyle>,
        mode: FlowMode,
        continuation: bool,
        consumed: f64,
    ) -> Result<BlockId, LayoutError> {
        let (parent_region, allot, outer) = {
            let top = cx.top()?;
            let used = self.doc.regions[top.region.0].used_size.height;
            let allot = Rect::new(
                0.0,
                used,
                top.column_width,
                (top.limit - used).max(0.0),
            );
            let outer = top
                .column_origin()
                .offset(0.0, used)
                .add(style.relative_offset());
            (top.region, allot, outer)
        };
        let mut bounds = box_model::resolve(&style, allot.size(), continuation);
        if continuation {
            bounds = box_model::continue_after(bounds, consumed);
        }
        let block = self.push_block(
            cx,
            id,
            style,
            bounds,
            mode,
            Container::Region(parent_region),
            allot.origin(),
            outer,
            false,
            continuation,
            consumed,
        )?;
        self.doc.regions[parent_region.0]
            .items
            .push(RegionItem::Block(block));
        Ok(block)
    }

    /// Create a block and its first region and push it on the stack.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn push_block(
        &mut self,
        cx: &mut FlowContext,
        node: NodeId,
        style: Rc<ResolvedStyle>,
        bounds: BoxBounds,
        mode: FlowMode,
        container: Container,
        position: Point,
        outer: Point,
        explicit_layout: bool,
        continuation: bool,
        consumed: f64,
    ) -> Result<BlockId, LayoutError> {
        let columns = style.column_count.max(1);
        let gutter = style.column_gap;
        let column_width = box_model::column_width(bounds.available.width, columns, gutter);
        if columns > 1 && column_width <= 0.0 {
            return Err(LayoutError::InvalidRegion {
                node,
                width: column_width,
            });
        }
        let (limit, capped) = if mode == FlowMode::Split {
            let spacing = bounds.spacing().vertical();
            let room = (bounds.total.height - bounds.margin.vertical() - spacing).max(0.0);
            match box_model::remaining_height(&style, &bounds, consumed) {
                Some(h) if h - spacing < room => ((h - spacing).max(0.0), true),
                _ => (room, false),
            }
        } else {
            (f64::INFINITY, false)
        };

        let block = BlockId(self.doc.blocks.len());
        self.doc.blocks.push(LayoutBlock {
            owner: node,
            parent: container,
            page_index: cx.page_index,
            total_bounds: Rect::from_origin(position, bounds.total),
            available_bounds: bounds.available,
            margin: bounds.margin,
            border: bounds.border,
            padding: bounds.padding,
            width: 0.0,
            height: 0.0,
            regions: Vec::new(),
            columns,
            column_gap: gutter,
            position: style.position,
            relative_offset: style.relative_offset(),
            overflow: style.overflow,
            explicit_layout,
            clip: mode == FlowMode::Clip,
            overflowed: false,
            positioned_regions: Vec::new(),
            continuation,
            continues: false,
        });
        let region = self.new_region(block, 0, column_width, gutter, limit);
        trace!(
            "open {} as block {} ({:?}, {} column(s) of {:.2}pt)",
            node,
            block.0,
            mode,
            columns,
            column_width
        );

        cx.stack.push(OpenBlock {
            node,
            block,
            style,
            bounds,
            region,
            column: 0,
            columns,
            column_width,
            gutter,
            limit,
            capped,
            mode,
            outer,
            explicit_layout,
            consumed,
        });
        Ok(block)
    }

    fn new_region(
        &mut self,
        block: BlockId,
        column: usize,
        width: f64,
        gutter: f64,
        capacity: f64,
    ) -> RegionId {
        let id = RegionId(self.doc.regions.len());
        self.doc.regions.push(LayoutRegion {
            block,
            column_index: column,
            total_bounds: Rect::new(column as f64 * (width + gutter), 0.0, width, capacity),
            used_size: Size::default(),
            capacity,
            items: Vec::new(),
            positioned: Vec::new(),
        });
        self.doc.blocks[block.0].regions.push(id);
        id
    }

    /// Shrink a region to what it used.
    fn finish_region(&mut self, region: RegionId) {
        let r = &mut self.doc.regions[region.0];
        r.total_bounds.width = r.used_size.width;
        r.total_bounds.height = r.used_size.height;
    }

    /// Pop the innermost box and compute its used size.
    ///
    /// `last` is false when the box continues in another column or page:
    /// the fragment then fills its allotment and defers its bottom spacing.
    pub(super) fn close_block(
        &mut self,
        cx: &mut FlowContext,
        last: bool,
    ) -> Result<BlockId, LayoutError> {
        let ob = cx
            .stack
            .pop()
            .ok_or(LayoutError::FlowState("close without an open block"))?;
        self.finish_region(ob.region);

        let (content_width, content_height) = self.doc.blocks[ob.block.0]
            .regions
            .iter()
            .map(|r| &self.doc.regions[r.0])
            .fold((0.0f64, 0.0f64), |(w, h), r| {
                (w.max(r.total_bounds.right()), h.max(r.used_size.height))
            });

        let bounds = &ob.bounds;
        let spacing = bounds.spacing();
        let natural = content_height + spacing.vertical();
        let border_width = box_model::shrink_width(&ob.style, bounds, content_width);
        let mut border_height = if !last {
            let fill = (bounds.total.height - bounds.margin.top).max(0.0);
            match box_model::remaining_height(&ob.style, bounds, ob.consumed) {
                Some(h) => fill.min(h),
                None => fill,
            }
        } else {
            match bounds.fixed_height {
                Some(h) => (h - ob.consumed).max(0.0),
                None => {
                    let min = (ob.style.min_height - ob.consumed).max(0.0);
                    let max = (ob.style.max_height - ob.consumed).max(0.0);
                    box_model::clamp(natural, min, max)
                }
            }
        };
        if ob.mode == FlowMode::Clip && bounds.total.height.is_finite() {
            border_height = border_height.min((bounds.total.height - bounds.margin.vertical()).max(0.0));
        }
        let overflowed = last && natural > border_height + EPSILON;
        if overflowed {
            let page_body = matches!(self.doc.blocks[ob.block.0].parent, Container::Page(_));
            if page_body && ob.mode == FlowMode::Clip {
                warn!(
                    "page {} does not wrap; {:.2}pt of content clipped to {:.2}pt",
                    cx.page_index + 1,
                    natural,
                    border_height
                );
            } else {
                debug!(
                    "{} overflows its box ({:.2}pt of content in {:.2}pt)",
                    ob.node, natural, border_height
                );
            }
        }

        let bottom_margin = if last { bounds.margin.bottom } else { 0.0 };
        let width = border_width + bounds.margin.horizontal();
        let height = border_height + bounds.margin.top + bottom_margin;

        let parent = {
            let block = &mut self.doc.blocks[ob.block.0];
            block.width = width;
            block.height = height;
            block.continues = !last;
            block.overflowed = overflowed;
            if !block.total_bounds.height.is_finite() {
                block.total_bounds.height = height;
            }
            if !block.available_bounds.height.is_finite() {
                block.available_bounds.height = (border_height - spacing.vertical()).max(0.0);
            }
            block.parent
        };

        let padding_box = Rect::new(
            ob.outer.x + bounds.margin.left,
            ob.outer.y + bounds.margin.top,
            border_width,
            border_height,
        )
        .inset(&bounds.border);
        self.resolve_deferred(ob.block, padding_box);

        if let Container::Region(region) = parent {
            let origin = self.doc.blocks[ob.block.0].total_bounds.origin();
            let r = &mut self.doc.regions[region.0];
            r.used_size.width = r.used_size.width.max(origin.x + width);
            r.used_size.height = r.used_size.height.max(origin.y + height);
        }

        // Canvas content is arranged by each placement of the canvas.
        if ob.node != NodeId::ROOT && !matches!(parent, Container::Resource(_)) {
            let render = Rect::new(
                ob.outer.x + bounds.margin.left,
                ob.outer.y + bounds.margin.top,
                border_width,
                border_height,
            );
            self.doc
                .arrangements
                .record(ob.node, cx.page_index, render, cx.resource);
        }
        trace!(
            "close {} ({:.2}x{:.2}{})",
            ob.node,
            width,
            height,
            if last { "" } else { ", continues" }
        );
        Ok(ob.block)
    }

    /// Make room for content that doesn't fit: the next free column of the
    /// innermost multi-column box that can take one, else a new page.
    pub(super) fn advance(&mut self, cx: &mut FlowContext) -> Result<(), LayoutError> {
        if cx.sequence.is_none() {
            return Err(LayoutError::FlowState("a detached flow cannot advance"));
        }
        let target = cx
            .stack
            .iter()
            .rposition(|ob| ob.mode == FlowMode::Split && ob.column + 1 < ob.columns);
        match target {
            Some(level) => {
                let suspended = self.suspend_above(cx, level)?;
                self.next_column(cx)?;
                self.resume(cx, suspended)
            }
            None => self.advance_page(cx),
        }
    }

    /// Close the current page and continue every open box on a new one.
    pub(super) fn advance_page(&mut self, cx: &mut FlowContext) -> Result<(), LayoutError> {
        let suspended = self.suspend_above(cx, 0)?;
        self.close_page(cx)?;
        self.open_page(cx)?;
        self.resume(cx, suspended)
    }

    /// Close the fragments of every box above `level`, innermost first,
    /// and return them outermost first.
    fn suspend_above(
        &mut self,
        cx: &mut FlowContext,
        level: usize,
    ) -> Result<Vec<Suspended>, LayoutError> {
        let mut suspended = Vec::new();
        while cx.stack.len() > level + 1 {
            let (node, style, mode, consumed) = {
                let top = cx.top()?;
                (top.node, top.style.clone(), top.mode, top.consumed)
            };
            let block = self.close_block(cx, false)?;
            let used = self.doc.blocks[block.0].border_size().height;
            suspended.push(Suspended {
                node,
                style,
                mode,
                consumed: consumed + used,
            });
        }
        suspended.reverse();
        Ok(suspended)
    }

    fn next_column(&mut self, cx: &mut FlowContext) -> Result<(), LayoutError> {
        let (block, region, column, width, gutter, limit) = {
            let top = cx.top()?;
            (top.block, top.region, top.column + 1, top.column_width, top.gutter, top.limit)
        };
        self.finish_region(region);
        let next = self.new_region(block, column, width, gutter, limit);
        debug!("column {} of {}", column + 1, cx.top()?.node);
        if let Some(top) = cx.stack.last_mut() {
            top.column = column;
            top.region = next;
        }
        Ok(())
    }

    fn resume(&mut self, cx: &mut FlowContext, suspended: Vec<Suspended>) -> Result<(), LayoutError> {
        for s in suspended {
            self.open_block(cx, s.node, s.style, s.mode, true, s.consumed)?;
        }
        Ok(())
    }

    fn page_break(&mut self, cx: &mut FlowContext) -> Result<(), LayoutError> {
        if cx.sequence.is_none() {
            warn!("page break inside positioned or repeated content is ignored");
            return Ok(());
        }
        if self.at_page_top(cx) {
            trace!("page break at the top of a page; nothing to do");
            return Ok(());
        }
        self.advance_page(cx)
    }
}
