//! # Line Composition
//!
//! Inline content (text, canvases and the anchors of out-of-flow nodes) is
//! flattened into items, broken greedily into lines at the width of the
//! current column, and committed line by line. Every Text node starts a new
//! paragraph; canvases and anchors continue the line they follow. Each line is fit-checked
//! like a block, so paragraphs split between lines across columns and
//! pages.

use std::ops::Range;
use std::rc::Rc;

use log::warn;

use super::page_break::EPSILON;
use super::tree::{FontSpec, LayoutLine, LayoutRun, LineId, RegionItem, RunId, RunKind};
use super::{FlowContext, LayoutPass};
use crate::error::LayoutError;
use crate::font::FontData;
use crate::geometry::{Point, Rect, Size};
use crate::model::{NodeId, NodeKind};
use crate::style::{ResolvedStyle, TextAlign, VerticalAlign};
use crate::text::{apply_text_transform, segments, split_word};

/// A text style in use by a group of inline items.
struct TextSource {
    owner: NodeId,
    font: FontSpec,
    /// Glyph ascent and descent.
    ascent: f64,
    descent: f64,
    /// Half-leading included: the line box a run of this source needs.
    box_ascent: f64,
    box_descent: f64,
    relative_offset: Point,
    align: TextAlign,
}

pub(super) enum InlineItem {
    Text {
        source: usize,
        word: String,
        width: f64,
        trailing: String,
        trailing_width: f64,
        mandatory: bool,
    },
    /// A canvas. `size` is its border box, `outer` adds margins.
    Replaced {
        node: NodeId,
        style: Rc<ResolvedStyle>,
        size: Size,
        outer: Size,
    },
    /// Where an absolute or fixed node appears in the flow.
    Anchor {
        node: NodeId,
        style: Rc<ResolvedStyle>,
    },
    /// Paragraph boundary.
    Break,
}

impl InlineItem {
    /// Width when the item ends a line.
    fn width(&self) -> f64 {
        match self {
            InlineItem::Text { width, .. } => *width,
            InlineItem::Replaced { outer, .. } => outer.width,
            InlineItem::Anchor { .. } | InlineItem::Break => 0.0,
        }
    }

    /// Width consumed when something follows on the same line.
    fn advance(&self) -> f64 {
        match self {
            InlineItem::Text {
                width,
                trailing_width,
                ..
            } => width + trailing_width,
            other => other.width(),
        }
    }

    fn is_mandatory_break(&self) -> bool {
        matches!(self, InlineItem::Text { mandatory: true, .. })
    }
}

/// Greedy line breaking. Returns each line's item range and whether it
/// ends at a mandatory break.
///
/// An item that doesn't fit moves to the next line unless the line has no
/// width yet; a lone item wider than the line stays and overflows.
pub(super) fn break_lines(items: &[InlineItem], width: f64) -> Vec<(Range<usize>, bool)> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut x = 0.0;
    for (i, item) in items.iter().enumerate() {
        if matches!(item, InlineItem::Break) {
            if start < i {
                lines.push((start..i, true));
            }
            start = i + 1;
            x = 0.0;
            continue;
        }
        if x > 0.0 && x + item.width() > width + EPSILON {
            lines.push((start..i, false));
            start = i;
            x = 0.0;
        }
        x += item.advance();
        if item.is_mandatory_break() {
            lines.push((start..i + 1, true));
            start = i + 1;
            x = 0.0;
        }
    }
    if start < items.len() {
        lines.push((start..items.len(), false));
    }
    lines
}

/// A run being assembled for a committed line.
enum PendingRun {
    Text {
        source: usize,
        text: String,
        width: f64,
        spaces: usize,
    },
    Replaced(usize),
    Anchor(usize),
}

impl<'a> LayoutPass<'a> {
    /// Compose `ids` into lines in the innermost open box. `root` is a text
    /// node laid out as the content of its own positioned box, so it is
    /// in flow here even though its style says otherwise.
    pub(super) fn layout_inline(
        &mut self,
        cx: &mut FlowContext,
        ids: &[NodeId],
        root: Option<NodeId>,
    ) -> Result<(), LayoutError> {
        let (parent_style, width) = {
            let top = cx.top()?;
            (top.style.clone(), top.column_width)
        };
        let mut sources = Vec::new();
        let mut items = Vec::new();
        for &id in ids {
            self.collect_inline(id, &parent_style, width, root, &mut sources, &mut items)?;
        }
        if items.is_empty() {
            return Ok(());
        }

        let lines = break_lines(&items, width);
        let count = lines.len();
        for (i, (range, forced)) in lines.into_iter().enumerate() {
            let last = forced || i + 1 == count;
            self.commit_line(cx, &parent_style, &sources, &items[range], last)?;
        }
        Ok(())
    }

    fn collect_inline(
        &mut self,
        id: NodeId,
        parent_style: &ResolvedStyle,
        width: f64,
        root: Option<NodeId>,
        sources: &mut Vec<TextSource>,
        items: &mut Vec<InlineItem>,
    ) -> Result<(), LayoutError> {
        let node = self.node(id)?;
        let space = Size::new(width, f64::INFINITY);
        let style = Rc::new(node.style.resolve(Some(parent_style), space));

        if style.position.is_out_of_flow() && root != Some(id) {
            items.push(InlineItem::Anchor { node: id, style });
            return Ok(());
        }

        if matches!(node.kind, NodeKind::Text { .. }) && !items.is_empty() {
            items.push(InlineItem::Break);
        }
        match &node.kind {
            NodeKind::Text { content, runs } if runs.is_empty() => {
                self.collect_text(id, &style, content, width, sources, items);
            }
            NodeKind::Text { runs, .. } => {
                for run in runs {
                    let run_style = run.style.resolve(Some(&style), space);
                    self.collect_text(id, &run_style, &run.content, width, sources, items);
                }
            }
            NodeKind::Canvas { .. } => {
                let size = self.canvas_box(node, &style);
                let outer = Size::new(
                    size.width + style.margin.horizontal(),
                    size.height + style.margin.vertical(),
                );
                items.push(InlineItem::Replaced {
                    node: id,
                    style,
                    size,
                    outer,
                });
            }
            other => {
                warn!("{} {} cannot be laid out inline; skipped", other.name(), id);
            }
        }
        Ok(())
    }

    fn collect_text(
        &mut self,
        owner: NodeId,
        style: &ResolvedStyle,
        text: &str,
        width: f64,
        sources: &mut Vec<TextSource>,
        items: &mut Vec<InlineItem>,
    ) {
        if text.is_empty() {
            return;
        }
        self.note_font(&style.font_family);
        let fonts = self.fonts;
        let italic = style.italic();
        let family = style.font_family.as_str();
        let standard = match fonts.registry().resolve(family, style.font_weight, italic) {
            FontData::Standard(font) => Some(*font),
            FontData::Custom(_) => None,
        };
        let (ascent, descent) =
            fonts
                .vertical_metrics(family, style.font_weight, italic, style.font_size);
        let half_leading = (style.font_size * style.line_height - (ascent + descent)) / 2.0;

        let source = sources.len();
        sources.push(TextSource {
            owner,
            font: FontSpec {
                family: style.font_family.clone(),
                weight: style.font_weight,
                italic,
                size: style.font_size,
                letter_spacing: style.letter_spacing,
                standard,
            },
            ascent,
            descent,
            box_ascent: ascent + half_leading,
            box_descent: descent + half_leading,
            relative_offset: style.relative_offset(),
            align: style.text_align,
        });

        let measure = |s: &str| {
            fonts.measure_string(
                s,
                family,
                style.font_weight,
                italic,
                style.font_size,
                style.letter_spacing,
            )
        };
        let transformed = apply_text_transform(text, style.text_transform);
        for segment in segments(&transformed) {
            let word_width = measure(&segment.word);
            let trailing_width = measure(&segment.trailing);
            if word_width > width && width > 0.0 {
                let pieces = split_word(&segment.word, width, |ch| {
                    fonts
                        .char_width(ch, family, style.font_weight, italic, style.font_size)
                        + style.letter_spacing
                });
                let n = pieces.len();
                for (i, piece) in pieces.into_iter().enumerate() {
                    let piece_width = measure(&piece);
                    let end = i + 1 == n;
                    items.push(InlineItem::Text {
                        source,
                        word: piece,
                        width: piece_width,
                        trailing: if end { segment.trailing.clone() } else { String::new() },
                        trailing_width: if end { trailing_width } else { 0.0 },
                        mandatory: end && segment.mandatory,
                    });
                }
            } else {
                items.push(InlineItem::Text {
                    source,
                    word: segment.word,
                    width: word_width,
                    trailing: segment.trailing,
                    trailing_width,
                    mandatory: segment.mandatory,
                });
            }
        }
    }

    /// Place one line: size it from its runs, fit-check it, align it and
    /// create its runs. Inline canvases and out-of-flow anchors are
    /// positioned once the line's position is final.
    fn commit_line(
        &mut self,
        cx: &mut FlowContext,
        block_style: &ResolvedStyle,
        sources: &[TextSource],
        items: &[InlineItem],
        last: bool,
    ) -> Result<(), LayoutError> {
        let has_content = items.iter().any(|item| {
            matches!(item, InlineItem::Text { .. } | InlineItem::Replaced { .. })
        });
        if !has_content {
            // Only out-of-flow nodes: nothing takes room in the flow.
            let (origin, anchor) = {
                let top = cx.top()?;
                let used = self.doc.regions[top.region.0].used_size.height;
                (top.column_origin().offset(0.0, used), top.region)
            };
            for item in items {
                if let InlineItem::Anchor { node, style } = item {
                    self.place_out_of_flow(cx, *node, style, origin, None, Some(anchor))?;
                }
            }
            return Ok(());
        }

        let runs = pending_runs(items);
        let spaces: usize = runs
            .iter()
            .map(|r| match r {
                PendingRun::Text { spaces, .. } => *spaces,
                _ => 0,
            })
            .sum();
        let used_width: f64 = runs
            .iter()
            .map(|r| match r {
                PendingRun::Text { width, .. } => *width,
                PendingRun::Replaced(i) => items[*i].width(),
                PendingRun::Anchor(_) => 0.0,
            })
            .sum();

        // Vertical metrics. Text and baseline-aligned canvases share the
        // baseline; top and middle canvases only stretch the line; a
        // bottom canvas that is the tallest item puts the baseline at its
        // full height, and the line grows by the text descent below it.
        let mut ascent = 0.0f64;
        let mut descent = 0.0f64;
        for run in &runs {
            match run {
                PendingRun::Text { source, .. } => {
                    ascent = ascent.max(sources[*source].box_ascent);
                    descent = descent.max(sources[*source].box_descent);
                }
                PendingRun::Replaced(i) => {
                    if let InlineItem::Replaced { style, outer, .. } = &items[*i] {
                        if style.vertical_align == VerticalAlign::Baseline {
                            ascent = ascent.max(outer.height);
                        }
                    }
                }
                PendingRun::Anchor(_) => {}
            }
        }
        let mut height = ascent + descent;
        let mut baseline = ascent;
        for (align, h) in replaced_heights(items, &runs) {
            match align {
                VerticalAlign::Top => height = height.max(h),
                VerticalAlign::Middle => {
                    height = height.max(h);
                    baseline = baseline.max(h / 2.0);
                }
                _ => {}
            }
        }
        for (align, h) in replaced_heights(items, &runs) {
            if align == VerticalAlign::Bottom {
                if h >= height - EPSILON {
                    baseline = baseline.max(h);
                }
                height = height.max(h);
            }
        }
        height = height.max(baseline + descent);

        self.ensure_space(cx, height)?;
        let (region, line_width, origin) = {
            let top = cx.top()?;
            let used = self.doc.regions[top.region.0].used_size.height;
            (
                top.region,
                top.column_width,
                top.column_origin().offset(0.0, used),
            )
        };
        let offset_y = self.doc.regions[region.0].used_size.height;

        let free = (line_width - used_width).max(0.0);
        // A paragraph aligns by its own style; lines holding only canvases
        // follow the enclosing box.
        let align = runs
            .iter()
            .find_map(|r| match r {
                PendingRun::Text { source, .. } => Some(sources[*source].align),
                _ => None,
            })
            .unwrap_or(block_style.text_align);
        let extra_space = if align == TextAlign::Justify && !last && spaces > 0 {
            free / spaces as f64
        } else {
            0.0
        };
        let shift = match align {
            TextAlign::Right => free,
            TextAlign::Center => free / 2.0,
            _ => 0.0,
        };
        let laid_width = used_width + extra_space * spaces as f64;

        let line = LineId(self.doc.lines.len());
        self.doc.lines.push(LayoutLine {
            region,
            offset_y,
            width: line_width,
            used_width: laid_width,
            height,
            baseline_offset: baseline,
            runs: Vec::new(),
            align,
            extra_space,
        });
        {
            let r = &mut self.doc.regions[region.0];
            r.items.push(RegionItem::Line(line));
            r.used_size.height = offset_y + height;
            r.used_size.width = r.used_size.width.max(shift + laid_width);
        }

        let mut x = shift;
        for run in runs {
            match run {
                PendingRun::Text {
                    source,
                    text,
                    width,
                    spaces,
                } => {
                    let src = &sources[source];
                    let run_width = width + extra_space * spaces as f64;
                    let bounds = Rect::new(
                        x,
                        baseline - src.box_ascent,
                        run_width,
                        src.box_ascent + src.box_descent,
                    );
                    self.push_run(
                        line,
                        src.owner,
                        bounds,
                        src.relative_offset,
                        RunKind::Text {
                            text,
                            font: src.font.clone(),
                            ascent: src.ascent,
                            descent: src.descent,
                            spaces,
                        },
                    );
                    let painted = bounds.translate(
                        origin.x + src.relative_offset.x,
                        origin.y + src.relative_offset.y,
                    );
                    self.doc
                        .arrangements
                        .record(src.owner, cx.page_index, painted, cx.resource);
                    x += run_width;
                }
                PendingRun::Replaced(i) => {
                    let InlineItem::Replaced {
                        node,
                        style,
                        size,
                        outer,
                    } = &items[i]
                    else {
                        continue;
                    };
                    let y = match style.vertical_align {
                        VerticalAlign::Baseline => baseline - outer.height,
                        VerticalAlign::Top => 0.0,
                        VerticalAlign::Middle => baseline - outer.height / 2.0,
                        VerticalAlign::Bottom => height - outer.height,
                    };
                    let bounds = Rect::new(x, y, outer.width, outer.height);
                    let run_id = self.push_run(
                        line,
                        *node,
                        bounds,
                        style.relative_offset(),
                        RunKind::Component { region: None },
                    );
                    let border_box = Rect::new(
                        origin.x + x + style.margin.left,
                        origin.y + y + style.margin.top,
                        size.width,
                        size.height,
                    );
                    let positioned =
                        self.place_canvas(cx, *node, style, border_box, run_id, region)?;
                    self.doc.runs[run_id.0].kind = RunKind::PositionedRegion {
                        region: positioned,
                        vertical_align: style.vertical_align,
                    };
                    x += outer.width;
                }
                PendingRun::Anchor(i) => {
                    let InlineItem::Anchor { node, style } = &items[i] else {
                        continue;
                    };
                    let run_id = self.push_run(
                        line,
                        *node,
                        Rect::default(),
                        Point::ZERO,
                        RunKind::Component { region: None },
                    );
                    let static_position = origin.offset(x, 0.0);
                    let positioned = self.place_out_of_flow(
                        cx,
                        *node,
                        style,
                        static_position,
                        Some(run_id),
                        Some(region),
                    )?;
                    self.doc.runs[run_id.0].kind = RunKind::Component {
                        region: Some(positioned),
                    };
                }
            }
        }
        Ok(())
    }

    fn push_run(
        &mut self,
        line: LineId,
        owner: NodeId,
        bounds: Rect,
        relative_offset: Point,
        kind: RunKind,
    ) -> RunId {
        let id = RunId(self.doc.runs.len());
        self.doc.runs.push(LayoutRun {
            line,
            owner,
            bounds,
            relative_offset,
            kind,
        });
        self.doc.lines[line.0].runs.push(id);
        id
    }
}

/// Merge a line's items into runs: adjacent words of the same text source
/// become one run. Trailing whitespace at the end of the line is dropped.
fn pending_runs(items: &[InlineItem]) -> Vec<PendingRun> {
    let last_text = items
        .iter()
        .rposition(|item| matches!(item, InlineItem::Text { .. }));
    let mut runs: Vec<PendingRun> = Vec::new();
    for (i, item) in items.iter().enumerate() {
        match item {
            InlineItem::Text {
                source,
                word,
                width,
                trailing,
                trailing_width,
                ..
            } => {
                let (piece_text, piece_width, piece_spaces) = if Some(i) == last_text {
                    (word.clone(), *width, 0)
                } else {
                    (
                        format!("{word}{trailing}"),
                        width + trailing_width,
                        trailing.chars().count(),
                    )
                };
                match runs.last_mut() {
                    Some(PendingRun::Text {
                        source: s,
                        text,
                        width,
                        spaces,
                    }) if s == source => {
                        text.push_str(&piece_text);
                        *width += piece_width;
                        *spaces += piece_spaces;
                    }
                    _ => runs.push(PendingRun::Text {
                        source: *source,
                        text: piece_text,
                        width: piece_width,
                        spaces: piece_spaces,
                    }),
                }
            }
            InlineItem::Replaced { .. } => runs.push(PendingRun::Replaced(i)),
            InlineItem::Anchor { .. } => runs.push(PendingRun::Anchor(i)),
            InlineItem::Break => {}
        }
    }
    runs
}

fn replaced_heights(items: &[InlineItem], runs: &[PendingRun]) -> Vec<(VerticalAlign, f64)> {
    runs.iter()
        .filter_map(|run| match run {
            PendingRun::Replaced(i) => match &items[*i] {
                InlineItem::Replaced { style, outer, .. } => {
                    Some((style.vertical_align, outer.height))
                }
                _ => None,
            },
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, width: f64, trailing: f64) -> InlineItem {
        InlineItem::Text {
            source: 0,
            word: text.to_string(),
            width,
            trailing: if trailing > 0.0 { " ".to_string() } else { String::new() },
            trailing_width: trailing,
            mandatory: false,
        }
    }

    #[test]
    fn breaks_greedily() {
        let items = vec![
            word("aa", 40.0, 5.0),
            word("bb", 40.0, 5.0),
            word("cc", 40.0, 0.0),
        ];
        let lines = break_lines(&items, 90.0);
        assert_eq!(lines, vec![(0..2, false), (2..3, false)]);
    }

    #[test]
    fn trailing_space_does_not_force_a_break() {
        // 40 + 5 + 45 = 90: the second word ends exactly at the edge.
        let items = vec![word("aa", 40.0, 5.0), word("bb", 45.0, 5.0)];
        assert_eq!(break_lines(&items, 90.0), vec![(0..2, false)]);
    }

    #[test]
    fn mandatory_break_ends_the_line() {
        let mut first = word("aa", 10.0, 0.0);
        if let InlineItem::Text { mandatory, .. } = &mut first {
            *mandatory = true;
        }
        let items = vec![first, word("bb", 10.0, 0.0)];
        assert_eq!(break_lines(&items, 500.0), vec![(0..1, true), (1..2, false)]);
    }

    #[test]
    fn paragraph_break_starts_a_new_line() {
        let items = vec![word("aa", 10.0, 0.0), InlineItem::Break, word("bb", 10.0, 0.0)];
        assert_eq!(break_lines(&items, 500.0), vec![(0..1, true), (2..3, false)]);
    }

    #[test]
    fn overlong_item_stays_on_an_empty_line() {
        let items = vec![word("wide", 200.0, 0.0), word("x", 5.0, 0.0)];
        assert_eq!(break_lines(&items, 100.0), vec![(0..1, false), (1..2, false)]);
    }

    #[test]
    fn adjacent_words_merge_into_one_run() {
        let items = vec![word("a", 10.0, 3.0), word("b", 10.0, 3.0), word("c", 10.0, 3.0)];
        let runs = pending_runs(&items);
        assert_eq!(runs.len(), 1);
        match &runs[0] {
            PendingRun::Text {
                text,
                width,
                spaces,
                ..
            } => {
                assert_eq!(text, "a b c");
                assert!((width - 36.0).abs() < 0.001);
                assert_eq!(*spaces, 2);
            }
            _ => panic!("expected a text run"),
        }
    }
}
