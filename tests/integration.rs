//! Integration tests for the Folio layout pipeline.
//!
//! These tests exercise the full path from a document tree (or JSON) to
//! resolved geometry. They verify:
//! - Box model arithmetic and min/max clamps
//! - Page breaks, page splitting and continuation fragments
//! - Multi-column flow
//! - Relative, absolute and fixed positioning
//! - Inline canvases, shared resources and arrangement chains

use folio::font::FontContext;
use folio::geometry::Rect;
use folio::layout::{BlockId, Container, LayoutDocument, LayoutEngine, LineId, RunKind};
use folio::model::*;
use folio::style::*;
use folio::LayoutError;

// ─── Helpers ────────────────────────────────────────────────────

fn make_text(content: &str, font_size: f64) -> Node {
    Node::text(
        content,
        Style {
            font_size: Some(font_size),
            ..Default::default()
        },
    )
}

fn make_panel(children: Vec<Node>) -> Node {
    Node::panel(Style::default(), children)
}

fn make_styled_panel(style: Style, children: Vec<Node>) -> Node {
    Node::panel(style, children)
}

fn make_lines(count: usize) -> Vec<Node> {
    (0..count)
        .map(|i| make_text(&format!("Line {}", i), 12.0))
        .collect()
}

fn default_doc(children: Vec<Node>) -> Document {
    Document {
        children,
        ..Default::default()
    }
}

/// A document on custom pages without margins.
fn custom_doc(width: f64, height: f64, children: Vec<Node>) -> Document {
    Document {
        children,
        default_page: PageConfig::custom(width, height),
        fonts: vec![],
    }
}

fn try_layout(doc: &Document) -> Result<LayoutDocument, LayoutError> {
    let font_context = FontContext::new();
    LayoutEngine::new().layout(doc, &font_context)
}

fn layout_doc(doc: &Document) -> LayoutDocument {
    try_layout(doc).expect("layout should succeed")
}

fn blocks(layout: &LayoutDocument, name: &str) -> Vec<BlockId> {
    let node = layout
        .node_id(name)
        .unwrap_or_else(|| panic!("no node named {name}"));
    layout.blocks_of(node)
}

fn first_block(layout: &LayoutDocument, name: &str) -> BlockId {
    blocks(layout, name)[0]
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 0.01,
        "expected {expected}, got {actual}"
    );
}

fn assert_rect(actual: Rect, expected: Rect) {
    assert!(
        actual.approx_eq(&expected),
        "expected {expected:?}, got {actual:?}"
    );
}

// ─── Basic Pipeline Tests ───────────────────────────────────────

#[test]
fn test_empty_document() {
    let layout = layout_doc(&default_doc(vec![]));
    assert!(layout.pages.is_empty(), "Empty document should produce no pages");
}

#[test]
fn test_single_text_node() {
    let layout = layout_doc(&default_doc(vec![make_text("Hello, World!", 12.0)]));
    assert_eq!(layout.pages.len(), 1, "Single text should fit on one page");

    let body = layout.block(layout.pages[0].body);
    let lines = layout.lines_of(body.regions[0]);
    assert_eq!(lines.len(), 1);
    assert_eq!(layout.line_text(lines[0]), "Hello, World!");
}

#[test]
fn test_text_nodes_are_separate_paragraphs() {
    let layout = layout_doc(&default_doc(vec![
        make_text("First", 12.0),
        make_text("Second", 12.0),
    ]));
    let body = layout.block(layout.pages[0].body);
    let lines = layout.lines_of(body.regions[0]);
    assert_eq!(lines.len(), 2);
    assert_close(layout.line(lines[1]).offset_y, layout.line(lines[0]).height);
}

#[test]
fn test_explicit_page_break() {
    let layout = layout_doc(&default_doc(vec![
        make_text("Page 1", 12.0),
        Node::page_break(),
        make_text("Page 2", 12.0),
    ]));
    assert_eq!(layout.pages.len(), 2, "Should have exactly 2 pages after a page break");
}

#[test]
fn test_multiple_page_breaks() {
    let layout = layout_doc(&default_doc(vec![
        make_text("Page 1", 12.0),
        Node::page_break(),
        make_text("Page 2", 12.0),
        Node::page_break(),
        make_text("Page 3", 12.0),
    ]));
    assert_eq!(layout.pages.len(), 3);
}

#[test]
fn test_page_break_at_top_of_page_is_a_no_op() {
    let layout = layout_doc(&default_doc(vec![
        Node::page_break(),
        make_text("Only page", 12.0),
    ]));
    assert_eq!(layout.pages.len(), 1);
}

#[test]
fn test_break_before() {
    let layout = layout_doc(&default_doc(vec![
        make_text("Intro", 12.0),
        make_styled_panel(
            Style {
                break_before: Some(true),
                ..Default::default()
            },
            vec![make_text("Chapter", 12.0)],
        )
        .with_id("chapter"),
    ]));
    assert_eq!(layout.pages.len(), 2);
    assert_eq!(layout.block(first_block(&layout, "chapter")).page_index, 1);
}

// ─── Page Overflow Tests ────────────────────────────────────────

#[test]
fn test_content_overflow_creates_new_page() {
    // A4 content height is roughly 734pt (841.89 - 2*54).
    // At 12pt font with 1.4 line height = 16.8pt per line.
    // 734 / 16.8 ≈ 43 lines per page.
    let layout = layout_doc(&default_doc(make_lines(100)));
    assert!(
        layout.pages.len() >= 2,
        "100 lines should overflow to multiple pages, got {} pages",
        layout.pages.len()
    );

    // The second page starts at the top of its body.
    let body = layout.block(layout.pages[1].body);
    let lines = layout.lines_of(body.regions[0]);
    assert_close(layout.line(lines[0]).offset_y, 0.0);
}

#[test]
fn test_large_font_overflows_faster() {
    let children = (0..30)
        .map(|i| make_text(&format!("Line {}", i), 24.0))
        .collect();
    let layout = layout_doc(&default_doc(children));
    assert!(
        layout.pages.len() >= 2,
        "30 lines at 24pt should overflow, got {} pages",
        layout.pages.len()
    );
}

#[test]
fn test_split_panel_continues_without_top_spacing() {
    // 100pt pages; the panel's padding leaves 80pt for lines of 16.8pt.
    let panel = make_styled_panel(
        Style {
            padding: Some(Edges::uniform(10.0)),
            ..Default::default()
        },
        make_lines(8),
    )
    .with_id("panel");
    let layout = layout_doc(&custom_doc(200.0, 100.0, vec![panel]));
    assert_eq!(layout.pages.len(), 2);

    let fragments = blocks(&layout, "panel");
    assert_eq!(fragments.len(), 2);
    let (first, second) = (layout.block(fragments[0]), layout.block(fragments[1]));
    assert!(first.continues && !first.continuation);
    assert!(second.continuation && !second.continues);
    assert_eq!(layout.lines_of(first.regions[0]).len(), 4);
    assert_eq!(layout.lines_of(second.regions[0]).len(), 4);

    // The first fragment fills its page; the second drops its top padding.
    assert_close(layout.block_border_rect(fragments[0]).height, 100.0);
    assert_close(layout.block_content_rect(fragments[1]).y, 0.0);
    assert_close(second.height, 4.0 * 16.8 + 10.0);

    // Arrangements follow the fragments page by page.
    let node = layout.node_id("panel").unwrap();
    let head = layout.arrangements.first(node).unwrap();
    assert_eq!(head.page_index, 0);
    let next = layout.arrangements.next(head).unwrap();
    assert_eq!(next.page_index, 1);
    assert!(layout.arrangements.next(next).is_none());
}

#[test]
fn test_unwrapped_page_clips_instead_of_splitting() {
    let page = Node::page(
        PageConfig {
            size: PageSize::Custom {
                width: 200.0,
                height: 100.0,
            },
            margin: Edges::default(),
            wrap: false,
        },
        Style::default(),
        make_lines(20),
    );
    let layout = layout_doc(&default_doc(vec![page]));
    assert_eq!(layout.pages.len(), 1);
    let body = layout.block(layout.pages[0].body);
    assert!(body.clip);
    assert!(body.overflowed);
    assert_close(body.height, 100.0);
}

#[test]
fn test_explicit_height_overflows_instead_of_splitting() {
    let panel = make_styled_panel(
        Style {
            height: Some(Dimension::Pt(100.0)),
            ..Default::default()
        },
        make_lines(40),
    )
    .with_id("box");
    let layout = layout_doc(&custom_doc(300.0, 200.0, vec![panel, make_text("after", 12.0)]));
    assert_eq!(layout.pages.len(), 1);

    let fragments = blocks(&layout, "box");
    assert_eq!(fragments.len(), 1);
    let block = layout.block(fragments[0]);
    assert_close(block.height, 100.0);
    assert!(block.overflowed);
    assert_eq!(layout.lines_of(block.regions[0]).len(), 40);

    // The next sibling starts below the declared height.
    let body = layout.block(layout.pages[0].body);
    let after = layout.lines_of(body.regions[0])[0];
    assert_close(layout.line_rect(after).y, 100.0);
}

#[test]
fn test_explicit_height_is_shared_across_fragments() {
    // 300pt declared on 200pt pages: 200pt here, the remaining 100pt next.
    let panel = make_styled_panel(
        Style {
            height: Some(Dimension::Pt(300.0)),
            ..Default::default()
        },
        make_lines(20),
    )
    .with_id("box");
    let layout = layout_doc(&custom_doc(300.0, 200.0, vec![panel]));
    assert_eq!(layout.pages.len(), 2);

    let fragments = blocks(&layout, "box");
    assert_eq!(fragments.len(), 2);
    let (first, second) = (layout.block(fragments[0]), layout.block(fragments[1]));
    assert_close(first.height, 200.0);
    assert_close(second.height, 100.0);
    assert_eq!(layout.lines_of(first.regions[0]).len(), 11);
    assert_eq!(layout.lines_of(second.regions[0]).len(), 9);
    assert!(!first.overflowed);
    assert!(second.overflowed);
}

#[test]
fn test_split_panel_arranges_each_fragment() {
    let panel = make_panel(make_lines(12)).with_id("flow");
    let layout = layout_doc(&custom_doc(200.0, 100.0, vec![panel]));
    assert_eq!(layout.pages.len(), 3);

    let fragments = blocks(&layout, "flow");
    assert_eq!(fragments.len(), 3);
    let node = layout.node_id("flow").unwrap();
    let chain = layout.arrangements.chain(node);
    assert_eq!(chain.len(), 3);
    for (i, (arrangement, &fragment)) in chain.iter().zip(&fragments).enumerate() {
        assert_eq!(arrangement.page_index, i);
        assert_eq!(arrangement.index, i);
        assert_eq!(layout.block(fragment).page_index, i);
    }
    assert_close(chain[0].render_bounds.height, 100.0);
    assert_close(chain[1].render_bounds.height, 100.0);
    assert_close(chain[2].render_bounds.height, 2.0 * 16.8);
}

#[test]
fn test_page_sequences_keep_their_own_config() {
    let doc = default_doc(vec![
        Node::page(PageConfig::custom(300.0, 400.0), Style::default(), vec![make_text("A", 12.0)]),
        Node::page(PageConfig::custom(500.0, 200.0), Style::default(), vec![make_text("B", 12.0)]),
    ]);
    let layout = layout_doc(&doc);
    assert_eq!(layout.pages.len(), 2);
    assert_close(layout.pages[0].width, 300.0);
    assert_close(layout.pages[1].height, 200.0);
}

// ─── Box Model Tests ────────────────────────────────────────────

#[test]
fn test_box_model_additivity() {
    for (m, p) in [(0.0, 0.0), (5.0, 10.0), (12.5, 3.25)] {
        let panel = make_styled_panel(
            Style {
                margin: Some(Edges::uniform(m)),
                padding: Some(Edges::uniform(p)),
                ..Default::default()
            },
            vec![],
        )
        .with_id("panel");
        let layout = layout_doc(&custom_doc(300.0, 500.0, vec![panel]));
        let block = layout.block(first_block(&layout, "panel"));
        assert_close(block.available_bounds.width, 300.0 - 2.0 * (m + p));
        assert_close(block.available_bounds.x, m + p);
    }
}

#[test]
fn test_bare_panel_fills_page() {
    let layout = layout_doc(&custom_doc(300.0, 500.0, vec![make_panel(vec![]).with_id("panel")]));
    let block = layout.block(first_block(&layout, "panel"));
    let full = Rect::new(0.0, 0.0, 300.0, 500.0);
    assert_rect(block.total_bounds, full);
    assert_rect(block.available_bounds, full);
}

#[test]
fn test_end_to_end_margin_and_padding() {
    let panel = make_styled_panel(
        Style {
            margin: Some(Edges::uniform(10.0)),
            padding: Some(Edges::uniform(20.0)),
            ..Default::default()
        },
        vec![make_text("Measured", 12.0)],
    )
    .with_id("panel");
    let layout = layout_doc(&custom_doc(300.0, 500.0, vec![panel]));
    let block = layout.block(first_block(&layout, "panel"));
    let region = layout.region(block.regions[0]);
    let line = layout.line(layout.lines_of(block.regions[0])[0]);
    let (w, h) = (line.used_width, line.height);

    assert_close(block.width, w + 60.0);
    assert_close(block.height, h + 60.0);
    assert_close(block.total_bounds.x, 0.0);
    assert_close(block.total_bounds.y, 0.0);
    assert_rect(region.total_bounds, Rect::new(0.0, 0.0, w, h));
}

#[test]
fn test_min_clamp_keeps_region_at_content_size() {
    let panel = make_styled_panel(
        Style {
            min_width: Some(Dimension::Pt(120.0)),
            min_height: Some(Dimension::Pt(100.0)),
            ..Default::default()
        },
        vec![make_text("Hi", 12.0)],
    )
    .with_id("panel");
    let layout = layout_doc(&custom_doc(300.0, 500.0, vec![panel]));
    let block = layout.block(first_block(&layout, "panel"));
    assert_close(block.width, 120.0);
    assert_close(block.height, 100.0);

    let region = layout.region(block.regions[0]);
    assert!(region.total_bounds.width < 120.0);
    assert_close(region.total_bounds.height, 16.8);
}

#[test]
fn test_max_clamp_with_clip() {
    let panel = make_styled_panel(
        Style {
            max_height: Some(Dimension::Pt(50.0)),
            overflow: Some(OverflowAction::Clip),
            ..Default::default()
        },
        make_lines(10),
    )
    .with_id("panel");
    let layout = layout_doc(&custom_doc(300.0, 500.0, vec![panel]));
    assert_eq!(layout.pages.len(), 1);
    let block = layout.block(first_block(&layout, "panel"));
    assert_close(block.height, 50.0);
    assert!(block.clip);
    assert!(block.overflowed);
}

#[test]
fn test_grow_ignores_page_bottom() {
    let panel = make_styled_panel(
        Style {
            overflow: Some(OverflowAction::Grow),
            ..Default::default()
        },
        make_lines(10),
    )
    .with_id("panel");
    let layout = layout_doc(&custom_doc(300.0, 100.0, vec![panel]));
    assert_eq!(layout.pages.len(), 1);
    let block = layout.block(first_block(&layout, "panel"));
    assert_close(block.height, 168.0);
    assert_eq!(blocks(&layout, "panel").len(), 1);
}

// ─── Column Tests ───────────────────────────────────────────────

fn two_column_panel(lines: usize) -> Node {
    make_styled_panel(
        Style {
            column_count: Some(2),
            column_gap: Some(20.0),
            ..Default::default()
        },
        make_lines(lines),
    )
    .with_id("columns")
}

#[test]
fn test_second_column_offset() {
    // 100pt tall page: five 16.8pt lines per column.
    let layout = layout_doc(&custom_doc(300.0, 100.0, vec![two_column_panel(8)]));
    assert_eq!(layout.pages.len(), 1);

    let block = layout.block(first_block(&layout, "columns"));
    assert_eq!(block.regions.len(), 2);
    let (col1, col2) = (block.regions[0], block.regions[1]);
    assert_eq!(layout.lines_of(col1).len(), 5);
    assert_eq!(layout.lines_of(col2).len(), 3);
    assert_eq!(layout.region(col2).column_index, 1);

    let column_width = (300.0 - 20.0) / 2.0;
    let dx = layout.region_rect(col2).x - layout.region_rect(col1).x;
    assert_close(dx, column_width + 20.0);
    assert_close(layout.region_rect(col2).y, layout.region_rect(col1).y);
}

#[test]
fn test_columns_exhaust_before_new_page() {
    let layout = layout_doc(&custom_doc(300.0, 100.0, vec![two_column_panel(14)]));
    assert_eq!(layout.pages.len(), 2);

    let fragments = blocks(&layout, "columns");
    assert_eq!(fragments.len(), 2);
    assert_eq!(layout.block(fragments[0]).regions.len(), 2);
    assert_eq!(layout.block(fragments[1]).page_index, 1);
}

#[test]
fn test_tall_item_overflows_an_empty_column() {
    // The multi-column box starts below a line of the page body; the tall
    // panel doesn't fit its first column and overflows the empty second.
    let tall = make_styled_panel(
        Style {
            height: Some(Dimension::Pt(300.0)),
            ..Default::default()
        },
        vec![],
    )
    .with_id("tall");
    let columns = make_styled_panel(
        Style {
            column_count: Some(2),
            column_gap: Some(20.0),
            ..Default::default()
        },
        vec![make_text("first", 12.0), tall],
    );
    let layout = layout_doc(&custom_doc(
        300.0,
        200.0,
        vec![make_text("intro", 12.0), columns],
    ));
    assert_eq!(layout.pages.len(), 1);

    let fragments = blocks(&layout, "tall");
    assert_eq!(fragments.len(), 1);
    let block = layout.block(fragments[0]);
    let Container::Region(region) = block.parent else {
        panic!("tall panel should sit in a column");
    };
    assert_eq!(layout.region(region).column_index, 1);
    assert_close(block.height, 300.0);
}

#[test]
fn test_percent_width_resolves_against_column() {
    let panel = make_styled_panel(
        Style {
            column_count: Some(2),
            column_gap: Some(20.0),
            ..Default::default()
        },
        vec![make_styled_panel(
            Style {
                width: Some(Dimension::Percent(50.0)),
                ..Default::default()
            },
            vec![],
        )
        .with_id("half")],
    );
    let layout = layout_doc(&custom_doc(300.0, 500.0, vec![panel]));
    let block = layout.block(first_block(&layout, "half"));
    assert_close(block.width, 70.0);
}

#[test]
fn test_columns_without_width_fail() {
    let panel = make_styled_panel(
        Style {
            column_count: Some(3),
            column_gap: Some(200.0),
            ..Default::default()
        },
        vec![],
    );
    let result = try_layout(&custom_doc(300.0, 500.0, vec![panel]));
    assert!(matches!(result, Err(LayoutError::InvalidRegion { .. })));
}

#[test]
fn test_margins_larger_than_page_fail() {
    let doc = Document {
        children: vec![make_text("x", 12.0)],
        default_page: PageConfig {
            size: PageSize::Custom {
                width: 100.0,
                height: 100.0,
            },
            margin: Edges::uniform(60.0),
            wrap: true,
        },
        fonts: vec![],
    };
    assert!(matches!(try_layout(&doc), Err(LayoutError::InvalidPage { .. })));
}

// ─── Positioning Tests ──────────────────────────────────────────

#[test]
fn test_relative_offset_does_not_move_siblings() {
    let moved = make_styled_panel(
        Style {
            position: Some(Position::Relative),
            left: Some(7.0),
            top: Some(5.0),
            width: Some(Dimension::Pt(50.0)),
            height: Some(Dimension::Pt(20.0)),
            ..Default::default()
        },
        vec![],
    )
    .with_id("moved");
    let sibling = make_styled_panel(
        Style {
            height: Some(Dimension::Pt(20.0)),
            ..Default::default()
        },
        vec![],
    )
    .with_id("sibling");
    let layout = layout_doc(&custom_doc(300.0, 500.0, vec![moved, sibling]));

    let node = layout.node_id("moved").unwrap();
    let arrangement = layout.arrangements.first(node).unwrap();
    assert_rect(arrangement.render_bounds, Rect::new(7.0, 5.0, 50.0, 20.0));
    assert_rect(
        layout.block_border_rect(first_block(&layout, "moved")),
        Rect::new(7.0, 5.0, 50.0, 20.0),
    );

    let sibling = layout.block(first_block(&layout, "sibling"));
    assert_close(sibling.total_bounds.y, 20.0);
    assert_close(sibling.relative_offset.x, 0.0);
}

#[test]
fn test_absolute_skips_static_ancestor() {
    let target = make_styled_panel(
        Style {
            position: Some(Position::Absolute),
            left: Some(7.0),
            top: Some(9.0),
            width: Some(Dimension::Pt(20.0)),
            height: Some(Dimension::Pt(10.0)),
            ..Default::default()
        },
        vec![],
    )
    .with_id("target");
    let inner = make_styled_panel(
        Style {
            margin: Some(Edges::uniform(30.0)),
            ..Default::default()
        },
        vec![make_text("inner", 12.0), target],
    );
    let outer = make_styled_panel(
        Style {
            position: Some(Position::Relative),
            margin: Some(Edges::uniform(5.0)),
            padding: Some(Edges::uniform(15.0)),
            ..Default::default()
        },
        vec![inner],
    );
    let layout = layout_doc(&custom_doc(300.0, 500.0, vec![outer]));

    let node = layout.node_id("target").unwrap();
    let positioned = layout.positioned_of(node);
    assert_eq!(positioned.len(), 1);
    let region = layout.positioned_region(positioned[0]);
    // Outer padding box starts at the outer margin.
    assert_rect(region.total_bounds, Rect::new(12.0, 14.0, 20.0, 10.0));
    assert_close(region.containing_block.x, 5.0);

    // The anchor run takes no room on its line.
    let run = layout.run(region.associated_run.unwrap());
    assert_rect(run.bounds, Rect::default());
    assert!(matches!(run.kind, RunKind::Component { region: Some(_) }));

    // Its content block sits inside the positioned region.
    let content = region.content.unwrap();
    assert_rect(layout.block_border_rect(content), Rect::new(12.0, 14.0, 20.0, 10.0));
}

#[test]
fn test_absolute_falls_back_to_page_content_box() {
    let doc = Document {
        children: vec![make_styled_panel(
            Style {
                position: Some(Position::Absolute),
                left: Some(5.0),
                top: Some(5.0),
                width: Some(Dimension::Pt(10.0)),
                height: Some(Dimension::Pt(10.0)),
                ..Default::default()
            },
            vec![],
        )
        .with_id("abs")],
        default_page: PageConfig {
            size: PageSize::Custom {
                width: 300.0,
                height: 500.0,
            },
            margin: Edges::uniform(20.0),
            wrap: true,
        },
        fonts: vec![],
    };
    let layout = layout_doc(&doc);
    let node = layout.node_id("abs").unwrap();
    let region = layout.positioned_region(layout.positioned_of(node)[0]);
    assert_close(region.total_bounds.x, 25.0);
    assert_close(region.total_bounds.y, 25.0);
    assert!(region.associated_run.is_none());
}

#[test]
fn test_fixed_resolves_against_page_box() {
    let fixed = make_styled_panel(
        Style {
            position: Some(Position::Fixed),
            right: Some(10.0),
            bottom: Some(10.0),
            width: Some(Dimension::Pt(30.0)),
            height: Some(Dimension::Pt(40.0)),
            ..Default::default()
        },
        vec![],
    )
    .with_id("fixed");
    let holder = make_styled_panel(
        Style {
            position: Some(Position::Relative),
            ..Default::default()
        },
        vec![fixed],
    );
    let doc = Document {
        children: vec![holder],
        default_page: PageConfig {
            size: PageSize::Custom {
                width: 300.0,
                height: 500.0,
            },
            margin: Edges::uniform(20.0),
            wrap: true,
        },
        fonts: vec![],
    };
    let layout = layout_doc(&doc);
    let node = layout.node_id("fixed").unwrap();
    let region = layout.positioned_region(layout.positioned_of(node)[0]);
    assert_rect(region.total_bounds, Rect::new(260.0, 450.0, 30.0, 40.0));
}

#[test]
fn test_absolute_with_both_offsets_stretches() {
    let abs = make_styled_panel(
        Style {
            position: Some(Position::Absolute),
            left: Some(10.0),
            right: Some(30.0),
            top: Some(0.0),
            ..Default::default()
        },
        vec![make_text("x", 12.0)],
    )
    .with_id("abs");
    let holder = make_styled_panel(
        Style {
            position: Some(Position::Relative),
            ..Default::default()
        },
        vec![abs],
    );
    let layout = layout_doc(&custom_doc(300.0, 500.0, vec![holder]));
    let node = layout.node_id("abs").unwrap();
    let region = layout.positioned_region(layout.positioned_of(node)[0]);
    assert_close(region.total_bounds.x, 10.0);
    assert_close(region.total_bounds.width, 260.0);
    assert_close(region.total_bounds.height, 16.8);
}

#[test]
fn test_far_offsets_use_the_final_containing_block() {
    let corner = make_styled_panel(
        Style {
            position: Some(Position::Absolute),
            right: Some(0.0),
            bottom: Some(0.0),
            width: Some(Dimension::Pt(20.0)),
            height: Some(Dimension::Pt(10.0)),
            ..Default::default()
        },
        vec![],
    )
    .with_id("corner");
    let band = make_styled_panel(
        Style {
            position: Some(Position::Absolute),
            left: Some(0.0),
            top: Some(0.0),
            bottom: Some(0.0),
            width: Some(Dimension::Pt(20.0)),
            ..Default::default()
        },
        vec![],
    )
    .with_id("band");
    let holder = make_styled_panel(
        Style {
            position: Some(Position::Relative),
            width: Some(Dimension::Pt(200.0)),
            padding: Some(Edges::uniform(5.0)),
            ..Default::default()
        },
        vec![make_text("Hi", 12.0), corner, band],
    )
    .with_id("holder");
    let layout = layout_doc(&custom_doc(300.0, 500.0, vec![holder]));

    // One line plus padding: the holder ends long before the page does.
    let holder = layout.block(first_block(&layout, "holder"));
    assert_close(holder.height, 16.8 + 10.0);
    let padding_box = Rect::new(0.0, 0.0, 200.0, 26.8);

    let node = layout.node_id("corner").unwrap();
    let region = layout.positioned_region(layout.positioned_of(node)[0]);
    assert_rect(region.containing_block, padding_box);
    assert_rect(region.total_bounds, Rect::new(180.0, 16.8, 20.0, 10.0));
    assert_rect(
        layout.block_border_rect(region.content.unwrap()),
        Rect::new(180.0, 16.8, 20.0, 10.0),
    );
    let arrangement = layout.arrangements.first(node).unwrap();
    assert_rect(arrangement.render_bounds, Rect::new(180.0, 16.8, 20.0, 10.0));

    let node = layout.node_id("band").unwrap();
    let region = layout.positioned_region(layout.positioned_of(node)[0]);
    assert_rect(region.total_bounds, Rect::new(0.0, 0.0, 20.0, 26.8));
}

#[test]
fn test_fixed_skips_relative_ancestor() {
    let pinned = make_styled_panel(
        Style {
            position: Some(Position::Fixed),
            left: Some(5.0),
            top: Some(5.0),
            width: Some(Dimension::Pt(10.0)),
            height: Some(Dimension::Pt(10.0)),
            ..Default::default()
        },
        vec![],
    )
    .with_id("pinned");
    let holder = make_styled_panel(
        Style {
            position: Some(Position::Relative),
            margin: Some(Edges::uniform(30.0)),
            ..Default::default()
        },
        vec![make_text("holder", 12.0), pinned],
    );
    let doc = Document {
        children: vec![holder],
        default_page: PageConfig {
            size: PageSize::Custom {
                width: 300.0,
                height: 500.0,
            },
            margin: Edges::uniform(20.0),
            wrap: true,
        },
        fonts: vec![],
    };
    let layout = layout_doc(&doc);
    let node = layout.node_id("pinned").unwrap();
    let region = layout.positioned_region(layout.positioned_of(node)[0]);
    assert_rect(region.containing_block, Rect::new(0.0, 0.0, 300.0, 500.0));
    assert_rect(region.total_bounds, Rect::new(5.0, 5.0, 10.0, 10.0));
}

#[test]
fn test_fixed_inside_canvas_uses_the_canvas_frame() {
    let pin = make_styled_panel(
        Style {
            position: Some(Position::Fixed),
            right: Some(10.0),
            bottom: Some(10.0),
            width: Some(Dimension::Pt(20.0)),
            height: Some(Dimension::Pt(20.0)),
            ..Default::default()
        },
        vec![],
    )
    .with_id("pin");
    let canvas = Node::canvas(Some(100.0), Some(80.0), Style::default(), vec![pin]).with_id("canvas");
    let layout = layout_doc(&custom_doc(300.0, 500.0, vec![make_text("Before", 12.0), canvas]));

    let handle = layout
        .resources
        .lookup(layout.node_id("canvas").unwrap())
        .unwrap();
    let node = layout.node_id("pin").unwrap();
    let region = layout.positioned_region(layout.positioned_of(node)[0]);
    assert_eq!(region.frame, Some(handle));
    assert_rect(region.containing_block, Rect::new(0.0, 0.0, 100.0, 80.0));
    assert_rect(region.total_bounds, Rect::new(70.0, 50.0, 20.0, 20.0));
}

#[test]
fn test_absolute_inside_absolute() {
    let inner = make_styled_panel(
        Style {
            position: Some(Position::Absolute),
            left: Some(5.0),
            top: Some(5.0),
            width: Some(Dimension::Pt(10.0)),
            height: Some(Dimension::Pt(10.0)),
            ..Default::default()
        },
        vec![],
    )
    .with_id("inner");
    let outer = make_styled_panel(
        Style {
            position: Some(Position::Absolute),
            left: Some(50.0),
            top: Some(40.0),
            width: Some(Dimension::Pt(100.0)),
            height: Some(Dimension::Pt(100.0)),
            padding: Some(Edges::uniform(10.0)),
            ..Default::default()
        },
        vec![inner],
    )
    .with_id("outer");
    let layout = layout_doc(&custom_doc(300.0, 500.0, vec![outer]));

    let node = layout.node_id("inner").unwrap();
    let region = layout.positioned_region(layout.positioned_of(node)[0]);
    assert_rect(region.containing_block, Rect::new(50.0, 40.0, 100.0, 100.0));
    assert_rect(region.total_bounds, Rect::new(55.0, 45.0, 10.0, 10.0));

    // The inner anchor lives in the outer box's content.
    let outer = layout.node_id("outer").unwrap();
    let outer = layout.positioned_region(layout.positioned_of(outer)[0]);
    let anchor = layout.region(region.anchor.unwrap());
    assert_eq!(Some(anchor.block), outer.content);
}

#[test]
fn test_columns_inside_positioned_region() {
    let cell = make_styled_panel(
        Style {
            width: Some(Dimension::Percent(100.0)),
            ..Default::default()
        },
        vec![make_text("cell", 12.0)],
    )
    .with_id("cell");
    let floating = make_styled_panel(
        Style {
            position: Some(Position::Absolute),
            left: Some(0.0),
            top: Some(0.0),
            width: Some(Dimension::Pt(200.0)),
            column_count: Some(2),
            column_gap: Some(20.0),
            ..Default::default()
        },
        vec![cell],
    )
    .with_id("floating");
    let layout = layout_doc(&custom_doc(300.0, 500.0, vec![floating]));

    let node = layout.node_id("floating").unwrap();
    let region = layout.positioned_region(layout.positioned_of(node)[0]);
    let content = layout.block(region.content.unwrap());
    assert_eq!(content.columns, 2);
    assert_close(layout.block(first_block(&layout, "cell")).width, 90.0);
}

#[test]
fn test_percent_width_of_absolute_uses_padding_box() {
    let abs = make_styled_panel(
        Style {
            position: Some(Position::Absolute),
            left: Some(0.0),
            top: Some(0.0),
            width: Some(Dimension::Percent(50.0)),
            height: Some(Dimension::Pt(10.0)),
            ..Default::default()
        },
        vec![],
    )
    .with_id("abs");
    let holder = make_styled_panel(
        Style {
            position: Some(Position::Relative),
            margin: Some(Edges::uniform(10.0)),
            padding: Some(Edges::uniform(20.0)),
            ..Default::default()
        },
        vec![abs],
    );
    let layout = layout_doc(&custom_doc(300.0, 500.0, vec![holder]));
    let node = layout.node_id("abs").unwrap();
    let region = layout.positioned_region(layout.positioned_of(node)[0]);
    // The padding box is the border box: 280pt wide, starting at the margin.
    assert_rect(region.total_bounds, Rect::new(10.0, 10.0, 140.0, 10.0));
}

// ─── Inline Content Tests ───────────────────────────────────────

#[test]
fn test_default_canvas_size() {
    let canvas = Node::canvas(
        None,
        None,
        Style {
            margin: Some(Edges::uniform(10.0)),
            ..Default::default()
        },
        vec![],
    )
    .with_id("canvas");
    let layout = layout_doc(&default_doc(vec![canvas]));
    let node = layout.node_id("canvas").unwrap();
    let region = layout.positioned_region(layout.positioned_of(node)[0]);
    assert_close(region.total_bounds.width, 300.0);
    assert_close(region.total_bounds.height, 150.0);

    let run = layout.run(region.associated_run.unwrap());
    assert_close(run.bounds.width, 320.0);
    assert_close(run.bounds.height, 170.0);
}

#[test]
fn test_canvas_size_from_markup() {
    let canvas = Node {
        kind: NodeKind::Canvas {
            width: Some(100.0),
            height: None,
            view_box: None,
            content: Some(r#"<svg viewBox="0 0 200 50"></svg>"#.to_string()),
        },
        style: Style::default(),
        children: vec![],
        id: Some("canvas".to_string()),
    };
    let layout = layout_doc(&default_doc(vec![canvas]));
    let node = layout.node_id("canvas").unwrap();
    let region = layout.positioned_region(layout.positioned_of(node)[0]);
    assert_close(region.total_bounds.width, 100.0);
    assert_close(region.total_bounds.height, 25.0);
}

#[test]
fn test_baseline_canvas_raises_the_baseline() {
    let layout = layout_doc(&default_doc(vec![
        make_text("Hi", 12.0),
        Node::canvas(Some(40.0), Some(40.0), Style::default(), vec![]),
    ]));
    let body = layout.block(layout.pages[0].body);
    let lines = layout.lines_of(body.regions[0]);
    assert_eq!(lines.len(), 1);
    let line = layout.line(lines[0]);
    assert_close(line.baseline_offset, 40.0);
    assert!(line.height > 40.0);
    assert!(line.baseline_offset <= line.height);

    let canvas_run = line
        .runs
        .iter()
        .map(|r| layout.run(*r))
        .find(|r| matches!(r.kind, RunKind::PositionedRegion { .. }))
        .unwrap();
    assert_close(canvas_run.bounds.y, 0.0);
}

#[test]
fn test_top_aligned_canvas_only_stretches_the_line() {
    let layout = layout_doc(&default_doc(vec![
        make_text("Hi", 12.0),
        Node::canvas(
            Some(40.0),
            Some(40.0),
            Style {
                vertical_align: Some(VerticalAlign::Top),
                ..Default::default()
            },
            vec![],
        ),
    ]));
    let body = layout.block(layout.pages[0].body);
    let line = layout.line(layout.lines_of(body.regions[0])[0]);
    assert_close(line.height, 40.0);
    assert!(line.baseline_offset < 20.0);
}

fn canvas_line(align: VerticalAlign) -> (LayoutDocument, LineId) {
    let layout = layout_doc(&default_doc(vec![
        make_text("Hi", 12.0),
        Node::canvas(
            Some(40.0),
            Some(40.0),
            Style {
                vertical_align: Some(align),
                ..Default::default()
            },
            vec![],
        ),
    ]));
    let body = layout.block(layout.pages[0].body);
    let lines = layout.lines_of(body.regions[0]);
    assert_eq!(lines.len(), 1);
    let line = lines[0];
    (layout, line)
}

fn canvas_run(layout: &LayoutDocument, line: LineId) -> Rect {
    layout
        .line(line)
        .runs
        .iter()
        .map(|r| layout.run(*r))
        .find(|r| matches!(r.kind, RunKind::PositionedRegion { .. }))
        .unwrap()
        .bounds
}

#[test]
fn test_bottom_aligned_canvas_sets_baseline_to_its_height() {
    let (layout, id) = canvas_line(VerticalAlign::Bottom);
    let line = layout.line(id);
    assert_close(line.baseline_offset, 40.0);
    // The text descent hangs below the baseline.
    assert!(line.height > 40.0);
    let run = canvas_run(&layout, id);
    assert_close(run.y + run.height, line.height);
}

#[test]
fn test_middle_aligned_canvas_centers_on_the_baseline() {
    let (layout, id) = canvas_line(VerticalAlign::Middle);
    let line = layout.line(id);
    assert_close(line.height, 40.0);
    assert_close(line.baseline_offset, 20.0);
    assert_close(canvas_run(&layout, id).y, 0.0);
}

#[test]
fn test_justified_lines_fill_the_width() {
    let text = Node::text(
        "The quick brown fox jumps over the lazy dog again and again until the line wraps",
        Style {
            text_align: Some(TextAlign::Justify),
            ..Default::default()
        },
    );
    let layout = layout_doc(&custom_doc(200.0, 500.0, vec![text]));
    let body = layout.block(layout.pages[0].body);
    let lines = layout.lines_of(body.regions[0]);
    assert!(lines.len() >= 2);

    let first = layout.line(lines[0]);
    assert!(first.extra_space > 0.0);
    assert_close(first.used_width, 200.0);
    let last = layout.line(*lines.last().unwrap());
    assert_close(last.extra_space, 0.0);
}

#[test]
fn test_center_alignment_shifts_runs() {
    let text = Node::text(
        "Hi",
        Style {
            text_align: Some(TextAlign::Center),
            ..Default::default()
        },
    );
    let layout = layout_doc(&custom_doc(200.0, 500.0, vec![text]));
    let body = layout.block(layout.pages[0].body);
    let line = layout.line(layout.lines_of(body.regions[0])[0]);
    let run = layout.run(line.runs[0]);
    assert_close(run.bounds.x, line.available_width() / 2.0);
}

#[test]
fn test_styled_runs_and_transform() {
    let text = Node::runs(
        vec![
            TextRun {
                content: "bold ".to_string(),
                style: Style {
                    font_weight: Some(700),
                    ..Default::default()
                },
            },
            TextRun {
                content: "plain".to_string(),
                style: Style::default(),
            },
        ],
        Style {
            text_transform: Some(TextTransform::Uppercase),
            ..Default::default()
        },
    );
    let layout = layout_doc(&default_doc(vec![text]));
    let body = layout.block(layout.pages[0].body);
    let line = layout.lines_of(body.regions[0])[0];
    assert_eq!(layout.line(line).runs.len(), 2);
    assert_eq!(layout.line_text(line), "BOLD PLAIN");
    match &layout.run(layout.line(line).runs[0]).kind {
        RunKind::Text { font, .. } => assert_eq!(font.weight, 700),
        other => panic!("expected a text run, got {other:?}"),
    }
}

#[test]
fn test_newlines_force_breaks() {
    let layout = layout_doc(&default_doc(vec![make_text("one\ntwo\nthree", 12.0)]));
    let body = layout.block(layout.pages[0].body);
    let lines = layout.lines_of(body.regions[0]);
    let texts: Vec<String> = lines.iter().map(|l| layout.line_text(*l)).collect();
    assert_eq!(texts, vec!["one", "two", "three"]);
}

// ─── Headers, Footers and Shared Resources ──────────────────────

#[test]
fn test_header_and_footer_frame_the_body() {
    let doc = custom_doc(
        300.0,
        200.0,
        vec![
            Node::header(Style::default(), vec![make_text("Header", 12.0)]),
            Node::footer(Style::default(), vec![make_text("Footer", 12.0)]),
            make_text("Body", 12.0),
        ],
    );
    let layout = layout_doc(&doc);
    assert_eq!(layout.pages.len(), 1);
    let page = &layout.pages[0];
    assert_eq!(page.headers.len(), 1);
    assert_eq!(page.footers.len(), 1);

    assert_close(layout.block_border_rect(page.headers[0]).y, 0.0);
    assert_close(layout.block_border_rect(page.footers[0]).y, 200.0 - 16.8);
    assert_close(layout.block_content_rect(page.body).y, 16.8);
    assert_close(layout.block_content_rect(page.body).height, 200.0 - 2.0 * 16.8);

    let footer = layout.block(page.footers[0]);
    let line = layout.lines_of(footer.regions[0])[0];
    assert_close(layout.line_rect(line).y, 200.0 - 16.8);
}

#[test]
fn test_shared_canvas_is_registered_once() {
    let logo = Node::canvas(
        Some(20.0),
        Some(20.0),
        Style::default(),
        vec![make_styled_panel(
            Style {
                position: Some(Position::Absolute),
                left: Some(2.0),
                top: Some(2.0),
                width: Some(Dimension::Pt(16.0)),
                height: Some(Dimension::Pt(16.0)),
                ..Default::default()
            },
            vec![],
        )
        .with_id("mark")],
    )
    .with_id("logo");
    let doc = custom_doc(
        300.0,
        200.0,
        vec![
            Node::header(Style::default(), vec![logo]),
            make_text("Page 1", 12.0),
            Node::page_break(),
            make_text("Page 2", 12.0),
        ],
    );
    let layout = layout_doc(&doc);
    assert_eq!(layout.pages.len(), 2);

    assert_eq!(layout.resources.len(), 1);
    let resource = layout.resources.iter().next().unwrap();
    assert!(resource.registered);
    assert!(resource.content.is_some());

    let node = layout.node_id("logo").unwrap();
    let placements = layout.positioned_of(node);
    assert_eq!(placements.len(), 2);
    for &p in &placements {
        assert_eq!(layout.positioned_region(p).resource, Some(resource.handle));
    }
    let with_content = placements
        .iter()
        .filter(|p| layout.positioned_region(**p).content.is_some())
        .count();
    assert_eq!(with_content, 1);

    // Content inside the canvas is laid out once, in the canvas frame.
    let mark = layout.node_id("mark").unwrap();
    let inner = layout.positioned_of(mark);
    assert_eq!(inner.len(), 1);
    let inner = layout.positioned_region(inner[0]);
    assert_eq!(inner.frame, Some(resource.handle));
    assert_rect(inner.total_bounds, Rect::new(2.0, 2.0, 16.0, 16.0));

    // One arrangement per page for the canvas itself.
    let chain = layout.arrangements.chain(node);
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0].page_index, 0);
    assert_eq!(chain[1].page_index, 1);
}

#[test]
fn test_render_reference_slot() {
    let doc = default_doc(vec![Node::canvas(Some(10.0), Some(10.0), Style::default(), vec![])]);
    let mut layout = layout_doc(&doc);
    let handle = layout.resources.iter().next().unwrap().handle;
    layout.resources.set_render_reference(handle, 7);
    assert_eq!(layout.resources.get(handle).unwrap().render_reference, Some(7));
}

// ─── JSON Input Tests ───────────────────────────────────────────

#[test]
fn test_minimal_json() {
    let json = r#"{
        "children": [
            {
                "kind": { "type": "Text", "content": "Hello from JSON" },
                "style": { "fontSize": 14 }
            }
        ]
    }"#;
    let layout = folio::layout_json(json).expect("Should parse minimal JSON");
    assert_eq!(layout.pages.len(), 1);
}

#[test]
fn test_panel_json() {
    let json = r#"{
        "defaultPage": {
            "size": { "Custom": { "width": 300, "height": 500 } },
            "margin": { "top": 0, "right": 0, "bottom": 0, "left": 0 }
        },
        "children": [
            {
                "kind": { "type": "Panel" },
                "id": "box",
                "style": {
                    "margin": { "top": 10, "right": 10, "bottom": 10, "left": 10 },
                    "columnCount": 2,
                    "columnGap": 12
                },
                "children": [
                    { "kind": { "type": "Text", "content": "Column text" } }
                ]
            }
        ]
    }"#;
    let layout = folio::layout_json(json).expect("Should parse panel JSON");
    let block = layout.block(first_block(&layout, "box"));
    assert_eq!(block.columns, 2);
    assert_close(block.available_bounds.width, 280.0);
}

#[test]
fn test_invalid_json_reports_parse_error() {
    let result = folio::layout_json("{ \"children\": [ }");
    match result {
        Err(LayoutError::Parse { hint, .. }) => assert!(!hint.is_empty()),
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn test_layout_info_snapshot() {
    let layout = layout_doc(&default_doc(vec![
        make_panel(vec![make_text("Inside", 12.0)]).with_id("outer"),
    ]));
    let info = folio::layout::LayoutInfo::from_document(&layout);
    assert_eq!(info.pages.len(), 1);
    let body = &info.pages[0].elements[0];
    let panel = &body.children[0];
    assert_eq!(panel.node_type, "Panel");
    assert_eq!(panel.node_id.as_deref(), Some("outer"));
    assert_eq!(panel.children[0].kind, "Line");
    assert_eq!(panel.children[0].text_content.as_deref(), Some("Inside"));

    let json = serde_json::to_string(&info).unwrap();
    assert!(json.contains("\"nodeType\":\"Panel\""));
}
