//! # Style System
//!
//! A CSS-like style model for document nodes. It covers the properties the
//! layout engine needs: box model with min/max clamps, multi-column flow,
//! typography, positioning schemes and overflow behaviour.
//!
//! Unset or unusable values never fail layout. They resolve to documented
//! defaults: auto size, zero edges, static position, one column.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Size};
use crate::model::Edges;

/// The complete set of style properties for a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    // ── Box Model ──────────────────────────────────────────────
    /// Explicit border-box width.
    pub width: Option<Dimension>,
    /// Explicit border-box height.
    pub height: Option<Dimension>,
    pub min_width: Option<Dimension>,
    pub min_height: Option<Dimension>,
    pub max_width: Option<Dimension>,
    pub max_height: Option<Dimension>,
    /// Keep the full available width instead of shrinking to content.
    pub full_width: Option<bool>,

    /// Padding inside the border.
    pub padding: Option<Edges>,
    /// Margin outside the border. Adjacent margins add up.
    pub margin: Option<Edges>,
    /// Border thickness.
    pub border_width: Option<Edges>,

    // ── Columns ────────────────────────────────────────────────
    /// Number of columns the content flows through.
    pub column_count: Option<u32>,
    /// Gutter between columns in points.
    pub column_gap: Option<f64>,

    // ── Typography ─────────────────────────────────────────────
    pub font_family: Option<String>,
    /// Font size in points.
    pub font_size: Option<f64>,
    /// Font weight (100-900).
    pub font_weight: Option<u32>,
    pub font_style: Option<FontStyle>,
    /// Line height as a multiplier of font size.
    pub line_height: Option<f64>,
    pub text_align: Option<TextAlign>,
    /// Letter spacing in points.
    pub letter_spacing: Option<f64>,
    pub text_transform: Option<TextTransform>,
    /// Alignment of inline replaced content on its line.
    pub vertical_align: Option<VerticalAlign>,

    // ── Positioning ────────────────────────────────────────────
    pub position: Option<Position>,
    pub top: Option<f64>,
    pub right: Option<f64>,
    pub bottom: Option<f64>,
    pub left: Option<f64>,

    // ── Page Behavior ──────────────────────────────────────────
    /// What happens when content exceeds the available height.
    pub overflow: Option<OverflowAction>,
    /// Force a page break before this node.
    pub break_before: Option<bool>,
}

/// A dimension that can be points, percentage, or auto.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Dimension {
    /// Fixed size in points (1/72 inch).
    Pt(f64),
    /// Percentage of the containing size.
    Percent(f64),
    /// Size determined by content.
    Auto,
}

impl Dimension {
    /// Resolve against a containing size. Percentages of an unbounded size
    /// behave like `Auto`.
    pub fn resolve(&self, parent_size: f64) -> Option<f64> {
        match self {
            Dimension::Pt(v) => Some(*v),
            Dimension::Percent(p) if parent_size.is_finite() => Some(parent_size * p / 100.0),
            Dimension::Percent(_) | Dimension::Auto => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum TextAlign {
    #[default]
    Left,
    Right,
    Center,
    Justify,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum TextTransform {
    #[default]
    None,
    Uppercase,
    Lowercase,
    Capitalize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum VerticalAlign {
    #[default]
    Baseline,
    Top,
    Middle,
    Bottom,
}

/// Positioning scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    /// In flow.
    #[default]
    Static,
    /// In flow, painted at an offset from the static position.
    Relative,
    /// Out of flow, against the nearest positioned ancestor.
    Absolute,
    /// Out of flow, against the nearest explicit-layout frame or the page.
    Fixed,
}

impl Position {
    pub fn is_out_of_flow(self) -> bool {
        matches!(self, Position::Absolute | Position::Fixed)
    }

    /// Does a box with this scheme act as a containing block for
    /// absolutely positioned descendants?
    pub fn establishes_context(self) -> bool {
        !matches!(self, Position::Static)
    }
}

/// Overflow behaviour when content exceeds the available height.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverflowAction {
    /// Split and continue on the next column or page.
    #[default]
    NextPage,
    /// Cap the box and clip what doesn't fit.
    Clip,
    /// Grow the box to fit its content.
    Grow,
}

/// Resolved style: all values are concrete (no Option, no Auto for computed values).
/// This is what the layout engine works with after style resolution.
#[derive(Debug, Clone)]
pub struct ResolvedStyle {
    // Box model
    pub width: SizeConstraint,
    pub height: SizeConstraint,
    pub min_width: f64,
    pub min_height: f64,
    pub max_width: f64,
    pub max_height: f64,
    pub full_width: bool,
    pub padding: Edges,
    pub margin: Edges,
    pub border_width: Edges,

    // Columns
    pub column_count: usize,
    pub column_gap: f64,

    // Text
    pub font_family: String,
    pub font_size: f64,
    pub font_weight: u32,
    pub font_style: FontStyle,
    pub line_height: f64,
    pub text_align: TextAlign,
    pub letter_spacing: f64,
    pub text_transform: TextTransform,
    pub vertical_align: VerticalAlign,

    // Positioning
    pub position: Position,
    pub top: Option<f64>,
    pub right: Option<f64>,
    pub bottom: Option<f64>,
    pub left: Option<f64>,

    // Page behavior
    pub overflow: OverflowAction,
    pub break_before: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeConstraint {
    Fixed(f64),
    Auto,
}

impl SizeConstraint {
    pub fn fixed(&self) -> Option<f64> {
        match self {
            SizeConstraint::Fixed(v) => Some(*v),
            SizeConstraint::Auto => None,
        }
    }
}

impl ResolvedStyle {
    pub fn italic(&self) -> bool {
        !matches!(self.font_style, FontStyle::Normal)
    }

    /// Border plus padding.
    pub fn spacing(&self) -> Edges {
        self.border_width.add(&self.padding)
    }

    /// Paint offset of a relatively positioned box. `left` wins over
    /// `right` and `top` over `bottom`.
    pub fn relative_offset(&self) -> Point {
        if self.position != Position::Relative {
            return Point::ZERO;
        }
        let dx = self.left.or(self.right.map(|r| -r)).unwrap_or(0.0);
        let dy = self.top.or(self.bottom.map(|b| -b)).unwrap_or(0.0);
        Point::new(dx, dy)
    }
}

fn size_constraint(dimension: Option<Dimension>, available: f64) -> SizeConstraint {
    dimension
        .and_then(|d| d.resolve(available))
        .map(|v| SizeConstraint::Fixed(v.max(0.0)))
        .unwrap_or(SizeConstraint::Auto)
}

impl Style {
    /// Resolve this style against a parent's resolved style and the space
    /// available to the node. Percentages resolve against `available`.
    pub fn resolve(&self, parent: Option<&ResolvedStyle>, available: Size) -> ResolvedStyle {
        let parent_font_size = parent.map(|p| p.font_size).unwrap_or(12.0);
        let parent_font_family = parent
            .map(|p| p.font_family.clone())
            .unwrap_or_else(|| "Helvetica".to_string());

        let column_count = match self.column_count {
            Some(0) => {
                warn!("columnCount 0 is not usable; laying out a single column");
                1
            }
            Some(n) => n as usize,
            None => 1,
        };

        let min_width = self
            .min_width
            .and_then(|d| d.resolve(available.width))
            .unwrap_or(0.0)
            .max(0.0);
        let max_width = self
            .max_width
            .and_then(|d| d.resolve(available.width))
            .unwrap_or(f64::INFINITY)
            .max(min_width);
        let min_height = self
            .min_height
            .and_then(|d| d.resolve(available.height))
            .unwrap_or(0.0)
            .max(0.0);
        let max_height = self
            .max_height
            .and_then(|d| d.resolve(available.height))
            .unwrap_or(f64::INFINITY)
            .max(min_height);

        ResolvedStyle {
            width: size_constraint(self.width, available.width),
            height: size_constraint(self.height, available.height),
            min_width,
            min_height,
            max_width,
            max_height,
            full_width: self.full_width.unwrap_or(false),
            padding: self.padding.unwrap_or_default().non_negative(),
            margin: self.margin.unwrap_or_default(),
            border_width: self.border_width.unwrap_or_default().non_negative(),

            column_count,
            column_gap: self.column_gap.unwrap_or(0.0).max(0.0),

            font_family: self.font_family.clone().unwrap_or(parent_font_family),
            font_size: self.font_size.unwrap_or(parent_font_size),
            font_weight: self
                .font_weight
                .unwrap_or(parent.map(|p| p.font_weight).unwrap_or(400)),
            font_style: self
                .font_style
                .unwrap_or(parent.map(|p| p.font_style).unwrap_or_default()),
            line_height: self
                .line_height
                .unwrap_or(parent.map(|p| p.line_height).unwrap_or(1.4)),
            text_align: self
                .text_align
                .unwrap_or(parent.map(|p| p.text_align).unwrap_or_default()),
            letter_spacing: self
                .letter_spacing
                .unwrap_or(parent.map(|p| p.letter_spacing).unwrap_or(0.0)),
            text_transform: self
                .text_transform
                .unwrap_or(parent.map(|p| p.text_transform).unwrap_or_default()),
            vertical_align: self.vertical_align.unwrap_or_default(),

            position: self.position.unwrap_or_default(),
            top: self.top,
            right: self.right,
            bottom: self.bottom,
            left: self.left,

            overflow: self.overflow.unwrap_or_default(),
            break_before: self.break_before.unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> Size {
        Size::new(200.0, 400.0)
    }

    #[test]
    fn defaults_when_unset() {
        let s = Style::default().resolve(None, space());
        assert_eq!(s.width, SizeConstraint::Auto);
        assert_eq!(s.margin, Edges::default());
        assert_eq!(s.position, Position::Static);
        assert_eq!(s.overflow, OverflowAction::NextPage);
        assert_eq!(s.column_count, 1);
        assert_eq!(s.font_family, "Helvetica");
        assert!((s.font_size - 12.0).abs() < 0.001);
    }

    #[test]
    fn percent_width_uses_available_width() {
        let s = Style {
            width: Some(Dimension::Percent(25.0)),
            ..Default::default()
        }
        .resolve(None, space());
        assert_eq!(s.width, SizeConstraint::Fixed(50.0));
    }

    #[test]
    fn percent_height_of_unbounded_space_is_auto() {
        let s = Style {
            height: Some(Dimension::Percent(50.0)),
            ..Default::default()
        }
        .resolve(None, Size::new(100.0, f64::INFINITY));
        assert_eq!(s.height, SizeConstraint::Auto);
    }

    #[test]
    fn zero_columns_fall_back_to_one() {
        let s = Style {
            column_count: Some(0),
            ..Default::default()
        }
        .resolve(None, space());
        assert_eq!(s.column_count, 1);
    }

    #[test]
    fn typography_inherits() {
        let parent = Style {
            font_size: Some(20.0),
            text_align: Some(TextAlign::Center),
            ..Default::default()
        }
        .resolve(None, space());
        let child = Style::default().resolve(Some(&parent), space());
        assert!((child.font_size - 20.0).abs() < 0.001);
        assert_eq!(child.text_align, TextAlign::Center);
        assert_eq!(child.vertical_align, VerticalAlign::Baseline);
    }

    #[test]
    fn relative_offset_prefers_left_and_top() {
        let s = Style {
            position: Some(Position::Relative),
            left: Some(5.0),
            right: Some(50.0),
            bottom: Some(7.0),
            ..Default::default()
        }
        .resolve(None, space());
        assert_eq!(s.relative_offset(), Point::new(5.0, -7.0));

        let static_style = Style {
            left: Some(5.0),
            ..Default::default()
        }
        .resolve(None, space());
        assert_eq!(static_style.relative_offset(), Point::ZERO);
    }
}
