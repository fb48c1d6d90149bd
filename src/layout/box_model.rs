//! Box model resolution: declared size, min/max clamps and
//! margin/border/padding against the space a parent offers.
//!
//! Explicit and min/max sizes describe the border box. Margins are
//! additive; adjacent margins are never collapsed.

use crate::geometry::{Rect, Size};
use crate::model::Edges;
use crate::style::ResolvedStyle;

/// Resolved rectangles for one box, relative to its outer origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxBounds {
    pub margin: Edges,
    pub border: Edges,
    pub padding: Edges,
    /// The outer space allotted to the box.
    pub total: Size,
    pub border_box: Rect,
    /// Content rectangle children are laid out in.
    pub available: Rect,
    /// Clamped explicit border-box width, if the style declares one.
    pub fixed_width: Option<f64>,
    /// Clamped explicit border-box height, if the style declares one.
    pub fixed_height: Option<f64>,
}

impl BoxBounds {
    /// Border plus padding.
    pub fn spacing(&self) -> Edges {
        self.border.add(&self.padding)
    }

    /// Everything above the content: margin, border and padding.
    pub fn top_spacing(&self) -> f64 {
        self.margin.top + self.border.top + self.padding.top
    }

    pub fn bottom_spacing(&self) -> f64 {
        self.margin.bottom + self.border.bottom + self.padding.bottom
    }
}

/// `min` wins over `max`.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.min(max).max(min)
}

/// Resolve a box inside `space`.
///
/// An auto width fills the space (minus margins) and is then clamped. An
/// auto height takes whatever height is left, capped by the max height;
/// the used height is decided later from content. Sizes that would go
/// negative are zero. A continuation fragment drops its top margin, border
/// and padding.
pub fn resolve(style: &ResolvedStyle, space: Size, continuation: bool) -> BoxBounds {
    let (margin, border, padding) = if continuation {
        (
            style.margin.without_top(),
            style.border_width.without_top(),
            style.padding.without_top(),
        )
    } else {
        (style.margin, style.border_width, style.padding)
    };

    let fixed_width = style
        .width
        .fixed()
        .map(|w| clamp(w, style.min_width, style.max_width));
    let fixed_height = style
        .height
        .fixed()
        .map(|h| clamp(h, style.min_height, style.max_height));

    let fill_width = (space.width - margin.horizontal()).max(0.0);
    let border_width = fixed_width
        .unwrap_or_else(|| clamp(fill_width, style.min_width, style.max_width));
    let border_height = fixed_height.unwrap_or_else(|| {
        (space.height - margin.vertical())
            .max(0.0)
            .min(style.max_height)
    });

    let border_box = Rect::new(margin.left, margin.top, border_width, border_height);
    let available = border_box.inset(&border.add(&padding));

    BoxBounds {
        margin,
        border,
        padding,
        total: space,
        border_box,
        available,
        fixed_width,
        fixed_height,
    }
}

/// Border-box height a box may still take after earlier fragments used
/// `consumed`: what is left of its explicit height, else of its max height.
/// `None` when the box is only bounded by the space around it.
pub fn remaining_height(style: &ResolvedStyle, bounds: &BoxBounds, consumed: f64) -> Option<f64> {
    bounds
        .fixed_height
        .or_else(|| style.max_height.is_finite().then_some(style.max_height))
        .map(|h| (h - consumed).max(0.0))
}

/// A continuation fragment of a box with an explicit height keeps only the
/// height earlier fragments left over.
pub fn continue_after(mut bounds: BoxBounds, consumed: f64) -> BoxBounds {
    if let Some(h) = bounds.fixed_height {
        let rest = (h - consumed).max(0.0);
        bounds.border_box.height = rest;
        bounds.available.height = (rest - bounds.spacing().vertical()).max(0.0);
    }
    bounds
}

/// Used border-box width of an auto-width box from its content width.
pub fn shrink_width(style: &ResolvedStyle, bounds: &BoxBounds, content_width: f64) -> f64 {
    if let Some(w) = bounds.fixed_width {
        return w;
    }
    if style.full_width {
        return bounds.border_box.width;
    }
    clamp(
        content_width + bounds.spacing().horizontal(),
        style.min_width,
        style.max_width,
    )
}

/// Width of one column of a multi-column region.
pub fn column_width(available_width: f64, columns: usize, gap: f64) -> f64 {
    let columns = columns.max(1);
    (available_width - gap * (columns - 1) as f64) / columns as f64
}
