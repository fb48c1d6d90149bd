use crate::geometry::Size;
use crate::style::{ResolvedStyle, Style};

/// Engine-wide defaults that apply when a document leaves them unset.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Font family of the root style.
    pub font_family: String,
    /// Font size of the root style, in points.
    pub font_size: f64,
    /// Line height multiplier of the root style.
    pub line_height: f64,
    /// Size of a canvas whose width and height can't be determined from
    /// the node or its markup.
    ///
    /// Defaults to 300×150, the usual embedded-canvas convention.
    pub default_canvas: Size,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            font_family: "Helvetica".to_string(),
            font_size: 12.0,
            line_height: 1.4,
            default_canvas: Size::new(300.0, 150.0),
        }
    }
}

impl LayoutConfig {
    /// The style every top-level node inherits from.
    pub fn root_style(&self, page: Size) -> ResolvedStyle {
        Style {
            font_family: Some(self.font_family.clone()),
            font_size: Some(self.font_size),
            line_height: Some(self.line_height),
            ..Default::default()
        }
        .resolve(None, page)
    }
}
