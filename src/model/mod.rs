//! # Document Model
//!
//! The input representation for the layout engine. A document is a tree of
//! nodes, each with a kind, style properties, and children. Panels are block
//! containers, Text is inline content, and Canvas is an embedded vector
//! sub-document with its own coordinate frame.
//!
//! **Page** is a first-class node type: each top-level Page starts a page
//! sequence with its own configuration. Top-level content outside a Page
//! flows into pages built from the document's default page configuration.

pub mod tree;

pub use tree::{NodeId, NodeTree};

use crate::style::Style;
use serde::{Deserialize, Serialize};

/// A complete document ready for layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// The root nodes of the document. Typically one or more Page nodes,
    /// but can also be content nodes that get auto-wrapped in pages.
    pub children: Vec<Node>,

    /// Page configuration for content that isn't wrapped in a Page node.
    #[serde(default)]
    pub default_page: PageConfig,

    /// Custom fonts to register before layout.
    #[serde(default)]
    pub fonts: Vec<FontEntry>,
}

/// A custom font to register with the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontEntry {
    /// Font family name (e.g. "Inter", "Roboto").
    pub family: String,
    /// Base64-encoded font data, or a data URI (e.g. "data:font/ttf;base64,...").
    pub src: String,
    /// Font weight (100-900). Defaults to 400.
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Whether this is an italic variant.
    #[serde(default)]
    pub italic: bool,
}

fn default_weight() -> u32 {
    400
}

/// Configuration for a page: size, margins, wrapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    /// Page size. Defaults to A4.
    #[serde(default = "PageSize::default")]
    pub size: PageSize,

    /// Page margins in points (1/72 inch).
    #[serde(default)]
    pub margin: Edges,

    /// Whether content that overflows the page continues on a new page.
    /// When false the page body clips instead.
    #[serde(default = "default_true")]
    pub wrap: bool,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            margin: Edges::uniform(54.0),
            wrap: true,
        }
    }
}

impl PageConfig {
    /// A custom-sized page without margins.
    pub fn custom(width: f64, height: f64) -> Self {
        Self {
            size: PageSize::Custom { width, height },
            margin: Edges::default(),
            wrap: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A3 => (841.89, 1190.55),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Tabloid => (792.0, 1224.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

/// Edge values (top, right, bottom, left) used for margin, border and padding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Edges {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub right: f64,
    #[serde(default)]
    pub bottom: f64,
    #[serde(default)]
    pub left: f64,
}

impl Edges {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn symmetric(vertical: f64, horizontal: f64) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }

    pub fn add(&self, other: &Edges) -> Edges {
        Edges {
            top: self.top + other.top,
            right: self.right + other.right,
            bottom: self.bottom + other.bottom,
            left: self.left + other.left,
        }
    }

    /// The same edges with the top side removed.
    pub fn without_top(&self) -> Edges {
        Edges { top: 0.0, ..*self }
    }

    /// Zero out negative sides.
    pub fn non_negative(&self) -> Edges {
        Edges {
            top: self.top.max(0.0),
            right: self.right.max(0.0),
            bottom: self.bottom.max(0.0),
            left: self.left.max(0.0),
        }
    }
}

/// A node in the document tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// What kind of node this is.
    pub kind: NodeKind,

    /// Style properties for this node.
    #[serde(default)]
    pub style: Style,

    /// Child nodes.
    #[serde(default)]
    pub children: Vec<Node>,

    /// Optional name, used to look up the node's placements after layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// The different kinds of nodes in the document tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    /// A page sequence. Content inside flows according to the page config.
    Page {
        #[serde(default)]
        config: PageConfig,
    },

    /// A block container, analogous to a <div>.
    Panel,

    /// Inline text.
    Text {
        #[serde(default)]
        content: String,
        /// Inline styled runs. When non-empty, `content` is ignored.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        runs: Vec<TextRun>,
    },

    /// An embedded vector canvas: inline replaced content with its own
    /// coordinate frame. Children are laid out inside that frame.
    Canvas {
        /// Display width in points. Falls back to the markup, then 300.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<f64>,
        /// Display height in points. Falls back to the markup, then 150.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        height: Option<f64>,
        /// Optional viewBox (e.g. "0 0 100 100").
        #[serde(default, skip_serializing_if = "Option::is_none")]
        view_box: Option<String>,
        /// Optional SVG markup carried through to the renderer.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },

    /// Laid out at the top of every page of the enclosing page sequence.
    PageHeader,

    /// Laid out at the bottom of every page of the enclosing page sequence.
    PageFooter,

    /// An explicit page break.
    PageBreak,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Page { .. } => "Page",
            NodeKind::Panel => "Panel",
            NodeKind::Text { .. } => "Text",
            NodeKind::Canvas { .. } => "Canvas",
            NodeKind::PageHeader => "PageHeader",
            NodeKind::PageFooter => "PageFooter",
            NodeKind::PageBreak => "PageBreak",
        }
    }
}

/// An inline styled run within a Text node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRun {
    pub content: String,
    #[serde(default)]
    pub style: Style,
}

impl Node {
    fn new(kind: NodeKind, style: Style, children: Vec<Node>) -> Self {
        Self {
            kind,
            style,
            children,
            id: None,
        }
    }

    /// Create a Panel node with children.
    pub fn panel(style: Style, children: Vec<Node>) -> Self {
        Self::new(NodeKind::Panel, style, children)
    }

    /// Create a Text node.
    pub fn text(content: &str, style: Style) -> Self {
        Self::new(
            NodeKind::Text {
                content: content.to_string(),
                runs: vec![],
            },
            style,
            vec![],
        )
    }

    /// Create a Text node made of styled runs.
    pub fn runs(runs: Vec<TextRun>, style: Style) -> Self {
        Self::new(
            NodeKind::Text {
                content: String::new(),
                runs,
            },
            style,
            vec![],
        )
    }

    /// Create a Canvas node. `None` sizes fall back to the intrinsic size.
    pub fn canvas(
        width: Option<f64>,
        height: Option<f64>,
        style: Style,
        children: Vec<Node>,
    ) -> Self {
        Self::new(
            NodeKind::Canvas {
                width,
                height,
                view_box: None,
                content: None,
            },
            style,
            children,
        )
    }

    /// Create a Page node.
    pub fn page(config: PageConfig, style: Style, children: Vec<Node>) -> Self {
        Self::new(NodeKind::Page { config }, style, children)
    }

    pub fn header(style: Style, children: Vec<Node>) -> Self {
        Self::new(NodeKind::PageHeader, style, children)
    }

    pub fn footer(style: Style, children: Vec<Node>) -> Self {
        Self::new(NodeKind::PageFooter, style, children)
    }

    pub fn page_break() -> Self {
        Self::new(NodeKind::PageBreak, Style::default(), vec![])
    }

    /// Attach a lookup name.
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Does this node take part in inline formatting?
    pub fn is_inline(&self) -> bool {
        matches!(self.kind, NodeKind::Text { .. } | NodeKind::Canvas { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_tagged_kinds() {
        let json = r#"{
            "kind": { "type": "Panel" },
            "style": { "padding": { "top": 4, "right": 4, "bottom": 4, "left": 4 } },
            "children": [
                { "kind": { "type": "Text", "content": "hi" } },
                { "kind": { "type": "Canvas", "width": 40 } }
            ]
        }"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert!(matches!(node.kind, NodeKind::Panel));
        assert_eq!(node.children.len(), 2);
        assert!(node.children[0].is_inline());
        match &node.children[1].kind {
            NodeKind::Canvas { width, height, .. } => {
                assert_eq!(*width, Some(40.0));
                assert!(height.is_none());
            }
            other => panic!("expected canvas, got {}", other.name()),
        }
    }

    #[test]
    fn page_config_defaults() {
        let config: PageConfig = serde_json::from_str("{}").unwrap();
        assert!(config.wrap);
        assert_eq!(config.size.dimensions(), (595.28, 841.89));
    }
}
