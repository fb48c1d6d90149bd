//! # Folio
//!
//! A page-native layout and positioning engine.
//!
//! Folio turns a tree of styled nodes into fully resolved geometry: pages,
//! boxes, column regions, lines and text runs, each with concrete
//! coordinates. Content flows *into* pages and columns; nothing is laid out
//! on an endless strip and cut up afterwards. A box that doesn't fit is
//! split, clipped or grown according to its overflow policy.
//!
//! ## Architecture
//!
//! ```text
//! Input (JSON/API)
//!       ↓
//!   [model]    Document tree: pages, panels, text, canvases
//!       ↓
//!   [style]    Inheritance, defaults, percentage resolution
//!       ↓
//!   [layout]   Box model, line composition, column/page flow,
//!              positioning, shared resources
//!       ↓
//! LayoutDocument (arenas of pages, blocks, regions, lines, runs)
//! ```
//!
//! ```
//! use folio::model::{Document, Node};
//! use folio::style::Style;
//!
//! let document = Document {
//!     children: vec![Node::text("Hello", Style::default())],
//!     ..Default::default()
//! };
//! let layout = folio::layout(&document).unwrap();
//! assert_eq!(layout.pages.len(), 1);
//! ```

pub mod canvas;
pub mod config;
pub mod error;
pub mod font;
pub mod geometry;
pub mod layout;
pub mod model;
pub mod style;
pub mod text;

pub use error::LayoutError;

use font::FontContext;
use layout::{LayoutDocument, LayoutEngine};
use model::Document;

/// Lay out a document with the default configuration.
///
/// Fonts listed in the document are registered first.
pub fn layout(document: &Document) -> Result<LayoutDocument, LayoutError> {
    let mut font_context = FontContext::new();
    for entry in &document.fonts {
        font_context.register_entry(entry)?;
    }
    LayoutEngine::new().layout(document, &font_context)
}

/// Lay out a document described as JSON.
pub fn layout_json(json: &str) -> Result<LayoutDocument, LayoutError> {
    let document: Document = serde_json::from_str(json)?;
    layout(&document)
}
