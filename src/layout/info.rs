//! Serializable layout metadata (for debug overlays and the CLI).
//!
//! Coordinates are absolute: page coordinates for page content, and the
//! resource's own frame for shared resource content.

use std::collections::HashMap;

use serde::Serialize;

use super::tree::{BlockId, LayoutDocument, LineId, PositionedId, RegionItem, RunKind};
use crate::geometry::Rect;
use crate::model::NodeId;

/// Complete layout metadata for all pages.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutInfo {
    pub pages: Vec<PageInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceInfo>,
}

/// Layout metadata for a single page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub width: f64,
    pub height: f64,
    pub content_x: f64,
    pub content_y: f64,
    pub content_width: f64,
    pub content_height: f64,
    pub elements: Vec<ElementInfo>,
}

/// One shared resource and its laid-out content.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    pub handle: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub width: f64,
    pub height: f64,
    pub registered: bool,
    pub placements: usize,
    pub elements: Vec<ElementInfo>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInfo {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Geometry kind: Block, Line, Text, Canvas, Anchor or Positioned.
    pub kind: String,
    /// Source node kind.
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub continues: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub clipped: bool,
    pub children: Vec<ElementInfo>,
}

struct InfoBuilder<'d> {
    layout: &'d LayoutDocument,
    names: HashMap<NodeId, String>,
}

impl LayoutInfo {
    /// Extract serializable layout metadata from a laid-out document.
    pub fn from_document(layout: &LayoutDocument) -> Self {
        let builder = InfoBuilder {
            layout,
            names: layout
                .names
                .iter()
                .map(|(name, id)| (*id, name.clone()))
                .collect(),
        };

        let pages = layout
            .pages
            .iter()
            .map(|page| {
                let content = page.content_rect();
                let elements = page
                    .headers
                    .iter()
                    .chain(std::iter::once(&page.body))
                    .chain(page.footers.iter())
                    .map(|&b| builder.block(b))
                    .collect();
                PageInfo {
                    width: page.width,
                    height: page.height,
                    content_x: content.x,
                    content_y: content.y,
                    content_width: content.width,
                    content_height: content.height,
                    elements,
                }
            })
            .collect();

        let resources = layout
            .resources
            .iter()
            .map(|r| ResourceInfo {
                handle: r.handle.0,
                node_id: builder.names.get(&r.owner).cloned(),
                width: r.bounding_box.width,
                height: r.bounding_box.height,
                registered: r.registered,
                placements: layout
                    .positioned
                    .iter()
                    .filter(|p| p.resource == Some(r.handle))
                    .count(),
                elements: r.content.map(|b| vec![builder.block(b)]).unwrap_or_default(),
            })
            .collect();

        LayoutInfo { pages, resources }
    }
}

impl InfoBuilder<'_> {
    fn element(&self, kind: &str, node: NodeId, rect: Rect) -> ElementInfo {
        ElementInfo {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            kind: kind.to_string(),
            node_type: self.layout.node_type(node).to_string(),
            node_id: self.names.get(&node).cloned(),
            text_content: None,
            continues: false,
            clipped: false,
            children: Vec::new(),
        }
    }

    fn block(&self, id: BlockId) -> ElementInfo {
        let block = self.layout.block(id);
        let mut info = self.element("Block", block.owner, self.layout.block_border_rect(id));
        info.continues = block.continues;
        info.clipped = block.clip;
        for region in &block.regions {
            for item in &self.layout.region(*region).items {
                info.children.push(match item {
                    RegionItem::Block(b) => self.block(*b),
                    RegionItem::Line(l) => self.line(*l),
                });
            }
        }
        for &p in &block.positioned_regions {
            info.children.push(self.positioned(p));
        }
        info
    }

    fn line(&self, id: LineId) -> ElementInfo {
        let line = self.layout.line(id);
        let owner = line
            .runs
            .first()
            .map(|r| self.layout.run(*r).owner)
            .unwrap_or(NodeId::ROOT);
        let mut info = self.element("Line", owner, self.layout.line_rect(id));
        for &run_id in &line.runs {
            let run = self.layout.run(run_id);
            let kind = match run.kind {
                RunKind::Text { .. } => "Text",
                RunKind::PositionedRegion { .. } => "Canvas",
                RunKind::Component { .. } => "Anchor",
            };
            let mut child = self.element(kind, run.owner, self.layout.run_rect(run_id));
            if let RunKind::Text { text, .. } = &run.kind {
                child.text_content = Some(text.clone());
            }
            info.children.push(child);
        }
        info.text_content = Some(self.layout.line_text(id)).filter(|t| !t.is_empty());
        info
    }

    fn positioned(&self, id: PositionedId) -> ElementInfo {
        let region = self.layout.positioned_region(id);
        let mut info = self.element("Positioned", region.owner, region.total_bounds);
        // Resource content is listed once, under the resource.
        if region.resource.is_none() {
            if let Some(content) = region.content {
                info.children.push(self.block(content));
            }
        }
        info
    }
}
