//! Flattened, index-addressed view of a [`Document`] tree.
//!
//! Layout refers to source nodes by [`NodeId`] instead of by reference so
//! that geometry, arrangements and resources can point back at their owner
//! without borrowing the document. Id 0 is the document itself.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use super::{Document, Node};

/// Identity of a source node. Stable for one layout pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The document root. It has no [`Node`] of its own.
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Entry<'a> {
    node: Option<&'a Node>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Preorder arena over the nodes of one document.
pub struct NodeTree<'a> {
    entries: Vec<Entry<'a>>,
    names: HashMap<String, NodeId>,
}

impl<'a> NodeTree<'a> {
    pub fn new(document: &'a Document) -> Self {
        let mut tree = NodeTree {
            entries: vec![Entry {
                node: None,
                parent: None,
                children: Vec::new(),
            }],
            names: HashMap::new(),
        };
        for child in &document.children {
            let id = tree.insert(child, NodeId::ROOT);
            tree.entries[0].children.push(id);
        }
        tree
    }

    fn insert(&mut self, node: &'a Node, parent: NodeId) -> NodeId {
        let id = NodeId(self.entries.len());
        self.entries.push(Entry {
            node: Some(node),
            parent: Some(parent),
            children: Vec::with_capacity(node.children.len()),
        });
        if let Some(name) = &node.id {
            self.names.entry(name.clone()).or_insert(id);
        }
        for child in &node.children {
            let child_id = self.insert(child, id);
            self.entries[id.0].children.push(child_id);
        }
        id
    }

    /// The source node, or `None` for [`NodeId::ROOT`] and unknown ids.
    pub fn node(&self, id: NodeId) -> Option<&'a Node> {
        self.entries.get(id.0).and_then(|e| e.node)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.entries
            .get(id.0)
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.entries.get(id.0).and_then(|e| e.parent)
    }

    /// Look up a node by its `id` attribute. The first match in document
    /// order wins.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn names(&self) -> &HashMap<String, NodeId> {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Style;

    #[test]
    fn ids_follow_preorder() {
        let doc = Document {
            children: vec![
                Node::panel(
                    Style::default(),
                    vec![Node::text("a", Style::default()).with_id("first")],
                ),
                Node::text("b", Style::default()),
            ],
            ..Default::default()
        };
        let tree = NodeTree::new(&doc);
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.children(NodeId::ROOT), &[NodeId(1), NodeId(3)]);
        assert_eq!(tree.children(NodeId(1)), &[NodeId(2)]);
        assert_eq!(tree.parent(NodeId(2)), Some(NodeId(1)));
        assert_eq!(tree.find("first"), Some(NodeId(2)));
        assert!(tree.node(NodeId::ROOT).is_none());
    }
}
