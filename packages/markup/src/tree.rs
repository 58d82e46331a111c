//! Arena element tree.
//!
//! Nodes are addressed by [`NodeId`] handles into a flat arena, the same way
//! the rest of the workspace addresses proxies by label. Text content is kept
//! per element (concatenated direct text children), which is all the
//! declaration model needs; the pretty-printing grammar lives outside this
//! workspace.

use indexmap::IndexMap;

use crate::{MarkupError, DECLARATION_SCRIPT_TYPE};

/// Handle to a node in a [`MarkupTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One element of the markup tree.
#[derive(Debug, Clone)]
pub struct MarkupNode {
    tag: String,
    attributes: IndexMap<String, String>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl MarkupNode {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Mutable arena of markup elements.
#[derive(Debug, Clone)]
pub struct MarkupTree {
    nodes: Vec<MarkupNode>,
    root: NodeId,
}

impl MarkupTree {
    /// Parse markup text into an arena.
    ///
    /// The parse happens exactly once per document load; everything after
    /// that is arena mutation.
    pub fn parse(source: &str) -> Result<Self, MarkupError> {
        let doc = roxmltree::Document::parse(source)?;

        let mut tree = MarkupTree {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        let root = tree.seed(doc.root_element(), None);
        tree.root = root;
        Ok(tree)
    }

    fn seed(&mut self, element: roxmltree::Node, parent: Option<NodeId>) -> NodeId {
        let mut attributes = IndexMap::new();
        for attr in element.attributes() {
            attributes.insert(attr.name().to_string(), attr.value().to_string());
        }

        let text = element
            .children()
            .filter(|child| child.is_text())
            .filter_map(|child| child.text())
            .collect::<String>();

        let id = NodeId(self.nodes.len());
        self.nodes.push(MarkupNode {
            tag: element.tag_name().name().to_string(),
            attributes,
            text,
            parent,
            children: Vec::new(),
        });

        for child in element.children().filter(|c| c.is_element()) {
            let child_id = self.seed(child, Some(id));
            self.nodes[id.0].children.push(child_id);
        }

        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &MarkupNode {
        &self.nodes[id.0]
    }

    /// The `<body>` element, root of the editable region.
    pub fn body(&self) -> Result<NodeId, MarkupError> {
        self.find_by_tag("body").ok_or(MarkupError::MissingBody)
    }

    pub fn find_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&id| self.node(id).tag == tag)
    }

    /// Depth-first listing of `start` and everything below it.
    pub fn descendants(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            out.push(id);
            for &child in self.nodes[id.0].children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// The script element carrying the declaration blob, if any.
    pub fn declaration_script(&self) -> Option<NodeId> {
        self.descendants(self.root).into_iter().find(|&id| {
            let node = self.node(id);
            node.tag == "script" && node.attribute("type") == Some(DECLARATION_SCRIPT_TYPE)
        })
    }

    // Mutation

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(MarkupNode {
            tag: tag.to_string(),
            attributes: IndexMap::new(),
            text: String::new(),
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Replace the tag of an element in place, keeping attributes and
    /// children.
    pub fn set_tag(&mut self, id: NodeId, tag: &str) {
        self.nodes[id.0].tag = tag.to_string();
    }

    /// Set or remove an attribute; `None` removes.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: Option<&str>) {
        match value {
            Some(value) => {
                self.nodes[id.0]
                    .attributes
                    .insert(name.to_string(), value.to_string());
            }
            None => {
                self.nodes[id.0].attributes.shift_remove(name);
            }
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), MarkupError> {
        if self.nodes[child.0].parent.is_some() {
            return Err(MarkupError::AlreadyAttached);
        }
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
        Ok(())
    }

    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        next_sibling: NodeId,
    ) -> Result<(), MarkupError> {
        if self.nodes[child.0].parent.is_some() {
            return Err(MarkupError::AlreadyAttached);
        }
        let index = self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == next_sibling)
            .ok_or(MarkupError::NotAChild)?;
        self.nodes[parent.0].children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), MarkupError> {
        let index = self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or(MarkupError::NotAChild)?;
        self.nodes[parent.0].children.remove(index);
        self.nodes[child.0].parent = None;
        Ok(())
    }

    /// Index of `child` among `parent`'s children.
    pub fn child_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.nodes[parent.0].children.iter().position(|&c| c == child)
    }

    /// Opening-tag excerpt for inspection UIs.
    pub fn snippet(&self, id: NodeId) -> String {
        let node = self.node(id);
        let mut out = format!("<{}", node.tag);
        for (name, value) in node.attributes() {
            out.push_str(&format!(" {}=\"{}\"", name, value));
        }
        out.push('>');
        out
    }
}
