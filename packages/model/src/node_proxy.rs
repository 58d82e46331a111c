//! Markup-node shadow tree.
//!
//! Every element under the markup `<body>` gets a proxy entry. The shadow
//! tree owns the markup arena outright and every structural edit goes
//! through it, so proxy parent/child links and real-tree containment cannot
//! diverge. Proxies additionally carry the back-reference to the template
//! object that declares the node as its `element`.

use vellum_markup::{
    MarkupTree, NodeId, ARG_ATTRIBUTE, ELEMENT_ID_ATTRIBUTE, PARAM_ATTRIBUTE,
};

use crate::errors::ModelError;

/// Handle to a node proxy in a [`ShadowTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProxyId(usize);

#[derive(Debug, Clone)]
struct NodeProxy {
    node: NodeId,
    parent: Option<ProxyId>,
    children: Vec<ProxyId>,
    /// Label of the template object declaring this node as its element.
    component: Option<String>,
}

#[derive(Debug)]
pub struct ShadowTree {
    markup: MarkupTree,
    proxies: Vec<NodeProxy>,
    root: ProxyId,
}

impl ShadowTree {
    /// Mirror the editable region (the `<body>` element) of `markup`.
    pub fn new(markup: MarkupTree) -> Result<Self, ModelError> {
        let body = markup.body()?;
        let mut tree = Self {
            markup,
            proxies: Vec::new(),
            root: ProxyId(0),
        };
        tree.root = tree.mirror(body, None);
        Ok(tree)
    }

    fn mirror(&mut self, node: NodeId, parent: Option<ProxyId>) -> ProxyId {
        let id = ProxyId(self.proxies.len());
        self.proxies.push(NodeProxy {
            node,
            parent,
            children: Vec::new(),
            component: None,
        });

        let children: Vec<NodeId> = self.markup.node(node).children().to_vec();
        for child in children {
            let child_id = self.mirror(child, Some(id));
            self.proxies[id.0].children.push(child_id);
        }

        id
    }

    pub fn root(&self) -> ProxyId {
        self.root
    }

    /// Read-only view of the real tree.
    pub fn markup(&self) -> &MarkupTree {
        &self.markup
    }

    pub fn parent(&self, id: ProxyId) -> Option<ProxyId> {
        self.proxies[id.0].parent
    }

    pub fn children(&self, id: ProxyId) -> &[ProxyId] {
        &self.proxies[id.0].children
    }

    pub fn next_sibling(&self, id: ProxyId) -> Option<ProxyId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&c| c == id)?;
        siblings.get(index + 1).copied()
    }

    pub fn last_child(&self, id: ProxyId) -> Option<ProxyId> {
        self.children(id).last().copied()
    }

    pub fn tag(&self, id: ProxyId) -> &str {
        self.markup.node(self.proxies[id.0].node).tag()
    }

    /// Replace the element's tag in place; attributes and children are kept.
    pub fn set_tag(&mut self, id: ProxyId, tag: &str) {
        self.markup.set_tag(self.proxies[id.0].node, tag);
    }

    pub fn snippet(&self, id: ProxyId) -> String {
        self.markup.snippet(self.proxies[id.0].node)
    }

    pub fn component(&self, id: ProxyId) -> Option<&str> {
        self.proxies[id.0].component.as_deref()
    }

    pub fn set_component(&mut self, id: ProxyId, label: Option<String>) {
        self.proxies[id.0].component = label;
    }

    // Attributes

    pub fn get_attribute(&self, id: ProxyId, name: &str) -> Option<&str> {
        self.markup.node(self.proxies[id.0].node).attribute(name)
    }

    /// Set an attribute on the real node; an empty value removes it, and
    /// writing the current value is a no-op.
    pub fn set_attribute(&mut self, id: ProxyId, name: &str, value: Option<&str>) {
        let previous = self.get_attribute(id, name);
        if previous == value {
            return;
        }
        let value = value.filter(|v| !v.is_empty());
        self.markup.set_attribute(self.proxies[id.0].node, name, value);
    }

    pub fn element_id(&self, id: ProxyId) -> Option<&str> {
        self.get_attribute(id, ELEMENT_ID_ATTRIBUTE)
    }

    pub fn set_element_id(&mut self, id: ProxyId, value: Option<&str>) {
        self.set_attribute(id, ELEMENT_ID_ATTRIBUTE, value);
    }

    pub fn arg(&self, id: ProxyId) -> Option<&str> {
        self.get_attribute(id, ARG_ATTRIBUTE)
    }

    pub fn set_arg(&mut self, id: ProxyId, value: Option<&str>) {
        self.set_attribute(id, ARG_ATTRIBUTE, value);
    }

    pub fn param(&self, id: ProxyId) -> Option<&str> {
        self.get_attribute(id, PARAM_ATTRIBUTE)
    }

    pub fn set_param(&mut self, id: ProxyId, value: Option<&str>) {
        self.set_attribute(id, PARAM_ATTRIBUTE, value);
    }

    /// Fallible lookup for `{"#": id}` references; absence is for the caller
    /// to judge.
    pub fn find_by_element_id(&self, element_id: &str) -> Option<ProxyId> {
        self.template_nodes()
            .into_iter()
            .find(|&id| self.element_id(id) == Some(element_id))
    }

    /// Depth-first listing of the shadow tree, root first.
    pub fn template_nodes(&self) -> Vec<ProxyId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            out.push(id);
            for &child in self.proxies[id.0].children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    // Structural mutation. Shadow links and the real arena move together in
    // each operation.

    /// Create a detached element with a proxy.
    pub fn create_element(&mut self, tag: &str) -> ProxyId {
        let node = self.markup.create_element(tag);
        let id = ProxyId(self.proxies.len());
        self.proxies.push(NodeProxy {
            node,
            parent: None,
            children: Vec::new(),
            component: None,
        });
        id
    }

    pub fn append_child(&mut self, parent: ProxyId, child: ProxyId) -> Result<(), ModelError> {
        self.markup
            .append_child(self.proxies[parent.0].node, self.proxies[child.0].node)?;
        self.proxies[parent.0].children.push(child);
        self.proxies[child.0].parent = Some(parent);
        tracing::debug!(parent = parent.0, child = child.0, "appended markup node");
        Ok(())
    }

    /// Insert `child` before `next_sibling`; appends when `next_sibling` is
    /// `None`.
    pub fn insert_before(
        &mut self,
        parent: ProxyId,
        child: ProxyId,
        next_sibling: Option<ProxyId>,
    ) -> Result<(), ModelError> {
        let Some(next) = next_sibling else {
            return self.append_child(parent, child);
        };

        let index = self.proxies[parent.0]
            .children
            .iter()
            .position(|&c| c == next)
            .ok_or(vellum_markup::MarkupError::NotAChild)?;

        self.markup.insert_before(
            self.proxies[parent.0].node,
            self.proxies[child.0].node,
            self.proxies[next.0].node,
        )?;
        self.proxies[parent.0].children.insert(index, child);
        self.proxies[child.0].parent = Some(parent);
        Ok(())
    }

    pub fn remove_child(&mut self, parent: ProxyId, child: ProxyId) -> Result<(), ModelError> {
        self.markup
            .remove_child(self.proxies[parent.0].node, self.proxies[child.0].node)?;
        self.proxies[parent.0].children.retain(|&c| c != child);
        self.proxies[child.0].parent = None;
        tracing::debug!(parent = parent.0, child = child.0, "removed markup node");
        Ok(())
    }

    /// Index of `child`'s markup node among `parent`'s markup children.
    pub fn markup_child_index(&self, parent: ProxyId, child: ProxyId) -> Option<usize> {
        self.markup
            .child_index(self.proxies[parent.0].node, self.proxies[child.0].node)
    }

    #[cfg(test)]
    fn ordering_is_consistent(&self, id: ProxyId) -> bool {
        let markup_children: Vec<NodeId> = self.markup.node(self.proxies[id.0].node).children().to_vec();
        let shadow_children: Vec<NodeId> = self.proxies[id.0]
            .children
            .iter()
            .map(|&c| self.proxies[c.0].node)
            .collect();
        markup_children == shadow_children
            && self.proxies[id.0]
                .children
                .iter()
                .all(|&c| self.ordering_is_consistent(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"<html>
        <head><script type="text/declaration">{}</script></head>
        <body>
            <div data-element-id="outer">
                <span data-element-id="inner"></span>
                <span data-element-id="other"></span>
            </div>
        </body>
    </html>"#;

    fn shadow() -> ShadowTree {
        ShadowTree::new(MarkupTree::parse(SOURCE).unwrap()).unwrap()
    }

    #[test]
    fn mirrors_body_in_document_order() {
        let shadow = shadow();
        let root = shadow.root();
        assert_eq!(shadow.tag(root), "body");

        let outer = shadow.children(root)[0];
        assert_eq!(shadow.element_id(outer), Some("outer"));
        assert_eq!(shadow.children(outer).len(), 2);
        assert!(shadow.ordering_is_consistent(root));
    }

    #[test]
    fn finds_nodes_by_element_id() {
        let shadow = shadow();
        let inner = shadow.find_by_element_id("inner").unwrap();
        assert_eq!(shadow.tag(inner), "span");
        assert!(shadow.find_by_element_id("missing").is_none());
    }

    #[test]
    fn structural_edits_keep_both_trees_in_step() {
        let mut shadow = shadow();
        let outer = shadow.find_by_element_id("outer").unwrap();
        let inner = shadow.find_by_element_id("inner").unwrap();

        let fresh = shadow.create_element("p");
        shadow.insert_before(outer, fresh, Some(inner)).unwrap();
        assert_eq!(shadow.children(outer)[0], fresh);
        assert_eq!(shadow.markup_child_index(outer, fresh), Some(0));

        shadow.remove_child(outer, inner).unwrap();
        assert_eq!(shadow.parent(inner), None);
        assert!(shadow.ordering_is_consistent(shadow.root()));
    }

    #[test]
    fn sibling_navigation() {
        let shadow = shadow();
        let inner = shadow.find_by_element_id("inner").unwrap();
        let other = shadow.find_by_element_id("other").unwrap();
        let outer = shadow.find_by_element_id("outer").unwrap();

        assert_eq!(shadow.next_sibling(inner), Some(other));
        assert_eq!(shadow.next_sibling(other), None);
        assert_eq!(shadow.last_child(outer), Some(other));
    }

    #[test]
    fn empty_attribute_value_removes_the_attribute() {
        let mut shadow = shadow();
        let inner = shadow.find_by_element_id("inner").unwrap();

        shadow.set_arg(inner, Some("content"));
        assert_eq!(shadow.arg(inner), Some("content"));

        shadow.set_arg(inner, Some(""));
        assert_eq!(shadow.arg(inner), None);
    }

    #[test]
    fn component_backreference_round_trips() {
        let mut shadow = shadow();
        let inner = shadow.find_by_element_id("inner").unwrap();
        shadow.set_component(inner, Some("label1".to_string()));
        assert_eq!(shadow.component(inner), Some("label1"));
    }
}
