//! Template-objects tree construction.
//!
//! Merges the flat label → proxy map and the markup shadow tree into one
//! display tree rooted at the owner, respecting markup containment order.
//! Proxies need not be declared in dependency order: a proxy whose markup
//! parent has not been placed yet goes back to the tail of the FIFO, and a
//! consecutive-requeue counter aborts the build when no progress is possible
//! (mutually unsatisfiable parent references).

use std::collections::{HashMap, VecDeque};

use indexmap::IndexMap;
use serde::Serialize;

use crate::errors::ModelError;
use crate::node_proxy::{ProxyId, ShadowTree};
use crate::reviver::ROOT_OBJECT_LABEL;
use crate::template_object::TemplateObject;
use crate::value::Value;

/// One node of the display tree, serializable for inspection UIs. Children
/// are in markup containment order; orphans and template-less objects sit at
/// the front of the root's children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    /// Label of the template object this node wraps.
    pub label: String,
    pub expanded: bool,
    pub children: Vec<TreeNode>,
}

/// Build the display tree.
///
/// `toggle_states` persists expand/collapse choices across rebuilds; a proxy
/// seen for the first time defaults to expanded.
pub fn build_template_object_tree(
    proxies: &IndexMap<String, TemplateObject>,
    shadow: &ShadowTree,
    toggle_states: &mut HashMap<String, bool>,
) -> Result<TreeNode, ModelError> {
    if !proxies.contains_key(ROOT_OBJECT_LABEL) {
        return Err(ModelError::ProxyNotFound(ROOT_OBJECT_LABEL.to_string()));
    }

    let mut slots: Vec<Slot> = vec![Slot::new(ROOT_OBJECT_LABEL, true)];
    let mut insertion_map: HashMap<&str, usize> = HashMap::new();
    insertion_map.insert(ROOT_OBJECT_LABEL, 0);

    let mut fifo: VecDeque<&str> = proxies
        .keys()
        .map(String::as_str)
        .filter(|&label| label != ROOT_OBJECT_LABEL)
        .collect();
    let mut successive_pushes = 0usize;

    while let Some(label) = fifo.pop_front() {
        let proxy = &proxies[label];

        match proxy.get_property("element").and_then(Value::as_element) {
            Some(element) => {
                match find_parent_component(shadow, element) {
                    None => {
                        // Orphan: its ancestor chain never reaches a
                        // componentized node.
                        let slot = slots.len();
                        slots.push(Slot::new(label, true));
                        slots[0].children.insert(0, slot);
                    }
                    Some(parent_label) => {
                        if let Some(&parent_slot) = insertion_map.get(parent_label) {
                            let position = find_child_position(
                                shadow,
                                element,
                                element_of(proxies, parent_label)?,
                            )?;
                            let expanded = *toggle_states.entry(label.to_string()).or_insert(true);

                            let slot = slots.len();
                            slots.push(Slot::new(label, expanded));
                            let siblings = &mut slots[parent_slot].children;
                            if position >= siblings.len() {
                                siblings.push(slot);
                            } else {
                                siblings.insert(position, slot);
                            }
                            insertion_map.insert(label, slot);
                            successive_pushes = 0;
                        } else {
                            // Parent not placed yet; try again later.
                            fifo.push_back(label);
                            successive_pushes += 1;
                        }
                    }
                }
            }
            None => {
                // Template-less: no markup representation, added at the top
                // of the root.
                let slot = slots.len();
                slots.push(Slot::new(label, true));
                slots[0].children.insert(0, slot);
            }
        }

        if successive_pushes > fifo.len() {
            tracing::error!(pending = fifo.len(), "template objects tree cannot make progress");
            return Err(ModelError::TreeCycle);
        }
    }

    Ok(materialize(&slots, 0))
}

struct Slot {
    label: String,
    expanded: bool,
    children: Vec<usize>,
}

impl Slot {
    fn new(label: &str, expanded: bool) -> Self {
        Self {
            label: label.to_string(),
            expanded,
            children: Vec::new(),
        }
    }
}

fn materialize(slots: &[Slot], index: usize) -> TreeNode {
    let slot = &slots[index];
    TreeNode {
        label: slot.label.clone(),
        expanded: slot.expanded,
        children: slot.children.iter().map(|&c| materialize(slots, c)).collect(),
    }
}

/// Walk up the markup parent chain until a node with a component
/// back-reference is found.
fn find_parent_component(shadow: &ShadowTree, element: ProxyId) -> Option<&str> {
    let mut current = element;
    while let Some(parent) = shadow.parent(current) {
        if let Some(component) = shadow.component(parent) {
            return Some(component);
        }
        current = parent;
    }
    None
}

fn element_of(proxies: &IndexMap<String, TemplateObject>, label: &str) -> Result<ProxyId, ModelError> {
    proxies
        .get(label)
        .and_then(|p| p.get_property("element"))
        .and_then(Value::as_element)
        .ok_or_else(|| ModelError::ProxyNotFound(label.to_string()))
}

/// Index of `element` among the parent element's children, walking up first
/// when the parent component's node is not the direct markup parent.
fn find_child_position(
    shadow: &ShadowTree,
    element: ProxyId,
    parent_element: ProxyId,
) -> Result<usize, ModelError> {
    let mut node = element;
    while let Some(parent) = shadow.parent(node) {
        if parent == parent_element {
            break;
        }
        node = parent;
    }

    shadow
        .children(parent_element)
        .iter()
        .position(|&c| c == node)
        .ok_or(ModelError::ChildPositionNotFound)
}
