//! Template-objects tree construction exercised through a loaded document,
//! where component back-references are wired from the declared `element`
//! properties rather than by hand.

use serde_json::json;
use vellum_model::{MemoryDataSource, TemplateDocument};

const PACKAGE: &str = "memory://app";

fn markup(blob: &str) -> String {
    format!(
        concat!(
            "<html><head>",
            "<script type=\"text/declaration\">{}</script>",
            "</head><body data-element-id=\"body\">",
            "<div data-element-id=\"panel\">",
            "<span data-element-id=\"first\"/>",
            "<span data-element-id=\"second\"/>",
            "</div>",
            "<div data-element-id=\"footer\"/>",
            "</body></html>",
        ),
        blob
    )
}

async fn load(blob: serde_json::Value) -> TemplateDocument<MemoryDataSource> {
    let source = MemoryDataSource::new()
        .with_file("memory://app/ui/main.vlm/main.html", &markup(&blob.to_string()))
        .with_file("memory://app/ui/main.vlm/main.js", "");

    let mut doc = TemplateDocument::new("memory://app/ui/main.vlm", source, PACKAGE);
    doc.load().await;
    doc
}

fn labels(children: &[vellum_model::TreeNode]) -> Vec<&str> {
    children.iter().map(|c| c.label.as_str()).collect()
}

#[tokio::test]
async fn owner_without_element_collects_declared_objects_at_the_root() {
    // The owner claims no markup, so label1's ancestor chain never reaches a
    // componentized node; it still appears, as the root's first child.
    let doc = load(json!({
        "owner": {"properties": {}},
        "label1": {"prototype": "ui/foo", "properties": {"element": {"#": "first"}}}
    }))
    .await;

    assert!(doc.errors().is_empty());
    let tree = doc.template_objects_tree().unwrap();
    assert_eq!(tree.label, "owner");
    assert_eq!(labels(&tree.children), ["label1"]);
}

#[tokio::test]
async fn nesting_follows_markup_containment() {
    let doc = load(json!({
        "owner": {"properties": {"element": {"#": "body"}}},
        "panel": {"prototype": "ui/panel", "properties": {"element": {"#": "panel"}}},
        "a": {"prototype": "ui/a", "properties": {"element": {"#": "first"}}},
        "b": {"prototype": "ui/b", "properties": {"element": {"#": "second"}}},
        "footer": {"prototype": "ui/footer", "properties": {"element": {"#": "footer"}}}
    }))
    .await;

    let tree = doc.template_objects_tree().unwrap();
    assert_eq!(labels(&tree.children), ["panel", "footer"]);
    assert_eq!(labels(&tree.children[0].children), ["a", "b"]);
}

#[tokio::test]
async fn declaration_order_does_not_affect_the_tree() {
    // Children declared before their markup parents are requeued until the
    // parent is placed.
    let doc = load(json!({
        "owner": {"properties": {"element": {"#": "body"}}},
        "b": {"prototype": "ui/b", "properties": {"element": {"#": "second"}}},
        "a": {"prototype": "ui/a", "properties": {"element": {"#": "first"}}},
        "panel": {"prototype": "ui/panel", "properties": {"element": {"#": "panel"}}}
    }))
    .await;

    let tree = doc.template_objects_tree().unwrap();
    assert_eq!(labels(&tree.children), ["panel"]);
    assert_eq!(labels(&tree.children[0].children), ["a", "b"]);
}

#[tokio::test]
async fn template_less_objects_precede_placed_children() {
    let doc = load(json!({
        "owner": {"properties": {"element": {"#": "body"}}},
        "panel": {"prototype": "ui/panel", "properties": {"element": {"#": "panel"}}},
        "controller": {"prototype": "core/range-controller"}
    }))
    .await;

    let tree = doc.template_objects_tree().unwrap();
    assert_eq!(labels(&tree.children), ["controller", "panel"]);
}

#[tokio::test]
async fn collapse_state_survives_edits_and_rebuilds() {
    let mut doc = load(json!({
        "owner": {"properties": {"element": {"#": "body"}}},
        "panel": {"prototype": "ui/panel", "properties": {"element": {"#": "panel"}}},
        "a": {"prototype": "ui/a", "properties": {"element": {"#": "first"}}}
    }))
    .await;

    doc.set_tree_toggle_state("panel", false);
    doc.add_object("extra", "core/controller");
    let tree = doc.build_template_objects_tree().unwrap();

    let panel = tree.children.iter().find(|c| c.label == "panel").unwrap();
    assert!(!panel.expanded);
    assert_eq!(labels(&panel.children), ["a"]);
}

#[tokio::test]
async fn retargeting_an_element_moves_the_subtree() {
    let mut doc = load(json!({
        "owner": {"properties": {"element": {"#": "body"}}},
        "panel": {"prototype": "ui/panel", "properties": {"element": {"#": "panel"}}},
        "a": {"prototype": "ui/a", "properties": {"element": {"#": "first"}}}
    }))
    .await;

    // Point "a" at the footer element; it leaves the panel and becomes the
    // owner's direct child.
    let footer = doc.node_proxy_for_element_id("footer").unwrap();
    doc.set_object_property("a", "element", vellum_model::Value::Element(footer));
    let tree = doc.build_template_objects_tree().unwrap().clone();

    assert_eq!(labels(&tree.children), ["panel", "a"]);
    assert!(tree.children[0].children.is_empty());
}
