//! # Template Document
//!
//! Owns the whole editable graph of one template: the markup shadow tree,
//! the label → proxy map, the persistent expand/collapse side table and the
//! recoverable load errors.
//!
//! ## Lifecycle
//!
//! ```text
//! Load → Revive → Edit → Rebuild tree → Save
//!   ↓       ↓       ↓         ↓           ↓
//! Fetch  Proxies  Graph    Display    Spliced blob
//! ```
//!
//! Loading fetches the markup and the companion source concurrently and
//! joins both before opening the template. A failed fetch or a malformed
//! declaration blob is recorded in [`TemplateDocument::errors`] instead of
//! failing the load, so the user can open the document and repair it.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};
use vellum_common::CommonResult;
use vellum_markup::{splice_declaration, MarkupTree};

use crate::data_source::DataSource;
use crate::errors::ModelError;
use crate::export_id::ExportIdCache;
use crate::node_proxy::{ProxyId, ShadowTree};
use crate::reviver::Reviver;
use crate::serializer::Serializer;
use crate::template_object::TemplateObject;
use crate::tree::{build_template_object_tree, TreeNode};
use crate::value::Value;

/// One recoverable load-time problem, serializable for inspection UIs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadProblem {
    /// URL of the offending source.
    pub file: String,
    /// Stable problem id (`syntaxError`, `serializationError`, `treeError`).
    pub id: String,
    pub reason: String,
}

#[derive(Debug)]
pub struct TemplateDocument<D: DataSource> {
    url: String,
    data_source: D,
    module_id: String,
    export_name: String,
    export_ids: ExportIdCache,

    source: Option<String>,
    companion_source: Option<String>,
    shadow: Option<ShadowTree>,
    proxies: IndexMap<String, TemplateObject>,
    tree: Option<TreeNode>,
    toggle_states: HashMap<String, bool>,
    errors: Vec<LoadProblem>,
}

impl<D: DataSource> TemplateDocument<D> {
    /// `url` addresses the component's `.vlm` directory inside the package
    /// rooted at `package_location`.
    pub fn new(url: impl Into<String>, data_source: D, package_location: &str) -> Self {
        let url = url.into();
        let module_id = url
            .strip_prefix(package_location)
            .unwrap_or(&url)
            .trim_start_matches('/')
            .to_string();

        let mut export_ids = ExportIdCache::new();
        let export_name = export_ids.export_name(&module_id);

        Self {
            url,
            data_source,
            module_id,
            export_name,
            export_ids,
            source: None,
            companion_source: None,
            shadow: None,
            proxies: IndexMap::new(),
            tree: None,
            toggle_states: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// Last segment of the document URL.
    pub fn title(&self) -> &str {
        self.url.trim_end_matches('/').rsplit('/').next().unwrap_or(&self.url)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    pub fn export_name(&self) -> &str {
        &self.export_name
    }

    fn file_stem(&self) -> &str {
        let title = self.title();
        title.strip_suffix(".vlm").unwrap_or(title)
    }

    fn markup_url(&self) -> String {
        format!("{}/{}.html", self.url.trim_end_matches('/'), self.file_stem())
    }

    fn companion_url(&self) -> String {
        format!("{}/{}.js", self.url.trim_end_matches('/'), self.file_stem())
    }

    // Loading

    /// Fetch both sources, then open the template. Always leaves the
    /// document usable; problems land in [`errors`](Self::errors).
    pub async fn load(&mut self) {
        let markup_url = self.markup_url();
        let companion_url = self.companion_url();

        let (markup, companion) = tokio::join!(
            self.data_source.read(&markup_url),
            self.data_source.read(&companion_url),
        );

        self.errors.clear();
        self.tree = None;

        match companion {
            Ok(text) => self.companion_source = Some(text),
            Err(error) => self.push_problem(&companion_url, "syntaxError", &error.to_string()),
        }

        match markup {
            Ok(text) => {
                self.open_template(&text);
                self.source = Some(text);
            }
            Err(error) => self.push_problem(&markup_url, "syntaxError", &error.to_string()),
        }

        if !self.errors.is_empty() {
            tracing::error!(url = %self.url, problems = self.errors.len(), "errors loading document");
        }
    }

    fn open_template(&mut self, text: &str) {
        let markup_url = self.markup_url();

        let markup = match MarkupTree::parse(text) {
            Ok(markup) => markup,
            Err(error) => {
                self.push_problem(&markup_url, "syntaxError", &error.to_string());
                return;
            }
        };

        let declaration = markup
            .declaration_script()
            .map(|script| markup.node(script).text().trim().to_string());

        let shadow = match ShadowTree::new(markup) {
            Ok(shadow) => shadow,
            Err(error) => {
                self.push_problem(&markup_url, "syntaxError", &error.to_string());
                return;
            }
        };
        self.shadow = Some(shadow);
        self.proxies = IndexMap::new();

        if let Some(declaration) = declaration.filter(|d| !d.is_empty()) {
            match serde_json::from_str::<JsonValue>(&declaration) {
                Ok(blob) => {
                    let shadow = self.shadow.as_ref().unwrap();
                    match Reviver::new(shadow, &self.module_id).revive(&blob) {
                        Ok(proxies) => self.proxies = proxies,
                        Err(error) => {
                            self.push_problem(
                                &markup_url,
                                "serializationError",
                                &error.to_string(),
                            );
                        }
                    }
                }
                Err(error) => {
                    self.push_problem(&markup_url, "serializationError", &error.to_string());
                }
            }
        }

        self.rebuild_component_references();
        if let Err(error) = self.build_template_objects_tree() {
            // A topology error should not keep the document from opening.
            if !matches!(error, ModelError::ProxyNotFound(_)) {
                self.push_problem(&markup_url, "treeError", &error.to_string());
            }
        }
    }

    fn push_problem(&mut self, file: &str, id: &str, reason: &str) {
        self.errors.push(LoadProblem {
            file: file.to_string(),
            id: id.to_string(),
            reason: reason.to_string(),
        });
    }

    pub fn errors(&self) -> &[LoadProblem] {
        &self.errors
    }

    // Graph access

    pub fn editing_proxy_map(&self) -> &IndexMap<String, TemplateObject> {
        &self.proxies
    }

    pub fn get_object(&self, label: &str) -> Option<&TemplateObject> {
        self.proxies.get(label)
    }

    pub fn get_object_mut(&mut self, label: &str) -> Option<&mut TemplateObject> {
        self.proxies.get_mut(label)
    }

    pub fn shadow(&self) -> Option<&ShadowTree> {
        self.shadow.as_ref()
    }

    pub fn shadow_mut(&mut self) -> Option<&mut ShadowTree> {
        self.shadow.as_mut()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn companion_source(&self) -> Option<&str> {
        self.companion_source.as_deref()
    }

    pub fn node_proxy_for_element_id(&self, element_id: &str) -> Option<ProxyId> {
        self.shadow.as_ref()?.find_by_element_id(element_id)
    }

    /// Module id of the proxy's backing type, through the document's cache.
    pub fn object_module_id(&mut self, label: &str) -> Option<String> {
        let export_id = self.proxies.get(label)?.export_id()?.to_string();
        Some(self.export_ids.module_id(&export_id))
    }

    pub fn object_export_name(&mut self, label: &str) -> Option<String> {
        let export_id = self.proxies.get(label)?.export_id()?.to_string();
        Some(self.export_ids.export_name(&export_id))
    }

    // Editing model

    /// Declare a new component. Replaces any proxy already under `label`.
    pub fn add_object(
        &mut self,
        label: impl Into<String>,
        export_id: impl Into<String>,
    ) -> &TemplateObject {
        let label = label.into();
        let proxy = TemplateObject::with_export_id(label.clone(), export_id);
        self.proxies.insert(label.clone(), proxy);
        &self.proxies[&label]
    }

    /// Remove and return the proxy under `label`; removing an unknown label
    /// is an error.
    pub fn remove_object(&mut self, label: &str) -> Result<TemplateObject, ModelError> {
        let proxy = self
            .proxies
            .shift_remove(label)
            .ok_or_else(|| ModelError::ProxyNotFound(label.to_string()))?;

        if let (Some(shadow), Some(element)) = (
            self.shadow.as_mut(),
            proxy.get_property("element").and_then(Value::as_element),
        ) {
            shadow.set_component(element, None);
        }
        Ok(proxy)
    }

    /// Rename a proxy, move-not-copy. Returns false when the new label is
    /// empty or already taken.
    pub fn set_object_label(&mut self, old_label: &str, new_label: &str) -> bool {
        if new_label.is_empty() || self.proxies.contains_key(new_label) {
            return false;
        }
        let Some(mut proxy) = self.proxies.shift_remove(old_label) else {
            return false;
        };

        proxy.set_label(new_label);
        self.proxies.insert(new_label.to_string(), proxy);
        self.rebuild_component_references();
        true
    }

    pub fn set_object_property(&mut self, label: &str, key: &str, value: Value) {
        if let Some(proxy) = self.proxies.get_mut(label) {
            proxy.set_property(key, value);
            if key == "element" {
                self.rebuild_component_references();
            }
        }
    }

    pub fn get_object_property(&self, label: &str, key: &str) -> Option<&Value> {
        self.proxies.get(label)?.get_property(key)
    }

    pub fn delete_object_property(&mut self, label: &str, key: &str) {
        if let Some(proxy) = self.proxies.get_mut(label) {
            proxy.delete_property(key);
            if key == "element" {
                self.rebuild_component_references();
            }
        }
    }

    /// Point every declared `element` node back at its component. Cheap
    /// enough to redo wholesale whenever the linkage may have changed.
    fn rebuild_component_references(&mut self) {
        let Some(shadow) = self.shadow.as_mut() else {
            return;
        };

        for node in shadow.template_nodes() {
            shadow.set_component(node, None);
        }
        for (label, proxy) in &self.proxies {
            if let Some(element) = proxy.get_property("element").and_then(Value::as_element) {
                shadow.set_component(element, Some(label.clone()));
            }
        }
    }

    // Template-objects tree

    /// Rebuild the display tree from the proxy map and the shadow tree.
    pub fn build_template_objects_tree(&mut self) -> Result<&TreeNode, ModelError> {
        let shadow = self.shadow.as_ref().ok_or(ModelError::NoMarkup)?;
        let tree = build_template_object_tree(&self.proxies, shadow, &mut self.toggle_states)?;
        self.tree = Some(tree);
        Ok(self.tree.as_ref().unwrap())
    }

    pub fn template_objects_tree(&self) -> Option<&TreeNode> {
        self.tree.as_ref()
    }

    /// Record a UI expand/collapse choice so it survives rebuilds.
    pub fn set_tree_toggle_state(&mut self, label: &str, expanded: bool) {
        self.toggle_states.insert(label.to_string(), expanded);
    }

    // Serialization

    /// The canonical unit map for one proxy, sorted.
    pub fn serialization_for_proxy(
        &self,
        label: &str,
    ) -> Result<JsonMap<String, JsonValue>, ModelError> {
        let shadow = self.shadow.as_ref().ok_or(ModelError::NoMarkup)?;
        let proxy = self
            .proxies
            .get(label)
            .ok_or_else(|| ModelError::ProxyNotFound(label.to_string()))?;
        Ok(Serializer::new(shadow).serialize_proxy(proxy))
    }

    /// The whole graph as a declaration blob.
    pub fn serialize_declarations(&self) -> Result<JsonValue, ModelError> {
        let shadow = self.shadow.as_ref().ok_or(ModelError::NoMarkup)?;
        Ok(Serializer::new(shadow).serialize_graph(&self.proxies))
    }

    /// Re-serialize the declaration blob, splice it into the markup source
    /// and write both files back through the data source.
    pub async fn save(&mut self) -> CommonResult<()> {
        let blob = self.serialize_declarations()?;
        let source = self.source.as_deref().ok_or(ModelError::NoMarkup)?;

        let declaration = serde_json::to_string_pretty(&blob)
            .map_err(|e| vellum_common::CommonError::Generic(e.to_string()))?;
        let updated = splice_declaration(source, &declaration)?;

        self.data_source.write(&self.markup_url(), &updated).await?;
        self.source = Some(updated);

        if let Some(companion) = self.companion_source.as_deref() {
            self.data_source.write(&self.companion_url(), companion).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::MemoryDataSource;
    use serde_json::json;

    const PACKAGE: &str = "memory://app";

    fn markup(blob: &str) -> String {
        format!(
            concat!(
                "<html><head>",
                "<script type=\"text/declaration\">{}</script>",
                "</head><body data-element-id=\"body\">",
                "<div data-element-id=\"id1\"/>",
                "</body></html>",
            ),
            blob
        )
    }

    async fn load(blob: &str) -> TemplateDocument<MemoryDataSource> {
        let source = MemoryDataSource::new()
            .with_file("memory://app/ui/main.vlm/main.html", &markup(blob))
            .with_file("memory://app/ui/main.vlm/main.js", "// component code\n");

        let mut doc = TemplateDocument::new("memory://app/ui/main.vlm", source, PACKAGE);
        doc.load().await;
        doc
    }

    #[tokio::test]
    async fn derives_module_id_and_export_name() {
        let doc = load("{\"owner\": {}}").await;
        assert_eq!(doc.module_id(), "ui/main.vlm");
        assert_eq!(doc.export_name(), "Main");
        assert_eq!(doc.title(), "main.vlm");
    }

    #[tokio::test]
    async fn load_revives_proxies_and_builds_the_tree() {
        let blob = json!({
            "owner": {"properties": {"element": {"#": "body"}}},
            "label1": {"prototype": "ui/foo", "properties": {"element": {"#": "id1"}}}
        });
        let doc = load(&blob.to_string()).await;

        assert!(doc.errors().is_empty());
        assert_eq!(doc.editing_proxy_map().len(), 2);

        let tree = doc.template_objects_tree().unwrap();
        assert_eq!(tree.label, "owner");
        assert_eq!(tree.children[0].label, "label1");
    }

    #[tokio::test]
    async fn missing_companion_source_is_recoverable() {
        let source = MemoryDataSource::new()
            .with_file("memory://app/ui/main.vlm/main.html", &markup("{\"owner\": {}}"));

        let mut doc = TemplateDocument::new("memory://app/ui/main.vlm", source, PACKAGE);
        doc.load().await;

        assert_eq!(doc.errors().len(), 1);
        assert_eq!(doc.errors()[0].id, "syntaxError");
        // The markup side still loaded.
        assert!(doc.get_object("owner").is_some());

        // Problems are reportable as plain data.
        let reported = serde_json::to_value(&doc.errors()[0]).unwrap();
        assert_eq!(reported["id"], json!("syntaxError"));
        assert_eq!(reported["file"], json!("memory://app/ui/main.vlm/main.js"));
    }

    #[tokio::test]
    async fn malformed_blob_is_recoverable() {
        let doc = load("{not json").await;
        assert_eq!(doc.errors().len(), 1);
        assert_eq!(doc.errors()[0].id, "serializationError");
        assert!(doc.editing_proxy_map().is_empty());
        assert!(doc.shadow().is_some());
    }

    #[tokio::test]
    async fn label_rename_is_move_not_copy() {
        let blob = json!({
            "owner": {},
            "label1": {"prototype": "ui/foo"}
        });
        let mut doc = load(&blob.to_string()).await;

        assert!(doc.set_object_label("label1", "renamed"));
        assert!(doc.get_object("label1").is_none());
        assert_eq!(doc.get_object("renamed").unwrap().label(), "renamed");

        // Taken and empty labels are rejected.
        assert!(!doc.set_object_label("renamed", "owner"));
        assert!(!doc.set_object_label("renamed", ""));
    }

    #[tokio::test]
    async fn removing_an_unknown_label_fails() {
        let mut doc = load("{\"owner\": {}}").await;
        let err = doc.remove_object("ghost").unwrap_err();
        assert!(matches!(err, ModelError::ProxyNotFound(_)));
    }

    #[tokio::test]
    async fn add_and_remove_round_trip() {
        let mut doc = load("{\"owner\": {}}").await;
        doc.add_object("button", "ui/button.vlm");
        assert_eq!(doc.object_export_name("button").as_deref(), Some("Button"));

        let removed = doc.remove_object("button").unwrap();
        assert_eq!(removed.label(), "button");
        assert!(doc.get_object("button").is_none());
    }

    #[tokio::test]
    async fn save_splices_the_new_blob_into_the_markup() {
        let blob = json!({
            "owner": {"properties": {"element": {"#": "body"}}},
            "label1": {"prototype": "ui/foo", "properties": {"element": {"#": "id1"}}}
        });
        let mut doc = load(&blob.to_string()).await;

        doc.set_object_property("label1", "enabled", Value::Bool(true));
        doc.save().await.unwrap();

        let saved = doc.source().unwrap();
        assert!(saved.contains("\"enabled\": true"));

        // A reload of the saved text sees the edit.
        let mut reloaded = TemplateDocument::new(
            "memory://app/ui/main.vlm",
            MemoryDataSource::new()
                .with_file("memory://app/ui/main.vlm/main.html", saved)
                .with_file("memory://app/ui/main.vlm/main.js", ""),
            PACKAGE,
        );
        reloaded.load().await;
        assert_eq!(
            reloaded.get_object_property("label1", "enabled"),
            Some(&Value::Bool(true))
        );
    }
}
