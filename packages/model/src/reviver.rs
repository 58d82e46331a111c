//! Declaration-blob deserialization.
//!
//! Turns the raw label → unit-map blob into template-object proxies,
//! resolving `{"#": id}` references against the markup shadow tree and
//! keeping `{"@": label}` references symbolic (they resolve through the
//! document's proxy map on demand, so declaration order never matters).
//!
//! Element resolution is deliberately forgiving: a reference to a markup
//! node that does not exist yields an absent value instead of failing the
//! load, so the user can repair the markup afterwards. No post-revival hook
//! runs for this dialect.

use indexmap::IndexMap;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::declaration::Binding;
use crate::errors::ModelError;
use crate::node_proxy::ShadowTree;
use crate::template_object::{Listener, TemplateObject};
use crate::value::{Value, ELEMENT_REF_KEY, OBJECT_REF_KEY};

/// Reserved label of the document's owner object.
pub const ROOT_OBJECT_LABEL: &str = "owner";

/// Reserved label of the ambient application object.
pub const APPLICATION_LABEL: &str = "application";

/// Built-in type reference of the ambient application object.
pub const APPLICATION_EXPORT_ID: &str = "core/application";

/// Reserved unit holding editor-only metadata.
pub const EDITOR_UNIT: &str = "_dev";

pub struct Reviver<'a> {
    shadow: &'a ShadowTree,
    owner_export_id: &'a str,
}

impl<'a> Reviver<'a> {
    pub fn new(shadow: &'a ShadowTree, owner_export_id: &'a str) -> Self {
        Self {
            shadow,
            owner_export_id,
        }
    }

    /// Revive the whole blob into a label → proxy map, in blob order.
    pub fn revive(&self, blob: &JsonValue) -> Result<IndexMap<String, TemplateObject>, ModelError> {
        let blob = blob.as_object().ok_or(ModelError::MalformedBlob)?;

        let mut proxies = IndexMap::with_capacity(blob.len());
        for (label, units) in blob {
            let units = units.as_object().ok_or(ModelError::MalformedBlob)?;
            let proxy = self.revive_object(label, units)?;
            proxies.insert(label.clone(), proxy);
        }

        // The application object is accessible at runtime to every
        // component; a reference to it must produce a proxy even when the
        // blob never declares it.
        if !proxies.contains_key(APPLICATION_LABEL)
            && proxies.values().any(|p| references_label(p, APPLICATION_LABEL))
        {
            let application = TemplateObject::new(
                APPLICATION_LABEL,
                JsonMap::new(),
                Some(APPLICATION_EXPORT_ID.to_string()),
                true,
                IndexMap::new(),
                Vec::new(),
                Vec::new(),
                IndexMap::new(),
            )?;
            proxies.insert(APPLICATION_LABEL.to_string(), application);
        }

        Ok(proxies)
    }

    fn revive_object(
        &self,
        label: &str,
        units: &JsonMap<String, JsonValue>,
    ) -> Result<TemplateObject, ModelError> {
        // The owner and application labels belong to the live component the
        // template is for; their type is supplied, not parsed.
        let (export_id, is_user_object) = if label == ROOT_OBJECT_LABEL {
            (Some(self.owner_export_id.to_string()), true)
        } else if label == APPLICATION_LABEL {
            (Some(APPLICATION_EXPORT_ID.to_string()), true)
        } else {
            (None, false)
        };

        let properties = self.revive_property_map(label, units.get("properties"));
        let bindings = self.revive_bindings(label, units.get("bindings"));
        let listeners = self.revive_listeners(label, units.get("listeners"));
        let editor_metadata = self.revive_property_map(label, units.get(EDITOR_UNIT));

        TemplateObject::new(
            label,
            units.clone(),
            export_id,
            is_user_object,
            properties,
            bindings,
            listeners,
            editor_metadata,
        )
    }

    fn revive_property_map(
        &self,
        label: &str,
        unit: Option<&JsonValue>,
    ) -> IndexMap<String, Value> {
        let Some(map) = unit.and_then(JsonValue::as_object) else {
            return IndexMap::new();
        };

        let mut out = IndexMap::with_capacity(map.len());
        for (key, raw) in map {
            match self.revive_value(raw) {
                Some(value) => {
                    out.insert(key.clone(), value);
                }
                None => {
                    tracing::warn!(label, key, "dropping unresolvable element reference");
                }
            }
        }
        out
    }

    /// Decode one wire value. `None` means an element reference that did not
    /// resolve; the caller drops the entry.
    fn revive_value(&self, raw: &JsonValue) -> Option<Value> {
        match raw {
            JsonValue::Null => Some(Value::Null),
            JsonValue::Bool(b) => Some(Value::Bool(*b)),
            JsonValue::Number(n) => Some(Value::Number(n.clone())),
            JsonValue::String(s) => Some(Value::String(s.clone())),
            JsonValue::Array(items) => Some(Value::Array(
                items.iter().filter_map(|v| self.revive_value(v)).collect(),
            )),
            JsonValue::Object(map) => {
                if map.len() == 1 {
                    if let Some(label) = map.get(OBJECT_REF_KEY).and_then(JsonValue::as_str) {
                        return Some(Value::ObjectRef(label.to_string()));
                    }
                    if let Some(id) = map.get(ELEMENT_REF_KEY).and_then(JsonValue::as_str) {
                        return self.shadow.find_by_element_id(id).map(Value::Element);
                    }
                }

                let mut out = IndexMap::with_capacity(map.len());
                for (key, value) in map {
                    if let Some(value) = self.revive_value(value) {
                        out.insert(key.clone(), value);
                    }
                }
                Some(Value::Map(out))
            }
        }
    }

    fn revive_bindings(&self, label: &str, unit: Option<&JsonValue>) -> Vec<Binding> {
        let Some(map) = unit.and_then(JsonValue::as_object) else {
            return Vec::new();
        };

        let mut out = Vec::with_capacity(map.len());
        for (key, entry) in map {
            let Some(entry) = entry.as_object() else {
                tracing::warn!(label, key, "skipping malformed binding entry");
                continue;
            };

            let (oneway, source_path) = if let Some(path) = entry.get("<-") {
                (true, path)
            } else if let Some(path) = entry.get("<->") {
                (false, path)
            } else {
                tracing::warn!(label, key, "skipping binding without a source path");
                continue;
            };
            let Some(source_path) = source_path.as_str() else {
                tracing::warn!(label, key, "skipping binding with non-string source path");
                continue;
            };

            let converter = entry
                .get("converter")
                .and_then(JsonValue::as_object)
                .and_then(|c| c.get(OBJECT_REF_KEY))
                .and_then(JsonValue::as_str)
                .map(str::to_string);

            out.push(Binding {
                key: key.clone(),
                oneway,
                source_path: source_path.to_string(),
                converter,
                trace: entry.get("trace").and_then(JsonValue::as_bool).unwrap_or(false),
            });
        }
        out
    }

    fn revive_listeners(&self, label: &str, unit: Option<&JsonValue>) -> Vec<Listener> {
        let Some(entries) = unit.and_then(JsonValue::as_array) else {
            return Vec::new();
        };

        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            let listener = entry
                .get("listener")
                .and_then(JsonValue::as_object)
                .and_then(|l| l.get(OBJECT_REF_KEY))
                .and_then(JsonValue::as_str);
            let event_type = entry.get("type").and_then(JsonValue::as_str);

            let (Some(listener), Some(event_type)) = (listener, event_type) else {
                tracing::warn!(label, "skipping malformed listener entry");
                continue;
            };

            out.push(Listener {
                event_type: event_type.to_string(),
                listener: listener.to_string(),
                use_capture: entry
                    .get("useCapture")
                    .and_then(JsonValue::as_bool)
                    .unwrap_or(false),
            });
        }
        out
    }
}

/// Whether any value, binding converter, or listener on `proxy` references
/// the proxy labeled `label`.
fn references_label(proxy: &TemplateObject, label: &str) -> bool {
    proxy.properties().values().any(|v| value_references(v, label))
        || proxy
            .bindings()
            .iter()
            .any(|b| b.converter.as_deref() == Some(label))
        || proxy.listeners().iter().any(|l| l.listener == label)
}

fn value_references(value: &Value, label: &str) -> bool {
    match value {
        Value::ObjectRef(target) => target == label,
        Value::Array(items) => items.iter().any(|v| value_references(v, label)),
        Value::Map(map) => map.values().any(|v| value_references(v, label)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vellum_markup::MarkupTree;

    const SOURCE: &str = r#"<html>
        <head><script type="text/declaration">{}</script></head>
        <body>
            <div data-element-id="id1"><span data-element-id="id2"/></div>
        </body>
    </html>"#;

    fn shadow() -> ShadowTree {
        ShadowTree::new(MarkupTree::parse(SOURCE).unwrap()).unwrap()
    }

    #[test]
    fn revives_owner_as_user_object_with_supplied_export_id() {
        let shadow = shadow();
        let reviver = Reviver::new(&shadow, "app/main.vlm");
        let proxies = reviver
            .revive(&json!({"owner": {"properties": {}}}))
            .unwrap();

        let owner = &proxies["owner"];
        assert!(owner.is_user_object());
        assert_eq!(owner.export_id(), Some("app/main.vlm"));
    }

    #[test]
    fn resolves_element_references_through_the_shadow_tree() {
        let shadow = shadow();
        let reviver = Reviver::new(&shadow, "app/main.vlm");
        let proxies = reviver
            .revive(&json!({
                "owner": {"properties": {"element": {"#": "id1"}}},
                "label1": {
                    "prototype": "ui/foo",
                    "properties": {"element": {"#": "id2"}}
                }
            }))
            .unwrap();

        let expected = shadow.find_by_element_id("id2").unwrap();
        assert_eq!(
            proxies["label1"].get_property("element"),
            Some(&Value::Element(expected))
        );
    }

    #[test]
    fn unresolvable_element_reference_yields_absence() {
        let shadow = shadow();
        let reviver = Reviver::new(&shadow, "app/main.vlm");
        let proxies = reviver
            .revive(&json!({
                "owner": {},
                "label1": {
                    "prototype": "ui/foo",
                    "properties": {"element": {"#": "missing"}, "kept": 1}
                }
            }))
            .unwrap();

        assert_eq!(proxies["label1"].get_property("element"), None);
        assert_eq!(proxies["label1"].get_property("kept"), Some(&Value::from(1)));
    }

    #[test]
    fn object_references_stay_symbolic() {
        let shadow = shadow();
        let reviver = Reviver::new(&shadow, "app/main.vlm");
        let proxies = reviver
            .revive(&json!({
                "owner": {},
                "label1": {
                    "prototype": "ui/foo",
                    "properties": {"delegate": {"@": "owner"}}
                }
            }))
            .unwrap();

        assert_eq!(
            proxies["label1"].get_property("delegate"),
            Some(&Value::ObjectRef("owner".to_string()))
        );
    }

    #[test]
    fn decodes_binding_arrows_and_companions() {
        let shadow = shadow();
        let reviver = Reviver::new(&shadow, "app/main.vlm");
        let proxies = reviver
            .revive(&json!({
                "owner": {},
                "label1": {
                    "prototype": "ui/foo",
                    "bindings": {
                        "value": {"<-": "@owner.value", "converter": {"@": "conv"}, "trace": true},
                        "label": {"<->": "@owner.label"}
                    }
                },
                "conv": {"prototype": "core/converter"}
            }))
            .unwrap();

        let bindings = proxies["label1"].bindings();
        assert_eq!(bindings.len(), 2);

        let value = proxies["label1"].get_binding("value").unwrap();
        assert!(value.oneway);
        assert_eq!(value.source_path, "@owner.value");
        assert_eq!(value.converter.as_deref(), Some("conv"));
        assert!(value.trace);

        let label = proxies["label1"].get_binding("label").unwrap();
        assert!(!label.oneway);
        assert!(!label.trace);
    }

    #[test]
    fn decodes_listeners() {
        let shadow = shadow();
        let reviver = Reviver::new(&shadow, "app/main.vlm");
        let proxies = reviver
            .revive(&json!({
                "owner": {},
                "label1": {
                    "prototype": "ui/foo",
                    "listeners": [
                        {"type": "action", "listener": {"@": "owner"}, "useCapture": true},
                        {"type": "press", "listener": {"@": "owner"}}
                    ]
                }
            }))
            .unwrap();

        let listeners = proxies["label1"].listeners();
        assert_eq!(listeners.len(), 2);
        assert!(listeners[0].use_capture);
        assert!(!listeners[1].use_capture);
        assert_eq!(listeners[1].event_type, "press");
    }

    #[test]
    fn materializes_referenced_application_object() {
        let shadow = shadow();
        let reviver = Reviver::new(&shadow, "app/main.vlm");
        let proxies = reviver
            .revive(&json!({
                "owner": {},
                "label1": {
                    "prototype": "ui/foo",
                    "properties": {"app": {"@": "application"}}
                }
            }))
            .unwrap();

        let application = &proxies["application"];
        assert!(application.is_user_object());
        assert_eq!(application.export_id(), Some(APPLICATION_EXPORT_ID));
    }

    #[test]
    fn missing_type_reference_fails_revival() {
        let shadow = shadow();
        let reviver = Reviver::new(&shadow, "app/main.vlm");
        let err = reviver
            .revive(&json!({"owner": {}, "label1": {"properties": {}}}))
            .unwrap_err();
        assert!(matches!(err, ModelError::NoTypeReference(_)));
    }

    #[test]
    fn editor_metadata_is_kept_out_of_properties() {
        let shadow = shadow();
        let reviver = Reviver::new(&shadow, "app/main.vlm");
        let proxies = reviver
            .revive(&json!({
                "owner": {},
                "label1": {
                    "prototype": "ui/foo",
                    "_dev": {"comment": "a note"}
                }
            }))
            .unwrap();

        let proxy = &proxies["label1"];
        assert_eq!(
            proxy.get_editor_metadata("comment"),
            Some(&Value::from("a note"))
        );
        assert_eq!(proxy.get_property("comment"), None);
    }
}
