//! Declaration-blob serialization.
//!
//! Walks template-object proxies back into the canonical blob. References
//! are re-encoded as `{"@": label}` / `{"#": id}`, user objects never emit a
//! type unit, the `_dev` unit is emitted only when the proxy carries
//! metadata, and any unit found in the original serialization that the
//! editor does not understand is passed through verbatim.

use indexmap::IndexMap;
use serde_json::{json, Map as JsonMap, Value as JsonValue};

use crate::declaration::Binding;
use crate::node_proxy::ShadowTree;
use crate::reviver::EDITOR_UNIT;
use crate::template_object::{Listener, TemplateObject, TypeUnit};
use crate::value::{Value, ELEMENT_REF_KEY, OBJECT_REF_KEY};

/// Units the serializer itself writes; everything else in the original unit
/// map is preserved verbatim.
const OWNED_UNITS: &[&str] = &[
    "object",
    "prototype",
    "properties",
    "bindings",
    "listeners",
    EDITOR_UNIT,
];

/// Canonical unit order for emitted maps.
const UNIT_ORDER: &[&str] = &["prototype", "object", "properties", "bindings", "listeners"];

pub struct Serializer<'a> {
    shadow: &'a ShadowTree,
}

impl<'a> Serializer<'a> {
    pub fn new(shadow: &'a ShadowTree) -> Self {
        Self { shadow }
    }

    /// Emit the whole graph as a label → unit-map blob, in map order.
    pub fn serialize_graph(&self, proxies: &IndexMap<String, TemplateObject>) -> JsonValue {
        let mut blob = JsonMap::with_capacity(proxies.len());
        for (label, proxy) in proxies {
            blob.insert(label.clone(), JsonValue::Object(self.serialize_proxy(proxy)));
        }
        JsonValue::Object(blob)
    }

    /// Emit one proxy's unit map, canonically sorted.
    pub fn serialize_proxy(&self, proxy: &TemplateObject) -> JsonMap<String, JsonValue> {
        let mut units = JsonMap::new();

        // User objects have an implicit type; re-emitting one would pin the
        // template to a concrete module.
        if !proxy.is_user_object() {
            if let Some(export_id) = proxy.export_id() {
                let key = match proxy.type_unit() {
                    TypeUnit::Prototype => "prototype",
                    TypeUnit::Object => "object",
                };
                units.insert(key.to_string(), json!(export_id));
            }
        }

        if !proxy.properties().is_empty() || proxy.original_units().contains_key("properties") {
            let mut properties = JsonMap::with_capacity(proxy.properties().len());
            for (key, value) in proxy.properties() {
                if let Some(encoded) = self.encode_value(value) {
                    properties.insert(key.clone(), encoded);
                } else {
                    tracing::warn!(
                        label = proxy.label(),
                        key,
                        "dropping element reference with no identity attribute"
                    );
                }
            }
            units.insert("properties".to_string(), JsonValue::Object(properties));
        }

        if !proxy.bindings().is_empty() {
            units.insert(
                "bindings".to_string(),
                serialize_bindings(proxy.bindings()),
            );
        }

        if !proxy.listeners().is_empty() {
            units.insert(
                "listeners".to_string(),
                serialize_listeners(proxy.listeners()),
            );
        }

        if !proxy.editor_metadata().is_empty() {
            let mut metadata = JsonMap::with_capacity(proxy.editor_metadata().len());
            for (key, value) in proxy.editor_metadata() {
                if let Some(encoded) = self.encode_value(value) {
                    metadata.insert(key.clone(), encoded);
                }
            }
            units.insert(EDITOR_UNIT.to_string(), JsonValue::Object(metadata));
        }

        // Preserve units we have no understanding of.
        for (key, value) in proxy.original_units() {
            if !OWNED_UNITS.contains(&key.as_str()) {
                units.insert(key.clone(), value.clone());
            }
        }

        sort_units(units)
    }

    /// Encode a revived value back to its wire form. `None` means an element
    /// reference that cannot be addressed (its node carries no identity
    /// attribute).
    fn encode_value(&self, value: &Value) -> Option<JsonValue> {
        match value {
            Value::Null => Some(JsonValue::Null),
            Value::Bool(b) => Some(JsonValue::Bool(*b)),
            Value::Number(n) => Some(JsonValue::Number(n.clone())),
            Value::String(s) => Some(JsonValue::String(s.clone())),
            Value::Array(items) => Some(JsonValue::Array(
                items.iter().filter_map(|v| self.encode_value(v)).collect(),
            )),
            Value::Map(map) => {
                let mut out = JsonMap::with_capacity(map.len());
                for (key, value) in map {
                    if let Some(encoded) = self.encode_value(value) {
                        out.insert(key.clone(), encoded);
                    }
                }
                Some(JsonValue::Object(out))
            }
            Value::ObjectRef(label) => Some(json!({ OBJECT_REF_KEY: label })),
            Value::Element(id) => self
                .shadow
                .element_id(*id)
                .map(|element_id| json!({ ELEMENT_REF_KEY: element_id })),
        }
    }
}

fn serialize_bindings(bindings: &[Binding]) -> JsonValue {
    let mut out = JsonMap::with_capacity(bindings.len());
    for binding in bindings {
        let mut entry = JsonMap::new();
        let arrow = if binding.oneway { "<-" } else { "<->" };
        entry.insert(arrow.to_string(), json!(binding.source_path));

        if let Some(converter) = &binding.converter {
            entry.insert("converter".to_string(), json!({ OBJECT_REF_KEY: converter }));
        }
        if binding.trace {
            entry.insert("trace".to_string(), json!(true));
        }

        out.insert(binding.key.clone(), JsonValue::Object(entry));
    }
    JsonValue::Object(out)
}

fn serialize_listeners(listeners: &[Listener]) -> JsonValue {
    JsonValue::Array(
        listeners
            .iter()
            .map(|listener| {
                json!({
                    "type": listener.event_type,
                    "useCapture": listener.use_capture,
                    "listener": { OBJECT_REF_KEY: listener.listener },
                })
            })
            .collect(),
    )
}

/// Canonical key order: type units first, then the well-known units, then
/// anything else alphabetically, with the editor unit last.
fn sort_units(units: JsonMap<String, JsonValue>) -> JsonMap<String, JsonValue> {
    let mut entries: Vec<(String, JsonValue)> = units.into_iter().collect();
    entries.sort_by(|(a, _), (b, _)| unit_rank(a).cmp(&unit_rank(b)).then_with(|| a.cmp(b)));
    entries.into_iter().collect()
}

fn unit_rank(key: &str) -> usize {
    if key == EDITOR_UNIT {
        return UNIT_ORDER.len() + 1;
    }
    UNIT_ORDER
        .iter()
        .position(|&k| k == key)
        .unwrap_or(UNIT_ORDER.len())
}
