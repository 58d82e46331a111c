//! Base declaration proxy.
//!
//! A [`Declaration`] is the editable stand-in for one labeled object of the
//! declaration blob: its properties, its data bindings, and a verbatim copy
//! of the raw unit map it was parsed from so that units the editor does not
//! understand survive an edit → save round trip.

use indexmap::IndexMap;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::value::Value;

/// One data-binding descriptor. At most one binding per `key` exists on a
/// given proxy.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub key: String,
    pub oneway: bool,
    pub source_path: String,
    /// Label of the converter proxy, if any.
    pub converter: Option<String>,
    pub trace: bool,
}

#[derive(Debug, Clone)]
pub struct Declaration {
    label: String,
    export_id: Option<String>,
    properties: IndexMap<String, Value>,
    bindings: Vec<Binding>,
    original_units: JsonMap<String, JsonValue>,
}

impl Declaration {
    /// Build a proxy from already-decoded units. `raw` is the unit map as it
    /// appeared in the blob, captured before any mutation.
    pub fn new(
        label: impl Into<String>,
        export_id: Option<String>,
        properties: IndexMap<String, Value>,
        bindings: Vec<Binding>,
        raw: JsonMap<String, JsonValue>,
    ) -> Self {
        Self {
            label: label.into(),
            export_id,
            properties,
            bindings,
            original_units: raw,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn export_id(&self) -> Option<&str> {
        self.export_id.as_deref()
    }

    /// The raw unit map this proxy was revived from.
    pub fn original_units(&self) -> &JsonMap<String, JsonValue> {
        &self.original_units
    }

    // Properties

    pub fn properties(&self) -> &IndexMap<String, Value> {
        &self.properties
    }

    pub fn get_property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: Value) {
        self.properties.insert(key.into(), value);
    }

    pub fn delete_property(&mut self, key: &str) -> Option<Value> {
        self.properties.shift_remove(key)
    }

    pub fn set_properties(&mut self, values: impl IntoIterator<Item = (String, Value)>) {
        for (key, value) in values {
            self.set_property(key, value);
        }
    }

    /// Bulk read. With `keys`, only the requested entries are returned
    /// (missing ones are skipped); without, every property is.
    pub fn get_properties(&self, keys: Option<&[&str]>) -> IndexMap<String, Value> {
        match keys {
            Some(keys) => keys
                .iter()
                .filter_map(|key| {
                    self.get_property(key)
                        .map(|value| (key.to_string(), value.clone()))
                })
                .collect(),
            None => self.properties.clone(),
        }
    }

    // Bindings

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Upsert a binding for `key`. An existing descriptor is mutated in
    /// place so its identity (position) is stable for observers.
    pub fn define_binding(
        &mut self,
        key: impl Into<String>,
        oneway: bool,
        source_path: impl Into<String>,
        converter: Option<String>,
    ) -> &Binding {
        let key = key.into();
        let source_path = source_path.into();

        if let Some(index) = self.bindings.iter().position(|b| b.key == key) {
            let binding = &mut self.bindings[index];
            binding.oneway = oneway;
            binding.source_path = source_path;
            binding.converter = converter;
            &self.bindings[index]
        } else {
            self.bindings.push(Binding {
                key,
                oneway,
                source_path,
                converter,
                trace: false,
            });
            self.bindings.last().unwrap()
        }
    }

    pub fn get_binding(&self, key: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.key == key)
    }

    /// Remove and return the binding for `key`. Unlike listener removal this
    /// is a no-op when the key is absent.
    pub fn cancel_binding(&mut self, key: &str) -> Option<Binding> {
        let index = self.bindings.iter().position(|b| b.key == key)?;
        Some(self.bindings.remove(index))
    }
}
