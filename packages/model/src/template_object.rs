//! Template-object proxy.
//!
//! Extends the base [`Declaration`] with event listeners, editor-only
//! metadata (kept under the reserved `_dev` unit) and the user-object rules
//! for the `owner` and `application` labels, whose type reference is
//! implicit and never serialized.

use std::ops::{Deref, DerefMut};

use indexmap::IndexMap;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::declaration::{Binding, Declaration};
use crate::errors::ModelError;
use crate::value::Value;

/// Which unit supplied the proxy's type reference; governs which unit is
/// re-emitted on save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeUnit {
    Prototype,
    Object,
}

/// One event-listener descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Listener {
    pub event_type: String,
    /// Label of the listening proxy.
    pub listener: String,
    pub use_capture: bool,
}

/// Result of a successful listener removal.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedListener {
    pub index: usize,
    pub removed: Listener,
}

#[derive(Debug, Clone)]
pub struct TemplateObject {
    base: Declaration,
    listeners: Vec<Listener>,
    editor_metadata: IndexMap<String, Value>,
    is_user_object: bool,
    type_unit: TypeUnit,
}

impl TemplateObject {
    /// Build a template object from decoded units, validating the type
    /// reference.
    ///
    /// `export_id` is the explicit type reference supplied by the owning
    /// document for user objects; everything else derives its type from the
    /// raw `prototype` or `object` unit.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        label: impl Into<String>,
        raw: JsonMap<String, JsonValue>,
        export_id: Option<String>,
        is_user_object: bool,
        properties: IndexMap<String, Value>,
        bindings: Vec<Binding>,
        listeners: Vec<Listener>,
        editor_metadata: IndexMap<String, Value>,
    ) -> Result<Self, ModelError> {
        let label = label.into();
        let raw_prototype = raw.get("prototype").and_then(JsonValue::as_str);
        let raw_object = raw.get("object").and_then(JsonValue::as_str);

        if !is_user_object
            && export_id.is_none()
            && raw_prototype.is_none()
            && raw_object.is_none()
        {
            return Err(ModelError::NoTypeReference(label));
        }

        if let (Some(explicit), Some(prototype)) = (export_id.as_deref(), raw_prototype) {
            if explicit != prototype {
                return Err(ModelError::ConflictingTypeReference(label));
            }
        }

        if raw_prototype.is_some() && raw_object.is_some() {
            return Err(ModelError::AmbiguousTypeReference(label));
        }

        let type_unit = if raw_object.is_some() {
            TypeUnit::Object
        } else {
            TypeUnit::Prototype
        };

        let resolved_export_id = export_id
            .or_else(|| raw_prototype.map(str::to_string))
            .or_else(|| raw_object.map(str::to_string));

        Ok(Self {
            base: Declaration::new(label, resolved_export_id, properties, bindings, raw),
            listeners,
            editor_metadata,
            is_user_object,
            type_unit,
        })
    }

    /// A fresh proxy for a newly declared component, with no raw units.
    pub fn with_export_id(label: impl Into<String>, export_id: impl Into<String>) -> Self {
        Self {
            base: Declaration::new(
                label,
                Some(export_id.into()),
                IndexMap::new(),
                Vec::new(),
                JsonMap::new(),
            ),
            listeners: Vec::new(),
            editor_metadata: IndexMap::new(),
            is_user_object: false,
            type_unit: TypeUnit::Prototype,
        }
    }

    pub fn is_user_object(&self) -> bool {
        self.is_user_object
    }

    pub fn type_unit(&self) -> TypeUnit {
        self.type_unit
    }

    /// The `identifier` property if set, else the label.
    pub fn identifier(&self) -> &str {
        self.base
            .get_property("identifier")
            .and_then(Value::as_str)
            .unwrap_or_else(|| self.base.label())
    }

    /// Writes through only when the value actually changes the derived
    /// identifier.
    pub fn set_identifier(&mut self, value: &str) {
        if value != self.identifier() {
            self.base.set_property("identifier", value.into());
        }
    }

    // Listeners

    pub fn listeners(&self) -> &[Listener] {
        &self.listeners
    }

    /// Insert `listener` at `index` (append when `None`). Adding a listener
    /// already present on this proxy is an error.
    pub fn add_listener(
        &mut self,
        listener: Listener,
        index: Option<usize>,
    ) -> Result<&Listener, ModelError> {
        if self.listeners.contains(&listener) {
            return Err(ModelError::DuplicateListener);
        }

        match index {
            Some(index) if index < self.listeners.len() => {
                self.listeners.insert(index, listener);
                Ok(&self.listeners[index])
            }
            _ => {
                self.listeners.push(listener);
                Ok(self.listeners.last().unwrap())
            }
        }
    }

    /// Convenience constructor form: always appends a fresh descriptor, with
    /// no duplicate check.
    pub fn add_event_listener(
        &mut self,
        event_type: impl Into<String>,
        listener: impl Into<String>,
        use_capture: bool,
    ) -> &Listener {
        self.listeners.push(Listener {
            event_type: event_type.into(),
            listener: listener.into(),
            use_capture,
        });
        self.listeners.last().unwrap()
    }

    /// Mutate `existing` in place. The listener must belong to this proxy.
    pub fn update_listener(
        &mut self,
        existing: &Listener,
        event_type: impl Into<String>,
        listener: impl Into<String>,
        use_capture: bool,
    ) -> Result<&Listener, ModelError> {
        let index = self
            .listeners
            .iter()
            .position(|l| l == existing)
            .ok_or(ModelError::ListenerNotFound)?;

        let entry = &mut self.listeners[index];
        entry.event_type = event_type.into();
        entry.listener = listener.into();
        entry.use_capture = use_capture;
        Ok(&self.listeners[index])
    }

    /// Remove `listener` from this proxy. Removing a listener that was never
    /// added is an error, unlike binding cancellation.
    pub fn remove_listener(&mut self, listener: &Listener) -> Result<RemovedListener, ModelError> {
        let index = self
            .listeners
            .iter()
            .position(|l| l == listener)
            .ok_or(ModelError::ListenerNotFound)?;

        let removed = self.listeners.remove(index);
        Ok(RemovedListener { index, removed })
    }

    // Editor metadata

    pub fn editor_metadata(&self) -> &IndexMap<String, Value> {
        &self.editor_metadata
    }

    pub fn get_editor_metadata(&self, key: &str) -> Option<&Value> {
        self.editor_metadata.get(key)
    }

    /// Falsy `comment`/`isHidden` annotations are dropped rather than
    /// stored, so empty annotations never reach the serialized form.
    pub fn set_editor_metadata(&mut self, key: &str, value: Value) {
        if (key == "comment" || key == "isHidden") && value.is_falsy() {
            self.editor_metadata.shift_remove(key);
        } else {
            self.editor_metadata.insert(key.to_string(), value);
        }
    }
}

impl Deref for TemplateObject {
    type Target = Declaration;

    fn deref(&self) -> &Declaration {
        &self.base
    }
}

impl DerefMut for TemplateObject {
    fn deref_mut(&mut self) -> &mut Declaration {
        &mut self.base
    }
}
