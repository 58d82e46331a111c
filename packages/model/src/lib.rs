//! # Vellum Model
//!
//! Core document editing model for Vellum templates.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ markup: template text → element arena       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ model: editable proxy graph                 │
//! │  - shadow tree mirroring the markup arena   │
//! │  - declaration proxies revived from the     │
//! │    embedded JSON blob                       │
//! │  - template-objects tree for display        │
//! │  - serializer for lossless save             │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! A document is loaded from a pair of sources (markup plus companion
//! code). The markup carries a JSON declaration blob in a script element;
//! the [`Reviver`] turns it into a graph of [`TemplateObject`] proxies whose
//! `element` properties point into the markup shadow tree. The
//! [`Serializer`] walks the graph back into the canonical blob, preserving
//! units it does not understand.

mod data_source;
mod declaration;
mod document;
mod errors;
mod export_id;
mod node_proxy;
mod reviver;
mod serializer;
mod template_object;
mod tree;
mod value;

pub use data_source::{DataChange, DataSource, MemoryDataSource};
pub use declaration::{Binding, Declaration};
pub use document::{LoadProblem, TemplateDocument};
pub use errors::ModelError;
pub use export_id::{ExportId, ExportIdCache};
pub use node_proxy::{ProxyId, ShadowTree};
pub use reviver::{
    Reviver, APPLICATION_EXPORT_ID, APPLICATION_LABEL, EDITOR_UNIT, ROOT_OBJECT_LABEL,
};
pub use serializer::Serializer;
pub use template_object::{Listener, RemovedListener, TemplateObject, TypeUnit};
pub use tree::{build_template_object_tree, TreeNode};
pub use value::Value;
