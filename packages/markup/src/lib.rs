//! # Vellum Markup
//!
//! The "real" markup tree backing a template document.
//!
//! Markup text is parsed once at load time (via roxmltree) into a mutable
//! arena of elements. Every later structural edit happens on the arena; the
//! editing model in `vellum-model` mirrors it with a shadow tree of node
//! proxies and funnels all mutation through here.

mod error;
mod splice;
mod tree;

pub use error::MarkupError;
pub use splice::splice_declaration;
pub use tree::{MarkupNode, MarkupTree, NodeId};

/// MIME type of the script element carrying the declaration blob.
pub const DECLARATION_SCRIPT_TYPE: &str = "text/declaration";

/// Reserved attribute naming an element for `{"#": id}` references.
pub const ELEMENT_ID_ATTRIBUTE: &str = "data-element-id";

/// Reserved attribute marking an element as a template argument.
pub const ARG_ATTRIBUTE: &str = "data-arg";

/// Reserved attribute marking an element as a template parameter.
pub const PARAM_ATTRIBUTE: &str = "data-param";
