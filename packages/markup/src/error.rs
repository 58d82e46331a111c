//! Error types for the markup tree

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarkupError {
    #[error("Markup parse error: {0}")]
    Parse(#[from] roxmltree::Error),

    #[error("Markup document has no <body> element")]
    MissingBody,

    #[error("Node is not a child of the given parent")]
    NotAChild,

    #[error("Node is already attached to a parent")]
    AlreadyAttached,

    #[error("No declaration script element in markup")]
    MissingDeclarationScript,
}
