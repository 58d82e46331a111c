//! Error types for the editing model

use thiserror::Error;
use vellum_markup::MarkupError;

/// Fatal model errors. These abort the operation that raised them; document
/// load catches the ones raised during revival and records them instead.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("No export id provided or found for template object with label '{0}'")]
    NoTypeReference(String),

    #[error("Conflicting prototype and export id values provided for template object with label '{0}'")]
    ConflictingTypeReference(String),

    #[error("Declaration for object with label '{0}' cannot have both 'prototype' and 'object' units")]
    AmbiguousTypeReference(String),

    #[error("Cannot add the same listener to a proxy more than once")]
    DuplicateListener,

    #[error("Listener is not associated with this proxy")]
    ListenerNotFound,

    #[error("Could not find proxy with label '{0}'")]
    ProxyNotFound(String),

    #[error("Declaration blob is not a JSON object")]
    MalformedBlob,

    #[error("Cannot build template objects tree: looping on the same objects")]
    TreeCycle,

    #[error("Cannot find child position")]
    ChildPositionNotFound,

    #[error("Document has no loaded markup")]
    NoMarkup,

    #[error("Markup error: {0}")]
    Markup(#[from] MarkupError),
}

impl From<ModelError> for vellum_common::CommonError {
    fn from(error: ModelError) -> Self {
        match error {
            ModelError::Markup(markup) => vellum_common::CommonError::Markup(markup),
            other => vellum_common::CommonError::Generic(other.to_string()),
        }
    }
}
