use thiserror::Error;
use vellum_markup::MarkupError;

/// Common error type that can hold any vellum error
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Markup error: {0}")]
    Markup(#[from] MarkupError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

impl From<String> for CommonError {
    fn from(s: String) -> Self {
        CommonError::Generic(s)
    }
}

impl From<&str> for CommonError {
    fn from(s: &str) -> Self {
        CommonError::Generic(s.to_string())
    }
}
