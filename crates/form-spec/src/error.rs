use thiserror::Error;

/// Failures at the boundary of the core. Evaluation and compilation never fail.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("failed to parse form snapshot: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("failed to decode cbor form snapshot: {0}")]
    Cbor(#[source] serde_cbor::Error),
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
    #[error("template error: {0}")]
    Template(#[from] handlebars::RenderError),
    #[error("document writer failed: {0}")]
    Write(String),
}

impl From<std::fmt::Error> for FormError {
    fn from(error: std::fmt::Error) -> Self {
        FormError::Write(error.to_string())
    }
}
