use thiserror::Error;

/// Errors surfaced synchronously by the editor API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    /// The value handed to `set_value` (or `insert`) is not a well-formed tree.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// The typesetter could not be started; the editor stays inert.
    #[error("renderer unavailable: {0}")]
    RendererUnavailable(String),
}

impl EditorError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        EditorError::InvalidValue(message.into())
    }
}

/// Failure reported by a typesetter for a single job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesetError {
    #[error("typesetter failed to start: {0}")]
    Startup(String),

    #[error("markup rejected by typesetter: {0}")]
    Markup(String),

    /// The laid-out formula does not fit the cell grid.
    #[error("formula too large to lay out")]
    TooLarge,
}

impl From<TypesetError> for EditorError {
    fn from(err: TypesetError) -> Self {
        EditorError::RendererUnavailable(err.to_string())
    }
}
