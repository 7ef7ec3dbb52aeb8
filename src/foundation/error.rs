/// Convenience result type used across the compositor.
pub type MockupResult<T> = Result<T, MockupError>;

/// Top-level error taxonomy used by compositor APIs.
#[derive(thiserror::Error, Debug)]
pub enum MockupError {
    /// Caller passed structurally invalid input (wrong point count, empty path, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A linear system had a numerically-zero pivot (degenerate or collinear points).
    #[error("singular matrix: {0}")]
    SingularMatrix(String),

    /// Invalid document or layer data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A texture or blob could not be fetched or decoded.
    #[error("load error: {0}")]
    Load(String),

    /// The framebuffer could not be captured or encoded.
    #[error("export error: {0}")]
    Export(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MockupError {
    /// Build a [`MockupError::InvalidInput`] value.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Build a [`MockupError::SingularMatrix`] value.
    pub fn singular(msg: impl Into<String>) -> Self {
        Self::SingularMatrix(msg.into())
    }

    /// Build a [`MockupError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`MockupError::Load`] value.
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    /// Build a [`MockupError::Export`] value.
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Build a [`MockupError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
