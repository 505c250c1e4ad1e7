/// Convenience result type used across kinegraph.
pub type KinegraphResult<T> = Result<T, KinegraphError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum KinegraphError {
    /// Null or malformed target, out-of-range value, bad enum.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// A required resource (for example a named font) is not available.
    #[error("insufficient condition: {0}")]
    InsufficientCondition(String),

    /// Empty or unparsable composition data.
    #[error("load error: {0}")]
    Load(String),

    /// A render pass could not acquire or write its destination.
    #[error("render error: {0}")]
    Render(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KinegraphError {
    /// Build a [`KinegraphError::InvalidArguments`] value.
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Build a [`KinegraphError::InsufficientCondition`] value.
    pub fn insufficient_condition(msg: impl Into<String>) -> Self {
        Self::InsufficientCondition(msg.into())
    }

    /// Build a [`KinegraphError::Load`] value.
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    /// Build a [`KinegraphError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`KinegraphError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for KinegraphError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
