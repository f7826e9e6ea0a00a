//! Error types for query-backed selection fields

use thiserror::Error;

/// Result type for selection field operations
pub type Result<T> = std::result::Result<T, SelectError>;

/// Errors that can occur while building or driving a selection field
#[derive(Debug, Error)]
pub enum SelectError {
    /// A query document does not have the shape an operation requires
    #[error("invalid query document: {reason}")]
    InvalidDocument { reason: String },

    /// An entity descriptor was configured inconsistently
    #[error("invalid entity descriptor '{entity}': {reason}")]
    InvalidDescriptor { entity: String, reason: String },

    /// The query transport failed to deliver a response
    #[error("query transport error: {0}")]
    Transport(String),

    /// Configuration could not be loaded or extracted
    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The field's event loop has stopped (the field was shut down)
    #[error("selection field is closed")]
    FieldClosed,
}

impl SelectError {
    /// Shorthand for an [`SelectError::InvalidDocument`].
    pub fn invalid_document(reason: impl Into<String>) -> Self {
        Self::InvalidDocument {
            reason: reason.into(),
        }
    }
}

impl From<figment::Error> for SelectError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}
