/// Typed errors for the storage layer.
///
/// The `Store` methods return `anyhow::Result` at the access-layer
/// boundary; this enum exists so callers that need to distinguish
/// not-found from real failures can downcast.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A required record was not found in the database.
    #[error("Storage: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// JSON serialization or deserialization failure (config columns).
    #[error("Storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic storage error for cases not covered by other variants.
    #[error("Storage: {0}")]
    Other(String),
}
